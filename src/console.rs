// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Terminal I/O for the peripheral layer.
//!
//! Peripherals consume the [`HostIo`] capability: sampled keyboard state,
//! a character stream, and replaceable text panels. The live
//! implementation drives a raw-mode terminal through crossterm; tests use
//! [`testing::ScriptedIo`].

use std::io::{stdout, Write};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{execute, queue};

/// Handle to one text panel, in registration order from the top of the
/// screen.
pub type PanelId = usize;

/// Terminal capability consumed by peripherals.
///
/// Key state is sampled, not event-driven: a key reads as pressed while
/// it was seen within the current sampling window.
pub trait HostIo {
    /// State of the key with the given ASCII keycode.
    fn key_state(&mut self, key: u8) -> bool;
    /// Whether any key is currently pressed.
    fn any_key_pressed(&mut self) -> bool;
    /// Keycode of an arbitrary pressed key, if any.
    fn pressed_key(&mut self) -> Option<u8>;
    /// Append text to the character stream below the panels.
    fn print(&mut self, text: &str);
    /// Erase the character before the stream cursor; no-op at column 0.
    fn backspace(&mut self);
    /// Register a new panel below the existing ones.
    fn add_panel(&mut self) -> PanelId;
    /// Replace a panel's text and redraw it.
    fn set_panel_text(&mut self, panel: PanelId, text: &str);
}

/// How long a drained batch of key events stays valid before the state
/// table is resampled.
const KEY_REFRESH: Duration = Duration::from_millis(25);

/// Map a crossterm key code to the ASCII byte peripherals see.
fn key_byte(code: KeyCode) -> Option<u8> {
    match code {
        KeyCode::Char(c) if c.is_ascii() => Some(c as u8),
        KeyCode::Enter => Some(b'\n'),
        KeyCode::Tab => Some(b'\t'),
        KeyCode::Esc => Some(27),
        KeyCode::Backspace => Some(127),
        _ => None,
    }
}

/// Raw-mode terminal console.
///
/// Layout: panels stacked from row 0, each followed by a dashed
/// separator line; the character stream begins below the last panel.
pub struct Console {
    key_states: [bool; 256],
    any_pressed: bool,
    last_refresh: Instant,
    panels: Vec<String>,
    stream_base: u16,
    stream_row: u16,
    stream_col: u16,
    cols: u16,
    rows: u16,
}

impl Console {
    /// Enter raw mode and clear the screen.
    pub fn init() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        let (cols, rows) = terminal::size()?;
        execute!(stdout(), Hide, Clear(ClearType::All), MoveTo(0, 0))?;
        Ok(Self {
            key_states: [false; 256],
            any_pressed: false,
            last_refresh: Instant::now(),
            panels: Vec::new(),
            stream_base: 0,
            stream_row: 0,
            stream_col: 0,
            cols,
            rows,
        })
    }

    /// Leave raw mode. The terminal cursor lands on a fresh line.
    pub fn finish(self) {
        let _ = execute!(stdout(), Show, MoveTo(0, self.rows.saturating_sub(1)), Print("\r\n"));
        let _ = terminal::disable_raw_mode();
    }

    /// Block until any key is pressed.
    pub fn wait_for_key(&mut self) {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(100)) {
                if let Ok(Event::Key(k)) = event::read() {
                    if k.kind != KeyEventKind::Release {
                        return;
                    }
                }
            }
        }
    }

    /// Clear the stream area, keeping the panels.
    pub fn clear_stream(&mut self) {
        let mut out = stdout();
        for row in self.stream_base..self.rows {
            let _ = queue!(out, MoveTo(0, row), Clear(ClearType::CurrentLine));
        }
        self.stream_row = self.stream_base;
        self.stream_col = 0;
        let _ = queue!(out, MoveTo(self.stream_col, self.stream_row));
        let _ = out.flush();
    }

    fn refresh_keys(&mut self) {
        if self.last_refresh.elapsed() <= KEY_REFRESH {
            return;
        }
        self.key_states = [false; 256];
        self.any_pressed = false;
        while let Ok(true) = event::poll(Duration::ZERO) {
            match event::read() {
                Ok(Event::Key(k)) if k.kind != KeyEventKind::Release => {
                    if let Some(byte) = key_byte(k.code) {
                        self.key_states[byte as usize] = true;
                        self.any_pressed = true;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
        self.last_refresh = Instant::now();
    }

    /// Rows a panel occupies on screen, separator included.
    fn panel_rows(text: &str) -> u16 {
        text.lines().count().max(1) as u16 + 1
    }

    /// First screen row of the given panel.
    fn panel_base(&self, panel: PanelId) -> u16 {
        self.panels[..panel]
            .iter()
            .map(|t| Self::panel_rows(t))
            .sum()
    }

    fn draw_panel(&self, panel: PanelId) {
        let mut out = stdout();
        let mut row = self.panel_base(panel);
        let text = &self.panels[panel];
        let lines: Vec<&str> = if text.is_empty() {
            vec![""]
        } else {
            text.lines().collect()
        };
        for line in lines {
            let _ = queue!(out, MoveTo(0, row), Clear(ClearType::CurrentLine), Print(line));
            row += 1;
        }
        let separator = "-".repeat(self.cols as usize);
        let _ = queue!(out, MoveTo(0, row), Print(&separator));
        let _ = queue!(out, MoveTo(self.stream_col, self.stream_row));
        let _ = out.flush();
    }

    fn redraw_all(&mut self) {
        let _ = execute!(stdout(), Clear(ClearType::All));
        self.stream_base = self
            .panels
            .iter()
            .map(|t| Self::panel_rows(t))
            .sum::<u16>();
        self.stream_row = self.stream_base;
        self.stream_col = 0;
        for panel in 0..self.panels.len() {
            self.draw_panel(panel);
        }
    }
}

impl HostIo for Console {
    fn key_state(&mut self, key: u8) -> bool {
        self.refresh_keys();
        self.key_states[key as usize]
    }

    fn any_key_pressed(&mut self) -> bool {
        self.refresh_keys();
        self.any_pressed
    }

    fn pressed_key(&mut self) -> Option<u8> {
        self.refresh_keys();
        self.key_states
            .iter()
            .position(|&down| down)
            .map(|key| key as u8)
    }

    fn print(&mut self, text: &str) {
        let mut out = stdout();
        for ch in text.chars() {
            if ch == '\n' {
                self.stream_row += 1;
                self.stream_col = 0;
            } else {
                let _ = queue!(out, MoveTo(self.stream_col, self.stream_row), Print(ch));
                self.stream_col += 1;
                if self.stream_col >= self.cols {
                    self.stream_row += 1;
                    self.stream_col = 0;
                }
            }
            if self.stream_row >= self.rows {
                // Stream ran off the screen: restart it below the panels.
                let _ = out.flush();
                self.clear_stream();
            }
        }
        let _ = queue!(out, MoveTo(self.stream_col, self.stream_row));
        let _ = out.flush();
    }

    fn backspace(&mut self) {
        if self.stream_col == 0 {
            return;
        }
        self.stream_col -= 1;
        let _ = execute!(
            stdout(),
            MoveTo(self.stream_col, self.stream_row),
            Print(' '),
            MoveTo(self.stream_col, self.stream_row)
        );
    }

    fn add_panel(&mut self) -> PanelId {
        self.panels.push(String::new());
        self.redraw_all();
        self.panels.len() - 1
    }

    fn set_panel_text(&mut self, panel: PanelId, text: &str) {
        let old_rows = Self::panel_rows(&self.panels[panel]);
        let new_rows = Self::panel_rows(text);
        self.panels[panel] = text.to_string();
        if old_rows == new_rows {
            self.draw_panel(panel);
        } else {
            // Line count changed: everything below shifts.
            self.redraw_all();
        }
    }
}
