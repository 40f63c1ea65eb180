// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Peripheral devices and their engine contract.
//!
//! A peripheral declares input cells it reads and output cells it
//! drives, each a (x, y, bit) triple. Every tick the engine fills the
//! input bits from the pre-tick state, runs [`Peripheral::update`], then
//! copies the output bits into the next state, overriding whatever the
//! kernel computed there. Devices see the terminal only through the
//! [`HostIo`] capability.

use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::console::{HostIo, PanelId};

/// One cell of a peripheral's interface. The engine fills `bit` for
/// inputs and consumes it for outputs; out-of-range coordinates read
/// nothing and write nowhere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellBit {
    pub x: i32,
    pub y: i32,
    pub bit: bool,
}

impl CellBit {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y, bit: false }
    }
}

/// A device exchanging bits with the board once per tick.
///
/// `outputs` is consulted after `update`, so a device may shorten its
/// output list on ticks where it releases some cells to the circuit.
pub trait Peripheral {
    fn inputs(&mut self) -> &mut [CellBit] {
        &mut []
    }

    fn outputs(&mut self) -> &mut [CellBit] {
        &mut []
    }

    fn update(&mut self, io: &mut dyn HostIo);
}

// ── JSON initializer shapes ─────────────────────────────────────────────

/// A bare board position in an initializer.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct CellPos {
    #[serde(rename = "X")]
    pub x: i32,
    #[serde(rename = "Y")]
    pub y: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LedSpec {
    #[serde(rename = "X")]
    pub x: i32,
    #[serde(rename = "Y")]
    pub y: i32,
    #[serde(rename = "Label")]
    pub label: String,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct SwitchSpec {
    #[serde(rename = "X")]
    pub x: i32,
    #[serde(rename = "Y")]
    pub y: i32,
    /// ASCII keycode driving this switch.
    #[serde(rename = "Key")]
    pub key: u8,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ClockSpec {
    #[serde(rename = "X")]
    pub x: i32,
    #[serde(rename = "Y")]
    pub y: i32,
    /// Toggle period in milliseconds of wall-clock time.
    #[serde(rename = "Period")]
    pub period_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct KeyboardSpec {
    #[serde(rename = "Key pressed line")]
    pub pressed_line: CellPos,
    /// Keycode bits, least significant first.
    #[serde(rename = "Key code lane")]
    pub code_lane: [CellPos; 8],
}

#[derive(Clone, Debug, Deserialize)]
pub struct PrinterSpec {
    #[serde(rename = "Print line")]
    pub print_line: CellPos,
    /// Character-code bits, least significant first.
    #[serde(rename = "Character lane")]
    pub char_lane: [CellPos; 8],
}

/// A peripheral descriptor as it appears in the circuit JSON:
/// `{"Class": …, "Initializer": …}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "Class", content = "Initializer")]
pub enum PeripheralSpec {
    LEDArray(Vec<LedSpec>),
    BitSwitchArray(Vec<SwitchSpec>),
    Clock(ClockSpec),
    Keyboard(KeyboardSpec),
    CharStreamPrinter(PrinterSpec),
}

impl PeripheralSpec {
    /// Instantiate the device. Panel-owning devices register their panel
    /// here, so build order fixes panel order on screen.
    pub fn build(self, io: &mut dyn HostIo) -> Box<dyn Peripheral> {
        match self {
            PeripheralSpec::LEDArray(leds) => Box::new(LedArray::new(leds, io)),
            PeripheralSpec::BitSwitchArray(switches) => Box::new(BitSwitchArray::new(switches)),
            PeripheralSpec::Clock(spec) => Box::new(Clock::new(spec)),
            PeripheralSpec::Keyboard(spec) => Box::new(Keyboard::new(spec)),
            PeripheralSpec::CharStreamPrinter(spec) => Box::new(CharStreamPrinter::new(spec)),
        }
    }
}

// ── Devices ─────────────────────────────────────────────────────────────

/// Status LEDs: reads its cells and renders them as one labelled line in
/// an owned panel.
pub struct LedArray {
    labels: Vec<String>,
    cells: Vec<CellBit>,
    panel: PanelId,
}

impl LedArray {
    pub fn new(leds: Vec<LedSpec>, io: &mut dyn HostIo) -> Self {
        let cells = leds.iter().map(|led| CellBit::new(led.x, led.y)).collect();
        let labels = leds.into_iter().map(|led| led.label).collect();
        Self {
            labels,
            cells,
            panel: io.add_panel(),
        }
    }
}

impl Peripheral for LedArray {
    fn inputs(&mut self) -> &mut [CellBit] {
        &mut self.cells
    }

    fn update(&mut self, io: &mut dyn HostIo) {
        let mut line = String::from("LEDs: ");
        for (label, cell) in self.labels.iter().zip(&self.cells) {
            line.push_str(label);
            line.push(if cell.bit { '1' } else { '0' });
        }
        line.push('\n');
        io.set_panel_text(self.panel, &line);
    }
}

/// Key-driven switches: each output cell tracks the pressed state of its
/// key.
pub struct BitSwitchArray {
    keys: Vec<u8>,
    cells: Vec<CellBit>,
}

impl BitSwitchArray {
    pub fn new(switches: Vec<SwitchSpec>) -> Self {
        Self {
            cells: switches.iter().map(|sw| CellBit::new(sw.x, sw.y)).collect(),
            keys: switches.iter().map(|sw| sw.key).collect(),
        }
    }
}

impl Peripheral for BitSwitchArray {
    fn outputs(&mut self) -> &mut [CellBit] {
        &mut self.cells
    }

    fn update(&mut self, io: &mut dyn HostIo) {
        for (cell, &key) in self.cells.iter_mut().zip(&self.keys) {
            cell.bit = io.key_state(key);
        }
    }
}

/// Wall-clock square wave. Circuit-built clocks cannot track real time
/// and grow with the period; this device drives one cell instead.
pub struct Clock {
    period: Duration,
    state: bool,
    previous: Instant,
    cell: [CellBit; 1],
}

impl Clock {
    pub fn new(spec: ClockSpec) -> Self {
        Self {
            period: Duration::from_millis(spec.period_ms),
            state: false,
            previous: Instant::now(),
            cell: [CellBit::new(spec.x, spec.y)],
        }
    }
}

impl Peripheral for Clock {
    fn outputs(&mut self) -> &mut [CellBit] {
        &mut self.cell
    }

    fn update(&mut self, _io: &mut dyn HostIo) {
        if self.previous.elapsed() > self.period {
            self.previous = Instant::now();
            self.state = !self.state;
        }
        self.cell[0].bit = self.state;
    }
}

/// Keyboard front-end: an any-key line plus an 8-bit keycode lane.
///
/// While no key is pressed only the any-key line is driven; the code
/// lane is released so the circuit may use those cells itself.
pub struct Keyboard {
    /// cells[0] is the pressed line, cells[1..9] the code lane LSB first.
    cells: Vec<CellBit>,
    driven: usize,
}

impl Keyboard {
    pub fn new(spec: KeyboardSpec) -> Self {
        let mut cells = Vec::with_capacity(9);
        cells.push(CellBit::new(spec.pressed_line.x, spec.pressed_line.y));
        cells.extend(spec.code_lane.iter().map(|pos| CellBit::new(pos.x, pos.y)));
        Self { cells, driven: 1 }
    }
}

impl Peripheral for Keyboard {
    fn outputs(&mut self) -> &mut [CellBit] {
        &mut self.cells[..self.driven]
    }

    fn update(&mut self, io: &mut dyn HostIo) {
        let pressed = io.any_key_pressed();
        self.cells[0].bit = pressed;
        if pressed {
            let key = io.pressed_key().unwrap_or(0);
            for i in 0..8 {
                self.cells[1 + i].bit = (key >> i) & 1 != 0;
            }
            self.driven = 9;
        } else {
            self.driven = 1;
        }
    }
}

/// Character-stream output: on a falling edge of the print line, emits
/// the character whose code sits on the lane. Code 127 is backspace.
pub struct CharStreamPrinter {
    /// cells[0] is the print line, cells[1..9] the character lane LSB
    /// first.
    cells: Vec<CellBit>,
    line_prev: bool,
}

impl CharStreamPrinter {
    pub fn new(spec: PrinterSpec) -> Self {
        let mut cells = Vec::with_capacity(9);
        cells.push(CellBit::new(spec.print_line.x, spec.print_line.y));
        cells.extend(spec.char_lane.iter().map(|pos| CellBit::new(pos.x, pos.y)));
        Self {
            cells,
            line_prev: false,
        }
    }
}

impl Peripheral for CharStreamPrinter {
    fn inputs(&mut self) -> &mut [CellBit] {
        &mut self.cells
    }

    fn update(&mut self, io: &mut dyn HostIo) {
        let line = self.cells[0].bit;
        if self.line_prev && !line {
            let mut code = 0u8;
            for i in 0..8 {
                code |= (self.cells[1 + i].bit as u8) << i;
            }
            if code == 127 {
                io.backspace();
            } else {
                io.print(&(code as char).to_string());
            }
        }
        self.line_prev = line;
    }
}
