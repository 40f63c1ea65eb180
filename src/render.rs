// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Frame rendering and animated GIF output.
//!
//! States map to two fixed colors; each cell becomes an s×s pixel block.
//! Frames accumulate into a looping GIF next to the circuit JSON.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// RGBA for state 0.
pub const COLOR_OFF: [u8; 4] = [0, 0, 0, 255];
/// RGBA for state 1.
pub const COLOR_ON: [u8; 4] = [255, 255, 255, 255];

/// Render the unpacked board into an RGBA frame scaled by `scale`.
pub fn render_frame(cells: &[bool], width: usize, height: usize, scale: usize) -> Vec<u8> {
    debug_assert_eq!(cells.len(), width * height);
    let row_px = width * scale;
    let mut frame = vec![0u8; width * height * scale * scale * 4];
    for y in 0..height {
        for x in 0..width {
            let color = if cells[y * width + x] {
                COLOR_ON
            } else {
                COLOR_OFF
            };
            for j in 0..scale {
                for i in 0..scale {
                    let px = (y * scale + j) * row_px + x * scale + i;
                    frame[px * 4..px * 4 + 4].copy_from_slice(&color);
                }
            }
        }
    }
    frame
}

/// Streaming writer for the output animation.
pub struct GifRecorder {
    encoder: gif::Encoder<BufWriter<File>>,
    width: u16,
    height: u16,
    delay_cs: u16,
}

impl GifRecorder {
    /// Create `path` and write the animation header. `width`/`height`
    /// are in output pixels (board size times scale), `frametime_ms` the
    /// delay between frames.
    pub fn create(
        path: &Path,
        width: usize,
        height: usize,
        frametime_ms: u64,
    ) -> Result<Self, String> {
        let file = File::create(path)
            .map_err(|e| format!("failed to create {}: {}", path.display(), e))?;
        let mut encoder = gif::Encoder::new(BufWriter::new(file), width as u16, height as u16, &[])
            .map_err(|e| format!("failed to start gif {}: {}", path.display(), e))?;
        encoder
            .set_repeat(gif::Repeat::Infinite)
            .map_err(|e| format!("failed to start gif {}: {}", path.display(), e))?;
        Ok(Self {
            encoder,
            width: width as u16,
            height: height as u16,
            // GIF frame delays are in centiseconds.
            delay_cs: (frametime_ms / 10) as u16,
        })
    }

    /// Append one RGBA frame.
    pub fn write_frame(&mut self, rgba: &[u8]) -> Result<(), String> {
        let mut pixels = rgba.to_vec();
        let mut frame = gif::Frame::from_rgba_speed(self.width, self.height, &mut pixels, 10);
        frame.delay = self.delay_cs;
        self.encoder
            .write_frame(&frame)
            .map_err(|e| format!("failed to write gif frame: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_unscaled() {
        let frame = render_frame(&[true, false], 2, 1, 1);
        assert_eq!(frame.len(), 8);
        assert_eq!(&frame[0..4], &COLOR_ON);
        assert_eq!(&frame[4..8], &COLOR_OFF);
    }

    #[test]
    fn test_render_scales_cells_to_blocks() {
        // 1×2 board, scale 3: a 3×6 image, top block white, bottom black.
        let frame = render_frame(&[true, false], 1, 2, 3);
        assert_eq!(frame.len(), 3 * 6 * 4);
        for px in 0..9 {
            assert_eq!(&frame[px * 4..px * 4 + 4], &COLOR_ON, "pixel {px}");
        }
        for px in 9..18 {
            assert_eq!(&frame[px * 4..px * 4 + 4], &COLOR_OFF, "pixel {px}");
        }
    }

    #[test]
    fn test_render_block_boundaries() {
        // 2×1 board, scale 2: each row is WWBB.
        let frame = render_frame(&[true, false], 2, 1, 2);
        let row_px = 4;
        for row in 0..2 {
            for col in 0..4 {
                let px = row * row_px + col;
                let expect = if col < 2 { &COLOR_ON } else { &COLOR_OFF };
                assert_eq!(&frame[px * 4..px * 4 + 4], expect, "row {row} col {col}");
            }
        }
    }

    #[test]
    fn test_gif_recorder_writes_animation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circuit.json.out.gif");
        let mut recorder = GifRecorder::create(&path, 4, 4, 100).unwrap();
        let frame_a = render_frame(&vec![true; 4], 2, 2, 2);
        let frame_b = render_frame(&vec![false; 4], 2, 2, 2);
        recorder.write_frame(&frame_a).unwrap();
        recorder.write_frame(&frame_b).unwrap();
        drop(recorder);
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"GIF89a"));
        assert!(bytes.len() > 6);
    }
}
