// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Bit-parallel tick kernel.
//!
//! Each tile word is advanced by building, per compass direction, the
//! one-step and two-step neighbour words (shifts of the tile with a
//! border slice stitched in from the adjacent tile), selecting between
//! them per bit with the direction plane, and then OR-ing the 16 product
//! terms of the truth-table evaluation. The 16 terms are disjoint: each
//! cell's four selector bits pick exactly one table index.

use crate::circuit::{CircuitPlanes, Direction, TRUTH_PLANES};
use crate::grid::PackedGrid;

/// Row-boundary masks for horizontal shifts. Shifting the whole word
/// moves bits across row boundaries; the masks cut those strays and the
/// border terms re-fill them from the neighbour tile.
const EAST1_KEEP: u32 = 0x7f7f7f7f;
const EAST1_EDGE: u32 = 0x80808080;
const EAST2_KEEP: u32 = 0x3f3f3f3f;
const EAST2_EDGE: u32 = 0xc0c0c0c0;
const WEST1_KEEP: u32 = 0xfefefefe;
const WEST1_EDGE: u32 = 0x01010101;
const WEST2_KEEP: u32 = 0xfcfcfcfc;
const WEST2_EDGE: u32 = 0x03030303;

/// Neighbour tile words around one tile, 0 where off-board.
#[derive(Clone, Copy, Debug, Default)]
pub struct TileNeighborhood {
    pub east: u32,
    pub north: u32,
    pub west: u32,
    pub south: u32,
}

/// Advance the 32 cells of one tile.
///
/// `truth[i]` is truth plane i's word for this tile and `dirs[d]` the
/// direction plane word (bit set = neighbour two away), both from the
/// circuit planes.
#[inline]
pub fn advance_tile(p: u32, nb: TileNeighborhood, truth: &[u32; 16], dirs: &[u32; 4]) -> u32 {
    // One-step and two-step neighbour values per direction.
    let v_e0 = ((p >> 1) & EAST1_KEEP) | ((nb.east << 7) & EAST1_EDGE);
    let v_e1 = ((p >> 2) & EAST2_KEEP) | ((nb.east << 6) & EAST2_EDGE);
    let v_n0 = (p << 8) | (nb.north >> 24);
    let v_n1 = (p << 16) | (nb.north >> 16);
    let v_w0 = ((p << 1) & WEST1_KEEP) | ((nb.west >> 7) & WEST1_EDGE);
    let v_w1 = ((p << 2) & WEST2_KEEP) | ((nb.west >> 6) & WEST2_EDGE);
    let v_s0 = (p >> 8) | (nb.south << 24);
    let v_s1 = (p >> 16) | (nb.south << 16);

    // Per-bit mux: direction bit set selects the two-step value.
    let sel_e = (dirs[Direction::East as usize] & v_e1)
        | (!dirs[Direction::East as usize] & v_e0);
    let sel_n = (dirs[Direction::North as usize] & v_n1)
        | (!dirs[Direction::North as usize] & v_n0);
    let sel_w = (dirs[Direction::West as usize] & v_w1)
        | (!dirs[Direction::West as usize] & v_w0);
    let sel_s = (dirs[Direction::South as usize] & v_s1)
        | (!dirs[Direction::South as usize] & v_s0);

    let e = [!sel_e, sel_e];
    let n = [!sel_n, sel_n];
    let w = [!sel_w, sel_w];
    let s = [!sel_s, sel_s];

    let mut out = 0u32;
    for index in 0..TRUTH_PLANES {
        out |= e[index & 1]
            & n[(index >> 1) & 1]
            & w[(index >> 2) & 1]
            & s[(index >> 3) & 1]
            & truth[index];
    }
    out
}

/// Compute the full next state from the current state, writing every
/// tile of `next`. Pure in (planes, current); iteration order is not
/// observable.
pub fn step(planes: &CircuitPlanes, current: &PackedGrid, next: &mut PackedGrid) {
    let wp = planes.tiles_wide();
    let hp = planes.tiles_high();
    debug_assert_eq!(current.tiles_wide(), wp);
    debug_assert_eq!(current.tiles_high(), hp);
    for ty in 0..hp {
        for tx in 0..wp {
            let ti = ty * wp + tx;
            let nb = TileNeighborhood {
                east: current.tile_or_zero(tx as i64 + 1, ty as i64),
                north: current.tile_or_zero(tx as i64, ty as i64 - 1),
                west: current.tile_or_zero(tx as i64 - 1, ty as i64),
                south: current.tile_or_zero(tx as i64, ty as i64 + 1),
            };
            let mut truth = [0u32; 16];
            for (index, word) in truth.iter_mut().enumerate() {
                *word = planes.truth_word(index, ti);
            }
            let dirs = [
                planes.dir_word(Direction::East, ti),
                planes.dir_word(Direction::North, ti),
                planes.dir_word(Direction::West, ti),
                planes.dir_word(Direction::South, ti),
            ];
            next.words_mut()[ti] = advance_tile(current.tile_or_zero(tx as i64, ty as i64), nb, &truth, &dirs);
        }
    }
}
