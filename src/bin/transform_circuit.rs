// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Geometric transforms for circuit images.
//!
//! Flipping or transposing a circuit moves pixels *and* rewires each
//! cell: the truth-table index bits and direction flags must follow the
//! geometry. Each transform therefore permutes the 20 significant
//! descriptor bits while leaving the label nibble untouched.

use std::path::PathBuf;

use clap::Parser;
use image::RgbImage;

/// perm[i] is the source bit of output bit i. Index bits are
/// (east, north, west, south) = (0, 1, 2, 3); direction flags sit at
/// 16..20 in the same order.
const FLIP_VERTICAL: [usize; 20] = [
    0, 4, 2, 6, 1, 5, 3, 7, 8, 12, 10, 14, 9, 13, 11, 15, 18, 17, 16, 19,
];
const FLIP_HORIZONTAL: [usize; 20] = [
    0, 1, 8, 9, 4, 5, 12, 13, 2, 3, 10, 11, 6, 7, 14, 15, 16, 19, 18, 17,
];
const TRANSPOSE: [usize; 20] = [
    0, 8, 4, 12, 2, 10, 6, 14, 1, 9, 5, 13, 3, 11, 7, 15, 19, 18, 17, 16,
];

#[derive(Parser)]
#[command(
    name = "transform-circuit",
    about = "Flip, transpose or rotate a circuit image, rewiring each cell to match"
)]
struct Cli {
    /// Transforms applied left to right: v = flip about the vertical
    /// axis, h = flip about the horizontal axis, t = transpose,
    /// l = rotate left, r = rotate right, u = rotate 180 degrees.
    transforms: String,

    /// Input circuit image path.
    input: PathBuf,

    /// Output circuit image path.
    output: PathBuf,
}

/// Permute the 20 significant bits of one pixel, preserving the label
/// nibble in the upper half of R.
fn permute_rule(pixel: image::Rgb<u8>, perm: &[usize; 20]) -> image::Rgb<u8> {
    let value =
        ((pixel[0] as u32) << 16) | ((pixel[1] as u32) << 8) | pixel[2] as u32;
    let mut out = value & 0x00f0_0000;
    for (i, &src) in perm.iter().enumerate() {
        out |= ((value >> src) & 1) << i;
    }
    image::Rgb([(out >> 16) as u8, (out >> 8) as u8, out as u8])
}

fn flip_vertical(img: &RgbImage) -> RgbImage {
    let (w, h) = img.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        permute_rule(*img.get_pixel(w - 1 - x, y), &FLIP_VERTICAL)
    })
}

fn flip_horizontal(img: &RgbImage) -> RgbImage {
    let (w, h) = img.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        permute_rule(*img.get_pixel(x, h - 1 - y), &FLIP_HORIZONTAL)
    })
}

fn transpose(img: &RgbImage) -> RgbImage {
    let (w, h) = img.dimensions();
    RgbImage::from_fn(h, w, |x, y| permute_rule(*img.get_pixel(y, x), &TRANSPOSE))
}

fn main() {
    clilog::init_stderr_color_debug();
    let cli = Cli::parse();

    // Expand the rotation shorthands into primitive transforms.
    let mut steps = Vec::new();
    for c in cli.transforms.chars() {
        match c {
            'v' => steps.push('v'),
            'h' => steps.push('h'),
            't' => steps.push('t'),
            'l' => steps.extend(['t', 'h']),
            'r' => steps.extend(['h', 't']),
            'u' => steps.extend(['v', 'h']),
            other => {
                eprintln!("unknown transform character '{other}' (expected v, h, t, l, r or u)");
                std::process::exit(1);
            }
        }
    }

    clilog::info!("Loading circuit {}", cli.input.display());
    let img = image::open(&cli.input).unwrap_or_else(|e| {
        clilog::error!("failed to load image {}: {}", cli.input.display(), e);
        std::process::exit(1);
    });
    if img.color() != image::ColorType::Rgb8 {
        clilog::error!(
            "input image {} is not 3-channel RGB ({:?})",
            cli.input.display(),
            img.color()
        );
        std::process::exit(1);
    }
    let mut img = img.to_rgb8();

    for step in steps {
        img = match step {
            'v' => flip_vertical(&img),
            'h' => flip_horizontal(&img),
            _ => transpose(&img),
        };
    }

    if let Err(e) = img.save(&cli.output) {
        clilog::error!("failed to write {}: {}", cli.output.display(), e);
        std::process::exit(1);
    }
    clilog::info!("Wrote transformed circuit to {}", cli.output.display());
}
