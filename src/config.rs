// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Circuit configuration: the JSON descriptor file and the RGB circuit
//! image it points at.
//!
//! The JSON names an image and a peripheral list; the image encodes one
//! cell rule per pixel. A relative image path is resolved against the
//! JSON file's directory.

use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::Deserialize;

use crate::circuit::CellRule;
use crate::peripheral::PeripheralSpec;

/// Top-level circuit JSON.
#[derive(Debug, Deserialize)]
pub struct CircuitConfig {
    #[serde(rename = "Image path")]
    pub image_path: String,
    #[serde(rename = "Peripherals", default)]
    pub peripherals: Vec<PeripheralSpec>,
}

/// A fully loaded circuit: board shape, per-cell rules, peripheral
/// descriptors still to be instantiated against a console.
#[derive(Debug)]
pub struct LoadedCircuit {
    pub width: usize,
    pub height: usize,
    pub rules: Vec<u32>,
    pub peripherals: Vec<PeripheralSpec>,
}

/// Parse the circuit JSON file.
pub fn parse_config(json_path: &Path) -> Result<CircuitConfig, String> {
    let content = std::fs::read_to_string(json_path)
        .map_err(|e| format!("failed to read circuit json {}: {}", json_path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("failed to parse circuit json {}: {}", json_path.display(), e))
}

/// Resolve the image path from the JSON: absolute paths pass through,
/// relative paths are relative to the JSON file's directory.
pub fn resolve_image_path(json_path: &Path, image_path: &str) -> PathBuf {
    let image = Path::new(image_path);
    if image.is_absolute() {
        return image.to_path_buf();
    }
    match json_path.parent() {
        Some(dir) => dir.join(image),
        None => image.to_path_buf(),
    }
}

/// Decode an RGB image into the row-major rule array.
pub fn decode_image(img: &RgbImage) -> (usize, usize, Vec<u32>) {
    let (width, height) = img.dimensions();
    let rules = img
        .pixels()
        .map(|p| CellRule::from_rgb(p.0[0], p.0[1], p.0[2]).0)
        .collect();
    (width as usize, height as usize, rules)
}

/// Load the circuit JSON and the image it references.
pub fn load_circuit(json_path: &Path) -> Result<LoadedCircuit, String> {
    let config = parse_config(json_path)?;
    let image_path = resolve_image_path(json_path, &config.image_path);
    clilog::info!("Loading circuit image {}", image_path.display());
    let img = image::open(&image_path)
        .map_err(|e| format!("failed to load image {}: {}", image_path.display(), e))?;
    if img.color() != image::ColorType::Rgb8 {
        clilog::warn!(
            "circuit image {} is not 3-channel RGB ({:?}); converting",
            image_path.display(),
            img.color()
        );
    }
    let (width, height, rules) = decode_image(&img.to_rgb8());
    Ok(LoadedCircuit {
        width,
        height,
        rules,
        peripherals: config.peripherals,
    })
}
