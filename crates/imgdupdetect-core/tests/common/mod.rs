#![allow(dead_code)]

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use imgdupdetect_core::{Config, ContentStore, DupDetector};
use std::fs;
use std::path::{Path, PathBuf};

pub const RED: [u8; 3] = [220, 20, 20];
pub const BLUE: [u8; 3] = [20, 20, 220];

/// Solid colour JPEG of the given size
pub fn solid_jpeg(dir: &Path, name: &str, colour: [u8; 3], size: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(size, size, Rgb(colour))
        .save(&path)
        .unwrap();
    path
}

/// Solid colour PNG of the given dimensions
pub fn solid_png(dir: &Path, name: &str, colour: [u8; 3], width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb(colour))
        .save(&path)
        .unwrap();
    path
}

/// Opaque solid colour GIF
pub fn solid_gif(dir: &Path, name: &str, colour: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    let [r, g, b] = colour;
    RgbaImage::from_pixel(8, 8, Rgba([r, g, b, 255]))
        .save(&path)
        .unwrap();
    path
}

/// Byte-for-byte copy of `source` as `dir/name`
pub fn copy_as(source: &Path, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::copy(source, &path).unwrap();
    path
}

/// A file with an image extension whose header is not an image
pub fn garbage(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"definitely not pixels").unwrap();
    path
}

/// A PNG whose header is intact but whose pixel data is cut off
pub fn truncated_png(dir: &Path, name: &str) -> PathBuf {
    let full = solid_png(dir, name, RED, 64, 64);
    let bytes = fs::read(&full).unwrap();
    // Signature, IHDR and the start of the first IDAT chunk
    fs::write(&full, &bytes[..45]).unwrap();
    full
}

/// Default configuration with a fixed worker count
pub fn config_with_workers(threads: usize) -> Config {
    Config {
        threads,
        queue_capacity: 4,
        ..Config::default()
    }
}

/// Detector over an in-memory store
pub fn detector(config: Config) -> DupDetector {
    DupDetector::with_store(config, ContentStore::open_in_memory().unwrap()).unwrap()
}

/// Store key of an existing file: its canonical path as text
pub fn path_string(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap()
        .to_string_lossy()
        .into_owned()
}
