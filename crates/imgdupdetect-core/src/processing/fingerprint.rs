//! Pixel fingerprints.
//!
//! A fingerprint samples the full middle column and the full middle row of an
//! image, packs every sampled pixel as four 16-bit big-endian channels
//! (R, G, B, A) and digests the result with SHA-256:
//!
//! ```text
//! [ column: H pixels at x = W/2 ][ row: W pixels at y = H/2 ]
//!   offset y * 8                   offset (H + x) * 8
//! ```
//!
//! Only those pixels contribute. An edit that leaves the middle row and
//! column untouched produces the same fingerprint.

use image::{DynamicImage, GenericImageView, Pixel};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufReader;

use crate::error::{Error, Result};
use crate::types::{Fingerprint, ImageDescriptor};

/// Bytes per sampled pixel: four channels of two bytes
const BYTES_PER_PIXEL: usize = 8;

/// Anything that exposes pixel dimensions and 16-bit RGBA lookups
pub trait PixelSource {
    /// Width and height in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Alpha-premultiplied 16-bit R, G, B, A at `(x, y)`, zero when out of bounds
    fn channels(&self, x: u32, y: u32) -> [u16; 4];
}

impl PixelSource for DynamicImage {
    fn dimensions(&self) -> (u32, u32) {
        GenericImageView::dimensions(self)
    }

    fn channels(&self, x: u32, y: u32) -> [u16; 4] {
        let (width, height) = GenericImageView::dimensions(self);
        if x >= width || y >= height {
            return [0; 4];
        }

        let straight = match self {
            DynamicImage::ImageLuma16(buf) => buf.get_pixel(x, y).to_rgba().0,
            DynamicImage::ImageLumaA16(buf) => buf.get_pixel(x, y).to_rgba().0,
            DynamicImage::ImageRgb16(buf) => buf.get_pixel(x, y).to_rgba().0,
            DynamicImage::ImageRgba16(buf) => buf.get_pixel(x, y).0,
            // 8-bit (and float) images widen every channel: 0xab -> 0xabab
            other => other.get_pixel(x, y).0.map(|c| u16::from(c) * 0x101),
        };

        premultiply(straight)
    }
}

/// Scale colour channels by alpha the way 16-bit RGBA colour models report them
fn premultiply([r, g, b, a]: [u16; 4]) -> [u16; 4] {
    let alpha = u32::from(a);
    let scale = |c: u16| (u32::from(c) * alpha / 0xffff) as u16;
    [scale(r), scale(g), scale(b), a]
}

fn midpoints(width: u32, height: u32) -> (u32, u32) {
    (width / 2, height / 2)
}

fn put_channels(buf: &mut [u8], offset: usize, channels: [u16; 4]) {
    for (j, c) in channels.iter().enumerate() {
        let at = offset + j * 2;
        buf[at..at + 2].copy_from_slice(&c.to_be_bytes());
    }
}

/// Build the sample buffer that gets digested
pub(crate) fn sample_buffer<S: PixelSource + ?Sized>(source: &S) -> Vec<u8> {
    let (width, height) = source.dimensions();
    let (mid_x, mid_y) = midpoints(width, height);
    let (w, h) = (width as usize, height as usize);

    let mut buf = vec![0u8; (w + h) * BYTES_PER_PIXEL];

    // Middle column, top to bottom
    for y in 0..height {
        let offset = y as usize * BYTES_PER_PIXEL;
        put_channels(&mut buf, offset, source.channels(mid_x, y));
    }

    // Middle row, left to right, after the column section
    for x in 0..width {
        let offset = (h + x as usize) * BYTES_PER_PIXEL;
        put_channels(&mut buf, offset, source.channels(x, mid_y));
    }

    buf
}

/// Compute the fingerprint of a pixel source
pub fn fingerprint<S: PixelSource + ?Sized>(source: &S) -> Fingerprint {
    let digest = Sha256::digest(sample_buffer(source));
    Fingerprint::new(digest.into())
}

/// Fully decode an image file and compute its fingerprint
pub fn fingerprint_file(descriptor: &ImageDescriptor) -> Result<Fingerprint> {
    let image = {
        let file = File::open(&descriptor.path)?;
        image::io::Reader::new(BufReader::new(file))
            .with_guessed_format()?
            .decode()?
    };

    let decoded = PixelSource::dimensions(&image);
    if decoded != (descriptor.width, descriptor.height) {
        return Err(Error::Decode(image::ImageError::Decoding(
            image::error::DecodingError::new(
                image::error::ImageFormatHint::Unknown,
                format!(
                    "decoded size {}x{} differs from header {}x{}",
                    decoded.0, decoded.1, descriptor.width, descriptor.height
                ),
            ),
        )));
    }

    Ok(fingerprint(&image))
}
