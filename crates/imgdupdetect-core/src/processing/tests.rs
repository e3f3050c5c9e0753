#[allow(clippy::module_inception)]
#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use image::{DynamicImage, Rgba, RgbaImage};
    use tempfile::tempdir;

    use crate::processing::fingerprint::sample_buffer;
    use crate::processing::{checksum_file, fingerprint, fingerprint_file, PixelSource};
    use crate::types::{ImageDescriptor, ImageFormat, ScanMode};
    use crate::Error;

    /// Synthetic source whose channels encode their own coordinates
    struct Grid {
        width: u32,
        height: u32,
    }

    impl PixelSource for Grid {
        fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn channels(&self, x: u32, y: u32) -> [u16; 4] {
            [x as u16, y as u16, 0xabcd, 0xffff]
        }
    }

    fn save_png(dir: &Path, name: &str, img: &RgbaImage) -> PathBuf {
        let path = dir.join(name);
        img.save_with_format(&path, image::ImageFormat::Png).unwrap();
        path
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7) as u8, (y * 11) as u8, ((x + y) * 3) as u8, 255])
        })
    }

    fn fingerprint_path(path: &Path) -> String {
        let descriptor = ImageDescriptor::open(path).unwrap();
        fingerprint_file(&descriptor).unwrap().to_hex()
    }

    #[test]
    fn test_sample_buffer_layout() {
        // 3x2: middle column is x = 1, middle row is y = 1
        let buf = sample_buffer(&Grid {
            width: 3,
            height: 2,
        });
        assert_eq!(buf.len(), (3 + 2) * 8);

        let pixel = |x: u8, y: u8| [0, x, 0, y, 0xab, 0xcd, 0xff, 0xff];
        let mut expected = Vec::new();
        expected.extend_from_slice(&pixel(1, 0));
        expected.extend_from_slice(&pixel(1, 1));
        expected.extend_from_slice(&pixel(0, 1));
        expected.extend_from_slice(&pixel(1, 1));
        expected.extend_from_slice(&pixel(2, 1));

        assert_eq!(buf, expected);
    }

    #[test]
    fn test_known_digest_single_white_pixel() {
        let dir = tempdir().unwrap();
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let path = save_png(dir.path(), "white.png", &img);

        // SHA-256 of sixteen 0xff bytes
        assert_eq!(
            fingerprint_path(&path),
            "5ac6a5945f16500911219129984ba8b387a06f24fe383ce4e81a73294065461b"
        );
    }

    #[test]
    fn test_zero_height_samples_as_zero() {
        let img = DynamicImage::new_rgba8(4, 0);
        // SHA-256 of 32 zero bytes: four out-of-bounds row samples
        assert_eq!(
            fingerprint(&img).to_hex(),
            "66687aadf862bd776c8fc18b8e9f8e20089714856ee233b3902a591d0d5f2925"
        );
    }

    #[test]
    fn test_channels_widen_and_premultiply() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([0xff, 0x00, 0x12, 0xff]));
        img.put_pixel(1, 1, Rgba([0xff, 0xff, 0xff, 0x80]));
        let img = DynamicImage::ImageRgba8(img);

        assert_eq!(img.channels(0, 0), [0xffff, 0x0000, 0x1212, 0xffff]);
        assert_eq!(img.channels(1, 1), [0x8080, 0x8080, 0x8080, 0x8080]);
        assert_eq!(img.channels(5, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_sixteen_bit_channels_used_directly() {
        let img = image::ImageBuffer::from_pixel(1, 1, image::Rgba([0x1234u16, 0x5678, 0x9abc, 0xffff]));
        let img = DynamicImage::ImageRgba16(img);
        assert_eq!(img.channels(0, 0), [0x1234, 0x5678, 0x9abc, 0xffff]);
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let dir = tempdir().unwrap();
        let path = save_png(dir.path(), "gradient.png", &gradient(40, 30));

        assert_eq!(fingerprint_path(&path), fingerprint_path(&path));
    }

    #[test]
    fn test_copy_has_same_fingerprint() {
        let dir = tempdir().unwrap();
        let original = save_png(dir.path(), "original.png", &gradient(40, 30));

        let nested = dir.path().join("elsewhere");
        std::fs::create_dir(&nested).unwrap();
        let copy = nested.join("renamed.png");
        std::fs::copy(&original, &copy).unwrap();

        assert_eq!(fingerprint_path(&original), fingerprint_path(&copy));
    }

    #[test]
    fn test_middle_row_and_column_changes_are_detected() {
        let dir = tempdir().unwrap();
        let base = gradient(40, 30);
        let base_fp = fingerprint_path(&save_png(dir.path(), "base.png", &base));

        // On the middle row (y = 15), away from the middle column
        let mut row_edit = base.clone();
        row_edit.put_pixel(3, 15, Rgba([1, 2, 3, 255]));
        let row_fp = fingerprint_path(&save_png(dir.path(), "row.png", &row_edit));
        assert_ne!(base_fp, row_fp);

        // On the middle column (x = 20), away from the middle row
        let mut col_edit = base.clone();
        col_edit.put_pixel(20, 2, Rgba([1, 2, 3, 255]));
        let col_fp = fingerprint_path(&save_png(dir.path(), "col.png", &col_edit));
        assert_ne!(base_fp, col_fp);
        assert_ne!(row_fp, col_fp);
    }

    #[test]
    fn test_changes_off_the_sampled_lines_are_not_detected() {
        // Known blind spot: only the middle row and middle column are sampled
        let dir = tempdir().unwrap();
        let base = gradient(40, 30);
        let base_fp = fingerprint_path(&save_png(dir.path(), "base.png", &base));

        let mut edited = base.clone();
        for (x, y) in [(0, 0), (39, 29), (5, 5), (21, 16)] {
            edited.put_pixel(x, y, Rgba([9, 9, 9, 255]));
        }
        let edited_fp = fingerprint_path(&save_png(dir.path(), "edited.png", &edited));

        assert_eq!(base_fp, edited_fp);
    }

    #[test]
    fn test_undecodable_file_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"DUMMY IMAGE DATA").unwrap();

        let descriptor = ImageDescriptor {
            path,
            format: ImageFormat::Png,
            width: 1,
            height: 1,
            size: 16,
        };
        assert!(matches!(fingerprint_file(&descriptor), Err(Error::Decode(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let descriptor = ImageDescriptor {
            path: PathBuf::from("/path/that/does/not/exist.png"),
            format: ImageFormat::Png,
            width: 1,
            height: 1,
            size: 0,
        };
        assert!(matches!(fingerprint_file(&descriptor), Err(Error::Io(_))));
    }

    #[test]
    fn test_header_size_mismatch_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = save_png(dir.path(), "small.png", &gradient(4, 4));
        let mut descriptor = ImageDescriptor::open(&path).unwrap();
        descriptor.width = 8;

        assert!(matches!(fingerprint_file(&descriptor), Err(Error::Decode(_))));
    }

    #[test]
    fn test_checksum_matches_blake3_of_contents() {
        let dir = tempdir().unwrap();
        let path = save_png(dir.path(), "gradient.png", &gradient(10, 10));
        let bytes = std::fs::read(&path).unwrap();

        let checksum = checksum_file(&path).unwrap();
        assert_eq!(checksum.as_bytes(), blake3::hash(&bytes).as_bytes());
    }

    #[test]
    fn test_scan_mode_dispatch() {
        let dir = tempdir().unwrap();
        let path = save_png(dir.path(), "gradient.png", &gradient(10, 10));
        let descriptor = ImageDescriptor::open(&path).unwrap();

        assert_eq!(
            ScanMode::Fingerprint.digest(&descriptor).unwrap(),
            fingerprint_file(&descriptor).unwrap()
        );
        assert_eq!(
            ScanMode::Checksum.digest(&descriptor).unwrap(),
            checksum_file(&path).unwrap()
        );
    }
}
