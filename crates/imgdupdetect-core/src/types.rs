use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Metadata field holding the file size in bytes
pub const SIZE_FIELD: &str = "size";
/// Metadata field holding the pixel width
pub const WIDTH_FIELD: &str = "width";
/// Metadata field holding the pixel height
pub const HEIGHT_FIELD: &str = "height";

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Gif,
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Every format the fingerprint engine can decode
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Gif, ImageFormat::Jpeg, ImageFormat::Png];

    /// Map a format sniffed by the decoder onto a supported format
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            _ => None,
        }
    }

    /// Glob patterns matching file names of this format
    pub fn default_patterns(&self) -> &'static [&'static str] {
        match self {
            Self::Gif => &["*.gif"],
            Self::Jpeg => &["*.jpg", "*.jpeg"],
            Self::Png => &["*.png"],
        }
    }

    /// Short lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which digest a scan computes, and so which collection it fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// SHA-256 over the sampled middle row and column
    #[default]
    Fingerprint,

    /// BLAKE3 over the whole file contents
    Checksum,
}

impl ScanMode {
    /// Default collection name for this mode
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Fingerprint => "fingerprint",
            Self::Checksum => "checksum",
        }
    }
}

/// Lowercase hex encoding of raw bytes
pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A 32-byte content digest used as the dedup key
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; Fingerprint::LEN]);

impl Fingerprint {
    /// Digest length in bytes
    pub const LEN: usize = 32;

    pub fn new(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex representation
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}

impl TryFrom<&[u8]> for Fingerprint {
    type Error = std::array::TryFromSliceError;

    fn try_from(bytes: &[u8]) -> std::result::Result<Self, Self::Error> {
        Ok(Self(<[u8; Self::LEN]>::try_from(bytes)?))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Raw metadata attached to one file under one fingerprint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata(BTreeMap<String, Vec<u8>>);

impl FileMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a raw field value, replacing any previous value
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.0.insert(field.into(), value.into());
    }

    /// Set a field to an 8-byte big-endian integer
    pub fn insert_u64(&mut self, field: impl Into<String>, value: u64) {
        self.insert(field, value.to_be_bytes().to_vec());
    }

    pub fn get(&self, field: &str) -> Option<&[u8]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Read a field written by `insert_u64`
    pub fn get_u64(&self, field: &str) -> Option<u64> {
        let bytes: [u8; 8] = self.get(field)?.try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for FileMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// An image file described by its header only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageDescriptor {
    /// Full path to the image file
    pub path: PathBuf,

    /// Format sniffed from the header bytes
    pub format: ImageFormat,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// File size in bytes
    pub size: u64,
}

impl ImageDescriptor {
    /// Read the image header without decoding any pixel data.
    ///
    /// The path is canonicalized first so one file has one key however it
    /// was reached. Paths that are not valid UTF-8 are rejected.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let canonical = std::fs::canonicalize(path.as_ref())?;
        if canonical.to_str().is_none() {
            return Err(Error::InvalidPath(canonical));
        }
        let path = canonical.as_path();
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        let reader = image::io::Reader::new(BufReader::new(file)).with_guessed_format()?;
        let format = match reader.format() {
            Some(sniffed) => ImageFormat::from_image_format(sniffed)
                .ok_or_else(|| Error::UnsupportedFormat(format!("{:?}", sniffed)))?,
            None => {
                return Err(Error::UnsupportedFormat(format!(
                    "unrecognised header in {}",
                    path.display()
                )))
            }
        };
        let (width, height) = reader.into_dimensions()?;

        Ok(Self {
            path: path.to_path_buf(),
            format,
            width,
            height,
            size,
        })
    }

    /// Key under which the file is recorded in the store; lossless for
    /// descriptors built by `open`
    pub fn filename(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// The `size`, `width` and `height` metadata record for this file
    pub fn metadata(&self) -> FileMetadata {
        let mut meta = FileMetadata::new();
        meta.insert_u64(SIZE_FIELD, self.size);
        meta.insert_u64(WIDTH_FIELD, u64::from(self.width));
        meta.insert_u64(HEIGHT_FIELD, u64::from(self.height));
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_fingerprint_hex_and_order() {
        let mut low = [0u8; 32];
        low[31] = 1;
        let mut high = [0u8; 32];
        high[0] = 0xab;

        let a = Fingerprint::new(low);
        let b = Fingerprint::new(high);
        assert!(a < b);
        assert_eq!(b.to_hex().len(), 64);
        assert!(b.to_string().starts_with("ab00"));
        assert!(Fingerprint::try_from(&[1u8, 2, 3][..]).is_err());
        assert_eq!(Fingerprint::try_from(&low[..]).unwrap(), a);
    }

    #[test]
    fn test_metadata_big_endian_fields() {
        let mut meta = FileMetadata::new();
        meta.insert_u64(SIZE_FIELD, 0x0102);
        assert_eq!(meta.get(SIZE_FIELD), Some(&[0, 0, 0, 0, 0, 0, 1, 2][..]));
        assert_eq!(meta.get_u64(SIZE_FIELD), Some(0x0102));

        meta.insert("note", b"abc".to_vec());
        assert_eq!(meta.get_u64("note"), None);
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn test_descriptor_reads_header() {
        let dir = tempdir().unwrap();
        // Extension deliberately wrong: the format comes from the header bytes
        let path = dir.path().join("wide.gif");
        RgbImage::from_pixel(7, 3, Rgb([1, 2, 3]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let descriptor = ImageDescriptor::open(&path).unwrap();
        assert_eq!(descriptor.format, ImageFormat::Png);
        assert_eq!((descriptor.width, descriptor.height), (7, 3));
        assert_eq!(descriptor.size, std::fs::metadata(&path).unwrap().len());

        let meta = descriptor.metadata();
        assert_eq!(meta.get_u64(WIDTH_FIELD), Some(7));
        assert_eq!(meta.get_u64(HEIGHT_FIELD), Some(3));
        assert_eq!(meta.get_u64(SIZE_FIELD), Some(descriptor.size));
    }

    #[test]
    fn test_descriptor_rejects_non_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.jpg");
        std::fs::write(&path, b"DUMMY IMAGE DATA").unwrap();

        let result = ImageDescriptor::open(&path);
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_descriptor_path_is_canonical() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        RgbImage::from_pixel(2, 2, Rgb([9, 9, 9]))
            .save(nested.join("pic.png"))
            .unwrap();

        let direct = ImageDescriptor::open(nested.join("pic.png")).unwrap();
        let dotted = ImageDescriptor::open(dir.path().join(".").join("nested/../nested/pic.png")).unwrap();

        assert_eq!(direct.filename(), dotted.filename());
        assert!(direct.path.is_absolute());
        assert!(!direct.filename().contains("/./"));
    }

    #[cfg(unix)]
    #[test]
    fn test_descriptor_rejects_non_utf8_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join(OsStr::from_bytes(b"x\xff.png"));
        RgbImage::from_pixel(2, 2, Rgb([9, 9, 9]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let result = ImageDescriptor::open(&path);
        assert!(matches!(result, Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_descriptor_missing_file_is_io_error() {
        let result = ImageDescriptor::open("/path/that/does/not/exist.png");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
