use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::media::mimetype;

pub const DEFAULT_MAX_WIDTH: u32 = 864;
pub const DEFAULT_MAX_HEIGHT: u32 = 1152;
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Base64 text of a JPEG, ready for a TEXT column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage(String);

impl EncodedImage {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub fn decode_bytes(&self) -> std::result::Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.0)
    }
}

/// Rotates, stretch-fits and JPEG-encodes catalog pictures.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    max_width: u32,
    max_height: u32,
    quality: u8,
    keep_resized_copy: bool,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WIDTH, DEFAULT_MAX_HEIGHT)
    }
}

impl ImageNormalizer {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
            quality: DEFAULT_JPEG_QUALITY,
            keep_resized_copy: false,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Also write the resized JPEG next to the source as `<stem>_<w>_<h><ext>`.
    pub fn keep_resized_copy(mut self, keep: bool) -> Self {
        self.keep_resized_copy = keep;
        self
    }

    /// `None` for an absent or empty path, which means "no picture".
    pub fn normalize(&self, path: Option<&Path>) -> Result<Option<EncodedImage>> {
        let path = match path {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => return Ok(None),
        };

        mimetype::ensure_image(path)?;
        let source = load_image(path)?;

        // Sources are shot in a fixed orientation; this is not EXIF driven.
        let rotated = source.rotate90();
        // Bicubic; samples past the border clamp to the edge pixel rather than mirroring it.
        let resized = rotated.resize_exact(self.max_width, self.max_height, FilterType::CatmullRom);
        let jpeg = self.encode_jpeg(&resized, path)?;

        let bytes = if self.keep_resized_copy {
            let copy_path = resized_copy_path(path, self.max_width, self.max_height);
            fs::write(&copy_path, &jpeg).map_err(|source| IngestError::ImageIo {
                path: copy_path.clone(),
                source,
            })?;
            debug!("Wrote resized copy {:?}", copy_path);
            fs::read(&copy_path).map_err(|source| IngestError::ImageIo {
                path: copy_path,
                source,
            })?
        } else {
            jpeg
        };

        debug!("Normalized {:?} ({} JPEG bytes)", path, bytes.len());
        Ok(Some(EncodedImage(STANDARD.encode(bytes))))
    }

    fn encode_jpeg(&self, image: &DynamicImage, path: &Path) -> Result<Vec<u8>> {
        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut buffer = Cursor::new(Vec::new());
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, self.quality))
            .map_err(|e| IngestError::ImageDecode {
                path: path.to_path_buf(),
                reason: format!("JPEG encoding failed: {}", e),
            })?;
        Ok(buffer.into_inner())
    }
}

fn load_image(path: &Path) -> Result<DynamicImage> {
    let io_error = |source: std::io::Error| IngestError::ImageIo {
        path: path.to_path_buf(),
        source,
    };
    ImageReader::open(path)
        .map_err(io_error)?
        .with_guessed_format()
        .map_err(io_error)?
        .decode()
        .map_err(|e| IngestError::ImageDecode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// `dir/bottle.jpg` -> `dir/bottle_864_1152.jpg`
pub fn resized_copy_path(path: &Path, width: u32, height: u32) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}_{}.{}", stem, width, height, ext.to_string_lossy()),
        None => format!("{}_{}_{}", stem, width, height),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage, RgbaImage};

    /// Left half red, right half blue.
    fn write_split_image(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        img.save_with_format(path, ImageFormat::Png).unwrap();
    }

    fn decode(payload: &EncodedImage) -> DynamicImage {
        image::load_from_memory(&payload.decode_bytes().unwrap()).unwrap()
    }

    #[test]
    fn test_absent_or_empty_path_is_no_image() {
        let normalizer = ImageNormalizer::default();
        assert_eq!(normalizer.normalize(None).unwrap(), None);
        assert_eq!(normalizer.normalize(Some(Path::new(""))).unwrap(), None);
    }

    #[test]
    fn test_output_always_fills_the_box() {
        let tmp = tempfile::TempDir::new().unwrap();
        let normalizer = ImageNormalizer::new(48, 64);

        for (i, (w, h)) in [(300, 200), (17, 91), (1, 1), (64, 48)].into_iter().enumerate() {
            let path = tmp.path().join(format!("src_{}.png", i));
            write_split_image(&path, w, h);

            let payload = normalizer.normalize(Some(&path)).unwrap().unwrap();
            assert_eq!(decode(&payload).dimensions(), (48, 64), "source {}x{}", w, h);
        }
    }

    #[test]
    fn test_default_box_is_portrait() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bottle.png");
        write_split_image(&path, 120, 90);

        let payload = ImageNormalizer::default().normalize(Some(&path)).unwrap().unwrap();
        let bytes = payload.decode_bytes().unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        assert_eq!(decode(&payload).dimensions(), (DEFAULT_MAX_WIDTH, DEFAULT_MAX_HEIGHT));
    }

    #[test]
    fn test_rotation_is_clockwise() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("split.png");
        write_split_image(&path, 40, 20);

        // 40x20 rotated is 20x40, so this box does not distort.
        let payload = ImageNormalizer::new(20, 40).normalize(Some(&path)).unwrap().unwrap();
        let img = decode(&payload).to_rgb8();

        let top = img.get_pixel(10, 5);
        let bottom = img.get_pixel(10, 34);
        assert!(top[0] > 200 && top[2] < 60, "top should be red: {:?}", top);
        assert!(bottom[2] > 200 && bottom[0] < 60, "bottom should be blue: {:?}", bottom);
    }

    #[test]
    fn test_alpha_source_is_flattened() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("alpha.png");
        RgbaImage::from_pixel(30, 30, image::Rgba([10, 200, 30, 128]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let payload = ImageNormalizer::new(16, 16).normalize(Some(&path)).unwrap().unwrap();
        assert_eq!(decode(&payload).dimensions(), (16, 16));
    }

    #[test]
    fn test_keep_resized_copy_writes_sibling() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bottle.png");
        write_split_image(&path, 50, 50);

        let payload = ImageNormalizer::new(24, 32)
            .keep_resized_copy(true)
            .normalize(Some(&path))
            .unwrap()
            .unwrap();

        let copy = tmp.path().join("bottle_24_32.png");
        assert!(copy.exists());
        assert_eq!(fs::read(&copy).unwrap(), payload.decode_bytes().unwrap());
    }

    #[test]
    fn test_in_memory_leaves_no_sibling() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bottle.png");
        write_split_image(&path, 50, 50);

        ImageNormalizer::new(24, 32).normalize(Some(&path)).unwrap();
        assert!(!tmp.path().join("bottle_24_32.png").exists());
    }

    #[test]
    fn test_resized_copy_path() {
        assert_eq!(
            resized_copy_path(Path::new("/pics/a.b.jpg"), 864, 1152),
            PathBuf::from("/pics/a.b_864_1152.jpg")
        );
        assert_eq!(
            resized_copy_path(Path::new("raw"), 10, 20),
            PathBuf::from("raw_10_20")
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ImageNormalizer::default().normalize(Some(Path::new("/nonexistent/a.jpg")));
        assert!(matches!(result, Err(IngestError::ImageIo { .. })));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        fs::write(&path, b"definitely not pixels").unwrap();

        let result = ImageNormalizer::default().normalize(Some(&path));
        assert!(matches!(result, Err(IngestError::ImageDecode { .. })));
    }

    #[test]
    fn test_unwritable_copy_is_io_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bottle.png");
        write_split_image(&path, 20, 20);
        // A directory squatting on the copy's name makes the write fail.
        fs::create_dir(tmp.path().join("bottle_8_8.png")).unwrap();

        let result = ImageNormalizer::new(8, 8).keep_resized_copy(true).normalize(Some(&path));
        assert!(matches!(result, Err(IngestError::ImageIo { .. })));
    }
}
