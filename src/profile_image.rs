//! Profile picture ingestion.
//!
//! A [`ProfileImage`] is only ever constructed from bytes that decoded
//! successfully, so anything stored in the composition state can be embedded
//! into the rendered card as-is.

use std::io::Cursor;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A fully loaded picture ready to be displayed on the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileImage {
    bytes: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl ProfileImage {
    /// Validates and wraps raw image bytes.
    ///
    /// PNG, JPEG, GIF and WebP are kept as they are. Any other format the
    /// decoder understands (BMP, TIFF, ICO, ...) is converted to PNG once
    /// here, so the stored bytes can always be embedded in the card.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let format = image::guess_format(&bytes).map_err(|e| Error::ImageDecode(e.to_string()))?;
        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| Error::ImageDecode(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());

        if is_embeddable(format) {
            return Ok(Self {
                bytes,
                format,
                width,
                height,
            });
        }

        debug!(?format, "converting profile image to PNG");
        let mut png = Cursor::new(Vec::new());
        decoded
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| Error::ImageDecode(e.to_string()))?;
        Ok(Self {
            bytes: png.into_inner(),
            format: ImageFormat::Png,
            width,
            height,
        })
    }

    /// Returns the MIME type of the picture.
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Returns the picture's pixel dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the raw encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encodes the picture as a self-contained `data:` URI.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(&self.bytes))
    }
}

fn is_embeddable(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP
    )
}

/// Reads and validates a picture from disk.
///
/// Failures are logged and returned; callers decide whether to surface them.
pub async fn read_profile_image(path: &Path) -> Result<ProfileImage> {
    let bytes = tokio::fs::read(path).await.map_err(|source| {
        warn!(path = %path.display(), error = %source, "failed to read profile image");
        Error::ImageRead {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let image = ProfileImage::from_bytes(bytes).inspect_err(|e| {
        warn!(path = %path.display(), error = %e, "rejected profile image");
    })?;

    debug!(
        path = %path.display(),
        mime = image.mime_type(),
        width = image.width,
        height = image.height,
        "loaded profile image"
    );
    Ok(image)
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    use image::{Rgba, RgbaImage};

    let img = RgbaImage::from_pixel(width, height, Rgba([30, 144, 255, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_becomes_data_uri() {
        let image = ProfileImage::from_bytes(sample_png(4, 3)).unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.dimensions(), (4, 3));

        let uri = image.to_data_uri();
        assert!(uri.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn bmp_is_converted_to_png() {
        let img = image::RgbImage::from_pixel(5, 4, image::Rgb([200, 10, 10]));
        let mut bmp = Cursor::new(Vec::new());
        img.write_to(&mut bmp, ImageFormat::Bmp).unwrap();
        let bmp = bmp.into_inner();
        assert_eq!(&bmp[..2], b"BM");

        let image = ProfileImage::from_bytes(bmp).unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.dimensions(), (5, 4));
        assert!(image.to_data_uri().starts_with("data:image/png;base64,"));

        let decoded = image::load_from_memory(image.as_bytes()).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(2, 2).0, [200, 10, 10]);
    }

    #[test]
    fn embeddable_bytes_are_kept() {
        let png = sample_png(3, 3);
        let image = ProfileImage::from_bytes(png.clone()).unwrap();
        assert_eq!(image.as_bytes(), &png[..]);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = ProfileImage::from_bytes(b"definitely not an image".to_vec()).unwrap_err();
        assert!(matches!(err, Error::ImageDecode(_)));
    }

    #[test]
    fn truncated_png_is_rejected() {
        let mut bytes = sample_png(8, 8);
        bytes.truncate(bytes.len() / 2);
        assert!(ProfileImage::from_bytes(bytes).is_err());
    }

    #[tokio::test]
    async fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avatar.png");
        std::fs::write(&path, sample_png(2, 2)).unwrap();

        let image = read_profile_image(&path).await.unwrap();
        assert_eq!(image.dimensions(), (2, 2));
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_profile_image(&dir.path().join("nope.png")).await.unwrap_err();
        assert!(matches!(err, Error::ImageRead { .. }));
    }
}
