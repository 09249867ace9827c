//! `image`-crate implementation of `MediaProcessor`.

use std::io::Cursor;

use bytes::Bytes;
use domains::{DomainError, DomainResult, ImageFormat, MediaProcessor};
use image::DynamicImage;

#[derive(Debug, Default, Clone, Copy)]
pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }
}

fn codec(format: ImageFormat) -> image::ImageFormat {
    match format {
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::Png => image::ImageFormat::Png,
    }
}

fn rejected(message: impl Into<String>) -> DomainError {
    DomainError::validation("image", message)
}

impl MediaProcessor for ImageProcessor {
    fn inspect(&self, data: &[u8]) -> DomainResult<ImageFormat> {
        let format = match image::guess_format(data) {
            Ok(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
            Ok(image::ImageFormat::Png) => ImageFormat::Png,
            Ok(other) => return Err(rejected(format!("unsupported image format {other:?}"))),
            Err(_) => return Err(rejected("upload a valid image")),
        };
        // Sniffing only reads the magic bytes; make sure the whole file decodes.
        image::load_from_memory_with_format(data, codec(format))
            .map_err(|err| rejected(format!("image could not be decoded: {err}")))?;
        Ok(format)
    }

    fn transcode(&self, data: &[u8], target: ImageFormat) -> DomainResult<Bytes> {
        let decoded = image::load_from_memory(data).map_err(DomainError::internal)?;
        // JPEG has no alpha channel.
        let decoded = match target {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(decoded.to_rgb8()),
            ImageFormat::Png => decoded,
        };
        let mut out = Cursor::new(Vec::new());
        decoded
            .write_to(&mut out, codec(target))
            .map_err(DomainError::internal)?;
        Ok(Bytes::from(out.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([200, 10, 10, 255])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn accepts_png_and_converts_to_jpeg() {
        let processor = ImageProcessor::new();
        let data = png();
        assert_eq!(processor.inspect(&data).unwrap(), ImageFormat::Png);

        let jpeg = processor.transcode(&data, ImageFormat::Jpeg).unwrap();
        assert_eq!(processor.inspect(&jpeg).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    #[test]
    fn rejects_non_images_and_truncated_files() {
        let processor = ImageProcessor::new();
        assert!(matches!(
            processor.inspect(b"definitely not an image"),
            Err(DomainError::Validation { .. })
        ));

        let data = png();
        let truncated = &data[..data.len() / 2];
        assert!(processor.inspect(truncated).is_err());
    }
}
