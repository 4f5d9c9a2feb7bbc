//! Image decoding backed by the `image` crate.

use tracing::trace;

use crate::domain::entities::DecodedImage;
use crate::domain::ports::ImageDecoder;

/// Decodes PNG, JPEG and WebP, guessing the format from the bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> Option<DecodedImage> {
        match image::load_from_memory(bytes) {
            Ok(image) => Some(DecodedImage::new(image)),
            Err(e) => {
                trace!(error = %e, len = bytes.len(), "Bytes are not a decodable image");
                None
            }
        }
    }
}

/// Encodes a blank PNG, for tests that need real image bytes.
#[cfg(test)]
pub(crate) fn encode_png(width: u32, height: u32) -> bytes::Bytes {
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::new_rgb8(width, height)
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("encoding a blank PNG cannot fail");
    bytes::Bytes::from(buf.into_inner())
}
