use crate::domain::entities::DecodedImage;

/// Port for turning downloaded bytes into a displayable image.
pub trait ImageDecoder: Send + Sync {
    /// Decodes `bytes`. Returns `None` when they are not a usable image.
    fn decode(&self, bytes: &[u8]) -> Option<DecodedImage>;
}
