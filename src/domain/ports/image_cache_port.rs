//! Port definition for image caching.

use crate::domain::entities::{DecodedImage, ImageKey};

/// Port for in-memory image caching.
///
/// Implementations must be thread-safe and must never block on I/O: the
/// loader consults the cache synchronously.
pub trait ImageCachePort: Send + Sync {
    /// Returns the cached image for `key`, if any.
    fn get(&self, key: &ImageKey) -> Option<DecodedImage>;

    /// Stores an image, replacing any previous entry for `key`.
    fn set(&self, key: ImageKey, image: DecodedImage);

    /// Removes the entry for `key`. Missing keys are ignored.
    fn remove(&self, key: &ImageKey);

    /// Drops every entry.
    fn clear(&self);

    /// Returns the current number of cached images.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
