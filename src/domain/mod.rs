//! Domain layer with core image-loading types and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{DecodedImage, FetchState, ImageKey, RequestDescriptor};
pub use errors::FetchError;
pub use ports::{FailureLogger, FetcherPort, ImageCachePort, ImageDecoder};
