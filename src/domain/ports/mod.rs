mod decoder_port;
mod failure_logger_port;
mod fetcher_port;
mod image_cache_port;

pub use decoder_port::ImageDecoder;
pub use failure_logger_port::FailureLogger;
pub use fetcher_port::{FetchHandle, FetchReporter, FetchResult, FetcherPort};
pub use image_cache_port::ImageCachePort;
