//! Infrastructure layer with adapters for the network, decoding and logging.

/// Application configuration.
pub mod config;
/// Failure sink.
pub mod failure_log;
/// Image handling (caching, fetching, decoding).
pub mod image;

pub use config::{AppConfig, CliArgs, ConfigStore, LogLevel};
pub use failure_log::{FAILURE_TARGET, TracingFailureLogger};
pub use image::{
    CacheStats, HttpFetcher, HttpFetcherConfig, ImageCrateDecoder, MemoryImageCache,
    MemoryPressureSignal, clear_on_memory_pressure,
};
