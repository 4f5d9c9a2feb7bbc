//! Image handling infrastructure.
//!
//! This module provides:
//! - The in-memory image cache and its memory-pressure hook
//! - The HTTP fetcher
//! - Decoding through the `image` crate

pub mod decoder;
pub mod http_fetcher;
pub mod memory_cache;
pub mod memory_pressure;

pub use decoder::ImageCrateDecoder;
pub use http_fetcher::{HttpFetcher, HttpFetcherConfig};
pub use memory_cache::{CacheStats, MemoryImageCache};
pub use memory_pressure::{MemoryPressureSignal, clear_on_memory_pressure};
