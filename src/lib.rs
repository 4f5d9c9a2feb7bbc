//! cached-image - remote image loading with an in-memory cache.
//!
//! A view binds an [`ImageKey`] to an [`ImageLoader`]; the loader serves the
//! image from the shared [`MemoryImageCache`] or downloads it, publishing
//! each [`FetchState`] as it goes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the loader state machine.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer containing the view binding and renderers.
pub mod presentation;

pub use application::ImageLoader;
pub use domain::{DecodedImage, FetchError, FetchState, ImageKey, RequestDescriptor};
pub use infrastructure::{HttpFetcher, MemoryImageCache, MemoryPressureSignal};
pub use presentation::{ImageBinding, ImageRenderer, render};

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "cached-image";
