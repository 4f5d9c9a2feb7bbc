//! Application layer with the image loading state machine.

/// Stateful services.
pub mod services;

pub use services::ImageLoader;
