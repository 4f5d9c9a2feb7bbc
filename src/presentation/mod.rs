//! Presentation layer binding image state to a view.

/// Reusable widgets.
pub mod widgets;

pub use widgets::{ImageBinding, ImageRenderer, TextRenderer, render};
