mod cached_image;

pub use cached_image::{ImageBinding, ImageRenderer, TextRenderer, render};
