//! Domain entity definitions.

mod fetch_state;
mod image;

pub use fetch_state::FetchState;
pub use image::{DEFAULT_METHOD, DecodedImage, ImageKey, RequestDescriptor};
