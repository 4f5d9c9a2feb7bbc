//! Domain error types.

mod fetch_error;

pub use fetch_error::{BAD_URL_MESSAGE, FetchError};
