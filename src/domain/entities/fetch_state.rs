//! Observable state of a single image loader.

use super::image::DecodedImage;

/// Where a loader is in its fetch lifecycle.
///
/// `Failed` and `Loaded` are terminal: nothing moves the state on until the
/// owner asks for another fetch.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchState {
    /// No fetch issued yet.
    #[default]
    Idle,
    /// A fetch is in flight; carries the fraction downloaded in `[0, 1]`.
    Loading(f64),
    /// The fetch failed with a user-facing message.
    Failed(String),
    /// The image is ready for display.
    Loaded(DecodedImage),
}

impl FetchState {
    /// A freshly started fetch.
    #[must_use]
    pub const fn loading() -> Self {
        Self::Loading(0.0)
    }

    /// Returns true if no fetch was issued yet.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true while a fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }

    /// Returns true if the last fetch failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns true if an image is available.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Returns true for `Failed` and `Loaded`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Loaded(_))
    }

    /// Fraction downloaded, while loading.
    #[must_use]
    pub const fn progress(&self) -> Option<f64> {
        match self {
            Self::Loading(fraction) => Some(*fraction),
            _ => None,
        }
    }

    /// Whole percent downloaded, rounded down, while loading.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn progress_percent(&self) -> Option<u8> {
        self.progress()
            .map(|fraction| (fraction.clamp(0.0, 1.0) * 100.0) as u8)
    }

    /// Failure message, if the fetch failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// The loaded image, if any.
    #[must_use]
    pub const fn image(&self) -> Option<&DecodedImage> {
        match self {
            Self::Loaded(image) => Some(image),
            _ => None,
        }
    }
}
