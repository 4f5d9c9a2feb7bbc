//! View binding for a single remote image.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::services::ImageLoader;
use crate::domain::entities::{DecodedImage, FetchState, ImageKey};

/// Rendering capabilities a view surface provides for an image slot.
pub trait ImageRenderer {
    /// What one render produces.
    type Output;

    /// Nothing requested yet.
    fn empty(&self) -> Self::Output;

    /// Download in progress, `percent` in `0..=100`.
    fn placeholder(&self, percent: u8) -> Self::Output;

    /// The decoded image.
    fn image(&self, image: &DecodedImage) -> Self::Output;

    /// The fetch failed with `message`.
    fn error(&self, message: &str) -> Self::Output;
}

/// Maps `state` to the matching renderer capability.
pub fn render<R: ImageRenderer + ?Sized>(renderer: &R, state: &FetchState) -> R::Output {
    match state {
        FetchState::Idle => renderer.empty(),
        FetchState::Loading(_) => renderer.placeholder(state.progress_percent().unwrap_or(0)),
        FetchState::Failed(message) => renderer.error(message),
        FetchState::Loaded(image) => renderer.image(image),
    }
}

/// One image slot in a view: a key and the loader that resolves it.
///
/// The loader lives exactly as long as the binding, so dropping the binding
/// cancels whatever it was downloading.
#[derive(Debug)]
pub struct ImageBinding {
    key: ImageKey,
    loader: ImageLoader,
}

impl ImageBinding {
    /// Binds `key` to `loader`. Nothing is fetched until [`Self::on_appear`].
    #[must_use]
    pub fn new(key: impl Into<ImageKey>, loader: ImageLoader) -> Self {
        Self {
            key: key.into(),
            loader,
        }
    }

    /// Returns the bound key.
    #[must_use]
    pub const fn key(&self) -> &ImageKey {
        &self.key
    }

    /// Returns the underlying loader.
    #[must_use]
    pub const fn loader(&self) -> &ImageLoader {
        &self.loader
    }

    /// Starts the first fetch when the view becomes visible.
    pub fn on_appear(&self) {
        if self.loader.state().is_idle() {
            self.loader.fetch_image(self.key.clone());
        }
    }

    /// Rebinds to `key`, fetching it if it differs from the current one.
    pub fn set_key(&mut self, key: impl Into<ImageKey>) {
        let key = key.into();
        if key == self.key {
            return;
        }
        self.key = key;
        self.loader.fetch_image(self.key.clone());
    }

    /// Fetches the current key again, e.g. after a failure.
    pub fn retry(&self) {
        self.loader.fetch_image(self.key.clone());
    }

    /// Returns the loader's current state.
    #[must_use]
    pub fn state(&self) -> FetchState {
        self.loader.state()
    }

    /// Streams the loader's states, starting with the current one.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<FetchState> {
        self.loader.subscribe()
    }

    /// Renders the current state.
    pub fn render<R: ImageRenderer + ?Sized>(&self, renderer: &R) -> R::Output {
        render(renderer, &self.state())
    }
}

/// Renders states as single text lines for a terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl ImageRenderer for TextRenderer {
    type Output = String;

    fn empty(&self) -> String {
        "idle".to_string()
    }

    fn placeholder(&self, percent: u8) -> String {
        format!("loading {percent:>3}%")
    }

    fn image(&self, image: &DecodedImage) -> String {
        let color = format!("{:?}", image.as_dynamic().color());
        format!("loaded {}x{} {}", image.width(), image.height(), color)
    }

    fn error(&self, message: &str) -> String {
        format!("failed: {}", message.replace('\n', " "))
    }
}

impl<T: ImageRenderer + ?Sized> ImageRenderer for Arc<T> {
    type Output = T::Output;

    fn empty(&self) -> Self::Output {
        (**self).empty()
    }

    fn placeholder(&self, percent: u8) -> Self::Output {
        (**self).placeholder(percent)
    }

    fn image(&self, image: &DecodedImage) -> Self::Output {
        (**self).image(image)
    }

    fn error(&self, message: &str) -> Self::Output {
        (**self).error(message)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use test_case::test_case;
    use tokio::time::timeout;

    use super::*;
    use crate::domain::errors::FetchError;
    use crate::domain::ports::ImageCachePort;
    use crate::domain::ports::mocks::{MockFailureLogger, MockFetcher};
    use crate::infrastructure::image::decoder::encode_png;
    use crate::infrastructure::{ImageCrateDecoder, MemoryImageCache};

    const URL: &str = "https://example.com/avatar.png";

    fn binding(fetcher: Arc<MockFetcher>, cache: Arc<MemoryImageCache>) -> ImageBinding {
        let loader = ImageLoader::new(
            cache,
            fetcher,
            Arc::new(ImageCrateDecoder),
            Arc::new(MockFailureLogger::new()),
        );
        ImageBinding::new(URL, loader)
    }

    #[test_case(FetchState::Idle, "idle" ; "idle renders empty")]
    #[test_case(FetchState::Loading(0.0), "loading   0%" ; "loading start")]
    #[test_case(FetchState::Loading(0.426), "loading  42%" ; "loading truncates")]
    #[test_case(FetchState::Loading(1.0), "loading 100%" ; "loading complete")]
    #[test_case(
        FetchState::Failed("Bad response.\nStatus code: 500".into()),
        "failed: Bad response. Status code: 500"
        ; "failure on one line"
    )]
    fn test_text_render(state: FetchState, expected: &str) {
        assert_eq!(render(&TextRenderer, &state), expected);
    }

    #[test]
    fn test_text_render_loaded() {
        let image = DecodedImage::new(image::DynamicImage::new_rgba8(3, 2));
        assert_eq!(
            render(&TextRenderer, &FetchState::Loaded(image)),
            "loaded 3x2 Rgba8"
        );
    }

    #[test]
    fn test_render_through_arc() {
        let renderer: Arc<TextRenderer> = Arc::new(TextRenderer);
        assert_eq!(render(&renderer, &FetchState::Idle), "idle");
    }

    #[tokio::test]
    async fn test_on_appear_fetches_once() {
        let fetcher = Arc::new(MockFetcher::holding());
        let binding = binding(fetcher.clone(), Arc::new(MemoryImageCache::new()));

        assert_eq!(binding.render(&TextRenderer), "idle");
        binding.on_appear();
        binding.on_appear();

        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(binding.render(&TextRenderer), "loading   0%");
    }

    #[tokio::test]
    async fn test_on_appear_serves_cache_without_fetching() {
        let fetcher = Arc::new(MockFetcher::holding());
        let cache = Arc::new(MemoryImageCache::new());
        cache.set(
            ImageKey::from_url(URL),
            DecodedImage::new(image::DynamicImage::new_rgb8(5, 5)),
        );
        let binding = binding(fetcher.clone(), cache);

        binding.on_appear();

        assert_eq!(binding.render(&TextRenderer), "loaded 5x5 Rgb8");
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_set_key_refetches_only_on_change() {
        let fetcher = Arc::new(MockFetcher::succeeding(encode_png(2, 2)));
        let mut binding = binding(fetcher.clone(), Arc::new(MemoryImageCache::new()));
        let mut rx = binding.subscribe();

        binding.on_appear();
        while let Ok(Some(state)) = timeout(Duration::from_secs(5), rx.recv()).await {
            if state.is_terminal() {
                break;
            }
        }

        binding.set_key(URL);
        assert_eq!(fetcher.call_count(), 1);

        binding.set_key("https://example.com/banner.png");
        assert_eq!(fetcher.call_count(), 2);
        assert_eq!(binding.key().url(), "https://example.com/banner.png");
    }

    #[tokio::test]
    async fn test_retry_after_failure() {
        let fetcher = Arc::new(MockFetcher::failing(FetchError::transport("offline")));
        let binding = binding(fetcher.clone(), Arc::new(MemoryImageCache::new()));
        let mut rx = binding.subscribe();

        binding.on_appear();
        let mut failures = 0;
        while let Ok(Some(state)) = timeout(Duration::from_secs(5), rx.recv()).await {
            if state.is_failed() {
                failures += 1;
                if failures == 2 {
                    break;
                }
                assert_eq!(binding.render(&TextRenderer), "failed: offline");
                binding.retry();
            }
        }

        assert_eq!(failures, 2);
        assert_eq!(fetcher.call_count(), 2);
    }
}
