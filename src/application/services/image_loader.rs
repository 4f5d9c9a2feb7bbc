//! Observable image loading state machine.
//!
//! One [`ImageLoader`] backs one view binding. It moves through
//! `Idle → Loading → {Failed, Loaded}` and back to `Loading` when asked to
//! fetch again; a cache hit goes straight to `Loaded`.
//!
//! Every transition happens under the loader's state lock and is fanned out
//! to observers while the lock is held, so observers see transitions in the
//! order they were made. Background work (download, decode) holds only a
//! weak reference and checks its attempt number and cancellation token
//! before touching state.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::domain::entities::{DecodedImage, FetchState, ImageKey, RequestDescriptor};
use crate::domain::errors::FetchError;
use crate::domain::ports::{FailureLogger, FetchHandle, FetcherPort, ImageCachePort, ImageDecoder};
use crate::infrastructure::{ImageCrateDecoder, TracingFailureLogger};

/// Loads one image at a time and publishes its [`FetchState`].
///
/// Dropping the loader cancels the in-flight fetch; nothing it started can
/// change state afterwards.
pub struct ImageLoader {
    shared: Arc<Shared>,
}

struct Shared {
    cache: Arc<dyn ImageCachePort>,
    fetcher: Arc<dyn FetcherPort>,
    decoder: Arc<dyn ImageDecoder>,
    logger: Arc<dyn FailureLogger>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    state: FetchState,
    observers: Vec<mpsc::UnboundedSender<FetchState>>,
    active: Option<ActiveFetch>,
    attempts: u64,
    destroyed: bool,
}

struct ActiveFetch {
    attempt: u64,
    token: CancellationToken,
}

impl Inner {
    fn transition(&mut self, state: FetchState) {
        if state.is_loading() {
            trace!(state = ?state, "Image loader transition");
        } else {
            debug!(state = ?state, "Image loader transition");
        }
        self.observers.retain(|tx| tx.send(state.clone()).is_ok());
        self.state = state;
    }

    /// True while `attempt` is the live fetch and nobody cancelled it.
    fn is_current(&self, attempt: u64) -> bool {
        !self.destroyed
            && self
                .active
                .as_ref()
                .is_some_and(|active| active.attempt == attempt && !active.token.is_cancelled())
    }

    fn cancel_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.token.cancel();
            debug!(attempt = active.attempt, "Cancelled image fetch");
        }
    }
}

impl ImageLoader {
    /// Creates a loader over explicit collaborators.
    #[must_use]
    pub fn new(
        cache: Arc<dyn ImageCachePort>,
        fetcher: Arc<dyn FetcherPort>,
        decoder: Arc<dyn ImageDecoder>,
        logger: Arc<dyn FailureLogger>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                cache,
                fetcher,
                decoder,
                logger,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    /// Creates a loader that decodes with the `image` crate and reports
    /// failures through `tracing`.
    #[must_use]
    pub fn with_defaults(cache: Arc<dyn ImageCachePort>, fetcher: Arc<dyn FetcherPort>) -> Self {
        Self::new(
            cache,
            fetcher,
            Arc::new(ImageCrateDecoder),
            Arc::new(TracingFailureLogger),
        )
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> FetchState {
        self.shared.inner.lock().state.clone()
    }

    /// Streams every state from now on, starting with the current one.
    ///
    /// The stream ends when the loader is dropped.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<FetchState> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.shared.inner.lock();
        if tx.send(inner.state.clone()).is_ok() {
            inner.observers.push(tx);
        }
        rx
    }

    /// Fetches `key` unless a fetch is already running.
    ///
    /// A cached image is published as `Loaded` before this returns, without
    /// any network call. Otherwise the state becomes `Loading(0)` and the
    /// download proceeds in the background.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime on a cache miss.
    pub fn fetch_image(&self, key: impl Into<ImageKey>) {
        let key = key.into();
        let mut inner = self.shared.inner.lock();

        if inner.state.is_loading() {
            trace!(key = %key.fingerprint(), "Fetch already in progress, ignoring");
            return;
        }

        if let Some(image) = self.shared.cache.get(&key) {
            debug!(key = %key.fingerprint(), "Serving image from memory cache");
            inner.transition(FetchState::Loaded(image));
            return;
        }

        inner.cancel_active();
        inner.attempts += 1;
        let attempt = inner.attempts;
        let token = CancellationToken::new();
        inner.active = Some(ActiveFetch {
            attempt,
            token: token.clone(),
        });
        inner.transition(FetchState::loading());
        drop(inner);

        debug!(key = %key.fingerprint(), attempt, "Fetching image");
        let handle = self.shared.fetcher.fetch(&key, token.clone());
        tokio::spawn(drive(
            Arc::downgrade(&self.shared),
            key,
            attempt,
            token,
            handle,
        ));
    }

    /// Cancels the running fetch, if any. The state is left as it is.
    ///
    /// A loader cancelled while `Loading` stays `Loading`, and further
    /// [`Self::fetch_image`] calls are ignored.
    pub fn cancel(&self) {
        self.shared.inner.lock().cancel_active();
    }

    /// Fetches a plain `GET` of `url`.
    pub fn fetch_image_from_url(&self, url: &str) {
        self.fetch_image(ImageKey::from_url(url));
    }

    /// Fetches the image described by `request`.
    pub fn fetch_image_for_request(&self, request: RequestDescriptor) {
        self.fetch_image(ImageKey::from_request(request));
    }
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        inner.destroyed = true;
        inner.cancel_active();
        inner.observers.clear();
    }
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn progress(&self, attempt: u64, fraction: f64) {
        let mut inner = self.inner.lock();
        if inner.is_current(attempt) {
            inner.transition(FetchState::Loading(fraction));
        }
    }

    fn loaded(&self, attempt: u64, key: ImageKey, image: DecodedImage) {
        let mut inner = self.inner.lock();
        if !inner.is_current(attempt) {
            return;
        }
        self.cache.set(key, image.clone());
        inner.active = None;
        inner.transition(FetchState::Loaded(image));
    }

    fn failed(&self, attempt: u64, key: &ImageKey, error: &FetchError) {
        let message = error.message().to_string();
        {
            let mut inner = self.inner.lock();
            if !inner.is_current(attempt) {
                return;
            }
            inner.active = None;
            inner.transition(FetchState::Failed(message.clone()));
        }
        self.logger.log(&message, Some(key));
    }
}

/// Resolves with the next fraction, or `None` once the fetcher stops
/// reporting.
async fn next_tick(progress: &mut Option<watch::Receiver<f64>>) -> Option<f64> {
    let rx = progress.as_mut()?;
    rx.changed().await.ok()?;
    Some(*rx.borrow_and_update())
}

async fn drive(
    shared: Weak<Shared>,
    key: ImageKey,
    attempt: u64,
    token: CancellationToken,
    handle: FetchHandle,
) {
    let FetchHandle {
        mut progress,
        mut result,
    } = handle;

    let outcome = loop {
        tokio::select! {
            biased;
            () = token.cancelled() => return,
            tick = next_tick(&mut progress), if progress.is_some() => match tick {
                Some(fraction) => {
                    let Some(shared) = shared.upgrade() else { return };
                    shared.progress(attempt, fraction);
                }
                None => progress = None,
            },
            outcome = &mut result => break outcome,
        }
    };

    let Ok(outcome) = outcome else {
        trace!(attempt, "Fetcher went away without a result");
        return;
    };

    let bytes = match outcome {
        Ok(bytes) => bytes,
        Err(error) => {
            if let Some(shared) = shared.upgrade() {
                shared.failed(attempt, &key, &error);
            }
            return;
        }
    };

    let decoder = match shared.upgrade() {
        Some(shared) => Arc::clone(&shared.decoder),
        None => return,
    };
    let decoded = tokio::select! {
        biased;
        () = token.cancelled() => return,
        decoded = tokio::task::spawn_blocking(move || decoder.decode(&bytes)) => decoded,
    };

    match decoded {
        Ok(Some(image)) => {
            if let Some(shared) = shared.upgrade() {
                shared.loaded(attempt, key, image);
            }
        }
        Ok(None) => {
            // The loader stays in `Loading`: there is no state for
            // undecodable bytes and the failure sink only sees network errors.
            warn!(key = %key.fingerprint(), "Downloaded bytes are not a decodable image");
        }
        Err(e) => {
            warn!(key = %key.fingerprint(), error = %e, "Image decode task failed");
        }
    }
}
