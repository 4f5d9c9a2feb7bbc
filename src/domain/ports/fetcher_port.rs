//! Port definition for downloading image bytes.

use bytes::Bytes;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::domain::entities::ImageKey;
use crate::domain::errors::FetchError;

/// Terminal outcome of a fetch: the complete body or a classified error.
pub type FetchResult = Result<Bytes, FetchError>;

/// Consumer side of a started fetch.
#[derive(Debug)]
pub struct FetchHandle {
    /// Download progress in `[0, 1]`, never decreasing.
    ///
    /// `None` when the request was rejected before any I/O. The channel
    /// closes before `result` resolves.
    pub progress: Option<watch::Receiver<f64>>,
    /// Resolves once with the outcome. Closes without a value if the fetch
    /// was cancelled.
    pub result: oneshot::Receiver<FetchResult>,
}

impl FetchHandle {
    /// Creates a connected handle and reporter pair.
    #[must_use]
    pub fn channel() -> (Self, FetchReporter) {
        let (progress_tx, progress_rx) = watch::channel(0.0);
        let (result_tx, result_rx) = oneshot::channel();
        (
            Self {
                progress: Some(progress_rx),
                result: result_rx,
            },
            FetchReporter {
                progress: progress_tx,
                result: result_tx,
            },
        )
    }

    /// Creates a handle that has already failed and reports no progress.
    #[must_use]
    pub fn failed(error: FetchError) -> Self {
        let (result_tx, result_rx) = oneshot::channel();
        let _ = result_tx.send(Err(error));
        Self {
            progress: None,
            result: result_rx,
        }
    }
}

/// Producer side of a started fetch.
#[derive(Debug)]
pub struct FetchReporter {
    progress: watch::Sender<f64>,
    result: oneshot::Sender<FetchResult>,
}

impl FetchReporter {
    /// Publishes a new fraction. Values are clamped to `[0, 1]`; anything not
    /// above the last published value is ignored.
    pub fn progress(&self, fraction: f64) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.progress.send_if_modified(|current| {
            if fraction > *current {
                *current = fraction;
                true
            } else {
                false
            }
        });
    }

    /// Completes the fetch with the downloaded body.
    pub fn succeed(self, body: Bytes) {
        self.finish(Ok(body));
    }

    /// Completes the fetch with an error.
    pub fn fail(self, error: FetchError) {
        self.finish(Err(error));
    }

    /// Closes the progress channel, then delivers the outcome.
    pub fn finish(self, outcome: FetchResult) {
        let Self { progress, result } = self;
        drop(progress);
        let _ = result.send(outcome);
    }

    /// Returns true once nobody is waiting for the outcome.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.result.is_closed()
    }
}

/// Port for network fetches of image bytes.
pub trait FetcherPort: Send + Sync {
    /// Starts fetching `key` and returns immediately.
    ///
    /// Cancelling `cancel` must abort the underlying operation, not just
    /// stop reporting it.
    fn fetch(&self, key: &ImageKey, cancel: CancellationToken) -> FetchHandle;
}

#[cfg(test)]
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;

    /// How the mock answers every fetch.
    #[derive(Debug, Clone)]
    pub enum MockResponse {
        /// Publish `ticks` as progress, then succeed with `body`.
        Succeed { ticks: Vec<f64>, body: Bytes },
        /// Fail with the given error.
        Fail(FetchError),
        /// Keep the reporter for the test to complete later.
        Hold,
    }

    /// Scripted fetcher recording every call.
    pub struct MockFetcher {
        response: MockResponse,
        calls: Mutex<Vec<ImageKey>>,
        held: Mutex<Vec<(FetchReporter, CancellationToken)>>,
    }

    impl MockFetcher {
        pub fn new(response: MockResponse) -> Self {
            Self {
                response,
                calls: Mutex::new(Vec::new()),
                held: Mutex::new(Vec::new()),
            }
        }

        pub fn succeeding(body: Bytes) -> Self {
            Self::new(MockResponse::Succeed {
                ticks: vec![0.25, 0.5, 1.0],
                body,
            })
        }

        pub fn failing(error: FetchError) -> Self {
            Self::new(MockResponse::Fail(error))
        }

        pub fn holding() -> Self {
            Self::new(MockResponse::Hold)
        }

        pub fn calls(&self) -> Vec<ImageKey> {
            self.calls.lock().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        /// Takes the oldest held fetch.
        pub fn take_held(&self) -> Option<(FetchReporter, CancellationToken)> {
            let mut held = self.held.lock();
            if held.is_empty() {
                None
            } else {
                Some(held.remove(0))
            }
        }
    }

    impl FetcherPort for MockFetcher {
        fn fetch(&self, key: &ImageKey, cancel: CancellationToken) -> FetchHandle {
            self.calls.lock().push(key.clone());

            if url::Url::parse(key.url()).is_err() {
                return FetchHandle::failed(FetchError::bad_url());
            }

            let (handle, reporter) = FetchHandle::channel();
            match self.response.clone() {
                MockResponse::Succeed { ticks, body } => {
                    tokio::spawn(async move {
                        for tick in ticks {
                            reporter.progress(tick);
                            tokio::task::yield_now().await;
                        }
                        reporter.succeed(body);
                    });
                }
                MockResponse::Fail(error) => {
                    tokio::spawn(async move {
                        tokio::task::yield_now().await;
                        reporter.fail(error);
                    });
                }
                MockResponse::Hold => self.held.lock().push((reporter, cancel)),
            }
            handle
        }
    }
}
