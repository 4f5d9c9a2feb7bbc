//! HTTP implementation of the fetcher port.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Request};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::entities::{ImageKey, RequestDescriptor};
use crate::domain::errors::FetchError;
use crate::domain::ports::{FetchHandle, FetchReporter, FetcherPort};

const USER_AGENT: &str = concat!("cached-image/", env!("CARGO_PKG_VERSION"));

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpFetcherConfig {
    /// `User-Agent` sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum concurrent downloads; further fetches wait for a slot.
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
        }
    }
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

const fn default_max_concurrent_downloads() -> usize {
    4
}

/// Downloads image bytes over HTTP(S).
///
/// Every fetch runs in its own task. Cancelling the token drops the request
/// future, which closes the connection.
pub struct HttpFetcher {
    client: Client,
    permits: Arc<Semaphore>,
}

impl HttpFetcher {
    /// Creates a fetcher with its own HTTP client.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &HttpFetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(client, config.max_concurrent_downloads))
    }

    /// Creates a fetcher with default configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(&HttpFetcherConfig::default())
    }

    /// Creates a fetcher around an existing client.
    #[must_use]
    pub fn with_client(client: Client, max_concurrent_downloads: usize) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_concurrent_downloads.max(1))),
        }
    }

    fn build_request(&self, descriptor: &RequestDescriptor) -> Result<Request, FetchError> {
        let url = url::Url::parse(descriptor.url()).map_err(|_| FetchError::bad_url())?;
        let method =
            Method::from_bytes(descriptor.method().as_bytes()).map_err(|_| FetchError::bad_url())?;

        let mut headers = HeaderMap::new();
        for (name, value) in descriptor.headers() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| FetchError::bad_url())?;
            let value = HeaderValue::from_str(value).map_err(|_| FetchError::bad_url())?;
            headers.append(name, value);
        }

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = descriptor.body() {
            builder = builder.body(body.clone());
        }
        builder.build().map_err(|_| FetchError::bad_url())
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("available_permits", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

impl FetcherPort for HttpFetcher {
    fn fetch(&self, key: &ImageKey, cancel: CancellationToken) -> FetchHandle {
        let request = match self.build_request(key.request()) {
            Ok(request) => request,
            Err(error) => {
                debug!(key = %key.fingerprint(), "Rejected invalid image request");
                return FetchHandle::failed(error);
            }
        };

        let (handle, reporter) = FetchHandle::channel();
        let client = self.client.clone();
        let permits = Arc::clone(&self.permits);
        let fingerprint = key.fingerprint();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(key = %fingerprint, "Image download cancelled");
                }
                () = download(client, permits, request, reporter) => {}
            }
        });

        handle
    }
}

async fn download(client: Client, permits: Arc<Semaphore>, request: Request, reporter: FetchReporter) {
    let Ok(_permit) = permits.acquire_owned().await else {
        reporter.fail(FetchError::transport("Download queue closed"));
        return;
    };

    let url = request.url().clone();
    if reporter.is_closed() {
        debug!(url = %url, "Nobody waiting for image, skipping download");
        return;
    }
    debug!(url = %url, "Downloading image from network");

    match receive(&client, request, &reporter).await {
        Ok(body) => {
            debug!(url = %url, bytes = body.len(), "Image downloaded");
            reporter.succeed(body);
        }
        Err(error) => {
            debug!(url = %url, error = %error, "Image download failed");
            reporter.fail(error);
        }
    }
}

/// Reads the whole body, publishing progress against `Content-Length`.
#[allow(clippy::cast_precision_loss)]
async fn receive(
    client: &Client,
    request: Request,
    reporter: &FetchReporter,
) -> Result<Bytes, FetchError> {
    let mut response = client
        .execute(request)
        .await
        .map_err(|e| FetchError::transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::bad_response(status.as_u16()));
    }

    let expected = response.content_length().filter(|len| *len > 0);
    let mut body = BytesMut::new();

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| FetchError::transport(e.to_string()))?
    {
        body.extend_from_slice(&chunk);
        if let Some(total) = expected {
            reporter.progress(body.len() as f64 / total as f64);
        }
    }

    reporter.progress(1.0);
    Ok(body.freeze())
}
