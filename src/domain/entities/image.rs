//! Domain types identifying and holding images.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;

/// Method used when a request is built from a bare URL.
pub const DEFAULT_METHOD: &str = "GET";

/// An image request: the URL plus the HTTP envelope around it.
///
/// Construction normalizes the parts that do not change the meaning of a
/// request, so two descriptors compare equal whenever they would fetch the
/// same resource the same way:
/// - parsable URLs are stored in their canonical serialization,
/// - methods are upper-cased,
/// - header names are lower-cased and kept in sorted order.
///
/// Unparsable URLs are kept verbatim so the fetcher can reject them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestDescriptor {
    url: String,
    method: String,
    headers: BTreeMap<String, String>,
    body: Option<Bytes>,
}

impl RequestDescriptor {
    /// Creates a `GET` request for the given URL.
    #[must_use]
    pub fn new(url: impl AsRef<str>) -> Self {
        Self {
            url: normalize_url(url.as_ref()),
            method: DEFAULT_METHOD.to_string(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: impl AsRef<str>) -> Self {
        self.method = method.as_ref().trim().to_ascii_uppercase();
        self
    }

    /// Adds a header, replacing any previous value for the same name.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().trim().to_ascii_lowercase(), value.into());
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns the (normalized) URL string.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Iterates over the headers in name order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the request body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

fn normalize_url(raw: &str) -> String {
    url::Url::parse(raw).map_or_else(|_| raw.to_string(), |url| url.to_string())
}

/// Identity of an image fetch.
///
/// Used both as the cache key and to tell whether a view binding asks for
/// something new.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageKey(RequestDescriptor);

impl ImageKey {
    /// Creates a key for a plain `GET` of the given URL.
    #[must_use]
    pub fn from_url(url: impl AsRef<str>) -> Self {
        Self(RequestDescriptor::new(url))
    }

    /// Creates a key from a full request descriptor.
    #[must_use]
    pub const fn from_request(request: RequestDescriptor) -> Self {
        Self(request)
    }

    /// Returns the underlying request.
    #[must_use]
    pub const fn request(&self) -> &RequestDescriptor {
        &self.0
    }

    /// Returns the URL string of the request.
    #[must_use]
    pub fn url(&self) -> &str {
        self.0.url()
    }

    /// Short stable digest of the whole request.
    ///
    /// Safe to put in logs: header values and bodies never appear in it.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.0.method.as_bytes());
        hasher.update([0]);
        hasher.update(self.0.url.as_bytes());
        for (name, value) in &self.0.headers {
            hasher.update([0]);
            hasher.update(name.as_bytes());
            hasher.update([b':']);
            hasher.update(value.as_bytes());
        }
        if let Some(body) = &self.0.body {
            hasher.update([1]);
            hasher.update(body);
        }
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }
}

impl std::fmt::Display for ImageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.url)
    }
}

impl From<&str> for ImageKey {
    fn from(url: &str) -> Self {
        Self::from_url(url)
    }
}

impl From<String> for ImageKey {
    fn from(url: String) -> Self {
        Self::from_url(url)
    }
}

impl From<RequestDescriptor> for ImageKey {
    fn from(request: RequestDescriptor) -> Self {
        Self::from_request(request)
    }
}

/// A decoded, displayable image.
///
/// Cheap to clone; clones share the same pixel buffer.
#[derive(Clone)]
pub struct DecodedImage(Arc<image::DynamicImage>);

impl DecodedImage {
    /// Wraps a decoded image.
    #[must_use]
    pub fn new(image: image::DynamicImage) -> Self {
        Self(Arc::new(image))
    }

    /// Returns the pixel data.
    #[must_use]
    pub fn as_dynamic(&self) -> &image::DynamicImage {
        &self.0
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Returns true if both handles point at the same image.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<image::DynamicImage> for DecodedImage {
    fn from(image: image::DynamicImage) -> Self {
        Self::new(image)
    }
}

impl PartialEq for DecodedImage {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
