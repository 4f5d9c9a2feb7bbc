//! Host memory-pressure notifications.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::ports::ImageCachePort;

const SIGNAL_CAPACITY: usize = 4;

/// Payload-less "memory is low" event delivered by the host environment.
///
/// Clones share the same channel; listeners stop once every clone is gone.
#[derive(Debug, Clone)]
pub struct MemoryPressureSignal {
    tx: broadcast::Sender<()>,
}

impl MemoryPressureSignal {
    /// Creates a signal with no listeners.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self { tx }
    }

    /// Delivers one event. Returns how many listeners received it.
    pub fn notify(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }

    /// Returns a raw receiver for custom listeners.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

impl Default for MemoryPressureSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears `cache` every time `signal` fires.
///
/// The listener is registered before this returns, so any later
/// [`MemoryPressureSignal::notify`] reaches it.
pub fn clear_on_memory_pressure(
    cache: Arc<dyn ImageCachePort>,
    signal: &MemoryPressureSignal,
) -> JoinHandle<()> {
    let mut rx = signal.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(()) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Coalesced memory pressure events");
                }
                Err(RecvError::Closed) => break,
            }
            info!(cached = cache.len(), "Memory pressure, clearing image cache");
            cache.clear();
        }
        debug!("Memory pressure listener stopped");
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::entities::{DecodedImage, ImageKey};
    use crate::infrastructure::image::MemoryImageCache;

    #[tokio::test]
    async fn test_signal_clears_cache() {
        let cache = Arc::new(MemoryImageCache::new());
        let signal = MemoryPressureSignal::new();
        let _listener = clear_on_memory_pressure(cache.clone(), &signal);

        cache.set(
            ImageKey::from_url("https://example.com/image.jpg"),
            DecodedImage::new(image::DynamicImage::new_rgb8(1, 1)),
        );
        assert_eq!(signal.notify(), 1);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !cache.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("cache was not cleared");
    }

    #[tokio::test]
    async fn test_listener_stops_when_signal_dropped() {
        let cache = Arc::new(MemoryImageCache::new());
        let signal = MemoryPressureSignal::new();
        let listener = clear_on_memory_pressure(cache, &signal);

        drop(signal);

        tokio::time::timeout(Duration::from_secs(5), listener)
            .await
            .expect("listener did not stop")
            .expect("listener panicked");
    }

    #[test]
    fn test_notify_without_listeners() {
        assert_eq!(MemoryPressureSignal::new().notify(), 0);
    }
}
