//! Failure sink writing to the tracing pipeline.

use tracing::error;

use crate::domain::entities::ImageKey;
use crate::domain::ports::FailureLogger;

/// Target that failure events are emitted under, for filtering.
pub const FAILURE_TARGET: &str = "cached_image::failure";

/// Reports failed fetches as `error` events on [`FAILURE_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFailureLogger;

impl FailureLogger for TracingFailureLogger {
    fn log(&self, message: &str, key: Option<&ImageKey>) {
        let url = key.map_or("", ImageKey::url);
        error!(target: FAILURE_TARGET, url = %url, "Error: {message}");
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_target(true)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_failure_event_uses_failure_target() {
        let key = ImageKey::from_url("https://example.com/image.jpg");

        let output = capture(|| TracingFailureLogger.log("Bad URL or nil.", Some(&key)));

        assert!(output.contains("ERROR"));
        assert!(output.contains(FAILURE_TARGET));
        assert!(output.contains("Error: Bad URL or nil."));
        assert!(output.contains("url=https://example.com/image.jpg"));
    }

    #[test]
    fn test_failure_without_key_logs_empty_url() {
        let output = capture(|| TracingFailureLogger.log("offline", None));

        assert!(output.contains(FAILURE_TARGET));
        assert!(output.contains("Error: offline"));
    }
}
