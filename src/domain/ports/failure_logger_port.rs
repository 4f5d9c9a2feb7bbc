use crate::domain::entities::ImageKey;

/// Port receiving one report per failed fetch.
pub trait FailureLogger: Send + Sync {
    /// Records a failure. Must not block.
    fn log(&self, message: &str, key: Option<&ImageKey>);
}
