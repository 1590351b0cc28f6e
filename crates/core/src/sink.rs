use std::future::Future;

use crate::error::SaveFailed;

/// Destination that persists a document's serialized content.
///
/// Calls for one controller never overlap, so implementations need not be
/// reentrant. Saving identical content twice must be acceptable.
pub trait SaveSink: Send + Sync + 'static {
    fn save(&self, content: String) -> impl Future<Output = Result<(), SaveFailed>> + Send;
}

impl<F, Fut> SaveSink for F
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SaveFailed>> + Send,
{
    fn save(&self, content: String) -> impl Future<Output = Result<(), SaveFailed>> + Send {
        self(content)
    }
}
