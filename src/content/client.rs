//! Content-management capability used by the walker and the reconciler.

use crate::content::model::{ContentType, Entry};
use crate::error::ContentResult;
use async_trait::async_trait;

/// Read/write access to entries and content types
///
/// Implementations must treat a missing entry as `Ok(None)`, not as an error:
/// callers skip unresolved links and keep going.
#[async_trait]
pub trait ContentClient: Send + Sync {
    async fn get_entry(&self, id: &str) -> ContentResult<Option<Entry>>;

    /// All entries of one content type, in the order the service lists them
    async fn get_entries(&self, content_type: &str) -> ContentResult<Vec<Entry>>;

    async fn get_content_type(&self, id: &str) -> ContentResult<ContentType>;

    /// Persist `entry` as a draft and return the stored copy (with its new version)
    ///
    /// A rejected save surfaces as `ContentError::Validation` carrying the
    /// offending field paths.
    async fn update_entry(&self, entry: &Entry) -> ContentResult<Entry>;
}
