//! Enrichment seam: auto-filling a medicine's description at creation time.

use async_trait::async_trait;

/// External description lookup consulted when a medicine is created.
///
/// Implementations must be best-effort: any failure (timeout, transport,
/// malformed payload) is reported as `None`, and the caller keeps the
/// draft's own description.
#[async_trait]
pub trait DescriptionSource: Send + Sync {
    async fn describe(&self, name: &str) -> Option<String>;
}

/// Null object: never supplies a description.
pub struct NoEnrichment;

#[async_trait]
impl DescriptionSource for NoEnrichment {
    async fn describe(&self, _name: &str) -> Option<String> {
        None
    }
}
