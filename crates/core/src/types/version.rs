//! Content version snapshots.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::content::{ContentKey, ContentType};
use super::id::VersionId;

/// An immutable, timestamped snapshot of an editable content item.
///
/// Serialized in camelCase because the editorial dashboard consumes it as
/// JSON from `/api/versioning`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentVersion {
    pub id: VersionId,
    pub content_type: ContentType,
    pub item_id: String,
    pub title: String,
    pub content: String,
    /// Free-text description of what changed.
    pub changes: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

impl ContentVersion {
    /// The content key this version belongs to.
    #[must_use]
    pub fn key(&self) -> ContentKey {
        ContentKey {
            content_type: self.content_type,
            item_id: self.item_id.clone(),
        }
    }

    /// Whether this version belongs to `key`.
    #[must_use]
    pub fn is_for(&self, key: &ContentKey) -> bool {
        self.content_type == key.content_type && self.item_id == key.item_id
    }

    /// Age of the version relative to `now`. Negative for future timestamps.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }
}
