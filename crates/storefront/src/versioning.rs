//! Content version history for the editorial dashboard.
//!
//! [`VersionStore`] keeps timestamped snapshots of editable content. It is
//! owned by [`AppState`](crate::state::AppState) and shared between handlers
//! behind an `Arc`; all state sits behind one lock that is never held across
//! an `.await`.
//!
//! Keys listed in the protected set cannot receive new versions unless the
//! caller bypasses approval (editor sessions only, see the API handler).

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use vitalis_core::{ContentKey, ContentType, ContentVersion, VersionId};

/// Default number of versions returned by [`VersionStore::list_all_versions`].
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Time source, replaceable in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Errors from version store writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersioningError {
    /// The key is protected and approval was not bypassed.
    #[error("content {0} is protected and requires approval")]
    Protected(ContentKey),
}

/// Whether a write must respect the protected set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    Required,
    Bypassed,
}

/// Fields of a version to be created.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub key: ContentKey,
    pub title: String,
    pub content: String,
    pub changes: String,
    pub author: String,
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    version: ContentVersion,
}

impl Entry {
    /// Sort key: timestamp, then insertion order.
    fn order(&self) -> (DateTime<Utc>, u64) {
        (self.version.timestamp, self.seq)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Entry>,
    current: HashMap<ContentKey, VersionId>,
    next_seq: u64,
}

impl Inner {
    fn newest_first<'a>(entries: impl Iterator<Item = &'a Entry>) -> Vec<ContentVersion> {
        let mut matching: Vec<&Entry> = entries.collect();
        matching.sort_by_key(|entry| std::cmp::Reverse(entry.order()));
        matching.into_iter().map(|e| e.version.clone()).collect()
    }

    fn latest(&self, key: &ContentKey) -> Option<&Entry> {
        self.entries
            .iter()
            .filter(|e| e.version.is_for(key))
            .max_by_key(|e| e.order())
    }
}

/// In-memory store of content versions.
pub struct VersionStore {
    inner: RwLock<Inner>,
    protected: BTreeSet<ContentKey>,
    clock: Clock,
}

impl std::fmt::Debug for VersionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionStore")
            .field("versions", &self.read().entries.len())
            .field("protected", &self.protected)
            .finish_non_exhaustive()
    }
}

impl VersionStore {
    /// Create an empty store with the given protected keys.
    #[must_use]
    pub fn new(protected: BTreeSet<ContentKey>) -> Self {
        Self::with_clock(protected, Arc::new(Utc::now))
    }

    /// Create an empty store that reads time from `clock`.
    #[must_use]
    pub fn with_clock(protected: BTreeSet<ContentKey>, clock: Clock) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            protected,
            clock,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether new versions of `key` require approval.
    #[must_use]
    pub fn is_protected(&self, key: &ContentKey) -> bool {
        self.protected.contains(key)
    }

    /// Protected keys in key order.
    #[must_use]
    pub fn list_protected_items(&self) -> Vec<ContentKey> {
        self.protected.iter().cloned().collect()
    }

    /// Total number of stored versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Whether the store holds no versions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// All versions of `key`, newest first.
    #[must_use]
    pub fn list_versions(&self, key: &ContentKey) -> Vec<ContentVersion> {
        let inner = self.read();
        Inner::newest_first(inner.entries.iter().filter(|e| e.version.is_for(key)))
    }

    /// The version of `key` with the greatest timestamp. Equal timestamps
    /// resolve to the one created last.
    #[must_use]
    pub fn latest_version(&self, key: &ContentKey) -> Option<ContentVersion> {
        self.read().latest(key).map(|e| e.version.clone())
    }

    /// The version of `key` that was last restored, or the latest version if
    /// none was restored (or the restored one has since been cleaned up).
    #[must_use]
    pub fn current_version(&self, key: &ContentKey) -> Option<ContentVersion> {
        let inner = self.read();
        let restored = inner.current.get(key).and_then(|id| {
            inner
                .entries
                .iter()
                .find(|e| e.version.id == *id)
                .map(|e| e.version.clone())
        });
        restored.or_else(|| inner.latest(key).map(|e| e.version.clone()))
    }

    /// The most recent versions across all keys, newest first.
    #[must_use]
    pub fn list_all_versions(&self, limit: usize) -> Vec<ContentVersion> {
        let mut versions = Inner::newest_first(self.read().entries.iter());
        versions.truncate(limit);
        versions
    }

    /// Append a new version.
    ///
    /// # Errors
    ///
    /// Returns `VersioningError::Protected` if the key is protected and
    /// `approval` is `Approval::Required`. Nothing is stored in that case.
    pub fn create_version(
        &self,
        new: NewVersion,
        approval: Approval,
    ) -> Result<ContentVersion, VersioningError> {
        if approval == Approval::Required && self.is_protected(&new.key) {
            tracing::info!(key = %new.key, "Rejected version for protected content");
            return Err(VersioningError::Protected(new.key));
        }

        let version = ContentVersion {
            id: VersionId::generate(),
            content_type: new.key.content_type,
            item_id: new.key.item_id,
            title: new.title,
            content: new.content,
            changes: new.changes,
            author: new.author,
            timestamp: (self.clock)(),
        };

        let mut inner = self.write();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.push(Entry {
            seq,
            version: version.clone(),
        });
        drop(inner);

        tracing::info!(
            version_id = %version.id,
            content_type = %version.content_type,
            item_id = %version.item_id,
            author = %version.author,
            "Content version created"
        );
        Ok(version)
    }

    /// Mark `id` as the current version of its key and return it unchanged.
    /// Returns `None` if no such version exists.
    pub fn restore_version(&self, id: VersionId) -> Option<ContentVersion> {
        let mut inner = self.write();
        let version = inner
            .entries
            .iter()
            .find(|e| e.version.id == id)
            .map(|e| e.version.clone())?;
        inner.current.insert(version.key(), id);
        drop(inner);

        tracing::info!(version_id = %id, key = %version.key(), "Content version restored");
        Some(version)
    }

    /// Remove every version older than `max_age_days` and return how many
    /// were removed.
    pub fn cleanup_old_versions(&self, max_age_days: u32) -> usize {
        let now = (self.clock)();
        let max_age = Duration::days(i64::from(max_age_days));

        let mut inner = self.write();
        let before = inner.entries.len();
        inner.entries.retain(|e| e.version.age(now) <= max_age);
        let removed = before - inner.entries.len();

        if removed > 0 {
            let Inner {
                entries, current, ..
            } = &mut *inner;
            current.retain(|_, id| entries.iter().any(|e| e.version.id == *id));
        }
        drop(inner);

        tracing::info!(removed, max_age_days, "Old content versions cleaned up");
        removed
    }

    /// Number of stored versions per content type.
    #[must_use]
    pub fn counts_by_type(&self) -> Vec<(ContentType, usize)> {
        let inner = self.read();
        ContentType::ALL
            .into_iter()
            .map(|ty| {
                let count = inner
                    .entries
                    .iter()
                    .filter(|e| e.version.content_type == ty)
                    .count();
                (ty, count)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;

    /// A clock that tests can move.
    fn manual_clock(start: DateTime<Utc>) -> (Clock, Arc<Mutex<DateTime<Utc>>>) {
        let now = Arc::new(Mutex::new(start));
        let handle = Arc::clone(&now);
        let clock: Clock = Arc::new(move || *handle.lock().unwrap());
        (clock, now)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn key(ty: ContentType, id: &str) -> ContentKey {
        ContentKey::new(ty, id).unwrap()
    }

    fn new_version(key: &ContentKey, title: &str) -> NewVersion {
        NewVersion {
            key: key.clone(),
            title: title.to_owned(),
            content: "C".to_owned(),
            changes: "fix typo".to_owned(),
            author: "bob".to_owned(),
        }
    }

    fn protected_store() -> VersionStore {
        VersionStore::new(BTreeSet::from([key(ContentType::Course, "detox-101")]))
    }

    #[test]
    fn test_create_then_list_and_restore() {
        let store = VersionStore::new(BTreeSet::new());
        let article = key(ContentType::Article, "42");

        let created = store
            .create_version(new_version(&article, "T"), Approval::Required)
            .unwrap();

        let versions = store.list_versions(&article);
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0], created);
        assert_eq!(store.restore_version(created.id), Some(created));
    }

    #[test]
    fn test_protected_key_rejected_without_changes() {
        let store = protected_store();
        let course = key(ContentType::Course, "detox-101");

        let err = store
            .create_version(new_version(&course, "T"), Approval::Required)
            .unwrap_err();

        assert_eq!(err, VersioningError::Protected(course.clone()));
        assert!(store.is_empty());
        assert!(store.list_versions(&course).is_empty());
    }

    #[test]
    fn test_protected_key_accepted_when_bypassed() {
        let store = protected_store();
        let course = key(ContentType::Course, "detox-101");
        store
            .create_version(new_version(&course, "T"), Approval::Bypassed)
            .unwrap();
        assert_eq!(store.list_versions(&course).len(), 1);
    }

    #[test]
    fn test_protection_is_per_key() {
        let store = protected_store();
        assert!(store.is_protected(&key(ContentType::Course, "detox-101")));
        assert!(!store.is_protected(&key(ContentType::Article, "detox-101")));
        assert!(!store.is_protected(&key(ContentType::Course, "detox-102")));
    }

    #[test]
    fn test_list_versions_newest_first_and_filtered() {
        let (clock, now) = manual_clock(start());
        let store = VersionStore::with_clock(BTreeSet::new(), clock);
        let a = key(ContentType::Article, "a");
        let b = key(ContentType::Article, "b");

        store.create_version(new_version(&a, "a1"), Approval::Required).unwrap();
        *now.lock().unwrap() += Duration::hours(1);
        store.create_version(new_version(&b, "b1"), Approval::Required).unwrap();
        *now.lock().unwrap() += Duration::hours(1);
        store.create_version(new_version(&a, "a2"), Approval::Required).unwrap();

        let titles: Vec<String> = store.list_versions(&a).into_iter().map(|v| v.title).collect();
        assert_eq!(titles, vec!["a2", "a1"]);
    }

    #[test]
    fn test_latest_version_uses_max_timestamp() {
        let (clock, now) = manual_clock(start());
        let store = VersionStore::with_clock(BTreeSet::new(), clock);
        let a = key(ContentType::Article, "a");

        *now.lock().unwrap() += Duration::days(2);
        store.create_version(new_version(&a, "later"), Approval::Required).unwrap();
        *now.lock().unwrap() -= Duration::days(1);
        store.create_version(new_version(&a, "earlier"), Approval::Required).unwrap();

        assert_eq!(store.latest_version(&a).unwrap().title, "later");
    }

    #[test]
    fn test_latest_version_tie_goes_to_last_created() {
        let (clock, _now) = manual_clock(start());
        let store = VersionStore::with_clock(BTreeSet::new(), clock);
        let a = key(ContentType::Article, "a");

        store.create_version(new_version(&a, "first"), Approval::Required).unwrap();
        store.create_version(new_version(&a, "second"), Approval::Required).unwrap();

        assert_eq!(store.latest_version(&a).unwrap().title, "second");
        assert_eq!(store.list_versions(&a)[0].title, "second");
    }

    #[test]
    fn test_latest_version_missing_key() {
        let store = VersionStore::new(BTreeSet::new());
        assert!(store.latest_version(&key(ContentType::Blog, "x")).is_none());
    }

    #[test]
    fn test_restore_unknown_is_none() {
        let store = VersionStore::new(BTreeSet::new());
        assert!(store.restore_version(VersionId::generate()).is_none());
    }

    #[test]
    fn test_current_version_follows_restore() {
        let (clock, now) = manual_clock(start());
        let store = VersionStore::with_clock(BTreeSet::new(), clock);
        let a = key(ContentType::Article, "a");

        let v1 = store.create_version(new_version(&a, "v1"), Approval::Required).unwrap();
        *now.lock().unwrap() += Duration::minutes(5);
        store.create_version(new_version(&a, "v2"), Approval::Required).unwrap();

        assert_eq!(store.current_version(&a).unwrap().title, "v2");
        store.restore_version(v1.id).unwrap();
        assert_eq!(store.current_version(&a).unwrap(), v1);
        assert_eq!(store.latest_version(&a).unwrap().title, "v2");
    }

    #[test]
    fn test_cleanup_removes_only_old_versions_and_is_idempotent() {
        let (clock, now) = manual_clock(start());
        let store = VersionStore::with_clock(BTreeSet::new(), clock);
        let a = key(ContentType::Article, "a");

        let old = store.create_version(new_version(&a, "old"), Approval::Required).unwrap();
        *now.lock().unwrap() += Duration::days(30);
        store.create_version(new_version(&a, "mid"), Approval::Required).unwrap();
        *now.lock().unwrap() += Duration::days(200);
        store.create_version(new_version(&a, "recent"), Approval::Required).unwrap();
        store.restore_version(old.id).unwrap();

        // 400 days after the first version, 370 after the second
        *now.lock().unwrap() = start() + Duration::days(400);
        assert_eq!(store.cleanup_old_versions(365), 2);
        assert_eq!(store.cleanup_old_versions(365), 0);

        let titles: Vec<String> = store.list_versions(&a).into_iter().map(|v| v.title).collect();
        assert_eq!(titles, vec!["recent"]);
        assert_eq!(store.current_version(&a).unwrap().title, "recent");
    }

    #[test]
    fn test_cleanup_keeps_version_at_threshold() {
        let (clock, now) = manual_clock(start());
        let store = VersionStore::with_clock(BTreeSet::new(), clock);
        let a = key(ContentType::Article, "a");
        store.create_version(new_version(&a, "edge"), Approval::Required).unwrap();

        *now.lock().unwrap() = start() + Duration::days(365);
        assert_eq!(store.cleanup_old_versions(365), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_list_all_versions_respects_limit() {
        let (clock, now) = manual_clock(start());
        let store = VersionStore::with_clock(BTreeSet::new(), clock);
        for i in 0..5 {
            let k = key(ContentType::Blog, &format!("post-{i}"));
            store.create_version(new_version(&k, &i.to_string()), Approval::Required).unwrap();
            *now.lock().unwrap() += Duration::seconds(1);
        }

        let titles: Vec<String> = store.list_all_versions(3).into_iter().map(|v| v.title).collect();
        assert_eq!(titles, vec!["4", "3", "2"]);
        assert_eq!(store.list_all_versions(DEFAULT_LIST_LIMIT).len(), 5);
    }

    #[test]
    fn test_list_protected_items_sorted() {
        let store = VersionStore::new(BTreeSet::from([
            key(ContentType::Course, "b"),
            key(ContentType::Article, "z"),
            key(ContentType::Course, "a"),
        ]));
        let items = store.list_protected_items();
        assert_eq!(items.len(), 3);
        assert!(items.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_counts_by_type() {
        let store = VersionStore::new(BTreeSet::new());
        let a = key(ContentType::Article, "a");
        store.create_version(new_version(&a, "1"), Approval::Required).unwrap();
        store.create_version(new_version(&a, "2"), Approval::Required).unwrap();

        let counts = store.counts_by_type();
        assert!(counts.contains(&(ContentType::Article, 2)));
        assert!(counts.contains(&(ContentType::Course, 0)));
    }
}
