//! Visitor item stores (cart and wishlist).
//!
//! An [`ItemStore`] is a small map from product id to item. Stores are built
//! per request from the visitor's session, mutated by the handler, and written
//! back as JSON text after every mutation. Nothing here is a global: each
//! handler owns the store instance it works on.
//!
//! Listeners registered with [`ItemStore::subscribe`] run synchronously,
//! right after a mutation has been committed to the map and before the
//! mutating call returns. The cart uses this to forward snapshots to the
//! remote sync worker (see [`sync`]).

pub mod cart;
pub mod session;
pub mod sync;
pub mod wishlist;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vitalis_core::ProductId;

pub use cart::{Cart, CartItem};
pub use sync::CartSync;
pub use wishlist::{Wishlist, WishlistItem};

/// Errors from store serialization and persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Stored text could not be parsed.
    #[error("corrupt store data: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The session backend failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// An item that can live in an [`ItemStore`].
pub trait StoreItem: Clone + Serialize + DeserializeOwned {
    /// The product this entry refers to. Entries are unique by this id.
    fn product_id(&self) -> &ProductId;

    /// Combine a newly added item with the entry already stored for the same
    /// product. The default keeps the new item.
    #[must_use]
    fn merge(self, _existing: &Self) -> Self {
        self
    }
}

/// What a mutation did, passed to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Added(ProductId),
    Updated(ProductId),
    Removed(ProductId),
    Cleared,
}

/// Listener invoked after every committed mutation.
pub type Listener<T> = Box<dyn FnMut(&StoreChange, &BTreeMap<ProductId, T>) + Send + Sync>;

/// Handle returned by [`ItemStore::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(usize);

/// Serialized form written to the session.
#[derive(Serialize, Deserialize)]
struct Persisted<T> {
    items: Vec<T>,
}

/// A keyed collection of items with change subscriptions.
pub struct ItemStore<T> {
    items: BTreeMap<ProductId, T>,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
    next_subscription: usize,
}

impl<T> Default for ItemStore<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ItemStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemStore")
            .field("items", &self.items)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T: StoreItem> ItemStore<T> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from items, merging duplicates by product id.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let mut map = BTreeMap::new();
        for item in items {
            insert_merged(&mut map, item);
        }
        Self {
            items: map,
            ..Self::default()
        }
    }

    /// Parse a store from its persisted JSON text.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if the text is not a valid store.
    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        let persisted: Persisted<T> = serde_json::from_str(text)?;
        Ok(Self::from_items(persisted.items))
    }

    /// Serialize the items (not the listeners) to JSON text.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if an item fails to serialize.
    pub fn to_json(&self) -> Result<String, StoreError> {
        let persisted = Persisted {
            items: self.items.values().cloned().collect(),
        };
        Ok(serde_json::to_string(&persisted)?)
    }

    /// Add an item. An existing entry for the same product is merged via
    /// [`StoreItem::merge`], so the store never holds two entries for one id.
    pub fn add(&mut self, item: T) {
        let id = item.product_id().clone();
        let change = if insert_merged(&mut self.items, item) {
            StoreChange::Updated(id)
        } else {
            StoreChange::Added(id)
        };
        self.notify(&change);
    }

    /// Remove the entry for `id`, returning it if it existed.
    pub fn remove(&mut self, id: &ProductId) -> Option<T> {
        let removed = self.items.remove(id)?;
        self.notify(&StoreChange::Removed(id.clone()));
        Some(removed)
    }

    /// Remove every entry. Listeners are notified even if the store was
    /// already empty.
    pub fn clear(&mut self) {
        self.items.clear();
        self.notify(&StoreChange::Cleared);
    }

    /// Whether the store holds an entry for `id`.
    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.items.contains_key(id)
    }

    /// Number of distinct products in the store.
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up the entry for `id`.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&T> {
        self.items.get(id)
    }

    /// Iterate entries in product id order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    /// Register a listener for committed mutations.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreChange, &BTreeMap<ProductId, T>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    /// Replace an existing entry in place and notify. Used by typed helpers
    /// that edit an entry without the merge rule.
    fn replace(&mut self, item: T) {
        let id = item.product_id().clone();
        let change = if self.items.insert(id.clone(), item).is_some() {
            StoreChange::Updated(id)
        } else {
            StoreChange::Added(id)
        };
        self.notify(&change);
    }

    fn notify(&mut self, change: &StoreChange) {
        for (_, listener) in &mut self.listeners {
            listener(change, &self.items);
        }
    }
}

/// Insert `item`, merging with an existing entry. Returns `true` if an entry
/// for the product already existed.
fn insert_merged<T: StoreItem>(map: &mut BTreeMap<ProductId, T>, item: T) -> bool {
    let id = item.product_id().clone();
    match map.get(&id) {
        Some(existing) => {
            let merged = item.merge(existing);
            map.insert(id, merged);
            true
        }
        None => {
            map.insert(id, item);
            false
        }
    }
}
