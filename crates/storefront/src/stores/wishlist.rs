//! Wishlist store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitalis_core::ProductId;

use super::{ItemStore, StoreItem};

/// A saved product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub product_id: ProductId,
    pub added_at: DateTime<Utc>,
}

impl WishlistItem {
    /// Save `product_id` now.
    #[must_use]
    pub fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            added_at: Utc::now(),
        }
    }
}

impl StoreItem for WishlistItem {
    fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Saving a product twice keeps the original date.
    fn merge(self, existing: &Self) -> Self {
        existing.clone()
    }
}

/// The visitor's wishlist.
pub type Wishlist = ItemStore<WishlistItem>;

impl ItemStore<WishlistItem> {
    /// Add the product if absent, remove it if present. Returns `true` if the
    /// product is saved afterwards.
    pub fn toggle(&mut self, id: &ProductId) -> bool {
        if self.remove(id).is_some() {
            false
        } else {
            self.add(WishlistItem::new(id.clone()));
            true
        }
    }

    /// Saved items, most recently added first.
    #[must_use]
    pub fn newest_first(&self) -> Vec<&WishlistItem> {
        let mut items: Vec<&WishlistItem> = self.items().collect();
        items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        items
    }
}
