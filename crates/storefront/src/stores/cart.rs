//! Cart store.

use serde::{Deserialize, Serialize};

use vitalis_core::ProductId;

use super::{ItemStore, StoreItem};

/// Largest quantity a single cart line may hold.
pub const MAX_QUANTITY: u32 = 99;

/// A cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartItem {
    /// Create a cart line, clamping the quantity to `1..=MAX_QUANTITY`.
    #[must_use]
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity: quantity.clamp(1, MAX_QUANTITY),
        }
    }
}

impl StoreItem for CartItem {
    fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Adding a product that is already in the cart increases its quantity.
    fn merge(self, existing: &Self) -> Self {
        Self {
            product_id: self.product_id,
            quantity: existing
                .quantity
                .saturating_add(self.quantity)
                .min(MAX_QUANTITY),
        }
    }
}

/// The visitor's cart.
pub type Cart = ItemStore<CartItem>;

impl ItemStore<CartItem> {
    /// Set the quantity of a line. Zero removes the line; unknown products
    /// are ignored. Returns `true` if the cart changed.
    pub fn set_quantity(&mut self, id: &ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(id).is_some();
        }

        let quantity = quantity.min(MAX_QUANTITY);
        match self.get(id) {
            Some(line) if line.quantity != quantity => {
                self.replace(CartItem {
                    product_id: id.clone(),
                    quantity,
                });
                true
            }
            _ => false,
        }
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items().map(|line| line.quantity).sum()
    }

    /// Merge the copy of the cart stored remotely for a signed-in user into
    /// this (local) cart.
    ///
    /// Products from both sides are kept; when both hold the same product the
    /// larger quantity wins, so signing in never loses items and never doubles
    /// a line that was already synced. Returns `true` if the local cart
    /// changed.
    pub fn merge_remote(&mut self, remote: impl IntoIterator<Item = CartItem>) -> bool {
        let mut changed = false;
        for line in remote {
            let quantity = line.quantity.clamp(1, MAX_QUANTITY);
            let keep_local = self
                .get(&line.product_id)
                .is_some_and(|local| local.quantity >= quantity);
            if !keep_local {
                self.replace(CartItem {
                    product_id: line.product_id,
                    quantity,
                });
                changed = true;
            }
        }
        changed
    }

    /// Snapshot of all lines, e.g. for the remote sync.
    #[must_use]
    pub fn lines(&self) -> Vec<CartItem> {
        self.items().cloned().collect()
    }
}
