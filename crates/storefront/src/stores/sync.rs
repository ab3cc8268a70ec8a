//! Remote cart sync for signed-in members.
//!
//! Every cart mutation made by a signed-in member produces a snapshot that is
//! queued to a background worker, which replaces the member's stored cart.
//! The request never waits for the write. Failures are logged and dropped;
//! the session copy stays authoritative and the next mutation retries with a
//! fresh snapshot.

use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::instrument;

use vitalis_core::UserId;

use super::{CartItem, ItemStore, StoreChange};
use crate::db::CartRepository;

/// Full cart contents of one member at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
}

/// Handle to the cart sync worker.
#[derive(Debug, Clone)]
pub struct CartSync {
    tx: mpsc::UnboundedSender<CartSnapshot>,
}

impl CartSync {
    /// Spawn the sync worker on the current runtime.
    #[must_use]
    pub fn spawn(pool: PgPool) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<CartSnapshot>();

        tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                write_snapshot(&pool, snapshot).await;
            }
            tracing::debug!("Cart sync worker stopped");
        });

        Self { tx }
    }

    /// Build a handle whose snapshots are delivered to the returned receiver
    /// instead of the database.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CartSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a snapshot of `cart` for `user_id`.
    pub fn push(&self, user_id: UserId, cart: &ItemStore<CartItem>) {
        self.send(CartSnapshot {
            user_id,
            items: cart.lines(),
        });
    }

    /// Subscribe `cart` so that every further mutation queues a snapshot.
    pub fn attach(&self, user_id: UserId, cart: &mut ItemStore<CartItem>) {
        let sync = self.clone();
        cart.subscribe(move |_change: &StoreChange, items| {
            sync.send(CartSnapshot {
                user_id,
                items: items.values().cloned().collect(),
            });
        });
    }

    fn send(&self, snapshot: CartSnapshot) {
        if self.tx.send(snapshot).is_err() {
            tracing::warn!("Cart sync worker is gone, snapshot dropped");
        }
    }
}

#[instrument(skip(pool, snapshot), fields(user_id = %snapshot.user_id, lines = snapshot.items.len()))]
async fn write_snapshot(pool: &PgPool, snapshot: CartSnapshot) {
    match CartRepository::new(pool)
        .replace(snapshot.user_id, &snapshot.items)
        .await
    {
        Ok(()) => tracing::debug!("Cart synced"),
        Err(e) => tracing::warn!(error = %e, "Cart sync failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vitalis_core::ProductId;

    use super::*;
    use crate::stores::Cart;

    fn id(slug: &str) -> ProductId {
        ProductId::parse(slug).unwrap()
    }

    #[tokio::test]
    async fn test_attached_cart_queues_snapshot_per_mutation() {
        let (sync, mut rx) = CartSync::channel();
        let user_id = UserId::generate();
        let mut cart = Cart::new();
        sync.attach(user_id, &mut cart);

        cart.add(CartItem::new(id("serum"), 1));
        cart.set_quantity(&id("serum"), 3);
        cart.clear();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.user_id, user_id);
        assert_eq!(first.items, vec![CartItem::new(id("serum"), 1)]);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.items, vec![CartItem::new(id("serum"), 3)]);

        let third = rx.recv().await.unwrap();
        assert!(third.items.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_push_sends_current_lines() {
        let (sync, mut rx) = CartSync::channel();
        let user_id = UserId::generate();
        let cart = Cart::from_items([CartItem::new(id("mask"), 2)]);

        sync.push(user_id, &cart);

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.items, vec![CartItem::new(id("mask"), 2)]);
    }

    #[test]
    fn test_send_after_worker_gone_does_not_panic() {
        let (sync, rx) = CartSync::channel();
        drop(rx);
        sync.push(UserId::generate(), &Cart::new());
    }
}
