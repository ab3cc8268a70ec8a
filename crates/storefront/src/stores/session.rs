//! Session persistence for item stores.
//!
//! Stores are written to the visitor's session as JSON text under
//! [`session_keys::CART`] and [`session_keys::WISHLIST`]. Unreadable text is
//! treated as an empty store so a bad write can never lock a visitor out of
//! their cart.

use tower_sessions::Session;

use super::{Cart, ItemStore, StoreError, StoreItem, Wishlist};
use crate::models::session_keys;

/// Load the store saved under `key`.
///
/// # Errors
///
/// Returns `StoreError::Session` if the session backend fails.
pub async fn load<T: StoreItem>(session: &Session, key: &str) -> Result<ItemStore<T>, StoreError> {
    let Some(text) = session.get::<String>(key).await? else {
        return Ok(ItemStore::new());
    };

    match ItemStore::from_json(&text) {
        Ok(store) => Ok(store),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unreadable store data");
            Ok(ItemStore::new())
        }
    }
}

/// Save `store` under `key`.
///
/// # Errors
///
/// Returns an error if serialization or the session backend fails.
pub async fn save<T: StoreItem>(
    session: &Session,
    key: &str,
    store: &ItemStore<T>,
) -> Result<(), StoreError> {
    session.insert(key, store.to_json()?).await?;
    Ok(())
}

/// Load the visitor's cart.
///
/// # Errors
///
/// Returns `StoreError::Session` if the session backend fails.
pub async fn load_cart(session: &Session) -> Result<Cart, StoreError> {
    load(session, session_keys::CART).await
}

/// Save the visitor's cart.
///
/// # Errors
///
/// Returns an error if serialization or the session backend fails.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), StoreError> {
    save(session, session_keys::CART, cart).await
}

/// Load the visitor's wishlist.
///
/// # Errors
///
/// Returns `StoreError::Session` if the session backend fails.
pub async fn load_wishlist(session: &Session) -> Result<Wishlist, StoreError> {
    load(session, session_keys::WISHLIST).await
}

/// Save the visitor's wishlist.
///
/// # Errors
///
/// Returns an error if serialization or the session backend fails.
pub async fn save_wishlist(session: &Session, wishlist: &Wishlist) -> Result<(), StoreError> {
    save(session, session_keys::WISHLIST, wishlist).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;
    use vitalis_core::ProductId;

    use super::*;
    use crate::stores::{CartItem, WishlistItem};

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn id(slug: &str) -> ProductId {
        ProductId::parse(slug).unwrap()
    }

    #[tokio::test]
    async fn test_missing_store_is_empty() {
        let session = session();
        assert!(load_cart(&session).await.unwrap().is_empty());
        assert!(load_wishlist(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let session = session();
        let mut cart = Cart::new();
        cart.add(CartItem::new(id("serum"), 2));
        save_cart(&session, &cart).await.unwrap();

        let mut wishlist = Wishlist::new();
        wishlist.add(WishlistItem::new(id("mask")));
        save_wishlist(&session, &wishlist).await.unwrap();

        let cart = load_cart(&session).await.unwrap();
        assert_eq!(cart.get(&id("serum")).unwrap().quantity, 2);
        assert!(load_wishlist(&session).await.unwrap().contains(&id("mask")));
    }

    #[tokio::test]
    async fn test_corrupt_text_yields_empty_store() {
        let session = session();
        session
            .insert(session_keys::CART, "{\"items\":[{\"broken\"")
            .await
            .unwrap();
        assert!(load_cart(&session).await.unwrap().is_empty());
    }
}
