//! Server-side cart copies for signed-in members.

use sqlx::PgPool;

use vitalis_core::{ProductId, UserId};

use super::RepositoryError;
use crate::stores::CartItem;

/// Repository for `storefront.cart_item`.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load the stored cart lines for a member.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored line is invalid.
    pub async fn load(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows: Vec<(String, i32)> = sqlx::query_as(
            r"
            SELECT product_id, quantity
            FROM storefront.cart_item
            WHERE user_id = $1
            ORDER BY product_id
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(product_id, quantity)| {
                let product_id = ProductId::parse(&product_id).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid product id in cart: {e}"))
                })?;
                let quantity = u32::try_from(quantity).map_err(|_| {
                    RepositoryError::DataCorruption(format!("invalid cart quantity: {quantity}"))
                })?;
                Ok(CartItem::new(product_id, quantity))
            })
            .collect()
    }

    /// Replace the stored cart for a member with `lines`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn replace(&self, user_id: UserId, lines: &[CartItem]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM storefront.cart_item WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        for line in lines {
            sqlx::query(
                r"
                INSERT INTO storefront.cart_item (user_id, product_id, quantity)
                VALUES ($1, $2, $3)
                ",
            )
            .bind(user_id.as_uuid())
            .bind(line.product_id.as_str())
            .bind(i32::try_from(line.quantity).unwrap_or(i32::MAX))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
