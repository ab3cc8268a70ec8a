//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::content::{ContentError, ContentStore};
use crate::services::{IdentityClient, IdentityError};
use crate::stores::CartSync;
use crate::versioning::VersionStore;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to load content: {0}")]
    Content(#[from] ContentError),
    #[error("failed to create identity client: {0}")]
    Identity(#[from] IdentityError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    content: ContentStore,
    versions: Arc<VersionStore>,
    identity: IdentityClient,
    cart_sync: CartSync,
}

impl AppState {
    /// Create the application state, loading content from the configured
    /// directory and starting the cart sync worker.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if content cannot be loaded or the identity client
    /// cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let content = ContentStore::load(&config.content_dir)?;
        let versions = Arc::new(VersionStore::new(config.protected_content.clone()));
        let cart_sync = CartSync::spawn(pool.clone());
        Self::from_parts(config, pool, content, versions, cart_sync)
    }

    /// Assemble state from already-built parts.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity client cannot be built.
    pub fn from_parts(
        config: StorefrontConfig,
        pool: PgPool,
        content: ContentStore,
        versions: Arc<VersionStore>,
        cart_sync: CartSync,
    ) -> Result<Self, StateError> {
        let identity = IdentityClient::new(&config.backend)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                content,
                versions,
                identity,
                cart_sync,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the loaded catalog and editorial content.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }

    /// Get the content version store.
    #[must_use]
    pub fn versions(&self) -> &VersionStore {
        &self.inner.versions
    }

    /// Get the identity provider client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Get the cart sync handle.
    #[must_use]
    pub fn cart_sync(&self) -> &CartSync {
        &self.inner.cart_sync
    }
}
