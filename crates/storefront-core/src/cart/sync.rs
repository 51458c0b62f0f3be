//! Server-side cart synchronization trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cart::model::CartItem;
use crate::error::SyncError;
use crate::session::Credentials;

/// Body of both the sync request and the sync response: `{ "items": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEnvelope {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl CartEnvelope {
    pub fn new(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    /// Checks that the server's cart respects the local invariants.
    pub fn validate(&self) -> Result<(), SyncError> {
        if let Some(bad) = self.items.iter().find(|i| i.quantity == 0) {
            return Err(SyncError::InvalidResponse(format!(
                "item '{}' has zero quantity",
                bad.id
            )));
        }
        Ok(())
    }
}

/// The server-authoritative cart endpoint.
///
/// Implementations send the client's full snapshot and return the server's
/// cart unchanged; reconciliation policy lives on the server.
#[async_trait]
pub trait CartSyncApi: Send + Sync {
    /// Sends the full local cart and returns the authoritative cart.
    async fn sync_cart(
        &self,
        credentials: &Credentials,
        items: Vec<CartItem>,
    ) -> Result<Vec<CartItem>, SyncError>;

    /// Fetches the server cart without sending local state.
    async fn fetch_cart(&self, credentials: &Credentials) -> Result<Vec<CartItem>, SyncError>;
}
