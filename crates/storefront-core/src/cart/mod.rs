//! Shopping cart: model, durable store seam, server sync seam and the reconciler.

pub mod model;
pub mod reconciler;
pub mod store;
pub mod sync;

pub use model::{Cart, CartItem, ProductSnapshot};
pub use reconciler::{
    CART_ITEMS_KEY, CART_MODIFIED_AT_KEY, CartReconciler, DEFAULT_STALENESS_HORIZON_HOURS,
    MutationReport,
};
pub use store::{DurableStore, MemoryStore};
pub use sync::{CartEnvelope, CartSyncApi};
