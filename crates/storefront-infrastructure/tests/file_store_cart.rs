//! Cart reconciler persisted through the file store, across "restarts".

use std::sync::Arc;

use chrono::{Duration, Utc};
use storefront_core::cart::{CART_ITEMS_KEY, CartItem, CartReconciler, DurableStore, ProductSnapshot};
use storefront_core::clock::ManualClock;
use storefront_infrastructure::FileStore;
use tempfile::TempDir;

#[test]
fn test_cart_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(Utc::now()));

    {
        let store = Arc::new(FileStore::new(temp_dir.path()));
        let mut cart = CartReconciler::restore_with_default_horizon(store, clock.clone());
        cart.add_item(ProductSnapshot::new("mug", "Mug", 12.0), 2);
        cart.add_item(ProductSnapshot::new("tee", "T-Shirt", 20.0), 1);
        cart.remove_item("tee");
        cart.add_item(ProductSnapshot::new("mug", "Mug", 12.0), 1);
    }

    clock.advance(Duration::hours(3));
    let store = Arc::new(FileStore::new(temp_dir.path()));
    let cart = CartReconciler::restore_with_default_horizon(store.clone(), clock);

    assert_eq!(cart.cart().len(), 1);
    assert_eq!(cart.cart().get("mug").unwrap().quantity, 3);

    let raw = store.get(CART_ITEMS_KEY).unwrap().unwrap();
    let persisted: Vec<CartItem> = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted, cart.cart().to_vec());
}

#[test]
fn test_expired_cart_file_is_deleted() {
    let temp_dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(Utc::now()));

    {
        let store = Arc::new(FileStore::new(temp_dir.path()));
        let mut cart = CartReconciler::restore_with_default_horizon(store, clock.clone());
        cart.add_item(ProductSnapshot::new("mug", "Mug", 12.0), 2);
    }

    clock.advance(Duration::hours(25));
    let store = Arc::new(FileStore::new(temp_dir.path()));
    let cart = CartReconciler::restore_with_default_horizon(store, clock);

    assert!(cart.cart().is_empty());
    assert!(!temp_dir.path().join("cart_items.json").exists());
    assert!(!temp_dir.path().join("cart_last_modified_at.json").exists());
}
