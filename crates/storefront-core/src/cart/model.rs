//! Cart domain models.

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::wire::{deserialize_id, deserialize_timestamp};

/// The product fields a cart line is created from.
///
/// This is what the UI hands to [`crate::cart::CartReconciler::add_item`];
/// the reconciler stamps `quantity` and `added_at` itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    /// Cart line identity. Equal to `product_id` in this storefront.
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl ProductSnapshot {
    /// Creates a snapshot whose line id is the product id.
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, unit_price: f64) -> Self {
        let product_id = product_id.into();
        Self {
            id: product_id.clone(),
            product_id,
            name: name.into(),
            unit_price,
            image_ref: None,
        }
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }
}

/// A single line in the cart.
///
/// `quantity` is always at least 1; a line that would drop below that is
/// clamped, never stored as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub product_id: String,
    pub name: String,
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub quantity: u32,
    #[serde(
        default = "Utc::now",
        deserialize_with = "deserialize_timestamp"
    )]
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn from_product(product: ProductSnapshot, quantity: u32, added_at: DateTime<Utc>) -> Self {
        Self {
            id: product.id,
            product_id: product.product_id,
            name: product.name,
            unit_price: product.unit_price,
            image_ref: product.image_ref,
            quantity: quantity.max(1),
            added_at,
        }
    }

    /// Price of the whole line.
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// Insertion-ordered cart keyed by line id.
///
/// Only the reconciler mutates a `Cart`; everything else reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: IndexMap<String, CartItem>,
    last_modified_at: Option<DateTime<Utc>>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a cart from a persisted or server-provided item list.
    ///
    /// Later duplicates of an id overwrite earlier ones but keep the first
    /// position.
    pub fn from_items(items: Vec<CartItem>, last_modified_at: Option<DateTime<Utc>>) -> Self {
        let mut map = IndexMap::with_capacity(items.len());
        for item in items {
            map.insert(item.id.clone(), item);
        }
        Self {
            items: map,
            last_modified_at,
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.values()
    }

    /// Owned copy of the lines in insertion order.
    pub fn to_vec(&self) -> Vec<CartItem> {
        self.items.values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<&CartItem> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities over all lines.
    pub fn total_quantity(&self) -> u64 {
        self.items.values().map(|i| u64::from(i.quantity)).sum()
    }

    /// Sum of line totals.
    pub fn subtotal(&self) -> f64 {
        self.items.values().map(CartItem::line_total).sum()
    }

    pub fn last_modified_at(&self) -> Option<DateTime<Utc>> {
        self.last_modified_at
    }

    /// Whether the cart is older than `horizon` at `now`.
    ///
    /// A cart that was never modified is never stale.
    pub fn is_stale(&self, now: DateTime<Utc>, horizon: Duration) -> bool {
        match self.last_modified_at {
            Some(modified) => now - modified > horizon,
            None => false,
        }
    }

    // ------------------------------------------------------------------------
    // Mutations (reconciler only)
    // ------------------------------------------------------------------------

    /// Adds `quantity` to an existing line or inserts a new one.
    pub(crate) fn add(&mut self, product: ProductSnapshot, quantity: u32, now: DateTime<Utc>) {
        let quantity = quantity.max(1);
        match self.items.get_mut(&product.id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(quantity);
            }
            None => {
                let item = CartItem::from_product(product, quantity, now);
                self.items.insert(item.id.clone(), item);
            }
        }
        self.last_modified_at = Some(now);
    }

    /// Sets the quantity of an existing line. Returns `false` if nothing changed.
    pub(crate) fn set_quantity(&mut self, id: &str, quantity: u32, now: DateTime<Utc>) -> bool {
        let quantity = quantity.max(1);
        match self.items.get_mut(id) {
            Some(item) if item.quantity != quantity => {
                item.quantity = quantity;
                self.last_modified_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Removes a line. Returns `false` if it was absent.
    pub(crate) fn remove(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        if self.items.shift_remove(id).is_some() {
            self.last_modified_at = Some(now);
            true
        } else {
            false
        }
    }

    pub(crate) fn replace_all(&mut self, items: Vec<CartItem>, now: DateTime<Utc>) {
        *self = Self::from_items(items, Some(now));
    }

    pub(crate) fn reset(&mut self) {
        self.items.clear();
        self.last_modified_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: f64) -> ProductSnapshot {
        ProductSnapshot::new(id, format!("Product {}", id), price)
    }

    #[test]
    fn test_add_increments_existing_line() {
        let now = Utc::now();
        let mut cart = Cart::new();
        cart.add(product("1", 2.5), 2, now);
        cart.add(product("1", 2.5), 3, now);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get("1").unwrap().quantity, 5);
    }

    #[test]
    fn test_insertion_order_survives_removal() {
        let now = Utc::now();
        let mut cart = Cart::new();
        cart.add(product("a", 1.0), 1, now);
        cart.add(product("b", 1.0), 1, now);
        cart.add(product("c", 1.0), 1, now);
        cart.remove("b", now);

        let ids: Vec<_> = cart.items().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_totals() {
        let now = Utc::now();
        let mut cart = Cart::new();
        cart.add(product("a", 2.0), 3, now);
        cart.add(product("b", 0.5), 2, now);

        assert_eq!(cart.total_quantity(), 5);
        assert!((cart.subtotal() - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_staleness() {
        let start = Utc::now();
        let mut cart = Cart::new();
        assert!(!cart.is_stale(start + Duration::days(30), Duration::hours(24)));

        cart.add(product("a", 1.0), 1, start);
        assert!(!cart.is_stale(start + Duration::hours(24), Duration::hours(24)));
        assert!(cart.is_stale(
            start + Duration::hours(24) + Duration::seconds(1),
            Duration::hours(24)
        ));
    }

    #[test]
    fn test_set_quantity_reports_change() {
        let now = Utc::now();
        let mut cart = Cart::new();
        cart.add(product("a", 1.0), 2, now);

        assert!(!cart.set_quantity("a", 2, now));
        assert!(cart.set_quantity("a", 0, now));
        assert_eq!(cart.get("a").unwrap().quantity, 1);
        assert!(!cart.set_quantity("missing", 4, now));
    }

    #[test]
    fn test_cart_item_wire_format() {
        let json = r#"{"id":1,"productId":1,"name":"Mug","unitPrice":9.5,"quantity":2,"addedAt":1700000000000}"#;
        let item: CartItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, "1");
        assert_eq!(item.quantity, 2);
        assert!(item.image_ref.is_none());

        let out = serde_json::to_value(&item).unwrap();
        assert_eq!(out["productId"], "1");
        assert!(out.get("imageRef").is_none());
    }
}
