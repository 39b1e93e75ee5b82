//! Cart state and point-in-time snapshots.
//!
//! [`CartState`] is the mutable record owned by exactly one cart actor.
//! [`CartSnapshot`] is the immutable copy handed back to callers.
//!
//! Quantities are stored as [`NonZeroU32`], so a present key always carries a
//! positive quantity and a zero entry cannot be represented at all.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::id::ItemId;

/// Items in one session's cart, keyed by item identifier.
///
/// Prices and catalog metadata are deliberately absent; they belong to the
/// host rendering the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    items: BTreeMap<ItemId, NonZeroU32>,
}

impl CartState {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of `item`, inserting it at quantity 1 if absent.
    ///
    /// Always succeeds; the quantity saturates at `u32::MAX`.
    /// Returns the new quantity.
    pub fn add(&mut self, item: ItemId) -> NonZeroU32 {
        *self
            .items
            .entry(item)
            .and_modify(|quantity| *quantity = quantity.saturating_add(1))
            .or_insert(NonZeroU32::MIN)
    }

    /// Remove one unit of `item`, deleting the key when it reaches zero.
    ///
    /// Removing an item that is not in the cart is a no-op and returns `None`.
    /// Otherwise returns the remaining quantity (0 when the key was deleted).
    pub fn remove(&mut self, item: &ItemId) -> Option<u32> {
        let remaining = self.items.get(item)?.get() - 1;

        match NonZeroU32::new(remaining) {
            Some(quantity) => {
                self.items.insert(item.clone(), quantity);
            }
            None => {
                self.items.remove(item);
            }
        }

        Some(remaining)
    }

    /// Quantity of `item`, or 0 when absent.
    #[must_use]
    pub fn quantity(&self, item: &str) -> u32 {
        self.items.get(item).map_or(0, |quantity| quantity.get())
    }

    /// Whether the cart holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Take an immutable copy of the current items.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
        }
    }
}

/// Immutable point-in-time copy of a cart's items.
///
/// Ordered by item identifier and serialized as a plain JSON object:
///
/// ```rust
/// use session_cart_core::{CartState, ItemId};
///
/// let mut cart = CartState::new();
/// cart.add(ItemId::new("banana"));
/// cart.add(ItemId::new("apple"));
/// cart.add(ItemId::new("apple"));
///
/// let json = serde_json::to_string(&cart.snapshot()).unwrap();
/// assert_eq!(json, r#"{"apple":2,"banana":1}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSnapshot {
    items: BTreeMap<ItemId, NonZeroU32>,
}

impl CartSnapshot {
    /// An empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Quantity of `item`, or 0 when absent.
    #[must_use]
    pub fn quantity(&self, item: &str) -> u32 {
        self.items.get(item).map_or(0, |quantity| quantity.get())
    }

    /// Whether `item` is present.
    #[must_use]
    pub fn contains(&self, item: &str) -> bool {
        self.items.contains_key(item)
    }

    /// Iterate items in identifier order.
    pub fn items(&self) -> impl Iterator<Item = (&ItemId, u32)> {
        self.items.iter().map(|(item, quantity)| (item, quantity.get()))
    }

    /// Number of distinct items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the snapshot holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items
            .values()
            .map(|quantity| u64::from(quantity.get()))
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: &str) -> ItemId {
        ItemId::new(id)
    }

    #[test]
    fn test_add_inserts_then_increments() {
        let mut cart = CartState::new();
        assert_eq!(cart.add(item("apple")).get(), 1);
        assert_eq!(cart.add(item("apple")).get(), 2);
        assert_eq!(cart.quantity("apple"), 2);
    }

    #[test]
    fn test_add_saturates() {
        let mut cart = CartState::new();
        cart.items.insert(item("house"), NonZeroU32::MAX);
        assert_eq!(cart.add(item("house")), NonZeroU32::MAX);
    }

    #[test]
    fn test_remove_decrements_and_deletes_at_zero() {
        let mut cart = CartState::new();
        cart.add(item("apple"));
        cart.add(item("apple"));

        assert_eq!(cart.remove(&item("apple")), Some(1));
        assert_eq!(cart.quantity("apple"), 1);

        assert_eq!(cart.remove(&item("apple")), Some(0));
        assert!(!cart.snapshot().contains("apple"));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = CartState::new();
        cart.add(item("banana"));
        let before = cart.snapshot();

        assert_eq!(cart.remove(&item("car")), None);
        assert_eq!(cart.snapshot(), before);
    }

    #[test]
    fn test_add_then_remove_restores_quantity() {
        let mut cart = CartState::new();
        for quantity in 0..4 {
            let before = cart.quantity("binder");
            assert_eq!(before, quantity);

            cart.add(item("binder"));
            cart.remove(&item("binder"));
            assert_eq!(cart.quantity("binder"), before);

            cart.add(item("binder"));
        }
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut cart = CartState::new();
        cart.add(item("apple"));
        let snapshot = cart.snapshot();

        cart.add(item("apple"));
        cart.add(item("watermelon"));

        assert_eq!(snapshot.quantity("apple"), 1);
        assert!(!snapshot.contains("watermelon"));
    }

    #[test]
    fn test_snapshot_accessors() {
        let mut cart = CartState::new();
        cart.add(item("watermelon"));
        cart.add(item("apple"));
        cart.add(item("apple"));

        let snapshot = cart.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.total_quantity(), 3);

        let ordered: Vec<_> = snapshot.items().map(|(id, q)| (id.as_str(), q)).collect();
        assert_eq!(ordered, vec![("apple", 2), ("watermelon", 1)]);
    }

    #[test]
    fn test_snapshot_rejects_zero_quantities() {
        let result = serde_json::from_str::<CartSnapshot>(r#"{"apple":0}"#);
        assert!(result.is_err());

        let snapshot: CartSnapshot = serde_json::from_str(r#"{"apple":3}"#).unwrap();
        assert_eq!(snapshot.quantity("apple"), 3);
    }
}
