//! Shopping cart, kept locally and persisted between runs.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

use crate::commerce::types::{CheckoutLine, Product};
use crate::store::KeyValueStore;

const CART_KEY: &str = "cart-storage";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
  pub product: Product,
  pub quantity: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CartState {
  items: Vec<CartItem>,
}

/// Shared cart handle. Clones see the same items.
#[derive(Clone)]
pub struct Cart {
  store: Arc<dyn KeyValueStore>,
  state: Arc<Mutex<CartState>>,
}

impl Cart {
  /// Load the saved cart; an unreadable one starts empty.
  pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self> {
    let state = match store.get(CART_KEY)? {
      Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "Discarding unreadable cart");
        CartState::default()
      }),
      None => CartState::default(),
    };

    Ok(Self {
      store,
      state: Arc::new(Mutex::new(state)),
    })
  }

  pub fn items(&self) -> Vec<CartItem> {
    self.lock().items.clone()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().items.is_empty()
  }

  /// Add `quantity` of a product, merging with an existing line.
  pub fn add(&self, product: Product, quantity: i64) -> Result<()> {
    if quantity <= 0 {
      return Ok(());
    }
    self.update(|state| {
      match state
        .items
        .iter_mut()
        .find(|item| item.product.product_id == product.product_id)
      {
        Some(item) => item.quantity += quantity,
        None => state.items.push(CartItem { product, quantity }),
      }
    })
  }

  pub fn remove(&self, product_id: &str) -> Result<()> {
    self.update(|state| state.items.retain(|item| item.product.product_id != product_id))
  }

  /// Set a line's quantity; zero or less removes it.
  pub fn update_quantity(&self, product_id: &str, quantity: i64) -> Result<()> {
    self.update(|state| {
      if quantity <= 0 {
        state.items.retain(|item| item.product.product_id != product_id);
      } else if let Some(item) = state
        .items
        .iter_mut()
        .find(|item| item.product.product_id == product_id)
      {
        item.quantity = quantity;
      }
    })
  }

  pub fn clear(&self) -> Result<()> {
    self.update(|state| state.items.clear())
  }

  pub fn total_price(&self) -> i64 {
    self
      .lock()
      .items
      .iter()
      .map(|item| item.product.price * item.quantity)
      .sum()
  }

  pub fn total_items(&self) -> i64 {
    self.lock().items.iter().map(|item| item.quantity).sum()
  }

  /// Lines for pricing and order creation.
  pub fn lines(&self) -> Vec<CheckoutLine> {
    self
      .lock()
      .items
      .iter()
      .map(|item| CheckoutLine {
        product: item.product.clone(),
        quantity: item.quantity,
      })
      .collect()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, CartState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn update(&self, f: impl FnOnce(&mut CartState)) -> Result<()> {
    let mut state = self.lock();
    f(&mut state);
    let raw = serde_json::to_string(&*state).map_err(|e| eyre!("Failed to encode cart: {}", e))?;
    self.store.set(CART_KEY, &raw)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::SqliteStore;

  fn product(id: &str, price: i64) -> Product {
    Product {
      product_id: id.into(),
      name: format!("Product {}", id),
      price,
      category: None,
      pictures: Vec::new(),
      tags: Vec::new(),
      package: None,
      quantity: None,
    }
  }

  fn cart() -> (Cart, Arc<dyn KeyValueStore>) {
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
    (Cart::load(store.clone()).unwrap(), store)
  }

  #[test]
  fn test_add_merges_quantities() {
    let (cart, _) = cart();
    cart.add(product("p1", 10), 1).unwrap();
    cart.add(product("p2", 5), 3).unwrap();
    cart.add(product("p1", 10), 2).unwrap();

    let items = cart.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].quantity, 3);
    assert_eq!(cart.total_items(), 6);
    assert_eq!(cart.total_price(), 45);
  }

  #[test]
  fn test_update_quantity_to_zero_removes() {
    let (cart, _) = cart();
    cart.add(product("p1", 10), 2).unwrap();
    cart.update_quantity("p1", 5).unwrap();
    assert_eq!(cart.total_items(), 5);

    cart.update_quantity("p1", 0).unwrap();
    assert!(cart.is_empty());
  }

  #[test]
  fn test_cart_persists() {
    let (cart, store) = cart();
    cart.add(product("p1", 10), 2).unwrap();

    let restored = Cart::load(store.clone()).unwrap();
    assert_eq!(restored.items(), cart.items());

    restored.clear().unwrap();
    let empty = Cart::load(store).unwrap();
    assert!(empty.is_empty());
  }

  #[test]
  fn test_lines_and_remove() {
    let (cart, _) = cart();
    cart.add(product("p1", 10), 1).unwrap();
    cart.add(product("p2", 20), 2).unwrap();
    cart.remove("p1").unwrap();

    let lines = cart.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product.product_id, "p2");
    assert_eq!(lines[0].quantity, 2);
  }
}
