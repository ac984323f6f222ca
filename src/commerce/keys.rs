//! Caching implementations for storefront types.

use crate::cache::{hash_key, Cacheable, QueryKey};

use super::types::{Delivery, Order, PackagingRequest, Product};

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Product {
  fn cache_key(&self) -> String {
    self.product_id.clone()
  }

  fn entity_type() -> &'static str {
    "product"
  }
}

impl Cacheable for Order {
  fn cache_key(&self) -> String {
    self.order_id.clone()
  }

  fn entity_type() -> &'static str {
    "order"
  }
}

impl Cacheable for Delivery {
  fn cache_key(&self) -> String {
    self.order_id.clone()
  }

  fn entity_type() -> &'static str {
    "delivery"
  }
}

impl Cacheable for PackagingRequest {
  fn cache_key(&self) -> String {
    self.order_id.clone()
  }

  fn entity_type() -> &'static str {
    "packaging_request"
  }
}

// ============================================================================
// Query key types
// ============================================================================

/// Query key types for storefront operations.
///
/// Paginated lists are identified without their continuation token, so every
/// page of a list lands in the same cached result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommerceQueryKey {
  Products,
  Product { product_id: String },
  Orders,
  Order { order_id: String },
  NewDeliveries,
  InProgressDeliveries,
  Delivery { order_id: String },
  NewPackagingIds,
  InProgressPackagingIds,
  CompletedPackagingIds,
  PackagingRequest { order_id: String },
}

impl QueryKey for CommerceQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::Products => "products".to_string(),
      Self::Product { product_id } => format!("product:{}", product_id),
      Self::Orders => "orders".to_string(),
      Self::Order { order_id } => format!("order:{}", order_id),
      Self::NewDeliveries => "deliveries:new".to_string(),
      Self::InProgressDeliveries => "deliveries:in_progress".to_string(),
      Self::Delivery { order_id } => format!("delivery:{}", order_id),
      Self::NewPackagingIds => "packaging_ids:new".to_string(),
      Self::InProgressPackagingIds => "packaging_ids:in_progress".to_string(),
      Self::CompletedPackagingIds => "packaging_ids:completed".to_string(),
      Self::PackagingRequest { order_id } => format!("packaging_request:{}", order_id),
    };

    hash_key(&input)
  }

  fn description(&self) -> String {
    match self {
      Self::Products => "products".to_string(),
      Self::Product { product_id } => format!("product {}", product_id),
      Self::Orders => "orders".to_string(),
      Self::Order { order_id } => format!("order {}", order_id),
      Self::NewDeliveries => "new deliveries".to_string(),
      Self::InProgressDeliveries => "in-progress deliveries".to_string(),
      Self::Delivery { order_id } => format!("delivery {}", order_id),
      Self::NewPackagingIds => "new packaging requests".to_string(),
      Self::InProgressPackagingIds => "in-progress packaging requests".to_string(),
      Self::CompletedPackagingIds => "completed packaging requests".to_string(),
      Self::PackagingRequest { order_id } => format!("packaging request {}", order_id),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_hashes_are_distinct_and_stable() {
    let a = CommerceQueryKey::Delivery {
      order_id: "o1".into(),
    };
    let b = CommerceQueryKey::PackagingRequest {
      order_id: "o1".into(),
    };
    assert_ne!(a.cache_hash(), b.cache_hash());
    assert_eq!(a.cache_hash(), a.clone().cache_hash());
    assert_eq!(a.cache_hash().len(), 64);
  }
}
