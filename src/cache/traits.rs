//! Core traits and types for the caching system.

use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

/// Trait for entities that can be cached.
///
/// Each entity is stored once under `(entity_type, cache_key)`; every list
/// that references it sees the same copy.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Unique identifier for this entity (e.g., order id, product id)
  fn cache_key(&self) -> String;

  /// Entity type name for storage organization (e.g., "delivery", "product")
  fn entity_type() -> &'static str;
}

/// Identity of a cached query result.
pub trait QueryKey {
  /// Stable, fixed-length key for the result.
  fn cache_hash(&self) -> String;

  /// Human-readable form for logs.
  fn description(&self) -> String;
}

/// SHA256 hex of a normalized query description.
pub fn hash_key(input: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(input.as_bytes());
  hex::encode(hasher.finalize())
}

/// One page of a paginated list plus the token for the next page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub next_token: Option<String>,
}

impl<T> Page<T> {
  pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
    Self { items, next_token }
  }

  pub fn has_more(&self) -> bool {
    self.next_token.is_some()
  }
}

impl<T> Default for Page<T> {
  fn default() -> Self {
    Self {
      items: Vec::new(),
      next_token: None,
    }
  }
}

/// Result of patching a cached entity or list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
  /// The value changed.
  Applied,
  /// The updater ran but produced an identical value.
  Unchanged,
  /// Nothing is cached under the key. Patches never create entries.
  Missing,
  /// Something is cached but it does not have the expected shape.
  Malformed,
}

impl PatchOutcome {
  pub fn is_missing(self) -> bool {
    self == PatchOutcome::Missing
  }
}
