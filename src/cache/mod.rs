//! Normalized response cache.
//!
//! This module provides a storefront-agnostic cache that:
//! - Stores each entity once under its type and key
//! - Keeps list results as ordered keys plus a continuation token
//! - Merges paginated fetches (replace on first page, append on later pages)
//! - Publishes a generation counter so views re-read after any change

mod normalized;
mod traits;

pub use normalized::{CacheError, CacheSnapshot, NormalizedCache};
pub use traits::{hash_key, Cacheable, Page, PatchOutcome, QueryKey};
