//! In-memory normalized response cache.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::traits::{Cacheable, Page, PatchOutcome, QueryKey};

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("Failed to serialize {entity_type} {key}: {message}")]
  Serialize {
    entity_type: &'static str,
    key: String,
    message: String,
  },
}

/// Address of a stored entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntityRef {
  pub entity_type: &'static str,
  pub key: String,
}

impl EntityRef {
  pub fn of<T: Cacheable>(key: &str) -> Self {
    Self {
      entity_type: T::entity_type(),
      key: key.to_string(),
    }
  }
}

/// An ordered list of entity keys plus its continuation token.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedList {
  pub entity_type: &'static str,
  pub keys: Vec<String>,
  pub next_token: Option<String>,
  pub fetched_at: DateTime<Utc>,
}

/// What a query key resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedResult {
  Entity(EntityRef),
  List(CachedList),
}

/// A comparable copy of the whole cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
  pub entities: BTreeMap<EntityRef, Value>,
  pub results: BTreeMap<String, CachedResult>,
}

#[derive(Default)]
struct CacheState {
  entities: BTreeMap<EntityRef, Value>,
  results: BTreeMap<String, CachedResult>,
  generation: u64,
}

/// Shared cache handle. Clones see the same state.
///
/// All reads and writes take one lock, so a patch is never observed half
/// applied. Every effective change bumps a generation counter which is
/// published to subscribers.
#[derive(Clone)]
pub struct NormalizedCache {
  state: Arc<Mutex<CacheState>>,
  notify: Arc<watch::Sender<u64>>,
}

impl Default for NormalizedCache {
  fn default() -> Self {
    Self::new()
  }
}

impl NormalizedCache {
  pub fn new() -> Self {
    let (notify, _) = watch::channel(0);
    Self {
      state: Arc::new(Mutex::new(CacheState::default())),
      notify: Arc::new(notify),
    }
  }

  fn lock(&self) -> MutexGuard<'_, CacheState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn bump(&self, state: &mut CacheState) {
    state.generation += 1;
    self.notify.send_replace(state.generation);
  }

  /// Current generation. Increases on every effective change.
  pub fn generation(&self) -> u64 {
    self.lock().generation
  }

  /// Receiver that is marked changed on every effective write.
  pub fn subscribe(&self) -> watch::Receiver<u64> {
    self.notify.subscribe()
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  /// Read the entity a detail query resolved to.
  pub fn read_entity<T: Cacheable>(&self, query: &impl QueryKey) -> Option<T> {
    let state = self.lock();
    match state.results.get(&query.cache_hash())? {
      CachedResult::Entity(entity_ref) => decode_entity(&state, entity_ref),
      CachedResult::List(_) => None,
    }
  }

  /// Read an entity directly by its key.
  pub fn read_entity_by_key<T: Cacheable>(&self, key: &str) -> Option<T> {
    let state = self.lock();
    decode_entity(&state, &EntityRef::of::<T>(key))
  }

  /// Whether an entity of type `T` is stored under `key`.
  pub fn contains<T: Cacheable>(&self, key: &str) -> bool {
    self.lock().entities.contains_key(&EntityRef::of::<T>(key))
  }

  /// Resolve a list result into entities.
  ///
  /// Keys with no stored entity are skipped.
  pub fn read_list<T: Cacheable>(&self, query: &impl QueryKey) -> Option<Page<T>> {
    let state = self.lock();
    let list = match state.results.get(&query.cache_hash())? {
      CachedResult::List(list) => list,
      CachedResult::Entity(_) => return None,
    };

    let items = list
      .keys
      .iter()
      .filter_map(|key| {
        decode_entity(
          &state,
          &EntityRef {
            entity_type: list.entity_type,
            key: key.clone(),
          },
        )
      })
      .collect();

    Some(Page::new(items, list.next_token.clone()))
  }

  /// Read the raw keys of a list result.
  pub fn read_list_keys(&self, query: &impl QueryKey) -> Option<Page<String>> {
    match self.lock().results.get(&query.cache_hash())? {
      CachedResult::List(list) => Some(Page::new(list.keys.clone(), list.next_token.clone())),
      CachedResult::Entity(_) => None,
    }
  }

  /// When a list result was last written by a fetch.
  pub fn list_fetched_at(&self, query: &impl QueryKey) -> Option<DateTime<Utc>> {
    match self.lock().results.get(&query.cache_hash())? {
      CachedResult::List(list) => Some(list.fetched_at),
      CachedResult::Entity(_) => None,
    }
  }

  // ==========================================================================
  // Writes
  // ==========================================================================

  /// Store an entity without binding it to a query.
  pub fn put_entity<T: Cacheable>(&self, entity: &T) -> Result<(), CacheError> {
    let value = encode(entity)?;
    let mut state = self.lock();
    if merge_into(&mut state, EntityRef::of::<T>(&entity.cache_key()), value) {
      self.bump(&mut state);
    }
    Ok(())
  }

  /// Store an entity and bind the detail query to it.
  pub fn write_entity<T: Cacheable>(
    &self,
    query: &impl QueryKey,
    entity: &T,
  ) -> Result<(), CacheError> {
    let value = encode(entity)?;
    let entity_ref = EntityRef::of::<T>(&entity.cache_key());

    let mut state = self.lock();
    let mut changed = merge_into(&mut state, entity_ref.clone(), value);

    let result = CachedResult::Entity(entity_ref);
    let hash = query.cache_hash();
    if state.results.get(&hash) != Some(&result) {
      state.results.insert(hash, result);
      changed = true;
    }

    if changed {
      debug!(query = %query.description(), "Cached entity");
      self.bump(&mut state);
    }
    Ok(())
  }

  /// Store one fetched page of entities into a list result.
  ///
  /// `request_token` is the continuation token the page was requested with.
  /// Without one the list is replaced; with one the page is appended.
  pub fn write_page<T: Cacheable>(
    &self,
    query: &impl QueryKey,
    page: &Page<T>,
    request_token: Option<&str>,
  ) -> Result<(), CacheError> {
    let encoded = page
      .items
      .iter()
      .map(|item| Ok((item.cache_key(), encode(item)?)))
      .collect::<Result<Vec<_>, CacheError>>()?;

    let mut state = self.lock();
    let mut keys = Vec::with_capacity(encoded.len());
    for (key, value) in encoded {
      merge_into(&mut state, EntityRef::of::<T>(&key), value);
      keys.push(key);
    }

    merge_list(
      &mut state,
      query,
      T::entity_type(),
      keys,
      page.next_token.clone(),
      request_token,
    );
    self.bump(&mut state);
    Ok(())
  }

  /// Store one fetched page of bare keys into a list result.
  pub fn write_key_page(
    &self,
    query: &impl QueryKey,
    entity_type: &'static str,
    keys: Vec<String>,
    next_token: Option<String>,
    request_token: Option<&str>,
  ) {
    let mut state = self.lock();
    merge_list(&mut state, query, entity_type, keys, next_token, request_token);
    self.bump(&mut state);
  }

  // ==========================================================================
  // Patches
  // ==========================================================================

  /// Apply `updater` to a stored entity in place.
  pub fn patch_entity<T, F>(&self, key: &str, updater: F) -> PatchOutcome
  where
    T: Cacheable,
    F: FnOnce(&mut T),
  {
    let entity_ref = EntityRef::of::<T>(key);
    let mut state = self.lock();

    let Some(current) = state.entities.get(&entity_ref) else {
      return PatchOutcome::Missing;
    };

    let mut entity: T = match serde_json::from_value(current.clone()) {
      Ok(entity) => entity,
      Err(e) => {
        warn!(entity_type = entity_ref.entity_type, key, error = %e, "Cached entity is malformed");
        return PatchOutcome::Malformed;
      }
    };

    updater(&mut entity);

    let updated = match serde_json::to_value(&entity) {
      Ok(value) => value,
      Err(e) => {
        warn!(entity_type = entity_ref.entity_type, key, error = %e, "Patched entity does not serialize");
        return PatchOutcome::Malformed;
      }
    };

    if &updated == current {
      return PatchOutcome::Unchanged;
    }

    state.entities.insert(entity_ref, updated);
    self.bump(&mut state);
    PatchOutcome::Applied
  }

  /// Apply `updater` to the keys of a list result in place.
  pub fn patch_list<F>(&self, query: &impl QueryKey, updater: F) -> PatchOutcome
  where
    F: FnOnce(&mut Vec<String>),
  {
    let mut state = self.lock();

    let list = match state.results.get_mut(&query.cache_hash()) {
      None => return PatchOutcome::Missing,
      Some(CachedResult::Entity(_)) => return PatchOutcome::Malformed,
      Some(CachedResult::List(list)) => list,
    };

    let before = list.keys.clone();
    updater(&mut list.keys);
    if list.keys == before {
      return PatchOutcome::Unchanged;
    }

    self.bump(&mut state);
    PatchOutcome::Applied
  }

  /// Drop everything. Used on logout.
  pub fn clear(&self) {
    let mut state = self.lock();
    if state.entities.is_empty() && state.results.is_empty() {
      return;
    }
    state.entities.clear();
    state.results.clear();
    self.bump(&mut state);
  }

  pub fn snapshot(&self) -> CacheSnapshot {
    let state = self.lock();
    CacheSnapshot {
      entities: state.entities.clone(),
      results: state.results.clone(),
    }
  }
}

fn encode<T: Cacheable>(entity: &T) -> Result<Value, CacheError> {
  serde_json::to_value(entity).map_err(|e| CacheError::Serialize {
    entity_type: T::entity_type(),
    key: entity.cache_key(),
    message: e.to_string(),
  })
}

fn decode_entity<T: Cacheable>(state: &CacheState, entity_ref: &EntityRef) -> Option<T> {
  let value = state.entities.get(entity_ref)?;
  serde_json::from_value(value.clone())
    .inspect_err(|e| {
      warn!(entity_type = entity_ref.entity_type, key = %entity_ref.key, error = %e, "Skipping undecodable cached entity")
    })
    .ok()
}

/// Field-merge `incoming` into the stored entity. Incoming fields overwrite,
/// an explicit null included; fields absent from `incoming` are kept.
///
/// Returns whether the stored value changed.
fn merge_into(state: &mut CacheState, entity_ref: EntityRef, incoming: Value) -> bool {
  let Some(existing) = state.entities.get_mut(&entity_ref) else {
    state.entities.insert(entity_ref, incoming);
    return true;
  };

  match (existing, incoming) {
    (Value::Object(existing), Value::Object(incoming)) => {
      let mut changed = false;
      for (field, value) in incoming {
        if existing.get(&field) != Some(&value) {
          existing.insert(field, value);
          changed = true;
        }
      }
      changed
    }
    (existing, incoming) => {
      if *existing == incoming {
        false
      } else {
        *existing = incoming;
        true
      }
    }
  }
}

/// Merge policy shared by every paginated list.
fn merge_list(
  state: &mut CacheState,
  query: &impl QueryKey,
  entity_type: &'static str,
  incoming: Vec<String>,
  next_token: Option<String>,
  request_token: Option<&str>,
) {
  let hash = query.cache_hash();
  let fetched_at = Utc::now();

  let merged = match (request_token, state.results.remove(&hash)) {
    (Some(_), Some(CachedResult::List(mut existing))) => {
      for key in incoming {
        if !existing.keys.contains(&key) {
          existing.keys.push(key);
        }
      }
      existing.next_token = next_token;
      existing.fetched_at = fetched_at;
      existing
    }
    _ => CachedList {
      entity_type,
      keys: incoming,
      next_token,
      fetched_at,
    },
  };

  debug!(
    query = %query.description(),
    keys = merged.keys.len(),
    appended = request_token.is_some(),
    "Cached list page"
  );
  state.results.insert(hash, CachedResult::List(merged));
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::traits::hash_key;
  use serde::{Deserialize, Serialize};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Item {
    id: String,
    status: String,
    #[serde(default)]
    note: Option<String>,
    /// Only some fetches select it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stock: Option<i64>,
  }

  impl Cacheable for Item {
    fn cache_key(&self) -> String {
      self.id.clone()
    }

    fn entity_type() -> &'static str {
      "item"
    }
  }

  struct Key(&'static str);

  impl QueryKey for Key {
    fn cache_hash(&self) -> String {
      hash_key(self.0)
    }

    fn description(&self) -> String {
      self.0.to_string()
    }
  }

  fn item(id: &str, status: &str) -> Item {
    Item {
      id: id.into(),
      status: status.into(),
      note: None,
      stock: None,
    }
  }

  fn ids(page: &Page<Item>) -> Vec<&str> {
    page.items.iter().map(|i| i.id.as_str()).collect()
  }

  #[test]
  fn test_first_page_replaces_and_next_page_appends() {
    let cache = NormalizedCache::new();
    let list = Key("list");

    cache
      .write_page(&list, &Page::new(vec![item("a", "NEW"), item("b", "NEW")], Some("t1".into())), None)
      .unwrap();
    cache
      .write_page(&list, &Page::new(vec![item("c", "NEW")], None), Some("t1"))
      .unwrap();

    let page = cache.read_list::<Item>(&list).unwrap();
    assert_eq!(ids(&page), vec!["a", "b", "c"]);
    assert_eq!(page.next_token, None);

    // A fetch without a request token starts over.
    cache
      .write_page(&list, &Page::new(vec![item("d", "NEW")], Some("t9".into())), None)
      .unwrap();
    let page = cache.read_list::<Item>(&list).unwrap();
    assert_eq!(ids(&page), vec!["d"]);
    assert_eq!(page.next_token.as_deref(), Some("t9"));
  }

  #[test]
  fn test_append_skips_keys_already_present() {
    let cache = NormalizedCache::new();
    let list = Key("list");

    cache.write_key_page(&list, "item", vec!["a".into(), "b".into()], Some("t1".into()), None);
    cache.write_key_page(&list, "item", vec!["b".into(), "c".into()], None, Some("t1"));

    let keys = cache.read_list_keys(&list).unwrap();
    assert_eq!(keys.items, vec!["a", "b", "c"]);
  }

  #[test]
  fn test_append_to_missing_list_stores_incoming() {
    let cache = NormalizedCache::new();
    let list = Key("list");
    cache.write_key_page(&list, "item", vec!["x".into()], Some("t2".into()), Some("t1"));

    let keys = cache.read_list_keys(&list).unwrap();
    assert_eq!(keys.items, vec!["x"]);
    assert_eq!(keys.next_token.as_deref(), Some("t2"));
  }

  #[test]
  fn test_entity_is_shared_across_lists() {
    let cache = NormalizedCache::new();
    let first = Key("first");
    let second = Key("second");

    cache.write_page(&first, &Page::new(vec![item("a", "NEW")], None), None).unwrap();
    cache.write_page(&second, &Page::new(vec![item("a", "NEW")], None), None).unwrap();

    let outcome = cache.patch_entity::<Item, _>("a", |i| i.status = "DONE".into());
    assert_eq!(outcome, PatchOutcome::Applied);

    assert_eq!(cache.read_list::<Item>(&first).unwrap().items[0].status, "DONE");
    assert_eq!(cache.read_list::<Item>(&second).unwrap().items[0].status, "DONE");
  }

  #[test]
  fn test_write_merges_fields() {
    let cache = NormalizedCache::new();
    let detail = Key("detail");

    let mut full = item("a", "NEW");
    full.stock = Some(3);
    cache.write_entity(&detail, &full).unwrap();

    // A later fetch that does not select the stock keeps it.
    cache.put_entity(&item("a", "IN_PROGRESS")).unwrap();

    let stored = cache.read_entity::<Item>(&detail).unwrap();
    assert_eq!(stored.status, "IN_PROGRESS");
    assert_eq!(stored.stock, Some(3));
  }

  #[test]
  fn test_explicit_null_clears_field() {
    let cache = NormalizedCache::new();
    let detail = Key("detail");

    let mut full = item("a", "NEW");
    full.note = Some("fragile".into());
    cache.write_entity(&detail, &full).unwrap();
    let generation = cache.generation();

    // The server dropped the note; the fresh fetch says so with a null.
    cache.write_entity(&detail, &item("a", "NEW")).unwrap();

    assert_eq!(cache.read_entity::<Item>(&detail).unwrap().note, None);
    assert!(cache.generation() > generation);
  }

  #[test]
  fn test_patches_never_create_entries() {
    let cache = NormalizedCache::new();
    let before = cache.snapshot();

    assert_eq!(
      cache.patch_entity::<Item, _>("ghost", |i| i.status = "DONE".into()),
      PatchOutcome::Missing
    );
    assert_eq!(
      cache.patch_list(&Key("nowhere"), |keys| keys.push("ghost".into())),
      PatchOutcome::Missing
    );

    assert_eq!(cache.snapshot(), before);
    assert_eq!(cache.generation(), 0);
  }

  #[test]
  fn test_patch_list_on_entity_result_is_malformed() {
    let cache = NormalizedCache::new();
    let detail = Key("detail");
    cache.write_entity(&detail, &item("a", "NEW")).unwrap();

    assert_eq!(
      cache.patch_list(&detail, |keys| keys.clear()),
      PatchOutcome::Malformed
    );
  }

  #[test]
  fn test_noop_patch_does_not_bump_generation() {
    let cache = NormalizedCache::new();
    cache.put_entity(&item("a", "NEW")).unwrap();
    let generation = cache.generation();

    let outcome = cache.patch_entity::<Item, _>("a", |i| i.status = "NEW".into());
    assert_eq!(outcome, PatchOutcome::Unchanged);
    assert_eq!(cache.generation(), generation);

    cache.put_entity(&item("a", "NEW")).unwrap();
    assert_eq!(cache.generation(), generation);
  }

  #[test]
  fn test_subscribers_see_changes() {
    let cache = NormalizedCache::new();
    let mut rx = cache.subscribe();
    assert!(!rx.has_changed().unwrap());

    cache.put_entity(&item("a", "NEW")).unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), cache.generation());
  }

  #[test]
  fn test_list_skips_keys_without_entities() {
    let cache = NormalizedCache::new();
    let list = Key("list");
    cache.put_entity(&item("a", "NEW")).unwrap();
    cache.write_key_page(&list, "item", vec!["a".into(), "gone".into()], None, None);

    let page = cache.read_list::<Item>(&list).unwrap();
    assert_eq!(ids(&page), vec!["a"]);
  }

  #[test]
  fn test_clear_drops_everything() {
    let cache = NormalizedCache::new();
    let list = Key("list");
    cache.write_page(&list, &Page::new(vec![item("a", "NEW")], None), None).unwrap();

    cache.clear();
    assert!(cache.read_list::<Item>(&list).is_none());
    assert!(!cache.contains::<Item>("a"));
  }
}
