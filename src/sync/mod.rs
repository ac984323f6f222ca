//! Entity status synchronizer.
//!
//! After a status mutation succeeds, the server has moved the entity between
//! its work queues. The transition table below mirrors that movement in the
//! cache so dashboards stay consistent without a refetch.

mod transitions;

use std::fmt::Debug;
use tracing::{debug, warn};

use crate::cache::{Cacheable, NormalizedCache, PatchOutcome};
use crate::commerce::CommerceQueryKey;

pub use transitions::{
  COMPLETE_DELIVERY, COMPLETE_PACKAGING, FAIL_DELIVERY, START_DELIVERY, START_PACKAGING,
};

/// A cached list that transitions move entities in and out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListId {
  NewPackaging,
  InProgressPackaging,
  CompletedPackaging,
  NewDeliveries,
  InProgressDeliveries,
  Orders,
  Products,
}

impl ListId {
  pub fn query_key(self) -> CommerceQueryKey {
    match self {
      Self::NewPackaging => CommerceQueryKey::NewPackagingIds,
      Self::InProgressPackaging => CommerceQueryKey::InProgressPackagingIds,
      Self::CompletedPackaging => CommerceQueryKey::CompletedPackagingIds,
      Self::NewDeliveries => CommerceQueryKey::NewDeliveries,
      Self::InProgressDeliveries => CommerceQueryKey::InProgressDeliveries,
      Self::Orders => CommerceQueryKey::Orders,
      Self::Products => CommerceQueryKey::Products,
    }
  }

  /// Lists rendered from entity data. Adding a key whose entity is not
  /// cached would produce a row with nothing to show.
  pub fn holds_snapshots(self) -> bool {
    !matches!(
      self,
      Self::NewPackaging | Self::InProgressPackaging | Self::CompletedPackaging
    )
  }

  pub fn name(self) -> &'static str {
    match self {
      Self::NewPackaging => "new-packaging",
      Self::InProgressPackaging => "in-progress-packaging",
      Self::CompletedPackaging => "completed-packaging",
      Self::NewDeliveries => "new-deliveries",
      Self::InProgressDeliveries => "in-progress-deliveries",
      Self::Orders => "orders",
      Self::Products => "products",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEffect {
  RemoveFrom(ListId),
  AddTo(ListId),
}

impl ListEffect {
  pub fn list(self) -> ListId {
    match self {
      Self::RemoveFrom(list) | Self::AddTo(list) => list,
    }
  }
}

/// An entity whose status is changed by transitions.
pub trait StatusEntity: Cacheable {
  type Status: Copy + PartialEq + Debug + Send + Sync + 'static;

  fn set_status(&mut self, status: Self::Status);
}

/// One row of the transition table.
#[derive(Debug)]
pub struct Transition<S: 'static> {
  pub name: &'static str,
  pub to: S,
  pub effects: &'static [ListEffect],
}

/// What reconciliation did, for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
  pub entity: PatchOutcome,
  pub lists: Vec<(ListEffect, PatchOutcome)>,
}

impl ReconcileReport {
  pub fn outcome_for(&self, effect: ListEffect) -> Option<PatchOutcome> {
    self
      .lists
      .iter()
      .find(|(e, _)| *e == effect)
      .map(|(_, outcome)| *outcome)
  }
}

/// Mirror a successful transition of `key` in the cache.
///
/// Best-effort and infallible: missing entries are skipped, malformed ones
/// are logged and skipped. Running it twice leaves the same state as once.
pub fn reconcile<E: StatusEntity>(
  cache: &NormalizedCache,
  transition: &Transition<E::Status>,
  key: &str,
) -> ReconcileReport {
  let to = transition.to;
  let entity = cache.patch_entity::<E, _>(key, |e| e.set_status(to));
  log_outcome(transition.name, E::entity_type(), key, entity);

  let entity_cached = cache.contains::<E>(key);
  let lists = transition
    .effects
    .iter()
    .map(|effect| {
      let outcome = apply_effect(cache, *effect, key, entity_cached);
      log_outcome(transition.name, effect.list().name(), key, outcome);
      (*effect, outcome)
    })
    .collect();

  ReconcileReport { entity, lists }
}

/// Register a newly created entity: store it and prepend it to `list` if
/// that list is cached.
pub fn record_created<T: Cacheable>(
  cache: &NormalizedCache,
  list: ListId,
  entity: &T,
) -> ReconcileReport {
  let key = entity.cache_key();

  if let Err(e) = cache.put_entity(entity) {
    warn!(list = list.name(), key, error = %e, "Could not cache created entity");
    return ReconcileReport {
      entity: PatchOutcome::Malformed,
      lists: Vec::new(),
    };
  }

  let effect = ListEffect::AddTo(list);
  let outcome = apply_effect(cache, effect, &key, true);
  log_outcome("create", list.name(), &key, outcome);

  ReconcileReport {
    entity: PatchOutcome::Applied,
    lists: vec![(effect, outcome)],
  }
}

fn apply_effect(
  cache: &NormalizedCache,
  effect: ListEffect,
  key: &str,
  entity_cached: bool,
) -> PatchOutcome {
  match effect {
    ListEffect::RemoveFrom(list) => {
      cache.patch_list(&list.query_key(), |keys| keys.retain(|k| k != key))
    }
    ListEffect::AddTo(list) => {
      if list.holds_snapshots() && !entity_cached {
        // Distinguish "list not cached" from "entity not cached" in logs.
        if cache.read_list_keys(&list.query_key()).is_some() {
          debug!(list = list.name(), key, "Entity not cached, leaving list as is");
        }
        return PatchOutcome::Missing;
      }
      cache.patch_list(&list.query_key(), |keys| {
        if !keys.iter().any(|k| k == key) {
          keys.insert(0, key.to_string());
        }
      })
    }
  }
}

fn log_outcome(transition: &str, entry: &str, key: &str, outcome: PatchOutcome) {
  match outcome {
    PatchOutcome::Applied => debug!(transition, entry, key, "Reconciled"),
    PatchOutcome::Unchanged => debug!(transition, entry, key, "Already reconciled"),
    PatchOutcome::Missing => debug!(transition, entry, key, "Not cached, skipped"),
    PatchOutcome::Malformed => warn!(transition, entry, key, "Cached entry malformed, skipped"),
  }
}
