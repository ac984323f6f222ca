use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

use crate::gateway::CredentialSource;
use crate::store::KeyValueStore;

const TOKENS_KEY: &str = "auth_tokens";
const USER_KEY: &str = "auth_user";
const OAUTH_STATE_KEY: &str = "oauth_state";

/// Tokens issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
  pub access_token: String,
  pub id_token: String,
  #[serde(default)]
  pub refresh_token: Option<String>,
  #[serde(default)]
  pub expires_in: u64,
  #[serde(default)]
  pub token_type: String,
}

/// Profile decoded from the ID token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub sub: String,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default)]
  pub username: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub groups: Vec<String>,
}

impl User {
  /// Name shown in the header.
  pub fn display_name(&self) -> &str {
    self
      .name
      .as_deref()
      .or(self.username.as_deref())
      .or(self.email.as_deref())
      .unwrap_or(&self.sub)
  }
}

#[derive(Default)]
struct SessionState {
  tokens: Option<AuthTokens>,
  user: Option<User>,
}

/// The signed-in session, persisted in the local store.
///
/// State is mirrored in memory so the credential can be read on every request
/// without touching storage.
pub struct Session {
  store: Arc<dyn KeyValueStore>,
  state: RwLock<SessionState>,
}

impl Session {
  /// Restore the session saved by a previous run.
  ///
  /// Unreadable blobs are dropped with a warning; the user signs in again.
  pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self> {
    let tokens = read_json::<AuthTokens>(store.as_ref(), TOKENS_KEY)?;
    let user = read_json::<User>(store.as_ref(), USER_KEY)?;

    Ok(Self {
      store,
      state: RwLock::new(SessionState { tokens, user }),
    })
  }

  pub fn is_authenticated(&self) -> bool {
    let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
    state.tokens.is_some() && state.user.is_some()
  }

  pub fn user(&self) -> Option<User> {
    self
      .state
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .user
      .clone()
  }

  pub fn tokens(&self) -> Option<AuthTokens> {
    self
      .state
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .tokens
      .clone()
  }

  /// Persist a fresh sign-in.
  pub fn sign_in(&self, tokens: AuthTokens, user: User) -> Result<()> {
    write_json(self.store.as_ref(), TOKENS_KEY, &tokens)?;
    write_json(self.store.as_ref(), USER_KEY, &user)?;

    let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
    state.tokens = Some(tokens);
    state.user = Some(user);
    Ok(())
  }

  /// Drop tokens and profile.
  pub fn clear(&self) -> Result<()> {
    {
      let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
      state.tokens = None;
      state.user = None;
    }
    self.store.remove(TOKENS_KEY)?;
    self.store.remove(USER_KEY)?;
    Ok(())
  }

  /// Remember the state parameter of a pending authorization request.
  pub fn save_oauth_state(&self, value: &str) -> Result<()> {
    self.store.set(OAUTH_STATE_KEY, value)
  }

  /// Take the pending state parameter. It is valid for one callback only.
  pub fn take_oauth_state(&self) -> Result<Option<String>> {
    let value = self.store.get(OAUTH_STATE_KEY)?;
    if value.is_some() {
      self.store.remove(OAUTH_STATE_KEY)?;
    }
    Ok(value)
  }
}

impl CredentialSource for Session {
  fn credential(&self) -> Option<String> {
    self
      .state
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .tokens
      .as_ref()
      .map(|t| t.access_token.clone())
  }
}

fn read_json<T: serde::de::DeserializeOwned>(
  store: &dyn KeyValueStore,
  key: &str,
) -> Result<Option<T>> {
  let Some(raw) = store.get(key)? else {
    return Ok(None);
  };

  match serde_json::from_str(&raw) {
    Ok(value) => Ok(Some(value)),
    Err(e) => {
      warn!(key, error = %e, "Discarding unreadable session data");
      store.remove(key)?;
      Ok(None)
    }
  }
}

fn write_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
  let raw = serde_json::to_string(value).map_err(|e| eyre!("Failed to encode {}: {}", key, e))?;
  store.set(key, &raw)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::SqliteStore;

  fn tokens() -> AuthTokens {
    AuthTokens {
      access_token: "access".into(),
      id_token: "id".into(),
      refresh_token: Some("refresh".into()),
      expires_in: 3600,
      token_type: "Bearer".into(),
    }
  }

  fn user() -> User {
    User {
      sub: "u-1".into(),
      email: Some("kim@example.com".into()),
      username: Some("kim".into()),
      name: None,
      groups: vec!["warehouse".into()],
    }
  }

  #[test]
  fn test_sign_in_persists_across_loads() {
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
    let session = Session::load(store.clone()).unwrap();
    assert!(!session.is_authenticated());
    assert_eq!(session.credential(), None);

    session.sign_in(tokens(), user()).unwrap();
    assert_eq!(session.credential().as_deref(), Some("access"));

    let restored = Session::load(store.clone()).unwrap();
    assert!(restored.is_authenticated());
    assert_eq!(restored.user().unwrap().display_name(), "kim");
    assert!(store.get("auth_tokens").unwrap().unwrap().contains("accessToken"));
  }

  #[test]
  fn test_clear_removes_both_keys() {
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
    let session = Session::load(store.clone()).unwrap();
    session.sign_in(tokens(), user()).unwrap();

    session.clear().unwrap();
    assert!(!session.is_authenticated());
    assert_eq!(store.get("auth_tokens").unwrap(), None);
    assert_eq!(store.get("auth_user").unwrap(), None);
  }

  #[test]
  fn test_oauth_state_is_single_use() {
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
    let session = Session::load(store).unwrap();

    session.save_oauth_state("abc").unwrap();
    assert_eq!(session.take_oauth_state().unwrap().as_deref(), Some("abc"));
    assert_eq!(session.take_oauth_state().unwrap(), None);
  }

  #[test]
  fn test_corrupt_blob_is_discarded() {
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
    store.set("auth_tokens", "{not json").unwrap();

    let session = Session::load(store.clone()).unwrap();
    assert_eq!(session.tokens(), None);
    assert_eq!(store.get("auth_tokens").unwrap(), None);
  }
}
