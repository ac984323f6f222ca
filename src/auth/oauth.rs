//! Hosted-UI authorization code flow.
//!
//! The browser does the interactive part; the terminal opens the authorize URL,
//! then the user pastes the redirect URL back so the code can be exchanged.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use color_eyre::{eyre::eyre, Result};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::session::{AuthTokens, Session, User};
use crate::config::IdentityConfig;

const STATE_LEN: usize = 32;

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
  #[serde(default)]
  id_token: Option<String>,
  #[serde(default)]
  refresh_token: Option<String>,
  #[serde(default)]
  expires_in: u64,
  #[serde(default)]
  token_type: String,
}

#[derive(Debug, Deserialize)]
struct IdClaims {
  sub: String,
  #[serde(default)]
  email: Option<String>,
  #[serde(default)]
  name: Option<String>,
  #[serde(default, rename = "cognito:username")]
  cognito_username: Option<String>,
  #[serde(default)]
  preferred_username: Option<String>,
  #[serde(default, rename = "cognito:groups")]
  groups: Vec<String>,
}

/// Parameters extracted from a pasted redirect URL.
#[derive(Debug, PartialEq)]
pub struct Callback {
  pub code: String,
  pub state: Option<String>,
}

pub struct IdentityProvider {
  config: IdentityConfig,
  http: reqwest::Client,
}

impl IdentityProvider {
  pub fn new(config: IdentityConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .connect_timeout(Duration::from_secs(10))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { config, http })
  }

  fn base(&self) -> Result<Url> {
    Url::parse(&format!("https://{}", self.config.domain))
      .map_err(|e| eyre!("Invalid identity domain {}: {}", self.config.domain, e))
  }

  /// Start a sign-in: store a fresh state value and return the URL to open.
  pub fn begin_login(&self, session: &Session) -> Result<String> {
    let state: String = rand::thread_rng()
      .sample_iter(&Alphanumeric)
      .take(STATE_LEN)
      .map(char::from)
      .collect();
    session.save_oauth_state(&state)?;

    let url = self.authorize_url(&state)?;
    info!("Starting hosted sign-in");
    Ok(url)
  }

  fn authorize_url(&self, state: &str) -> Result<String> {
    let mut url = self.base()?.join("/oauth2/authorize")?;
    url
      .query_pairs_mut()
      .append_pair("response_type", "code")
      .append_pair("client_id", &self.config.client_id)
      .append_pair("redirect_uri", &self.config.redirect_uri)
      .append_pair("state", state)
      .append_pair("scope", &self.config.scopes.join(" "));
    Ok(url.into())
  }

  /// Finish a sign-in from the redirect URL the browser landed on.
  pub async fn complete_login(&self, session: &Session, redirect: &str) -> Result<User> {
    let callback = parse_callback(redirect)?;

    let expected = session.take_oauth_state()?;
    match (&expected, &callback.state) {
      (Some(expected), Some(actual)) if expected == actual => {}
      (None, _) => return Err(eyre!("No sign-in in progress; start again")),
      _ => {
        warn!("OAuth state mismatch on callback");
        return Err(eyre!("Sign-in response does not match this session; start again"));
      }
    }

    let response = self
      .token_request(&[
        ("grant_type", "authorization_code"),
        ("client_id", &self.config.client_id),
        ("code", &callback.code),
        ("redirect_uri", &self.config.redirect_uri),
      ])
      .await?;

    let id_token = response
      .id_token
      .ok_or_else(|| eyre!("Token response did not include an ID token"))?;
    let user = decode_id_token(&id_token)?;

    let tokens = AuthTokens {
      access_token: response.access_token,
      id_token,
      refresh_token: response.refresh_token,
      expires_in: response.expires_in,
      token_type: response.token_type,
    };
    session.sign_in(tokens, user.clone())?;

    info!(user = %user.sub, groups = ?user.groups, "Signed in");
    Ok(user)
  }

  /// Exchange the refresh token for new access and ID tokens.
  ///
  /// The provider does not rotate refresh tokens, so the stored one is kept.
  pub async fn refresh(&self, session: &Session) -> Result<()> {
    let current = session.tokens().ok_or_else(|| eyre!("Not signed in"))?;
    let refresh_token = current
      .refresh_token
      .clone()
      .ok_or_else(|| eyre!("Session has no refresh token"))?;

    let response = self
      .token_request(&[
        ("grant_type", "refresh_token"),
        ("client_id", &self.config.client_id),
        ("refresh_token", &refresh_token),
      ])
      .await?;

    let id_token = response.id_token.unwrap_or(current.id_token);
    let user = decode_id_token(&id_token)?;
    let tokens = AuthTokens {
      access_token: response.access_token,
      id_token,
      refresh_token: response.refresh_token.or(Some(refresh_token)),
      expires_in: response.expires_in,
      token_type: response.token_type,
    };
    session.sign_in(tokens, user)?;

    debug!("Session tokens refreshed");
    Ok(())
  }

  async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
    let url = self.base()?.join("/oauth2/token")?;
    let response = self
      .http
      .post(url)
      .form(form)
      .send()
      .await
      .map_err(|e| eyre!("Token request failed: {}", e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      warn!(status = status.as_u16(), "Token endpoint rejected request");
      return Err(eyre!("Token request failed ({}): {}", status, body));
    }

    response
      .json::<TokenResponse>()
      .await
      .map_err(|e| eyre!("Failed to parse token response: {}", e))
  }

  /// URL that ends the hosted session, when a logout URI is configured.
  pub fn logout_url(&self) -> Result<Option<String>> {
    let Some(logout_uri) = &self.config.logout_uri else {
      return Ok(None);
    };

    let mut url = self.base()?.join("/logout")?;
    url
      .query_pairs_mut()
      .append_pair("client_id", &self.config.client_id)
      .append_pair("logout_uri", logout_uri);
    Ok(Some(url.into()))
  }
}

/// Pull the code and state out of a redirect URL.
pub fn parse_callback(redirect: &str) -> Result<Callback> {
  let url = Url::parse(redirect.trim()).map_err(|e| eyre!("Not a valid URL: {}", e))?;

  let mut code = None;
  let mut state = None;
  let mut error = None;
  for (name, value) in url.query_pairs() {
    match name.as_ref() {
      "code" => code = Some(value.into_owned()),
      "state" => state = Some(value.into_owned()),
      "error_description" => error = Some(value.into_owned()),
      "error" if error.is_none() => error = Some(value.into_owned()),
      _ => {}
    }
  }

  if let Some(error) = error {
    return Err(eyre!("Sign-in was rejected: {}", error));
  }
  let code = code.ok_or_else(|| eyre!("Redirect URL has no authorization code"))?;
  Ok(Callback { code, state })
}

/// Read the profile claims from an ID token payload.
///
/// The signature is not verified; the token came straight from the provider
/// over TLS and is only used for display and role gating.
pub fn decode_id_token(token: &str) -> Result<User> {
  let payload = token
    .split('.')
    .nth(1)
    .ok_or_else(|| eyre!("ID token is not a JWT"))?;
  let bytes = URL_SAFE_NO_PAD
    .decode(payload.trim_end_matches('='))
    .map_err(|e| eyre!("ID token payload is not base64: {}", e))?;
  let claims: IdClaims =
    serde_json::from_slice(&bytes).map_err(|e| eyre!("ID token payload is not valid: {}", e))?;

  Ok(User {
    sub: claims.sub,
    email: claims.email,
    name: claims.name,
    username: claims.cognito_username.or(claims.preferred_username),
    groups: claims.groups,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{KeyValueStore, SqliteStore};
  use std::sync::Arc;

  fn config(logout: Option<&str>) -> IdentityConfig {
    IdentityConfig {
      domain: "auth.example.com".into(),
      client_id: "client-1".into(),
      redirect_uri: "http://localhost:3000/callback".into(),
      logout_uri: logout.map(String::from),
      scopes: vec!["openid".into(), "email".into(), "phone".into()],
    }
  }

  fn jwt(claims: serde_json::Value) -> String {
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    format!("eyJhbGciOiJSUzI1NiJ9.{}.sig", payload)
  }

  #[test]
  fn test_begin_login_stores_state_in_url() {
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
    let session = Session::load(store.clone()).unwrap();
    let provider = IdentityProvider::new(config(None)).unwrap();

    let url = Url::parse(&provider.begin_login(&session).unwrap()).unwrap();
    let state = store.get("oauth_state").unwrap().unwrap();
    assert_eq!(state.len(), 32);
    assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));

    assert_eq!(url.host_str(), Some("auth.example.com"));
    assert_eq!(url.path(), "/oauth2/authorize");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("state".into(), state)));
    assert!(pairs.contains(&("scope".into(), "openid email phone".into())));
    assert!(pairs.contains(&("redirect_uri".into(), "http://localhost:3000/callback".into())));
  }

  #[test]
  fn test_parse_callback() {
    let cb = parse_callback("http://localhost:3000/callback?code=xyz&state=s1").unwrap();
    assert_eq!(cb, Callback { code: "xyz".into(), state: Some("s1".into()) });

    let err = parse_callback("http://localhost:3000/callback?error=access_denied").unwrap_err();
    assert!(err.to_string().contains("access_denied"));

    assert!(parse_callback("http://localhost:3000/callback").is_err());
    assert!(parse_callback("not a url").is_err());
  }

  #[tokio::test]
  async fn test_complete_login_rejects_state_mismatch() {
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
    let session = Session::load(store.clone()).unwrap();
    let provider = IdentityProvider::new(config(None)).unwrap();
    session.save_oauth_state("expected").unwrap();

    let err = provider
      .complete_login(&session, "http://localhost:3000/callback?code=c&state=other")
      .await
      .unwrap_err();
    assert!(err.to_string().contains("does not match"));
    // The pending state is consumed either way.
    assert_eq!(store.get("oauth_state").unwrap(), None);
    assert!(!session.is_authenticated());
  }

  #[test]
  fn test_decode_id_token_claims() {
    let token = jwt(serde_json::json!({
      "sub": "u-1",
      "email": "kim@example.com",
      "cognito:username": "kim",
      "cognito:groups": ["admin", "warehouse"]
    }));
    let user = decode_id_token(&token).unwrap();
    assert_eq!(user.sub, "u-1");
    assert_eq!(user.username.as_deref(), Some("kim"));
    assert_eq!(user.groups, vec!["admin", "warehouse"]);

    let token = jwt(serde_json::json!({ "sub": "u-2", "preferred_username": "lee" }));
    let user = decode_id_token(&token).unwrap();
    assert_eq!(user.username.as_deref(), Some("lee"));
    assert!(user.groups.is_empty());

    assert!(decode_id_token("garbage").is_err());
  }

  #[test]
  fn test_logout_url() {
    let provider = IdentityProvider::new(config(None)).unwrap();
    assert_eq!(provider.logout_url().unwrap(), None);

    let provider = IdentityProvider::new(config(Some("http://localhost:3000/"))).unwrap();
    let url = Url::parse(&provider.logout_url().unwrap().unwrap()).unwrap();
    assert_eq!(url.path(), "/logout");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("logout_uri".into(), "http://localhost:3000/".into())));
    assert!(pairs.contains(&("client_id".into(), "client-1".into())));
  }
}
