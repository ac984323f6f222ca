//! Remote data gateway.
//!
//! Every backend call goes through [`Gateway::execute`]: one POST per
//! operation, the session credential attached, failures classified into
//! [`GatewayError`]. There are no retries and no side effects on failure; the
//! caller decides what an authorization failure means.

mod client;
mod error;
mod transport;

pub use client::{AuthScheme, CredentialSource, Gateway, Operation};
pub use error::GatewayError;
pub use transport::{HttpTransport, RawReply, Transport};

#[cfg(test)]
pub(crate) mod testing {
  use async_trait::async_trait;
  use serde_json::{json, Value};
  use std::collections::VecDeque;
  use std::sync::Mutex;

  use super::{CredentialSource, GatewayError, RawReply, Transport};

  #[derive(Debug, Clone)]
  pub struct SentRequest {
    pub body: Value,
    pub authorization: Option<String>,
  }

  #[derive(Debug, Clone)]
  pub struct SentUpload {
    pub url: String,
    pub content_type: String,
    pub size: usize,
  }

  /// Transport that replays queued replies in order and records requests.
  #[derive(Default)]
  pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<RawReply, GatewayError>>>,
    requests: Mutex<Vec<SentRequest>>,
    uploads: Mutex<Vec<SentUpload>>,
  }

  impl ScriptedTransport {
    pub fn new() -> Self {
      Self::default()
    }

    pub fn reply_data(&self, data: Value) {
      self.reply_status(200, json!({ "data": data }));
    }

    pub fn reply_status(&self, status: u16, body: Value) {
      self
        .replies
        .lock()
        .unwrap()
        .push_back(Ok(RawReply { status, body }));
    }

    pub fn fail(&self, error: GatewayError) {
      self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<SentRequest> {
      self.requests.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<SentUpload> {
      self.uploads.lock().unwrap().clone()
    }
  }

  #[async_trait]
  impl Transport for ScriptedTransport {
    async fn post_graphql(
      &self,
      body: &Value,
      authorization: Option<&str>,
    ) -> Result<RawReply, GatewayError> {
      self.requests.lock().unwrap().push(SentRequest {
        body: body.clone(),
        authorization: authorization.map(String::from),
      });
      self
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(GatewayError::Transport("no scripted reply".into())))
    }

    async fn put_object(
      &self,
      url: &str,
      content_type: &str,
      payload: Vec<u8>,
    ) -> Result<(), GatewayError> {
      self.uploads.lock().unwrap().push(SentUpload {
        url: url.to_string(),
        content_type: content_type.to_string(),
        size: payload.len(),
      });
      Ok(())
    }
  }

  pub struct FixedCredential(pub Option<String>);

  impl CredentialSource for FixedCredential {
    fn credential(&self) -> Option<String> {
      self.0.clone()
    }
  }
}
