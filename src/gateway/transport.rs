//! HTTP transport used by the gateway.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

use super::error::GatewayError;

/// A raw reply from the GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct RawReply {
  pub status: u16,
  pub body: Value,
}

/// Wire-level transport. The gateway builds requests; implementors move bytes.
#[async_trait]
pub trait Transport: Send + Sync {
  /// POST a GraphQL request body. `authorization` is the full header value.
  async fn post_graphql(
    &self,
    body: &Value,
    authorization: Option<&str>,
  ) -> Result<RawReply, GatewayError>;

  /// PUT a binary payload to a presigned object storage URL.
  async fn put_object(
    &self,
    url: &str,
    content_type: &str,
    payload: Vec<u8>,
  ) -> Result<(), GatewayError>;
}

/// `reqwest`-based transport for a single endpoint.
pub struct HttpTransport {
  client: reqwest::Client,
  endpoint: String,
}

impl HttpTransport {
  pub fn new(endpoint: &str) -> Result<Self, GatewayError> {
    let client = reqwest::Client::builder()
      .connect_timeout(Duration::from_secs(10))
      .build()
      .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      client,
      endpoint: endpoint.to_string(),
    })
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn post_graphql(
    &self,
    body: &Value,
    authorization: Option<&str>,
  ) -> Result<RawReply, GatewayError> {
    let mut request = self.client.post(&self.endpoint).json(body);
    if let Some(value) = authorization {
      request = request.header(AUTHORIZATION, value);
    }

    let response = request
      .send()
      .await
      .map_err(|e| GatewayError::Transport(e.to_string()))?;

    let status = response.status().as_u16();
    if status == 401 {
      // Some gateways answer 401 with an HTML or empty body.
      return Ok(RawReply {
        status,
        body: Value::Null,
      });
    }

    let text = response
      .text()
      .await
      .map_err(|e| GatewayError::Transport(e.to_string()))?;

    match serde_json::from_str::<Value>(&text) {
      Ok(body) => Ok(RawReply { status, body }),
      Err(_) if status >= 500 => Err(GatewayError::Transport(format!(
        "Server error ({})",
        status
      ))),
      Err(e) => Err(GatewayError::Decode(format!(
        "HTTP {} with non-JSON body: {}",
        status, e
      ))),
    }
  }

  async fn put_object(
    &self,
    url: &str,
    content_type: &str,
    payload: Vec<u8>,
  ) -> Result<(), GatewayError> {
    let response = self
      .client
      .put(url)
      .header(CONTENT_TYPE, content_type)
      .body(payload)
      .send()
      .await
      .map_err(|e| GatewayError::Transport(e.to_string()))?;

    if response.status().is_success() {
      Ok(())
    } else {
      Err(GatewayError::Transport(format!(
        "Failed to upload image ({})",
        response.status()
      )))
    }
  }
}
