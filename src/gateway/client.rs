use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::{classify, GatewayError, GraphqlErrorEntry};
use super::transport::Transport;

/// Supplies the credential attached to each request.
pub trait CredentialSource: Send + Sync {
  /// The current access token, or `None` when signed out.
  fn credential(&self) -> Option<String>;
}

/// How the credential is placed in the `Authorization` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
  /// The bare token, as the storefront API expects.
  #[default]
  Raw,
  /// `Bearer <token>`
  Bearer,
}

/// A named GraphQL document and the root field its result is read from.
#[derive(Debug, Clone, Copy)]
pub struct Operation {
  pub name: &'static str,
  pub root_field: &'static str,
  pub document: &'static str,
}

/// Executes GraphQL operations against a single endpoint.
#[derive(Clone)]
pub struct Gateway {
  transport: Arc<dyn Transport>,
  credentials: Arc<dyn CredentialSource>,
  scheme: AuthScheme,
}

impl Gateway {
  pub fn new(
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialSource>,
    scheme: AuthScheme,
  ) -> Self {
    Self {
      transport,
      credentials,
      scheme,
    }
  }

  /// Run `operation` and decode `data[root_field]` into `T`.
  ///
  /// A `null` root field decodes into `Option::None` when `T` is an option.
  pub async fn execute<V, T>(&self, operation: &Operation, variables: &V) -> Result<T, GatewayError>
  where
    V: Serialize + Sync,
    T: DeserializeOwned,
  {
    let variables = serde_json::to_value(variables)
      .map_err(|e| GatewayError::Decode(format!("Failed to encode variables: {}", e)))?;

    let body = json!({
      "operationName": operation.name,
      "query": operation.document,
      "variables": variables,
    });

    let authorization = self.credentials.credential().map(|token| match self.scheme {
      AuthScheme::Raw => token,
      AuthScheme::Bearer => format!("Bearer {}", token),
    });

    debug!(operation = operation.name, "Executing GraphQL operation");

    let result = self
      .transport
      .post_graphql(&body, authorization.as_deref())
      .await
      .and_then(|reply| decode_reply(operation, reply.status, reply.body));

    if let Err(e) = &result {
      warn!(operation = operation.name, error = %e, "GraphQL operation failed");
    }

    result
  }

  /// Upload bytes to a presigned object storage URL.
  pub async fn upload(
    &self,
    url: &str,
    content_type: &str,
    payload: Vec<u8>,
  ) -> Result<(), GatewayError> {
    debug!(content_type, size = payload.len(), "Uploading object");
    self
      .transport
      .put_object(url, content_type, payload)
      .await
      .inspect_err(|e| warn!(error = %e, "Object upload failed"))
  }
}

fn decode_reply<T: DeserializeOwned>(
  operation: &Operation,
  status: u16,
  mut body: Value,
) -> Result<T, GatewayError> {
  if status == 401 {
    return Err(GatewayError::Authorization("HTTP 401".to_string()));
  }

  if let Some(errors) = body.get("errors").and_then(Value::as_array) {
    if !errors.is_empty() {
      let entries: Vec<GraphqlErrorEntry> = errors
        .iter()
        .map(|e| {
          serde_json::from_value(e.clone()).unwrap_or_else(|_| GraphqlErrorEntry {
            message: e.to_string(),
            ..Default::default()
          })
        })
        .collect();
      return Err(classify(&entries));
    }
  }

  if !(200..300).contains(&status) {
    return Err(GatewayError::Transport(format!("HTTP {}", status)));
  }

  let data = body
    .get_mut("data")
    .filter(|d| d.is_object())
    .ok_or_else(|| GatewayError::Decode("response has no data".to_string()))?;

  let value = data
    .get_mut(operation.root_field)
    .map(Value::take)
    .unwrap_or(Value::Null);

  serde_json::from_value(value)
    .map_err(|e| GatewayError::Decode(format!("{}: {}", operation.root_field, e)))
}
