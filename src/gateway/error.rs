//! Failure taxonomy for remote operations.

use serde::Deserialize;
use thiserror::Error;

/// An error reported by a remote operation.
///
/// Every remote call in the client resolves to one of these. Callers branch
/// on the kind: authorization failures end the session, state conflicts get
/// a hint, everything else is shown as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
  /// No usable response reached us (connection, TLS, non-JSON body, 5xx).
  #[error("Network error: {0}")]
  Transport(String),

  /// The credential is missing, expired or rejected.
  #[error("Not authorized: {0}")]
  Authorization(String),

  /// The server rejected the input.
  #[error("{0}")]
  Validation(String),

  /// The server rejected a transition because the entity is not in the
  /// expected status.
  #[error("{0}")]
  StateConflict(String),

  /// The response arrived but did not have the expected shape.
  #[error("Unexpected response: {0}")]
  Decode(String),
}

impl GatewayError {
  pub fn is_authorization(&self) -> bool {
    matches!(self, GatewayError::Authorization(_))
  }

  /// Text shown to the user.
  pub fn user_message(&self) -> String {
    match self {
      GatewayError::Transport(_) => {
        "Could not reach the server. Check your connection and try again.".to_string()
      }
      GatewayError::Authorization(_) => {
        "Your session has expired or is not valid. You will be signed out.".to_string()
      }
      GatewayError::Validation(msg) => msg.clone(),
      GatewayError::StateConflict(msg) => format!(
        "{}\n\nThe order may have been changed by someone else. Close and reopen it to see its current state.",
        msg
      ),
      GatewayError::Decode(msg) => format!("The server sent an unexpected response ({}).", msg),
    }
  }
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphqlErrorEntry {
  #[serde(default)]
  pub message: String,
  #[serde(rename = "errorType", default)]
  pub error_type: Option<String>,
  #[serde(default)]
  pub path: Option<serde_json::Value>,
}

const AUTH_MARKERS: &[&str] = &[
  "token has expired",
  "expired",
  "unauthorized",
  "not authorized",
];

const CONFLICT_TYPES: &[&str] = &[
  "conditionalcheckfailedexception",
  "conditionalcheckfailed",
  "invalidstatetransition",
  "conflict",
];

/// Classify a non-empty list of GraphQL errors.
///
/// Any authorization marker wins, so an expired token is never reported as a
/// plain validation failure.
pub fn classify(errors: &[GraphqlErrorEntry]) -> GatewayError {
  let message = errors
    .iter()
    .map(|e| e.message.as_str())
    .filter(|m| !m.is_empty())
    .collect::<Vec<_>>()
    .join("; ");

  let message = if message.is_empty() {
    "The server rejected the request".to_string()
  } else {
    message
  };

  if errors.iter().any(is_authorization_entry) {
    return GatewayError::Authorization(message);
  }

  if errors.iter().any(is_conflict_entry) {
    return GatewayError::StateConflict(message);
  }

  GatewayError::Validation(message)
}

fn is_authorization_entry(entry: &GraphqlErrorEntry) -> bool {
  let message = entry.message.to_lowercase();
  let error_type = entry.error_type.as_deref().unwrap_or("").to_lowercase();
  AUTH_MARKERS.iter().any(|m| message.contains(m)) || error_type.starts_with("unauthorized")
}

fn is_conflict_entry(entry: &GraphqlErrorEntry) -> bool {
  // AppSync prefixes data source errors, e.g. "DynamoDB:ConditionalCheckFailedException".
  let error_type = entry.error_type.as_deref().unwrap_or("").to_lowercase();
  let error_type = error_type.rsplit(':').next().unwrap_or("");
  if CONFLICT_TYPES.contains(&error_type) {
    return true;
  }

  // Transition resolvers phrase these as "Order status is not IN_PROGRESS".
  let message = entry.message.to_lowercase();
  message.contains("status")
    && (message.contains(" not ") || message.contains("expected") || message.contains("invalid"))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(message: &str, error_type: Option<&str>) -> GraphqlErrorEntry {
    GraphqlErrorEntry {
      message: message.to_string(),
      error_type: error_type.map(String::from),
      path: None,
    }
  }

  #[test]
  fn test_expired_token_is_authorization() {
    let err = classify(&[entry("Token has expired.", None)]);
    assert!(err.is_authorization());
  }

  #[test]
  fn test_unauthorized_error_type_is_authorization() {
    let err = classify(&[entry(
      "Not Authorized to access getOrders on type Query",
      Some("Unauthorized"),
    )]);
    assert!(err.is_authorization());
  }

  #[test]
  fn test_status_message_is_state_conflict() {
    let err = classify(&[entry("Order status is not IN_PROGRESS", None)]);
    assert_eq!(
      err,
      GatewayError::StateConflict("Order status is not IN_PROGRESS".to_string())
    );
  }

  #[test]
  fn test_conditional_check_is_state_conflict() {
    let err = classify(&[entry(
      "The conditional request failed",
      Some("DynamoDB:ConditionalCheckFailedException"),
    )]);
    assert!(matches!(err, GatewayError::StateConflict(_)));

    let err = classify(&[entry(
      "The conditional request failed",
      Some("ConditionalCheckFailedException"),
    )]);
    assert!(matches!(err, GatewayError::StateConflict(_)));
  }

  #[test]
  fn test_other_errors_are_validation_and_joined() {
    let err = classify(&[
      entry("Address is incomplete", None),
      entry("Phone number is required", None),
    ]);
    assert_eq!(
      err,
      GatewayError::Validation("Address is incomplete; Phone number is required".to_string())
    );
  }

  #[test]
  fn test_auth_wins_over_conflict() {
    let err = classify(&[
      entry("Order status is not NEW", None),
      entry("Unauthorized", None),
    ]);
    assert!(err.is_authorization());
  }

  #[test]
  fn test_state_conflict_message_has_hint() {
    let msg = GatewayError::StateConflict("Order status is not NEW".into()).user_message();
    assert!(msg.starts_with("Order status is not NEW"));
    assert!(msg.contains("reopen"));
  }

  #[test]
  fn test_validation_message_is_verbatim() {
    let msg = GatewayError::Validation("Address is incomplete".into()).user_message();
    assert_eq!(msg, "Address is incomplete");
  }
}
