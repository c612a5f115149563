//! Wire error contract
//!
//! Every rejection crosses the wire as `{ "error": { code, message,
//! details } }`. All codes except `INTERNAL_ERROR` are recoverable by the
//! caller and carry full details; internal failures stay opaque.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::{DeleteOutcome, WriteOutcome};
use crate::models::{ProductId, ValidationFailure, RESOURCE};

/// Machine-readable error code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationError,
    Unauthorized,
    /// Carries the protected field name, e.g. `PERMISSION_EDIT_PRICE_CENTS`
    PermissionEdit(String),
    NotFound,
    Conflict,
    Internal,
}

impl ErrorCode {
    /// Wire representation of the code
    #[must_use]
    pub fn as_wire(&self) -> String {
        match self {
            Self::ValidationError => "VALIDATION_ERROR".to_string(),
            Self::Unauthorized => "UNAUTHORIZED".to_string(),
            Self::PermissionEdit(field) => {
                format!("PERMISSION_EDIT_{}", field.to_ascii_uppercase())
            }
            Self::NotFound => "NOT_FOUND".to_string(),
            Self::Conflict => "CONFLICT".to_string(),
            Self::Internal => "INTERNAL_ERROR".to_string(),
        }
    }

    /// HTTP status the code maps to
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::ValidationError => 400,
            Self::Unauthorized => 401,
            Self::PermissionEdit(_) => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}

/// The `error` object inside the envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

/// Shared error envelope for all non-success responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn new(code: &ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            error: ErrorBody {
                code: code.as_wire(),
                message: message.into(),
                details,
            },
        }
    }

    #[must_use]
    pub fn validation(failure: &ValidationFailure) -> Self {
        Self::new(
            &ErrorCode::ValidationError,
            "Payload failed validation",
            json!({
                "resource": failure.resource,
                "required_fields": failure.required_fields,
            }),
        )
    }

    #[must_use]
    pub fn not_found(id: ProductId) -> Self {
        Self::new(
            &ErrorCode::NotFound,
            format!("No {RESOURCE} with id {id}"),
            json!({ "resource": RESOURCE, "id": id }),
        )
    }

    #[must_use]
    pub fn permission(id: ProductId, field: &str) -> Self {
        Self::new(
            &ErrorCode::PermissionEdit(field.to_string()),
            format!("Role is not allowed to change {field}"),
            json!({ "resource": RESOURCE, "id": id, "field": field }),
        )
    }

    #[must_use]
    pub fn conflict(id: ProductId, expected_version: i64, actual_version: i64) -> Self {
        Self::new(
            &ErrorCode::Conflict,
            format!("Record changed since version {expected_version}"),
            json!({
                "resource": RESOURCE,
                "id": id,
                "expected_version": expected_version,
                "actual_version": actual_version,
            }),
        )
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(&ErrorCode::Unauthorized, message, Value::Null)
    }

    /// Opaque internal error; server-side context goes to the log, not here
    #[must_use]
    pub fn internal() -> Self {
        Self::new(
            &ErrorCode::Internal,
            "An internal error occurred",
            Value::Null,
        )
    }

    /// Map a rejected update outcome to its envelope; `None` for success
    #[must_use]
    pub fn from_write_outcome(outcome: &WriteOutcome, id: ProductId) -> Option<Self> {
        match outcome {
            WriteOutcome::Updated(_) => None,
            WriteOutcome::Invalid(failure) => Some(Self::validation(failure)),
            WriteOutcome::NotFound => Some(Self::not_found(id)),
            WriteOutcome::Restricted { field } => Some(Self::permission(id, field)),
            WriteOutcome::Conflict {
                expected_version,
                actual_version,
            } => Some(Self::conflict(id, *expected_version, *actual_version)),
        }
    }

    /// Map a rejected delete outcome to its envelope; `None` for success
    #[must_use]
    pub fn from_delete_outcome(outcome: &DeleteOutcome, id: ProductId) -> Option<Self> {
        match outcome {
            DeleteOutcome::Deleted => None,
            DeleteOutcome::NotFound => Some(Self::not_found(id)),
            DeleteOutcome::Conflict {
                expected_version,
                actual_version,
            } => Some(Self::conflict(id, *expected_version, *actual_version)),
        }
    }

    /// Status code implied by the envelope's error code
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self.error.code.as_str() {
            "VALIDATION_ERROR" => 400,
            "UNAUTHORIZED" => 401,
            "NOT_FOUND" => 404,
            "CONFLICT" => 409,
            code if code.starts_with("PERMISSION_EDIT_") => 403,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_permission_code_includes_field() {
        let code = ErrorCode::PermissionEdit("price_cents".to_string());
        assert_eq!(code.as_wire(), "PERMISSION_EDIT_PRICE_CENTS");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::ValidationError.http_status(), 400);
        assert_eq!(ErrorCode::Unauthorized.http_status(), 401);
        assert_eq!(
            ErrorCode::PermissionEdit("price_cents".to_string()).http_status(),
            403
        );
        assert_eq!(ErrorCode::NotFound.http_status(), 404);
        assert_eq!(ErrorCode::Conflict.http_status(), 409);
        assert_eq!(ErrorCode::Internal.http_status(), 500);
    }

    #[test]
    fn test_conflict_envelope_shape() {
        let id = ProductId::new();
        let envelope = ErrorEnvelope::conflict(id, 1, 3);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["error"]["code"], "CONFLICT");
        assert_eq!(json["error"]["details"]["expected_version"], 1);
        assert_eq!(json["error"]["details"]["actual_version"], 3);
        assert_eq!(envelope.http_status(), 409);
    }

    #[test]
    fn test_internal_envelope_is_opaque() {
        let envelope = ErrorEnvelope::internal();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn test_envelope_round_trip() {
        let id = ProductId::new();
        let envelope = ErrorEnvelope::permission(id, "price_cents");
        let text = serde_json::to_string(&envelope).unwrap();
        let parsed: ErrorEnvelope = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, envelope);
        assert_eq!(parsed.http_status(), 403);
    }
}
