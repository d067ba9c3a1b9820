//! Error taxonomy and wire shape.
//!
//! Every error that can reach a client carries a fully qualified `__type`
//! name and a message, serialized as `{"__type": "...", "message": "..."}`.
//! Validation-style failures map to HTTP 400, invariant violations to 500.

use http::StatusCode;
use serde::Serialize;

/// Error codes recognized by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamintErrorCode {
    /// Malformed request body or expression syntax.
    SerializationException,
    /// A request parameter or expression failed semantic validation.
    ValidationException,
    /// A conditional write's condition evaluated to false.
    ConditionalCheckFailedException,
    /// The named table already exists (or is mid-creation).
    ResourceInUseException,
    /// The named table does not exist.
    ResourceNotFoundException,
    /// An internal invariant was violated.
    InternalFailure,
}

impl DynamintErrorCode {
    /// Fully qualified `__type` name used on the wire.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::SerializationException => "com.amazon.coral.service#SerializationException",
            Self::ValidationException => "com.amazon.coral.validate#ValidationException",
            Self::ConditionalCheckFailedException => {
                "com.amazonaws.dynamodb.v20120810#ConditionalCheckFailedException"
            }
            Self::ResourceInUseException => {
                "com.amazonaws.dynamodb.v20120810#ResourceInUseException"
            }
            Self::ResourceNotFoundException => {
                "com.amazonaws.dynamodb.v20120810#ResourceNotFoundException"
            }
            Self::InternalFailure => "com.amazon.coral.service#InternalFailure",
        }
    }

    /// Short code name (the part after `#`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SerializationException => "SerializationException",
            Self::ValidationException => "ValidationException",
            Self::ConditionalCheckFailedException => "ConditionalCheckFailedException",
            Self::ResourceInUseException => "ResourceInUseException",
            Self::ResourceNotFoundException => "ResourceNotFoundException",
            Self::InternalFailure => "InternalFailure",
        }
    }

    /// HTTP status code this error maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalFailure => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// An engine error: a code plus a client-visible message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", code.as_str())]
pub struct DynamintError {
    /// The error code.
    pub code: DynamintErrorCode,
    /// The client-visible message.
    pub message: String,
}

/// Wire representation of an error body.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    #[serde(rename = "__type")]
    error_type: &'static str,
    message: &'a str,
}

impl DynamintError {
    /// Create an error with an explicit code.
    #[must_use]
    pub fn new(code: DynamintErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// A `ValidationException` with the given message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(DynamintErrorCode::ValidationException, message)
    }

    /// A `SerializationException` with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(DynamintErrorCode::SerializationException, message)
    }

    /// The standard `ConditionalCheckFailedException`.
    #[must_use]
    pub fn conditional_check_failed() -> Self {
        Self::new(
            DynamintErrorCode::ConditionalCheckFailedException,
            "The conditional request failed",
        )
    }

    /// A `ResourceInUseException` for a table mid-creation or existing.
    #[must_use]
    pub fn resource_in_use(table_name: &str) -> Self {
        Self::new(
            DynamintErrorCode::ResourceInUseException,
            format!("Table already exists: {table_name}"),
        )
    }

    /// The standard `ResourceNotFoundException`.
    #[must_use]
    pub fn resource_not_found() -> Self {
        Self::new(
            DynamintErrorCode::ResourceNotFoundException,
            "Requested resource not found",
        )
    }

    /// An `InternalFailure` for invariant violations.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(DynamintErrorCode::InternalFailure, message)
    }

    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    /// Serialize to the `{"__type": ..., "message": ...}` wire body.
    #[must_use]
    pub fn to_body(&self) -> String {
        let body = ErrorBody {
            error_type: self.code.error_type(),
            message: &self.message,
        };
        serde_json::to_string(&body).unwrap_or_else(|_| {
            format!(r#"{{"__type":"{}","message":""}}"#, self.code.error_type())
        })
    }
}
