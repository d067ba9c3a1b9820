//! Shared model types for the dynamint engine.
//!
//! This crate defines the wire-facing data model that the engine crate
//! builds on:
//!
//! - [`AttributeValue`] — the ten-variant tagged value union with the
//!   engine's comparison semantics (exact decimal numbers, positional set
//!   equality, asymmetric map equality).
//! - [`Decimal`] — arbitrary-precision decimal numbers in normalized
//!   sign/digits/exponent form, used everywhere a `N` value is compared,
//!   encoded, or added.
//! - Request/response types for the supported operations, serialized in
//!   the DynamoDB JSON wire format.
//! - [`DynamintError`] — the error taxonomy with its `__type` wire shape.

pub mod attribute_value;
pub mod decimal;
pub mod error;
pub mod input;
pub mod output;
pub mod types;

pub use attribute_value::{AttributeValue, ComparisonError};
pub use decimal::{Decimal, DecimalError};
pub use error::{DynamintError, DynamintErrorCode};
