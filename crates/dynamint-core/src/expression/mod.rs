//! Condition, update, and projection expression engine.
//!
//! Each dialect goes through the same two stages with a three-way result:
//! malformed text is a [`SyntaxError`], text that parses but breaks a
//! semantic rule comes back as [`Outcome::Invalid`] with the rejection
//! message, and everything else is [`Outcome::Valid`] carrying the AST.

pub mod ast;
pub mod evaluator;
mod parser;
mod reserved;
pub mod validator;

pub use evaluator::{EvalContext, UpdateError, apply_projection, apply_update, evaluate_condition};
pub use parser::SyntaxError;
pub use reserved::is_reserved_word;
pub use validator::ValidationContext;

use ast::{AttributePath, Expr, UpdateExpr};

/// A successfully parsed expression, either usable or semantically
/// rejected with the message to report.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Parsed and validated.
    Valid(T),
    /// Parsed, but a semantic check failed.
    Invalid(String),
}

impl<T> Outcome<T> {
    /// Convert to a `Result`, mapping the invalid message through `reject`.
    pub fn into_result<E>(self, reject: impl FnOnce(String) -> E) -> Result<T, E> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Invalid(message) => Err(reject(message)),
        }
    }
}

/// Parse and validate a condition (or filter) expression.
pub fn parse_condition(
    input: &str,
    ctx: &ValidationContext<'_>,
) -> Result<Outcome<Expr>, SyntaxError> {
    let expr = parser::parse_condition_ast(input)?;
    Ok(match validator::validate_condition(&expr, ctx) {
        Some(message) => Outcome::Invalid(message),
        None => Outcome::Valid(expr),
    })
}

/// Parse and validate an update expression.
pub fn parse_update(
    input: &str,
    ctx: &ValidationContext<'_>,
) -> Result<Outcome<UpdateExpr>, SyntaxError> {
    let update = parser::parse_update_ast(input)?;
    Ok(match validator::validate_update(&update, ctx) {
        Some(message) => Outcome::Invalid(message),
        None => Outcome::Valid(update),
    })
}

/// Parse and validate a projection expression.
pub fn parse_projection(
    input: &str,
    ctx: &ValidationContext<'_>,
) -> Result<Outcome<Vec<AttributePath>>, SyntaxError> {
    let paths = parser::parse_projection_ast(input)?;
    Ok(match validator::validate_projection(&paths, ctx) {
        Some(message) => Outcome::Invalid(message),
        None => Outcome::Valid(paths),
    })
}
