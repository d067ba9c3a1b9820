//! Mapping of engine-internal failures onto the client error taxonomy.

use dynamint_model::DynamintError;

use crate::expression::{Outcome, SyntaxError, UpdateError};
use crate::filter::LegacyUpdateError;

/// Which request parameter an expression came from; picks the message
/// prefix clients see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionParam {
    /// `ConditionExpression` on a conditional write.
    Condition,
    /// `UpdateExpression` on `UpdateItem`.
    Update,
    /// `ProjectionExpression` on a read.
    Projection,
}

impl ExpressionParam {
    fn as_str(self) -> &'static str {
        match self {
            Self::Condition => "ConditionExpression",
            Self::Update => "UpdateExpression",
            Self::Projection => "ProjectionExpression",
        }
    }
}

/// Wrap a syntax or semantic rejection with the parameter prefix.
#[must_use]
pub fn invalid_expression(param: ExpressionParam, message: &str) -> DynamintError {
    DynamintError::validation(format!("Invalid {}: {message}", param.as_str()))
}

/// Collapse the parse outcome: syntax errors and semantic rejections both
/// become `ValidationException`s naming the parameter.
pub fn resolve_outcome<T>(
    param: ExpressionParam,
    outcome: Result<Outcome<T>, SyntaxError>,
) -> Result<T, DynamintError> {
    match outcome {
        Ok(Outcome::Valid(value)) => Ok(value),
        Ok(Outcome::Invalid(message)) => Err(invalid_expression(param, &message)),
        Err(err) => Err(invalid_expression(param, &err.to_string())),
    }
}

impl From<UpdateError> for DynamintError {
    fn from(err: UpdateError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<LegacyUpdateError> for DynamintError {
    fn from(err: LegacyUpdateError) -> Self {
        Self::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{ValidationContext, parse_condition};

    #[test]
    fn test_should_prefix_rejections_with_the_parameter_name() {
        let ctx = ValidationContext::default();
        let err = resolve_outcome(
            ExpressionParam::Condition,
            parse_condition("a = :missing", &ctx),
        )
        .unwrap_err();
        assert_eq!(
            err.message,
            "Invalid ConditionExpression: An expression attribute value used in expression is not defined; attribute value: :missing"
        );

        let err = resolve_outcome(ExpressionParam::Condition, parse_condition("a = =", &ctx))
            .unwrap_err();
        assert!(err.message.starts_with("Invalid ConditionExpression: Syntax error"));
    }
}
