//! Engine configuration.

use std::env;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_ACCOUNT_ID: &str = "000000000000";

/// Settings the engine bakes into ARNs and descriptions.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Region reported in table ARNs.
    pub region: String,
    /// Account id reported in table ARNs.
    pub account_id: String,
    /// When set, unused `ExpressionAttributeNames`/`Values` entries fail
    /// the request the way the real service does. Off, they are ignored,
    /// which older client code sometimes relies on.
    pub strict_validation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
            strict_validation: true,
        }
    }
}

impl EngineConfig {
    /// Read overrides from `DYNAMINT_REGION`, `DYNAMINT_ACCOUNT_ID`, and
    /// `DYNAMINT_STRICT_VALIDATION`, falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            region: env::var("DYNAMINT_REGION").unwrap_or(defaults.region),
            account_id: env::var("DYNAMINT_ACCOUNT_ID").unwrap_or(defaults.account_id),
            strict_validation: env::var("DYNAMINT_STRICT_VALIDATION")
                .map(|v| !matches!(v.as_str(), "0" | "false" | "off"))
                .unwrap_or(defaults.strict_validation),
        }
    }

    /// The ARN of a table under this configuration.
    #[must_use]
    pub fn table_arn(&self, table: &str) -> String {
        format!(
            "arn:aws:dynamodb:{}:{}:table/{table}",
            self.region, self.account_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_arns_from_configuration() {
        let config = EngineConfig {
            region: "eu-west-2".to_string(),
            account_id: "123456789012".to_string(),
            ..EngineConfig::default()
        };
        assert_eq!(
            config.table_arn("Books"),
            "arn:aws:dynamodb:eu-west-2:123456789012:table/Books"
        );
    }
}
