//! Shared wire types for table schemas, indexes, and legacy request forms.
//!
//! Structs use `#[serde(rename_all = "PascalCase")]` to match the DynamoDB
//! JSON wire format; enum variants map to the `SCREAMING_SNAKE_CASE` wire
//! strings with explicit renames.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Key type within a key schema element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// Partition key.
    #[serde(rename = "HASH")]
    Hash,
    /// Sort key.
    #[serde(rename = "RANGE")]
    Range,
}

impl KeyType {
    /// Wire-format string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hash => "HASH",
            Self::Range => "RANGE",
        }
    }
}

/// Scalar attribute types allowed in key schemas.
///
/// Values other than `S`, `N`, and `B` must be rejected with a
/// `ValidationException` rather than a deserialization error, so unknown
/// strings survive parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarAttributeType {
    /// String type.
    S,
    /// Number type.
    N,
    /// Binary type.
    B,
    /// An unknown attribute type received from the client.
    Unknown(String),
}

impl ScalarAttributeType {
    /// Wire-format string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// True for the three valid key attribute types.
    #[must_use]
    pub fn is_valid_key_type(&self) -> bool {
        matches!(self, Self::S | Self::N | Self::B)
    }
}

impl Serialize for ScalarAttributeType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ScalarAttributeType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "S" => Self::S,
            "N" => Self::N,
            "B" => Self::B,
            _ => Self::Unknown(s),
        })
    }
}

impl std::fmt::Display for ScalarAttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableStatus {
    /// The table is being created.
    #[serde(rename = "CREATING")]
    Creating,
    /// The table is ready for use.
    #[serde(rename = "ACTIVE")]
    Active,
    /// The table is being deleted.
    #[serde(rename = "DELETING")]
    Deleting,
}

/// Projection type for secondary indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionType {
    /// All attributes are projected into the index.
    #[default]
    #[serde(rename = "ALL")]
    All,
    /// Only the index and primary key attributes are projected.
    #[serde(rename = "KEYS_ONLY")]
    KeysOnly,
    /// Keys plus the listed non-key attributes.
    #[serde(rename = "INCLUDE")]
    Include,
}

/// What a write operation returns about the affected item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReturnValue {
    /// Nothing is returned.
    #[default]
    #[serde(rename = "NONE")]
    None,
    /// All attributes as they were before the operation.
    #[serde(rename = "ALL_OLD")]
    AllOld,
    /// Only the updated attributes, pre-operation values.
    #[serde(rename = "UPDATED_OLD")]
    UpdatedOld,
    /// All attributes as they are after the operation.
    #[serde(rename = "ALL_NEW")]
    AllNew,
    /// Only the updated attributes, post-operation values.
    #[serde(rename = "UPDATED_NEW")]
    UpdatedNew,
}

impl ReturnValue {
    /// Wire-format string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::AllOld => "ALL_OLD",
            Self::UpdatedOld => "UPDATED_OLD",
            Self::AllNew => "ALL_NEW",
            Self::UpdatedNew => "UPDATED_NEW",
        }
    }
}

/// The legacy comparison operators used by `Expected`, query filters, and
/// scan filters.
///
/// Each operator has two wire spellings: a name (`EQ`) and, for the six
/// ordering operators, a symbol (`=`). Both deserialize to the same
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    /// `EQ` / `=`
    Eq,
    /// `NE` / `<>`
    Ne,
    /// `LE` / `<=`
    Le,
    /// `LT` / `<`
    Lt,
    /// `GE` / `>=`
    Ge,
    /// `GT` / `>`
    Gt,
    /// `NOT_NULL` — the attribute exists.
    NotNull,
    /// `NULL` — the attribute does not exist.
    Null,
    /// `CONTAINS`
    Contains,
    /// `NOT_CONTAINS`
    NotContains,
    /// `BEGINS_WITH`
    BeginsWith,
    /// `IN`
    In,
    /// `BETWEEN`
    Between,
}

impl ComparisonOperator {
    /// Parse either wire spelling. Returns `None` for unknown strings.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "EQ" | "=" => Self::Eq,
            "NE" | "<>" => Self::Ne,
            "LE" | "<=" => Self::Le,
            "LT" | "<" => Self::Lt,
            "GE" | ">=" => Self::Ge,
            "GT" | ">" => Self::Gt,
            "NOT_NULL" => Self::NotNull,
            "NULL" => Self::Null,
            "CONTAINS" => Self::Contains,
            "NOT_CONTAINS" => Self::NotContains,
            "BEGINS_WITH" => Self::BeginsWith,
            "IN" => Self::In,
            "BETWEEN" => Self::Between,
            _ => return None,
        })
    }

    /// Canonical (name) spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Le => "LE",
            Self::Lt => "LT",
            Self::Ge => "GE",
            Self::Gt => "GT",
            Self::NotNull => "NOT_NULL",
            Self::Null => "NULL",
            Self::Contains => "CONTAINS",
            Self::NotContains => "NOT_CONTAINS",
            Self::BeginsWith => "BEGINS_WITH",
            Self::In => "IN",
            Self::Between => "BETWEEN",
        }
    }
}

impl Serialize for ComparisonOperator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ComparisonOperator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown comparison operator: {s}"))
        })
    }
}

/// Action for a legacy `AttributeUpdates` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttributeAction {
    /// Replace or create the attribute.
    #[default]
    #[serde(rename = "PUT")]
    Put,
    /// Numeric add or set union.
    #[serde(rename = "ADD")]
    Add,
    /// Remove the attribute or a set subset.
    #[serde(rename = "DELETE")]
    Delete,
}

// ---------------------------------------------------------------------------
// Structs — key schema and indexes
// ---------------------------------------------------------------------------

/// An element of a table or index key schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    /// The name of the key attribute.
    pub attribute_name: String,
    /// `HASH` or `RANGE`.
    pub key_type: KeyType,
}

/// Declares an attribute that participates in a key schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    /// The name of the attribute.
    pub attribute_name: String,
    /// The scalar type (`S`, `N`, or `B`).
    pub attribute_type: ScalarAttributeType,
}

/// Projection settings for a secondary index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Projection {
    /// Which attributes are copied into the index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_type: Option<ProjectionType>,
    /// The non-key attributes to project for `INCLUDE`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_key_attributes: Vec<String>,
}

/// Global secondary index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GlobalSecondaryIndex {
    /// The index name, unique within the table.
    pub index_name: String,
    /// The index key schema (its own partition key, optional sort key).
    pub key_schema: Vec<KeySchemaElement>,
    /// The attributes projected into the index.
    pub projection: Projection,
}

/// Local secondary index definition.
///
/// Shares the table's partition key and uses a different sort key; fixed at
/// table creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalSecondaryIndex {
    /// The index name, unique within the table.
    pub index_name: String,
    /// The index key schema (table hash key plus an alternate range key).
    pub key_schema: Vec<KeySchemaElement>,
    /// The attributes projected into the index.
    pub projection: Projection,
}

/// Provisioned throughput settings. Accepted and echoed, never enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisionedThroughput {
    /// Read capacity units.
    pub read_capacity_units: u64,
    /// Write capacity units.
    pub write_capacity_units: u64,
}

/// Table description returned by the table lifecycle operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableDescription {
    /// The table name.
    pub table_name: String,
    /// The table key schema.
    pub key_schema: Vec<KeySchemaElement>,
    /// Attribute definitions for all key attributes (table and indexes).
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Current status.
    pub table_status: TableStatus,
    /// Creation time in epoch seconds.
    pub creation_date_time: f64,
    /// Number of items.
    pub item_count: u64,
    /// Total stored size in bytes.
    pub table_size_bytes: u64,
    /// The table ARN.
    pub table_arn: String,
    /// Unique table id assigned at creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    /// Global secondary indexes, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
    /// Local secondary indexes, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_secondary_indexes: Vec<LocalSecondaryIndex>,
    /// Provisioned throughput, echoed from creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

// ---------------------------------------------------------------------------
// Structs — legacy request forms
// ---------------------------------------------------------------------------

/// A legacy `Expected` entry on a conditional write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpectedAttributeValue {
    /// Single comparison value (shorthand for `EQ` with one value).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<AttributeValue>,
    /// Existence check; `false` means the attribute must be absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    /// Explicit operator form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_operator: Option<ComparisonOperator>,
    /// Comparison values for the operator form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_value_list: Vec<AttributeValue>,
}

/// A legacy `AttributeUpdates` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeValueUpdate {
    /// The new value (absent for a plain `DELETE`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<AttributeValue>,
    /// The action to apply; defaults to `PUT`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<AttributeAction>,
}

/// An item: attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_both_operator_spellings() {
        assert_eq!(ComparisonOperator::parse("EQ"), Some(ComparisonOperator::Eq));
        assert_eq!(ComparisonOperator::parse("="), Some(ComparisonOperator::Eq));
        assert_eq!(ComparisonOperator::parse("<>"), Some(ComparisonOperator::Ne));
        assert_eq!(
            ComparisonOperator::parse("BEGINS_WITH"),
            Some(ComparisonOperator::BeginsWith)
        );
        assert_eq!(ComparisonOperator::parse("LIKE"), None);
    }

    #[test]
    fn test_should_preserve_unknown_scalar_types_through_serde() {
        let parsed: ScalarAttributeType = serde_json::from_str("\"SS\"").unwrap();
        assert_eq!(parsed, ScalarAttributeType::Unknown("SS".to_string()));
        assert!(!parsed.is_valid_key_type());
    }

    #[test]
    fn test_should_serialize_key_schema_in_wire_case() {
        let element = KeySchemaElement {
            attribute_name: "pk".to_string(),
            key_type: KeyType::Hash,
        };
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(json["AttributeName"], "pk");
        assert_eq!(json["KeyType"], "HASH");
    }
}
