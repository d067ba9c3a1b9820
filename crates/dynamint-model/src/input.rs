//! Request types for the supported operations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;
use crate::types::{
    AttributeDefinition, AttributeValueUpdate, ExpectedAttributeValue, GlobalSecondaryIndex,
    Item, KeySchemaElement, LocalSecondaryIndex, ProvisionedThroughput, ReturnValue,
};

/// `CreateTable` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableInput {
    /// The table name.
    pub table_name: String,
    /// Definitions for every attribute named in a key schema.
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// The table key schema: `HASH` first, optional `RANGE` second.
    pub key_schema: Vec<KeySchemaElement>,
    /// Global secondary indexes to create with the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
    /// Local secondary indexes to create with the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_secondary_indexes: Vec<LocalSecondaryIndex>,
    /// Provisioned throughput; accepted and echoed, never enforced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

/// `DeleteTable` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteTableInput {
    /// The table name.
    pub table_name: String,
}

/// `DescribeTable` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeTableInput {
    /// The table name.
    pub table_name: String,
}

/// `ListTables` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListTablesInput {
    /// Start listing after this name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_table_name: Option<String>,
    /// Maximum number of names to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// `PutItem` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemInput {
    /// The table name.
    pub table_name: String,
    /// The item to write; must carry every key attribute.
    pub item: Item,
    /// Condition that must hold for the write to proceed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// `#alias` substitutions for the condition expression.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
    /// `:value` substitutions for the condition expression.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,
    /// Legacy conditional form, evaluated with the comparator table.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expected: HashMap<String, ExpectedAttributeValue>,
    /// `AND` (default) or `OR` joining of multiple `Expected` entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional_operator: Option<String>,
    /// `NONE` or `ALL_OLD`.
    #[serde(default)]
    pub return_values: ReturnValue,
}

/// `GetItem` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemInput {
    /// The table name.
    pub table_name: String,
    /// The full primary key of the item.
    pub key: Item,
    /// Projection limiting the returned attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    /// `#alias` substitutions for the projection expression.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
    /// Legacy projection form, applied as a top-level attribute filter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes_to_get: Vec<String>,
    /// Strongly consistent read. Affects capacity accounting only.
    #[serde(default)]
    pub consistent_read: bool,
}

/// `DeleteItem` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemInput {
    /// The table name.
    pub table_name: String,
    /// The full primary key of the item.
    pub key: Item,
    /// Condition that must hold for the delete to proceed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// `#alias` substitutions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
    /// `:value` substitutions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,
    /// Legacy conditional form.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expected: HashMap<String, ExpectedAttributeValue>,
    /// `AND` (default) or `OR` joining of multiple `Expected` entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional_operator: Option<String>,
    /// `NONE` or `ALL_OLD`.
    #[serde(default)]
    pub return_values: ReturnValue,
}

/// `UpdateItem` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateItemInput {
    /// The table name.
    pub table_name: String,
    /// The full primary key of the item.
    pub key: Item,
    /// The update expression (`SET` / `REMOVE` / `ADD` / `DELETE`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_expression: Option<String>,
    /// Condition that must hold for the update to proceed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// `#alias` substitutions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
    /// `:value` substitutions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,
    /// Legacy update form, applied per attribute action.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attribute_updates: HashMap<String, AttributeValueUpdate>,
    /// Legacy conditional form.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expected: HashMap<String, ExpectedAttributeValue>,
    /// `AND` (default) or `OR` joining of multiple `Expected` entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional_operator: Option<String>,
    /// Any of the five return-value modes.
    #[serde(default)]
    pub return_values: ReturnValue,
}
