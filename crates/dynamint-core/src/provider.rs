//! The operation surface: table lifecycle and single-item reads/writes.
//!
//! Every operation validates first and touches storage last, so a failed
//! request never leaves partial state behind. Item writes go to the
//! table namespace under the codec key, then fan out to index namespaces.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use dynamint_model::input::{
    CreateTableInput, DeleteItemInput, DeleteTableInput, DescribeTableInput, GetItemInput,
    ListTablesInput, PutItemInput, UpdateItemInput,
};
use dynamint_model::output::{
    ConsumedCapacity, CreateTableOutput, DeleteItemOutput, DeleteTableOutput, DescribeTableOutput,
    GetItemOutput, ListTablesOutput, PutItemOutput, UpdateItemOutput,
};
use dynamint_model::types::{
    AttributeAction, AttributeDefinition, AttributeValueUpdate, ExpectedAttributeValue, Item,
    KeySchemaElement, KeyType, ProjectionType, ReturnValue, TableStatus,
};
use dynamint_model::{AttributeValue, Decimal, DynamintError};
use tracing::{debug, instrument};

use crate::config::EngineConfig;
use crate::error::{ExpressionParam, resolve_outcome};
use crate::expression::ast::{
    AttributePath, Expr, PathElement, UpdateExpr, collect_aliases_from_expr,
    collect_aliases_from_projection, collect_aliases_from_update, collect_values_from_expr,
    collect_values_from_update,
};
use crate::expression::{
    EvalContext, ValidationContext, apply_projection, apply_update, evaluate_condition,
    parse_condition, parse_projection, parse_update,
};
use crate::filter::{apply_attribute_updates, check_expected};
use crate::keys::{create_index_key, create_key};
use crate::size::{MAX_ITEM_SIZE_BYTES, capacity_units, item_size};
use crate::state::{IndexRef, Table, TableRegistry};
use crate::storage::{KeyValueStore, MemoryStore, index_namespace, table_namespace};

const MAX_TABLE_NAME_LEN: usize = 255;
const MIN_TABLE_NAME_LEN: usize = 3;

/// The engine: registry, storage, and configuration behind the DynamoDB
/// operation surface.
pub struct Provider {
    config: EngineConfig,
    registry: TableRegistry,
    store: Arc<dyn KeyValueStore>,
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("config", &self.config)
            .field("tables", &self.registry.names())
            .finish_non_exhaustive()
    }
}

impl Provider {
    /// An engine over in-memory storage with environment configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(EngineConfig::from_env(), Arc::new(MemoryStore::new()))
    }

    /// An engine over a caller-supplied backend.
    #[must_use]
    pub fn with_store(config: EngineConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            config,
            registry: TableRegistry::new(),
            store,
        }
    }

    // -----------------------------------------------------------------------
    // Table lifecycle
    // -----------------------------------------------------------------------

    /// `CreateTable`.
    #[instrument(skip_all, fields(table = %input.table_name))]
    pub fn create_table(&self, input: CreateTableInput) -> Result<CreateTableOutput, DynamintError> {
        validate_table_name(&input.table_name)?;
        validate_key_schema(&input.key_schema, &input.attribute_definitions)?;
        validate_indexes(&input)?;
        validate_definitions_used(&input)?;

        let table = Table::new(
            input.table_name.clone(),
            input.key_schema,
            input.attribute_definitions,
            input.global_secondary_indexes,
            input.local_secondary_indexes,
            input.provisioned_throughput,
            self.config.table_arn(&input.table_name),
        );
        let table = self.registry.create(table)?;
        debug!(arn = %table.arn, "table created");
        Ok(CreateTableOutput {
            table_description: table.describe(TableStatus::Active),
        })
    }

    /// `DeleteTable`.
    #[instrument(skip_all, fields(table = %input.table_name))]
    pub fn delete_table(&self, input: DeleteTableInput) -> Result<DeleteTableOutput, DynamintError> {
        validate_table_name(&input.table_name)?;
        let table = self
            .registry
            .remove(&input.table_name)
            .ok_or_else(DynamintError::resource_not_found)?;
        self.store.clear(&table_namespace(&table.name));
        for index in table.all_indexes() {
            self.store.clear(&index_namespace(&table.name, index.name));
        }
        debug!("table deleted");
        Ok(DeleteTableOutput {
            table_description: table.describe(TableStatus::Deleting),
        })
    }

    /// `DescribeTable`.
    #[instrument(skip_all, fields(table = %input.table_name))]
    pub fn describe_table(
        &self,
        input: DescribeTableInput,
    ) -> Result<DescribeTableOutput, DynamintError> {
        validate_table_name(&input.table_name)?;
        let table = self.registry.require(&input.table_name)?;
        Ok(DescribeTableOutput {
            table: table.describe(TableStatus::Active),
        })
    }

    /// `ListTables`.
    #[instrument(skip_all)]
    pub fn list_tables(&self, input: ListTablesInput) -> Result<ListTablesOutput, DynamintError> {
        let limit = input.limit.unwrap_or(100);
        if !(1..=100).contains(&limit) {
            return Err(DynamintError::validation(
                "Limit must be between 1 and 100",
            ));
        }
        let names = self.registry.names();
        let start = match &input.exclusive_start_table_name {
            Some(after) => names.partition_point(|n| n <= after),
            None => 0,
        };
        let page: Vec<String> = names.iter().skip(start).take(limit).cloned().collect();
        let last_evaluated_table_name = if start + page.len() < names.len() {
            page.last().cloned()
        } else {
            None
        };
        Ok(ListTablesOutput {
            table_names: page,
            last_evaluated_table_name,
        })
    }

    // -----------------------------------------------------------------------
    // Item operations
    // -----------------------------------------------------------------------

    /// `PutItem`.
    #[instrument(skip_all, fields(table = %input.table_name))]
    pub fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamintError> {
        let table = self.registry.require(&input.table_name)?;
        if !matches!(input.return_values, ReturnValue::None | ReturnValue::AllOld) {
            return Err(DynamintError::validation(
                "One or more parameter values were invalid: ReturnValues can only be ALL_OLD or NONE",
            ));
        }
        check_parameter_conflict(
            &[(!input.expected.is_empty()).then_some("Expected")],
            &[
                input.condition_expression.as_deref().map(|_| "ConditionExpression"),
                (!input.expression_attribute_names.is_empty())
                    .then_some("ExpressionAttributeNames"),
                (!input.expression_attribute_values.is_empty())
                    .then_some("ExpressionAttributeValues"),
            ],
        )?;
        validate_value_map(&input.expression_attribute_values)?;
        for value in input.item.values() {
            validate_value(value)?;
        }
        check_put_keys(&table, &input.item)?;

        let key = create_key(&input.item, &table.attribute_definitions, &table.key_schema);
        let new_size = item_size(
            &input.item,
            false,
            true,
            table.key_name(KeyType::Range),
        );
        if new_size > MAX_ITEM_SIZE_BYTES {
            return Err(DynamintError::validation(
                "Item size has exceeded the maximum allowed size",
            ));
        }

        let condition = self.parse_condition_param(
            input.condition_expression.as_deref(),
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;
        self.check_condition_parameter_usage(
            condition.as_ref(),
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;

        let namespace = table_namespace(&table.name);
        let old_item = self.read_item(&namespace, &key)?;
        self.enforce_condition(
            condition.as_ref(),
            &input.expected,
            input.conditional_operator.as_deref(),
            &input.expression_attribute_names,
            &input.expression_attribute_values,
            old_item.as_ref(),
        )?;

        let old_size = old_item
            .as_ref()
            .map(|i| item_size(i, false, true, table.key_name(KeyType::Range)));
        self.store
            .put(&namespace, &key, encode_item(&input.item)?);
        table.record_put(new_size, old_size);
        self.update_indexes(&table, old_item.as_ref(), Some(&input.item))?;
        debug!(%key, "item written");

        Ok(PutItemOutput {
            attributes: match input.return_values {
                ReturnValue::AllOld => old_item,
                _ => None,
            },
            consumed_capacity: Some(ConsumedCapacity {
                table_name: table.name.clone(),
                capacity_units: capacity_units(Some(&input.item), false, true),
            }),
        })
    }

    /// `GetItem`.
    #[instrument(skip_all, fields(table = %input.table_name))]
    pub fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, DynamintError> {
        let table = self.registry.require(&input.table_name)?;
        check_parameter_conflict(
            &[(!input.attributes_to_get.is_empty()).then_some("AttributesToGet")],
            &[
                input.projection_expression.as_deref().map(|_| "ProjectionExpression"),
                (!input.expression_attribute_names.is_empty())
                    .then_some("ExpressionAttributeNames"),
            ],
        )?;
        check_duplicate_attributes(&input.attributes_to_get)?;
        let key = extract_key(&table, &input.key)?;

        let projection = match input.projection_expression.as_deref() {
            Some(expression) => {
                let ctx = ValidationContext {
                    names: Some(&input.expression_attribute_names),
                    values: None,
                    key_attributes: &[],
                };
                let paths = resolve_outcome(
                    ExpressionParam::Projection,
                    parse_projection(expression, &ctx),
                )?;
                self.check_unused_names(
                    &input.expression_attribute_names,
                    &collect_aliases_from_projection(&paths),
                )?;
                Some(paths)
            }
            None => {
                if !input.expression_attribute_names.is_empty() {
                    return Err(DynamintError::validation(
                        "ExpressionAttributeNames can only be specified when using expressions",
                    ));
                }
                None
            }
        };

        let namespace = table_namespace(&table.name);
        let stored = self.read_item(&namespace, &key)?;
        let consumed = capacity_units(stored.as_ref(), true, input.consistent_read);
        let item = stored.map(|item| {
            if let Some(paths) = &projection {
                let ctx = EvalContext {
                    names: Some(&input.expression_attribute_names),
                    values: None,
                };
                apply_projection(paths, &item, &ctx)
            } else if !input.attributes_to_get.is_empty() {
                input
                    .attributes_to_get
                    .iter()
                    .filter_map(|name| item.get(name).map(|v| (name.clone(), v.clone())))
                    .collect()
            } else {
                item
            }
        });

        Ok(GetItemOutput {
            item,
            consumed_capacity: Some(ConsumedCapacity {
                table_name: table.name.clone(),
                capacity_units: consumed,
            }),
        })
    }

    /// `DeleteItem`.
    #[instrument(skip_all, fields(table = %input.table_name))]
    pub fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, DynamintError> {
        let table = self.registry.require(&input.table_name)?;
        if !matches!(input.return_values, ReturnValue::None | ReturnValue::AllOld) {
            return Err(DynamintError::validation(
                "One or more parameter values were invalid: ReturnValues can only be ALL_OLD or NONE",
            ));
        }
        check_parameter_conflict(
            &[(!input.expected.is_empty()).then_some("Expected")],
            &[
                input.condition_expression.as_deref().map(|_| "ConditionExpression"),
                (!input.expression_attribute_names.is_empty())
                    .then_some("ExpressionAttributeNames"),
                (!input.expression_attribute_values.is_empty())
                    .then_some("ExpressionAttributeValues"),
            ],
        )?;
        validate_value_map(&input.expression_attribute_values)?;
        let key = extract_key(&table, &input.key)?;
        let condition = self.parse_condition_param(
            input.condition_expression.as_deref(),
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;
        self.check_condition_parameter_usage(
            condition.as_ref(),
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;

        let namespace = table_namespace(&table.name);
        let old_item = self.read_item(&namespace, &key)?;
        self.enforce_condition(
            condition.as_ref(),
            &input.expected,
            input.conditional_operator.as_deref(),
            &input.expression_attribute_names,
            &input.expression_attribute_values,
            old_item.as_ref(),
        )?;

        if let Some(old) = &old_item {
            self.store.delete(&namespace, &key);
            table.record_delete(item_size(old, false, true, table.key_name(KeyType::Range)));
            self.update_indexes(&table, Some(old), None)?;
            debug!(%key, "item deleted");
        }

        Ok(DeleteItemOutput {
            attributes: match input.return_values {
                ReturnValue::AllOld => old_item,
                _ => None,
            },
            consumed_capacity: Some(ConsumedCapacity {
                table_name: table.name.clone(),
                capacity_units: 1.0,
            }),
        })
    }

    /// `UpdateItem`.
    #[instrument(skip_all, fields(table = %input.table_name))]
    pub fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, DynamintError> {
        let table = self.registry.require(&input.table_name)?;
        check_parameter_conflict(
            &[
                (!input.attribute_updates.is_empty()).then_some("AttributeUpdates"),
                (!input.expected.is_empty()).then_some("Expected"),
            ],
            &[
                input.update_expression.as_deref().map(|_| "UpdateExpression"),
                input.condition_expression.as_deref().map(|_| "ConditionExpression"),
                (!input.expression_attribute_names.is_empty())
                    .then_some("ExpressionAttributeNames"),
                (!input.expression_attribute_values.is_empty())
                    .then_some("ExpressionAttributeValues"),
            ],
        )?;
        validate_value_map(&input.expression_attribute_values)?;
        let key = extract_key(&table, &input.key)?;

        let key_attributes = table.key_attribute_names();
        let update = match input.update_expression.as_deref() {
            Some(expression) => {
                let ctx = ValidationContext {
                    names: Some(&input.expression_attribute_names),
                    values: Some(&input.expression_attribute_values),
                    key_attributes: &key_attributes,
                };
                Some(resolve_outcome(
                    ExpressionParam::Update,
                    parse_update(expression, &ctx),
                )?)
            }
            None => None,
        };
        let condition = self.parse_condition_param(
            input.condition_expression.as_deref(),
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;
        self.check_update_parameter_usage(&input, update.as_ref(), condition.as_ref())?;
        if update.is_none() {
            validate_attribute_updates(&table, &input.attribute_updates)?;
        }

        let namespace = table_namespace(&table.name);
        let old_item = self.read_item(&namespace, &key)?;
        self.enforce_condition(
            condition.as_ref(),
            &input.expected,
            input.conditional_operator.as_deref(),
            &input.expression_attribute_names,
            &input.expression_attribute_values,
            old_item.as_ref(),
        )?;

        // A purely subtractive update (REMOVE/DELETE only) of a missing
        // item must not conjure a key-only item into existence.
        if old_item.is_none() && is_purely_subtractive(update.as_ref(), &input.attribute_updates) {
            return Ok(UpdateItemOutput {
                attributes: None,
                consumed_capacity: Some(ConsumedCapacity {
                    table_name: table.name.clone(),
                    capacity_units: 1.0,
                }),
            });
        }

        let mut new_item = old_item.clone().unwrap_or_else(|| input.key.clone());
        let touched: BTreeSet<String> = match &update {
            Some(update) => {
                let ctx = EvalContext {
                    names: Some(&input.expression_attribute_names),
                    values: Some(&input.expression_attribute_values),
                };
                apply_update(update, &mut new_item, &ctx)?;
                update_target_names(update, &input.expression_attribute_names)
            }
            None => {
                apply_attribute_updates(&input.attribute_updates, &mut new_item)?;
                input.attribute_updates.keys().cloned().collect()
            }
        };
        if item_size(&new_item, false, true, table.key_name(KeyType::Range)) > MAX_ITEM_SIZE_BYTES
        {
            return Err(DynamintError::validation(
                "Item size to update has exceeded the maximum allowed size",
            ));
        }

        let range_key = table.key_name(KeyType::Range);
        let old_size = old_item.as_ref().map(|i| item_size(i, false, true, range_key));
        self.store.put(&namespace, &key, encode_item(&new_item)?);
        table.record_put(item_size(&new_item, false, true, range_key), old_size);
        self.update_indexes(&table, old_item.as_ref(), Some(&new_item))?;
        debug!(%key, "item updated");

        let attributes = match input.return_values {
            ReturnValue::None => None,
            ReturnValue::AllOld => old_item,
            ReturnValue::AllNew => Some(new_item.clone()),
            ReturnValue::UpdatedOld => old_item.map(|old| subset(&old, &touched)),
            ReturnValue::UpdatedNew => Some(subset(&new_item, &touched)),
        };
        Ok(UpdateItemOutput {
            attributes: attributes.filter(|a| !a.is_empty()),
            consumed_capacity: Some(ConsumedCapacity {
                table_name: table.name.clone(),
                capacity_units: capacity_units(Some(&new_item), false, true),
            }),
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn read_item(&self, namespace: &str, key: &str) -> Result<Option<Item>, DynamintError> {
        self.store.get(namespace, key).map(|b| decode_item(&b)).transpose()
    }

    fn parse_condition_param(
        &self,
        expression: Option<&str>,
        names: &HashMap<String, String>,
        values: &HashMap<String, AttributeValue>,
    ) -> Result<Option<Expr>, DynamintError> {
        let Some(expression) = expression else {
            return Ok(None);
        };
        let ctx = ValidationContext {
            names: Some(names),
            values: Some(values),
            key_attributes: &[],
        };
        let expr = resolve_outcome(ExpressionParam::Condition, parse_condition(expression, &ctx))?;
        Ok(Some(expr))
    }

    fn enforce_condition(
        &self,
        condition: Option<&Expr>,
        expected: &HashMap<String, ExpectedAttributeValue>,
        conditional_operator: Option<&str>,
        names: &HashMap<String, String>,
        values: &HashMap<String, AttributeValue>,
        old_item: Option<&Item>,
    ) -> Result<(), DynamintError> {
        if let Some(expr) = condition {
            let ctx = EvalContext {
                names: Some(names),
                values: Some(values),
            };
            if !evaluate_condition(expr, old_item, &ctx) {
                return Err(DynamintError::conditional_check_failed());
            }
        } else if !expected.is_empty()
            && !check_expected(expected, conditional_operator, old_item)
        {
            return Err(DynamintError::conditional_check_failed());
        }
        Ok(())
    }

    /// Name and value maps are only legal alongside an expression, and in
    /// strict mode every entry must be referenced by one.
    fn check_condition_parameter_usage(
        &self,
        condition: Option<&Expr>,
        names: &HashMap<String, String>,
        values: &HashMap<String, AttributeValue>,
    ) -> Result<(), DynamintError> {
        let Some(expr) = condition else {
            if !names.is_empty() {
                return Err(DynamintError::validation(
                    "ExpressionAttributeNames can only be specified when using expressions",
                ));
            }
            if !values.is_empty() {
                return Err(DynamintError::validation(
                    "ExpressionAttributeValues can only be specified when using expressions",
                ));
            }
            return Ok(());
        };
        self.check_unused_names(names, &collect_aliases_from_expr(expr))?;
        self.check_unused_values(values, &collect_values_from_expr(expr))
    }

    /// Unused `ExpressionAttributeNames`/`Values` across an update
    /// request's expressions, checked jointly since both expressions draw
    /// from the same maps.
    fn check_update_parameter_usage(
        &self,
        input: &UpdateItemInput,
        update: Option<&UpdateExpr>,
        condition: Option<&Expr>,
    ) -> Result<(), DynamintError> {
        if update.is_none() && condition.is_none() {
            if !input.expression_attribute_names.is_empty() {
                return Err(DynamintError::validation(
                    "ExpressionAttributeNames can only be specified when using expressions",
                ));
            }
            if !input.expression_attribute_values.is_empty() {
                return Err(DynamintError::validation(
                    "ExpressionAttributeValues can only be specified when using expressions",
                ));
            }
            return Ok(());
        }
        let mut aliases = update.map(collect_aliases_from_update).unwrap_or_default();
        let mut values = update.map(collect_values_from_update).unwrap_or_default();
        if let Some(expr) = condition {
            aliases.extend(collect_aliases_from_expr(expr));
            values.extend(collect_values_from_expr(expr));
        }
        self.check_unused_names(&input.expression_attribute_names, &aliases)?;
        self.check_unused_values(&input.expression_attribute_values, &values)
    }

    fn check_unused_names(
        &self,
        provided: &HashMap<String, String>,
        used: &BTreeSet<String>,
    ) -> Result<(), DynamintError> {
        if !self.config.strict_validation {
            return Ok(());
        }
        let unused: Vec<&str> = provided
            .keys()
            .filter(|k| {
                k.strip_prefix('#')
                    .is_none_or(|alias| !used.contains(alias))
            })
            .map(String::as_str)
            .collect();
        if unused.is_empty() {
            Ok(())
        } else {
            Err(unused_parameter_error("ExpressionAttributeNames", unused))
        }
    }

    fn check_unused_values(
        &self,
        provided: &HashMap<String, AttributeValue>,
        used: &BTreeSet<String>,
    ) -> Result<(), DynamintError> {
        if !self.config.strict_validation {
            return Ok(());
        }
        let unused: Vec<&str> = provided
            .keys()
            .filter(|k| {
                k.strip_prefix(':')
                    .is_none_or(|value| !used.contains(value))
            })
            .map(String::as_str)
            .collect();
        if unused.is_empty() {
            Ok(())
        } else {
            Err(unused_parameter_error("ExpressionAttributeValues", unused))
        }
    }

    /// Maintain every secondary index after a write or delete.
    ///
    /// An item missing any index key attribute has no entry in that index;
    /// that is what makes sparse indexes work.
    fn update_indexes(
        &self,
        table: &Table,
        old_item: Option<&Item>,
        new_item: Option<&Item>,
    ) -> Result<(), DynamintError> {
        for index in table.all_indexes() {
            let namespace = index_namespace(&table.name, index.name);
            let old_key = old_item.and_then(|item| self.index_entry_key(table, &index, item));
            let new_key = new_item.and_then(|item| self.index_entry_key(table, &index, item));

            if let Some(old_key) = &old_key {
                if new_key.as_deref() != Some(old_key) {
                    self.store.delete(&namespace, old_key);
                }
            }
            if let (Some(new_key), Some(item)) = (new_key, new_item) {
                let projected = project_for_index(table, &index, item);
                self.store.put(&namespace, &new_key, encode_item(&projected)?);
            }
        }
        Ok(())
    }

    fn index_entry_key(&self, table: &Table, index: &IndexRef<'_>, item: &Item) -> Option<String> {
        let complete = index
            .key_schema
            .iter()
            .all(|element| item.contains_key(&element.attribute_name));
        complete.then(|| {
            create_index_key(
                item,
                &table.attribute_definitions,
                &table.key_schema,
                index.key_schema,
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Request validation
// ---------------------------------------------------------------------------

fn validate_table_name(name: &str) -> Result<(), DynamintError> {
    let valid_len = (MIN_TABLE_NAME_LEN..=MAX_TABLE_NAME_LEN).contains(&name.len());
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid_len && valid_chars {
        Ok(())
    } else {
        Err(DynamintError::validation(format!(
            "Invalid table/index name. Table/index names must be between 3 and 255 characters long, and may contain only the characters a-z, A-Z, 0-9, '_', '-', and '.': {name}"
        )))
    }
}

fn validate_key_schema(
    key_schema: &[KeySchemaElement],
    definitions: &[AttributeDefinition],
) -> Result<(), DynamintError> {
    match key_schema {
        [] => {
            return Err(DynamintError::validation(
                "Invalid KeySchema: The first KeySchemaElement is not a HASH key type",
            ));
        }
        [first, ..] if first.key_type != KeyType::Hash => {
            return Err(DynamintError::validation(
                "Invalid KeySchema: The first KeySchemaElement is not a HASH key type",
            ));
        }
        [_, second] if second.key_type != KeyType::Range => {
            return Err(DynamintError::validation(
                "Invalid KeySchema: The second KeySchemaElement is not a RANGE key type",
            ));
        }
        [_] | [_, _] => {}
        _ => {
            return Err(DynamintError::validation(
                "Invalid KeySchema: A key schema may contain at most two elements",
            ));
        }
    }
    check_key_attributes_defined(key_schema, definitions)
}

fn check_key_attributes_defined(
    key_schema: &[KeySchemaElement],
    definitions: &[AttributeDefinition],
) -> Result<(), DynamintError> {
    for element in key_schema {
        let Some(definition) = definitions
            .iter()
            .find(|d| d.attribute_name == element.attribute_name)
        else {
            let keys: Vec<&str> = key_schema
                .iter()
                .map(|e| e.attribute_name.as_str())
                .collect();
            let defined: Vec<&str> = definitions
                .iter()
                .map(|d| d.attribute_name.as_str())
                .collect();
            return Err(DynamintError::validation(format!(
                "One or more parameter values were invalid: Some index key attributes are not defined in AttributeDefinitions. Keys: [{}], AttributeDefinitions: [{}]",
                keys.join(", "),
                defined.join(", ")
            )));
        };
        if !definition.attribute_type.is_valid_key_type() {
            return Err(DynamintError::validation(format!(
                "One or more parameter values were invalid: Invalid attribute type for key attribute {}: {}. Valid types are: B, N, S",
                element.attribute_name, definition.attribute_type
            )));
        }
    }
    Ok(())
}

fn validate_indexes(input: &CreateTableInput) -> Result<(), DynamintError> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let table_hash = input
        .key_schema
        .iter()
        .find(|e| e.key_type == KeyType::Hash)
        .map(|e| e.attribute_name.as_str())
        .unwrap_or_default();
    let table_has_range = input
        .key_schema
        .iter()
        .any(|e| e.key_type == KeyType::Range);

    for index in &input.local_secondary_indexes {
        validate_table_name(&index.index_name)?;
        if !seen.insert(&index.index_name) {
            return Err(duplicate_index_error(&index.index_name));
        }
        if !table_has_range {
            return Err(DynamintError::validation(
                "One or more parameter values were invalid: Table KeySchema does not have a range key, which is required when specifying a LocalSecondaryIndex",
            ));
        }
        validate_key_schema(&index.key_schema, &input.attribute_definitions)?;
        let index_hash = index
            .key_schema
            .iter()
            .find(|e| e.key_type == KeyType::Hash)
            .map(|e| e.attribute_name.as_str())
            .unwrap_or_default();
        if index_hash != table_hash {
            return Err(DynamintError::validation(format!(
                "One or more parameter values were invalid: Index KeySchema does not have the same leading hash key as table KeySchema for index: {}. index hash key: {index_hash}, table hash key: {table_hash}",
                index.index_name
            )));
        }
    }
    for index in &input.global_secondary_indexes {
        validate_table_name(&index.index_name)?;
        if !seen.insert(&index.index_name) {
            return Err(duplicate_index_error(&index.index_name));
        }
        validate_key_schema(&index.key_schema, &input.attribute_definitions)?;
    }
    Ok(())
}

fn duplicate_index_error(name: &str) -> DynamintError {
    DynamintError::validation(format!(
        "One or more parameter values were invalid: Duplicate index name: {name}"
    ))
}

/// Every attribute definition must be referenced by the table key schema
/// or some index key schema.
fn validate_definitions_used(input: &CreateTableInput) -> Result<(), DynamintError> {
    let mut used: BTreeSet<&str> = input
        .key_schema
        .iter()
        .map(|e| e.attribute_name.as_str())
        .collect();
    for schema in input
        .local_secondary_indexes
        .iter()
        .map(|i| &i.key_schema)
        .chain(input.global_secondary_indexes.iter().map(|i| &i.key_schema))
    {
        used.extend(schema.iter().map(|e| e.attribute_name.as_str()));
    }
    let unused: Vec<&str> = input
        .attribute_definitions
        .iter()
        .map(|d| d.attribute_name.as_str())
        .filter(|name| !used.contains(name))
        .collect();
    if unused.is_empty() {
        Ok(())
    } else {
        Err(DynamintError::validation(format!(
            "One or more parameter values were invalid: Some AttributeDefinitions are not used. AttributeDefinitions: [{}], keys used: [{}]",
            unused.join(", "),
            used.into_iter().collect::<Vec<_>>().join(", ")
        )))
    }
}

/// Validate every number and set inside a value, recursively.
fn validate_value(value: &AttributeValue) -> Result<(), DynamintError> {
    match value {
        AttributeValue::N(n) => {
            Decimal::parse(n).map_err(|e| DynamintError::validation(e.to_string()))?;
        }
        AttributeValue::Ns(set) => {
            if set.is_empty() {
                return Err(empty_set_error("number"));
            }
            for n in set {
                Decimal::parse(n).map_err(|e| DynamintError::validation(e.to_string()))?;
            }
        }
        AttributeValue::Ss(set) if set.is_empty() => return Err(empty_set_error("string")),
        AttributeValue::Bs(set) if set.is_empty() => return Err(empty_set_error("binary")),
        AttributeValue::L(list) => {
            for element in list {
                validate_value(element)?;
            }
        }
        AttributeValue::M(map) => {
            for element in map.values() {
                validate_value(element)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn empty_set_error(kind: &str) -> DynamintError {
    DynamintError::validation(format!(
        "One or more parameter values were invalid: An {kind} set may not be empty"
    ))
}

fn validate_value_map(values: &HashMap<String, AttributeValue>) -> Result<(), DynamintError> {
    for value in values.values() {
        validate_value(value)?;
    }
    Ok(())
}

/// The item of a `PutItem` must carry each key attribute with its defined
/// type.
fn check_put_keys(table: &Table, item: &Item) -> Result<(), DynamintError> {
    for element in &table.key_schema {
        let name = &element.attribute_name;
        let Some(value) = item.get(name) else {
            return Err(DynamintError::validation(format!(
                "One or more parameter values were invalid: Missing the key {name} in the item"
            )));
        };
        let expected = table
            .attribute_type(name)
            .map(ToString::to_string)
            .unwrap_or_default();
        if value.type_descriptor() != expected {
            return Err(DynamintError::validation(format!(
                "One or more parameter values were invalid: Type mismatch for key {name} expected: {expected} actual: {}",
                value.type_descriptor()
            )));
        }
    }
    Ok(())
}

/// A request `Key` must name exactly the key attributes, correctly typed.
fn extract_key(table: &Table, key: &Item) -> Result<String, DynamintError> {
    let schema_error =
        || DynamintError::validation("The provided key element does not match the schema");
    if key.len() != table.key_schema.len() {
        return Err(schema_error());
    }
    for element in &table.key_schema {
        let value = key.get(&element.attribute_name).ok_or_else(schema_error)?;
        validate_value(value)?;
        let expected = table
            .attribute_type(&element.attribute_name)
            .map(ToString::to_string)
            .unwrap_or_default();
        if value.type_descriptor() != expected {
            return Err(schema_error());
        }
    }
    Ok(create_key(key, &table.attribute_definitions, &table.key_schema))
}

fn check_duplicate_attributes(names: &[String]) -> Result<(), DynamintError> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(DynamintError::validation(format!(
                "One or more parameter values were invalid: Duplicate value in attribute name: {name}"
            )));
        }
    }
    Ok(())
}

/// Legacy and expression parameters cannot mix in one request.
fn check_parameter_conflict(
    non_expression: &[Option<&str>],
    expression: &[Option<&str>],
) -> Result<(), DynamintError> {
    fn present<'a>(slots: &[Option<&'a str>]) -> Vec<&'a str> {
        slots.iter().flatten().copied().collect()
    }
    let non_expression = present(non_expression);
    let expression = present(expression);
    if non_expression.is_empty() || expression.is_empty() {
        return Ok(());
    }
    Err(DynamintError::validation(format!(
        "Can not use both expression and non-expression parameters in the same request: Non-expression parameters: {{{}}} Expression parameters: {{{}}}",
        non_expression.join(", "),
        expression.join(", ")
    )))
}

fn unused_parameter_error(parameter: &str, mut keys: Vec<&str>) -> DynamintError {
    keys.sort_unstable();
    DynamintError::validation(format!(
        "Value provided in {parameter} unused in expressions: keys: {{{}}}",
        keys.join(", ")
    ))
}

/// Legacy `AttributeUpdates` shape checks: value presence per action, key
/// attributes untouchable, `ADD`/`DELETE` value types.
fn validate_attribute_updates(
    table: &Table,
    updates: &HashMap<String, AttributeValueUpdate>,
) -> Result<(), DynamintError> {
    for (name, update) in updates {
        if table.key_schema.iter().any(|e| &e.attribute_name == name) {
            return Err(DynamintError::validation(format!(
                "One or more parameter values were invalid: Cannot update attribute {name}. This attribute is part of the key"
            )));
        }
        let action = update.action.unwrap_or_default();
        match (&update.value, action) {
            (None, AttributeAction::Delete) => {}
            (None, _) => {
                return Err(DynamintError::validation(
                    "One or more parameter values were invalid: Only DELETE action is allowed when no attribute value is specified",
                ));
            }
            (Some(value), action) => {
                validate_value(value)?;
                let t = value.type_descriptor();
                match action {
                    AttributeAction::Add if !matches!(t, "N" | "SS" | "NS" | "BS") => {
                        return Err(DynamintError::validation(format!(
                            "One or more parameter values were invalid: Action ADD is not supported for the type {t}"
                        )));
                    }
                    AttributeAction::Delete if !matches!(t, "SS" | "NS" | "BS") => {
                        return Err(DynamintError::validation(format!(
                            "One or more parameter values were invalid: Action DELETE is not supported for the type {t}"
                        )));
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Item plumbing
// ---------------------------------------------------------------------------

fn encode_item(item: &Item) -> Result<Bytes, DynamintError> {
    serde_json::to_vec(item)
        .map(Bytes::from)
        .map_err(|e| DynamintError::internal(format!("failed to encode item: {e}")))
}

fn decode_item(bytes: &Bytes) -> Result<Item, DynamintError> {
    serde_json::from_slice(bytes)
        .map_err(|e| DynamintError::internal(format!("failed to decode stored item: {e}")))
}

/// Top-level attribute names an update expression touches, with aliases
/// resolved.
fn update_target_names(update: &UpdateExpr, names: &HashMap<String, String>) -> BTreeSet<String> {
    update
        .target_paths()
        .into_iter()
        .filter_map(|path| top_level_name(path, names))
        .collect()
}

fn top_level_name(path: &AttributePath, names: &HashMap<String, String>) -> Option<String> {
    match path.elements.first()? {
        PathElement::Attribute(name) => Some(name.clone()),
        PathElement::Alias(alias) => names.get(&format!("#{alias}")).cloned(),
        PathElement::Index(_) => None,
    }
}

fn is_purely_subtractive(
    update: Option<&UpdateExpr>,
    attribute_updates: &HashMap<String, AttributeValueUpdate>,
) -> bool {
    match update {
        Some(update) => {
            update.set_actions.is_empty()
                && update.add_actions.is_empty()
                && !(update.remove_paths.is_empty() && update.delete_actions.is_empty())
        }
        None => {
            !attribute_updates.is_empty()
                && attribute_updates
                    .values()
                    .all(|u| u.action.unwrap_or_default() == AttributeAction::Delete)
        }
    }
}

fn subset(item: &Item, names: &BTreeSet<String>) -> Item {
    item.iter()
        .filter(|(name, _)| names.contains(*name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Apply an index's projection to a table item.
fn project_for_index(table: &Table, index: &IndexRef<'_>, item: &Item) -> Item {
    let projection_type = index
        .projection
        .and_then(|p| p.projection_type)
        .unwrap_or_default();
    if projection_type == ProjectionType::All {
        return item.clone();
    }
    let mut keep: BTreeSet<&str> = table
        .key_schema
        .iter()
        .chain(index.key_schema.iter())
        .map(|e| e.attribute_name.as_str())
        .collect();
    if projection_type == ProjectionType::Include {
        if let Some(projection) = index.projection {
            keep.extend(projection.non_key_attributes.iter().map(String::as_str));
        }
    }
    item.iter()
        .filter(|(name, _)| keep.contains(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use dynamint_model::DynamintErrorCode;
    use dynamint_model::types::{
        GlobalSecondaryIndex, KeyType, Projection, ScalarAttributeType,
    };

    use super::*;

    fn provider() -> Provider {
        Provider::with_store(EngineConfig::default(), Arc::new(MemoryStore::new()))
    }

    fn s(v: &str) -> AttributeValue {
        AttributeValue::S(v.to_string())
    }

    fn n(v: &str) -> AttributeValue {
        AttributeValue::N(v.to_string())
    }

    fn item(pairs: &[(&str, AttributeValue)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn users_table() -> CreateTableInput {
        CreateTableInput {
            table_name: "users".to_string(),
            attribute_definitions: vec![AttributeDefinition {
                attribute_name: "pk".to_string(),
                attribute_type: ScalarAttributeType::S,
            }],
            key_schema: vec![KeySchemaElement {
                attribute_name: "pk".to_string(),
                key_type: KeyType::Hash,
            }],
            global_secondary_indexes: vec![],
            local_secondary_indexes: vec![],
            provisioned_throughput: None,
        }
    }

    fn put(provider: &Provider, table: &str, value: Item) -> Result<PutItemOutput, DynamintError> {
        provider.put_item(PutItemInput {
            table_name: table.to_string(),
            item: value,
            condition_expression: None,
            expression_attribute_names: HashMap::new(),
            expression_attribute_values: HashMap::new(),
            expected: HashMap::new(),
            conditional_operator: None,
            return_values: ReturnValue::None,
        })
    }

    fn get(provider: &Provider, table: &str, key: Item) -> Result<GetItemOutput, DynamintError> {
        provider.get_item(GetItemInput {
            table_name: table.to_string(),
            key,
            projection_expression: None,
            expression_attribute_names: HashMap::new(),
            attributes_to_get: vec![],
            consistent_read: false,
        })
    }

    #[test]
    fn test_should_create_describe_and_delete_table() {
        let provider = provider();
        let created = provider.create_table(users_table()).unwrap();
        assert_eq!(created.table_description.table_status, TableStatus::Active);
        assert!(created.table_description.table_id.is_some());

        let described = provider
            .describe_table(DescribeTableInput {
                table_name: "users".to_string(),
            })
            .unwrap();
        assert_eq!(described.table.table_name, "users");

        let deleted = provider
            .delete_table(DeleteTableInput {
                table_name: "users".to_string(),
            })
            .unwrap();
        assert_eq!(deleted.table_description.table_status, TableStatus::Deleting);

        let err = provider
            .describe_table(DescribeTableInput {
                table_name: "users".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.code, DynamintErrorCode::ResourceNotFoundException);
    }

    #[test]
    fn test_should_reject_duplicate_table_creation() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        let err = provider.create_table(users_table()).unwrap_err();
        assert_eq!(err.code, DynamintErrorCode::ResourceInUseException);
    }

    #[test]
    fn test_should_reject_bad_table_names_and_key_schemas() {
        let provider = provider();
        let mut input = users_table();
        input.table_name = "ab".to_string();
        let err = provider.create_table(input).unwrap_err();
        assert!(err.message.contains("between 3 and 255 characters"));

        let mut input = users_table();
        input.key_schema[0].key_type = KeyType::Range;
        let err = provider.create_table(input).unwrap_err();
        assert_eq!(
            err.message,
            "Invalid KeySchema: The first KeySchemaElement is not a HASH key type"
        );

        let mut input = users_table();
        input.attribute_definitions.push(AttributeDefinition {
            attribute_name: "orphan".to_string(),
            attribute_type: ScalarAttributeType::N,
        });
        let err = provider.create_table(input).unwrap_err();
        assert!(err.message.contains("Some AttributeDefinitions are not used"));
    }

    #[test]
    fn test_should_paginate_list_tables() {
        let provider = provider();
        for name in ["alpha", "beta", "gamma"] {
            let mut input = users_table();
            input.table_name = name.to_string();
            provider.create_table(input).unwrap();
        }
        let first = provider
            .list_tables(ListTablesInput {
                exclusive_start_table_name: None,
                limit: Some(2),
            })
            .unwrap();
        assert_eq!(first.table_names, vec!["alpha", "beta"]);
        assert_eq!(first.last_evaluated_table_name.as_deref(), Some("beta"));

        let rest = provider
            .list_tables(ListTablesInput {
                exclusive_start_table_name: first.last_evaluated_table_name,
                limit: Some(2),
            })
            .unwrap();
        assert_eq!(rest.table_names, vec!["gamma"]);
        assert!(rest.last_evaluated_table_name.is_none());
    }

    #[test]
    fn test_should_put_and_get_an_item() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        put(
            &provider,
            "users",
            item(&[("pk", s("u1")), ("age", n("30"))]),
        )
        .unwrap();

        let output = get(&provider, "users", item(&[("pk", s("u1"))])).unwrap();
        let fetched = output.item.unwrap();
        assert_eq!(fetched.get("age"), Some(&n("30")));
        let capacity = output.consumed_capacity.unwrap();
        assert_eq!(capacity.table_name, "users");
        assert_eq!(capacity.capacity_units, 0.5);
    }

    #[test]
    fn test_should_reject_put_missing_or_mistyped_key() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();

        let err = put(&provider, "users", item(&[("age", n("30"))])).unwrap_err();
        assert_eq!(
            err.message,
            "One or more parameter values were invalid: Missing the key pk in the item"
        );

        let err = put(&provider, "users", item(&[("pk", n("1"))])).unwrap_err();
        assert_eq!(
            err.message,
            "One or more parameter values were invalid: Type mismatch for key pk expected: S actual: N"
        );
    }

    #[test]
    fn test_should_reject_empty_sets_and_bad_numbers() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();

        let err = put(
            &provider,
            "users",
            item(&[("pk", s("u1")), ("tags", AttributeValue::Ss(vec![]))]),
        )
        .unwrap_err();
        assert_eq!(
            err.message,
            "One or more parameter values were invalid: An string set may not be empty"
        );

        let err = put(&provider, "users", item(&[("pk", s("u1")), ("age", n("abc"))]))
            .unwrap_err();
        assert_eq!(err.code, DynamintErrorCode::ValidationException);
    }

    #[test]
    fn test_should_enforce_condition_expressions_on_put() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        put(&provider, "users", item(&[("pk", s("u1"))])).unwrap();

        let err = provider
            .put_item(PutItemInput {
                table_name: "users".to_string(),
                item: item(&[("pk", s("u1"))]),
                condition_expression: Some("attribute_not_exists(pk)".to_string()),
                expression_attribute_names: HashMap::new(),
                expression_attribute_values: HashMap::new(),
                expected: HashMap::new(),
                conditional_operator: None,
                return_values: ReturnValue::None,
            })
            .unwrap_err();
        assert_eq!(err.code, DynamintErrorCode::ConditionalCheckFailedException);
    }

    #[test]
    fn test_should_reject_mixed_expression_and_legacy_parameters() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        let err = provider
            .put_item(PutItemInput {
                table_name: "users".to_string(),
                item: item(&[("pk", s("u1"))]),
                condition_expression: Some("attribute_not_exists(pk)".to_string()),
                expression_attribute_names: HashMap::new(),
                expression_attribute_values: HashMap::new(),
                expected: HashMap::from([(
                    "pk".to_string(),
                    ExpectedAttributeValue {
                        value: None,
                        exists: Some(false),
                        comparison_operator: None,
                        attribute_value_list: vec![],
                    },
                )]),
                conditional_operator: None,
                return_values: ReturnValue::None,
            })
            .unwrap_err();
        assert_eq!(
            err.message,
            "Can not use both expression and non-expression parameters in the same request: Non-expression parameters: {Expected} Expression parameters: {ConditionExpression}"
        );
    }

    #[test]
    fn test_should_flag_unused_expression_names() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        let err = provider
            .put_item(PutItemInput {
                table_name: "users".to_string(),
                item: item(&[("pk", s("u1"))]),
                condition_expression: Some("attribute_not_exists(pk)".to_string()),
                expression_attribute_names: HashMap::from([(
                    "#x".to_string(),
                    "x".to_string(),
                )]),
                expression_attribute_values: HashMap::new(),
                expected: HashMap::new(),
                conditional_operator: None,
                return_values: ReturnValue::None,
            })
            .unwrap_err();
        assert_eq!(
            err.message,
            "Value provided in ExpressionAttributeNames unused in expressions: keys: {#x}"
        );
    }

    #[test]
    fn test_should_delete_item_and_return_old_values() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        put(&provider, "users", item(&[("pk", s("u1")), ("age", n("30"))])).unwrap();

        let output = provider
            .delete_item(DeleteItemInput {
                table_name: "users".to_string(),
                key: item(&[("pk", s("u1"))]),
                condition_expression: None,
                expression_attribute_names: HashMap::new(),
                expression_attribute_values: HashMap::new(),
                expected: HashMap::new(),
                conditional_operator: None,
                return_values: ReturnValue::AllOld,
            })
            .unwrap();
        assert_eq!(output.attributes.unwrap().get("age"), Some(&n("30")));
        assert!(get(&provider, "users", item(&[("pk", s("u1"))]))
            .unwrap()
            .item
            .is_none());
    }

    #[test]
    fn test_should_update_with_expression_and_return_updated_new() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        put(&provider, "users", item(&[("pk", s("u1")), ("age", n("30"))])).unwrap();

        let output = provider
            .update_item(UpdateItemInput {
                table_name: "users".to_string(),
                key: item(&[("pk", s("u1"))]),
                update_expression: Some("SET age = age + :d, city = :c".to_string()),
                condition_expression: None,
                expression_attribute_names: HashMap::new(),
                expression_attribute_values: HashMap::from([
                    (":d".to_string(), n("1")),
                    (":c".to_string(), s("Oslo")),
                ]),
                attribute_updates: HashMap::new(),
                expected: HashMap::new(),
                conditional_operator: None,
                return_values: ReturnValue::UpdatedNew,
            })
            .unwrap();
        let attributes = output.attributes.unwrap();
        assert_eq!(attributes.get("age"), Some(&n("31")));
        assert_eq!(attributes.get("city"), Some(&s("Oslo")));
        assert!(!attributes.contains_key("pk"));
    }

    #[test]
    fn test_should_upsert_on_update_of_missing_item() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        provider
            .update_item(UpdateItemInput {
                table_name: "users".to_string(),
                key: item(&[("pk", s("u2"))]),
                update_expression: Some("SET age = :a".to_string()),
                condition_expression: None,
                expression_attribute_names: HashMap::new(),
                expression_attribute_values: HashMap::from([(":a".to_string(), n("7"))]),
                attribute_updates: HashMap::new(),
                expected: HashMap::new(),
                conditional_operator: None,
                return_values: ReturnValue::None,
            })
            .unwrap();
        let fetched = get(&provider, "users", item(&[("pk", s("u2"))]))
            .unwrap()
            .item
            .unwrap();
        assert_eq!(fetched.get("pk"), Some(&s("u2")));
        assert_eq!(fetched.get("age"), Some(&n("7")));
    }

    #[test]
    fn test_should_not_create_item_from_subtractive_update() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        provider
            .update_item(UpdateItemInput {
                table_name: "users".to_string(),
                key: item(&[("pk", s("ghost"))]),
                update_expression: Some("REMOVE age".to_string()),
                condition_expression: None,
                expression_attribute_names: HashMap::new(),
                expression_attribute_values: HashMap::new(),
                attribute_updates: HashMap::new(),
                expected: HashMap::new(),
                conditional_operator: None,
                return_values: ReturnValue::None,
            })
            .unwrap();
        assert!(get(&provider, "users", item(&[("pk", s("ghost"))]))
            .unwrap()
            .item
            .is_none());
    }

    #[test]
    fn test_should_reject_update_expression_touching_key_attribute() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        let err = provider
            .update_item(UpdateItemInput {
                table_name: "users".to_string(),
                key: item(&[("pk", s("u1"))]),
                update_expression: Some("SET pk = :v".to_string()),
                condition_expression: None,
                expression_attribute_names: HashMap::new(),
                expression_attribute_values: HashMap::from([(":v".to_string(), s("u2"))]),
                attribute_updates: HashMap::new(),
                expected: HashMap::new(),
                conditional_operator: None,
                return_values: ReturnValue::None,
            })
            .unwrap_err();
        assert!(err.message.contains("This attribute is part of the key"));
    }

    #[test]
    fn test_should_apply_legacy_attribute_updates() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        put(&provider, "users", item(&[("pk", s("u1")), ("age", n("30"))])).unwrap();

        let output = provider
            .update_item(UpdateItemInput {
                table_name: "users".to_string(),
                key: item(&[("pk", s("u1"))]),
                update_expression: None,
                condition_expression: None,
                expression_attribute_names: HashMap::new(),
                expression_attribute_values: HashMap::new(),
                attribute_updates: HashMap::from([(
                    "age".to_string(),
                    AttributeValueUpdate {
                        value: Some(n("5")),
                        action: Some(AttributeAction::Add),
                    },
                )]),
                expected: HashMap::new(),
                conditional_operator: None,
                return_values: ReturnValue::AllNew,
            })
            .unwrap();
        assert_eq!(output.attributes.unwrap().get("age"), Some(&n("35")));
    }

    #[test]
    fn test_should_filter_with_projection_expression_on_get() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        put(
            &provider,
            "users",
            item(&[("pk", s("u1")), ("age", n("30")), ("city", s("Oslo"))]),
        )
        .unwrap();

        let output = provider
            .get_item(GetItemInput {
                table_name: "users".to_string(),
                key: item(&[("pk", s("u1"))]),
                projection_expression: Some("age".to_string()),
                expression_attribute_names: HashMap::new(),
                attributes_to_get: vec![],
                consistent_read: true,
            })
            .unwrap();
        let fetched = output.item.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched.get("age"), Some(&n("30")));
        assert_eq!(output.consumed_capacity.unwrap().capacity_units, 1.0);
    }

    #[test]
    fn test_should_reject_key_not_matching_schema() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        let err = get(&provider, "users", item(&[("pk", s("u1")), ("extra", s("x"))]))
            .unwrap_err();
        assert_eq!(
            err.message,
            "The provided key element does not match the schema"
        );
    }

    #[test]
    fn test_should_track_item_count_in_description() {
        let provider = provider();
        provider.create_table(users_table()).unwrap();
        put(&provider, "users", item(&[("pk", s("u1"))])).unwrap();
        put(&provider, "users", item(&[("pk", s("u2"))])).unwrap();
        put(&provider, "users", item(&[("pk", s("u1"))])).unwrap();

        let described = provider
            .describe_table(DescribeTableInput {
                table_name: "users".to_string(),
            })
            .unwrap();
        assert_eq!(described.table.item_count, 2);
    }

    #[test]
    fn test_should_maintain_sparse_index_entries() {
        let provider = provider();
        let mut input = users_table();
        input.attribute_definitions.push(AttributeDefinition {
            attribute_name: "email".to_string(),
            attribute_type: ScalarAttributeType::S,
        });
        input.global_secondary_indexes = vec![GlobalSecondaryIndex {
            index_name: "by-email".to_string(),
            key_schema: vec![KeySchemaElement {
                attribute_name: "email".to_string(),
                key_type: KeyType::Hash,
            }],
            projection: Projection {
                projection_type: Some(ProjectionType::KeysOnly),
                non_key_attributes: vec![],
            },
        }];
        let store = Arc::new(MemoryStore::new());
        let provider = Provider::with_store(EngineConfig::default(), store.clone());
        provider.create_table(input).unwrap();

        // No email attribute, so no index entry.
        put(&provider, "users", item(&[("pk", s("u1"))])).unwrap();
        assert_eq!(store.len(&index_namespace("users", "by-email")), 0);

        put(
            &provider,
            "users",
            item(&[("pk", s("u1")), ("email", s("a@b.c")), ("age", n("30"))]),
        )
        .unwrap();
        assert_eq!(store.len(&index_namespace("users", "by-email")), 1);
        let entries = store.range(&index_namespace("users", "by-email"), None, None);
        let projected: Item = serde_json::from_slice(&entries[0].1).unwrap();
        assert!(projected.contains_key("pk"));
        assert!(projected.contains_key("email"));
        assert!(!projected.contains_key("age"));

        // Removing the attribute removes the entry.
        put(&provider, "users", item(&[("pk", s("u1"))])).unwrap();
        assert_eq!(store.len(&index_namespace("users", "by-email")), 0);
    }
}
