//! Table registry and per-table metadata.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dynamint_model::DynamintError;
use dynamint_model::types::{
    AttributeDefinition, GlobalSecondaryIndex, KeySchemaElement, KeyType, LocalSecondaryIndex,
    ProvisionedThroughput, ScalarAttributeType, TableDescription, TableStatus,
};
use uuid::Uuid;

/// Metadata for one live table. Item data lives in the store, not here;
/// the counters track what the store holds so descriptions are cheap.
#[derive(Debug)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Key schema, `HASH` first.
    pub key_schema: Vec<KeySchemaElement>,
    /// Attribute definitions covering all table and index key attributes.
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Global secondary indexes.
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
    /// Local secondary indexes.
    pub local_secondary_indexes: Vec<LocalSecondaryIndex>,
    /// Provisioned throughput, echoed but never enforced.
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    /// Table ARN.
    pub arn: String,
    /// Unique id assigned at creation.
    pub table_id: Uuid,
    /// Creation time in epoch seconds.
    pub created_at: f64,
    item_count: AtomicU64,
    size_bytes: AtomicU64,
}

impl Table {
    /// Build a table created now, with zeroed counters.
    #[must_use]
    pub fn new(
        name: String,
        key_schema: Vec<KeySchemaElement>,
        attribute_definitions: Vec<AttributeDefinition>,
        global_secondary_indexes: Vec<GlobalSecondaryIndex>,
        local_secondary_indexes: Vec<LocalSecondaryIndex>,
        provisioned_throughput: Option<ProvisionedThroughput>,
        arn: String,
    ) -> Self {
        Self {
            name,
            key_schema,
            attribute_definitions,
            global_secondary_indexes,
            local_secondary_indexes,
            provisioned_throughput,
            arn,
            table_id: Uuid::new_v4(),
            created_at: Utc::now().timestamp_millis() as f64 / 1000.0,
            item_count: AtomicU64::new(0),
            size_bytes: AtomicU64::new(0),
        }
    }

    /// The name of a key attribute by role.
    #[must_use]
    pub fn key_name(&self, key_type: KeyType) -> Option<&str> {
        self.key_schema
            .iter()
            .find(|k| k.key_type == key_type)
            .map(|k| k.attribute_name.as_str())
    }

    /// All key attribute names, hash first.
    #[must_use]
    pub fn key_attribute_names(&self) -> Vec<String> {
        self.key_schema
            .iter()
            .map(|k| k.attribute_name.clone())
            .collect()
    }

    /// The defined type of an attribute, if it is a key attribute.
    #[must_use]
    pub fn attribute_type(&self, name: &str) -> Option<&ScalarAttributeType> {
        self.attribute_definitions
            .iter()
            .find(|d| d.attribute_name == name)
            .map(|d| &d.attribute_type)
    }

    /// All secondary indexes as `(name, key_schema, projection)` triples,
    /// locals first.
    #[must_use]
    pub fn all_indexes(&self) -> Vec<IndexRef<'_>> {
        let locals = self.local_secondary_indexes.iter().map(|i| IndexRef {
            name: &i.index_name,
            key_schema: &i.key_schema,
            projection: Some(&i.projection),
        });
        let globals = self.global_secondary_indexes.iter().map(|i| IndexRef {
            name: &i.index_name,
            key_schema: &i.key_schema,
            projection: Some(&i.projection),
        });
        locals.chain(globals).collect()
    }

    /// Record an item landing in or leaving the table.
    pub fn record_put(&self, new_size: u64, old_size: Option<u64>) {
        match old_size {
            Some(old) => {
                if new_size >= old {
                    self.size_bytes.fetch_add(new_size - old, Ordering::Relaxed);
                } else {
                    self.size_bytes.fetch_sub(old - new_size, Ordering::Relaxed);
                }
            }
            None => {
                self.item_count.fetch_add(1, Ordering::Relaxed);
                self.size_bytes.fetch_add(new_size, Ordering::Relaxed);
            }
        }
    }

    /// Record an item deletion.
    pub fn record_delete(&self, old_size: u64) {
        self.item_count.fetch_sub(1, Ordering::Relaxed);
        self.size_bytes.fetch_sub(old_size, Ordering::Relaxed);
    }

    /// Current item count.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.item_count.load(Ordering::Relaxed)
    }

    /// Build the wire description.
    #[must_use]
    pub fn describe(&self, status: TableStatus) -> TableDescription {
        TableDescription {
            table_name: self.name.clone(),
            key_schema: self.key_schema.clone(),
            attribute_definitions: self.attribute_definitions.clone(),
            table_status: status,
            creation_date_time: self.created_at,
            item_count: self.item_count.load(Ordering::Relaxed),
            table_size_bytes: self.size_bytes.load(Ordering::Relaxed),
            table_arn: self.arn.clone(),
            table_id: Some(self.table_id.to_string()),
            global_secondary_indexes: self.global_secondary_indexes.clone(),
            local_secondary_indexes: self.local_secondary_indexes.clone(),
            provisioned_throughput: self.provisioned_throughput.clone(),
        }
    }
}

/// A borrowed view of one secondary index definition.
#[derive(Debug, Clone, Copy)]
pub struct IndexRef<'a> {
    /// Index name.
    pub name: &'a str,
    /// Index key schema.
    pub key_schema: &'a [KeySchemaElement],
    /// Projection, when declared.
    pub projection: Option<&'a dynamint_model::types::Projection>,
}

/// The set of live tables.
///
/// Creation races resolve through the map's entry API: two concurrent
/// `create` calls for the same name serialize on the shard lock, one
/// inserts and the other observes the occupied entry.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: DashMap<String, Arc<Table>>,
}

impl TableRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new table, failing if the name is taken.
    pub fn create(&self, table: Table) -> Result<Arc<Table>, DynamintError> {
        match self.tables.entry(table.name.clone()) {
            Entry::Occupied(_) => Err(DynamintError::resource_in_use(&table.name)),
            Entry::Vacant(entry) => {
                let table = Arc::new(table);
                entry.insert(table.clone());
                Ok(table)
            }
        }
    }

    /// Look up a table.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.get(name).map(|t| t.clone())
    }

    /// Look up a table, failing with `ResourceNotFoundException`.
    pub fn require(&self, name: &str) -> Result<Arc<Table>, DynamintError> {
        self.get(name).ok_or_else(DynamintError::resource_not_found)
    }

    /// Unregister a table, returning it so its data can be dropped.
    pub fn remove(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.remove(name).map(|(_, table)| table)
    }

    /// All table names in lexicographic order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|t| t.key().clone()).collect();
        names.sort();
        names
    }
}
