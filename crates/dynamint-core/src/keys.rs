//! Storage key construction.
//!
//! A stored item's key is a string of `/`-terminated segments: the 6-char
//! hash prefix, the encoded hash key piece, and the encoded range key piece
//! when the schema has one. Index entries append the digest of the *table*
//! key so entries for distinct items never collide even when their index
//! key pieces are equal.

use dynamint_model::types::{AttributeDefinition, Item, KeySchemaElement, KeyType, ScalarAttributeType};

use crate::lexicodec::{hash_prefix, to_lexi_str};

/// Visit the key pieces of a schema in hash-then-range order.
///
/// The visitor receives the attribute name, its declared type, and whether
/// it is the hash piece. Returning `Some` stops traversal and yields that
/// value.
pub fn traverse_key<T>(
    key_schema: &[KeySchemaElement],
    definitions: &[AttributeDefinition],
    mut visit: impl FnMut(&str, &ScalarAttributeType, bool) -> Option<T>,
) -> Option<T> {
    for wanted in [KeyType::Hash, KeyType::Range] {
        let Some(element) = key_schema.iter().find(|e| e.key_type == wanted) else {
            continue;
        };
        let attr_type = definitions
            .iter()
            .find(|d| d.attribute_name == element.attribute_name)
            .map_or(&ScalarAttributeType::S, |d| &d.attribute_type);
        if let Some(out) = visit(&element.attribute_name, attr_type, wanted == KeyType::Hash) {
            return Some(out);
        }
    }
    None
}

/// Build the storage key for an item under the given schema.
///
/// A key piece whose attribute is absent from the item is skipped entirely,
/// segment and all. Partial keys are intentional: index entries over sparse
/// items use them.
#[must_use]
pub fn create_key(
    item: &Item,
    definitions: &[AttributeDefinition],
    key_schema: &[KeySchemaElement],
) -> String {
    let mut key = String::new();
    traverse_key::<()>(key_schema, definitions, |name, _attr_type, is_hash| {
        if let Some(value) = item.get(name) {
            if is_hash {
                key.push_str(&hash_prefix(value, None));
                key.push('/');
            }
            key.push_str(&to_lexi_str(value));
            key.push('/');
        }
        None
    });
    key
}

/// Build the storage key for an index entry.
///
/// The entry is keyed by the index schema, then suffixed with the digest of
/// the table's own key pieces to disambiguate items that share index key
/// values.
#[must_use]
pub fn create_index_key(
    item: &Item,
    definitions: &[AttributeDefinition],
    table_schema: &[KeySchemaElement],
    index_schema: &[KeySchemaElement],
) -> String {
    let mut key = create_key(item, definitions, index_schema);

    let mut table_pieces: Vec<&dynamint_model::AttributeValue> = Vec::with_capacity(2);
    traverse_key::<()>(table_schema, definitions, |name, _attr_type, _is_hash| {
        if let Some(value) = item.get(name) {
            table_pieces.push(value);
        }
        None
    });
    if let Some(hash) = table_pieces.first() {
        key.push_str(&hash_prefix(hash, table_pieces.get(1).copied()));
    }
    key
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dynamint_model::AttributeValue;

    use super::*;

    fn schema(pairs: &[(&str, KeyType)]) -> Vec<KeySchemaElement> {
        pairs
            .iter()
            .map(|(name, key_type)| KeySchemaElement {
                attribute_name: (*name).to_string(),
                key_type: *key_type,
            })
            .collect()
    }

    fn defs(pairs: &[(&str, ScalarAttributeType)]) -> Vec<AttributeDefinition> {
        pairs
            .iter()
            .map(|(name, attr_type)| AttributeDefinition {
                attribute_name: (*name).to_string(),
                attribute_type: attr_type.clone(),
            })
            .collect()
    }

    fn item(pairs: &[(&str, AttributeValue)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_should_build_hash_only_keys_with_two_segments() {
        let value = AttributeValue::S("user1".to_string());
        let key = create_key(
            &item(&[("pk", value.clone())]),
            &defs(&[("pk", ScalarAttributeType::S)]),
            &schema(&[("pk", KeyType::Hash)]),
        );
        assert_eq!(key, format!("{}/user1/", hash_prefix(&value, None)));
    }

    #[test]
    fn test_should_append_range_segment_when_present() {
        let hash = AttributeValue::S("user1".to_string());
        let range = AttributeValue::N("42".to_string());
        let key = create_key(
            &item(&[("pk", hash.clone()), ("sk", range.clone())]),
            &defs(&[("pk", ScalarAttributeType::S), ("sk", ScalarAttributeType::N)]),
            &schema(&[("pk", KeyType::Hash), ("sk", KeyType::Range)]),
        );
        assert_eq!(
            key,
            format!("{}/user1/{}/", hash_prefix(&hash, None), to_lexi_str(&range))
        );
    }

    #[test]
    fn test_should_skip_absent_key_pieces_entirely() {
        let hash = AttributeValue::S("user1".to_string());
        let key = create_key(
            &item(&[("pk", hash.clone())]),
            &defs(&[("pk", ScalarAttributeType::S), ("sk", ScalarAttributeType::N)]),
            &schema(&[("pk", KeyType::Hash), ("sk", KeyType::Range)]),
        );
        // No empty third segment, no dangling slash.
        assert_eq!(key, format!("{}/user1/", hash_prefix(&hash, None)));
    }

    #[test]
    fn test_should_short_circuit_traversal() {
        let table = schema(&[("pk", KeyType::Hash), ("sk", KeyType::Range)]);
        let definitions = defs(&[
            ("pk", ScalarAttributeType::S),
            ("sk", ScalarAttributeType::N),
        ]);
        let mut visited = Vec::new();
        let found = traverse_key(&table, &definitions, |name, _ty, is_hash| {
            visited.push(name.to_string());
            is_hash.then_some(name.to_string())
        });
        assert_eq!(found.as_deref(), Some("pk"));
        assert_eq!(visited, vec!["pk"]);
    }

    #[test]
    fn test_should_disambiguate_index_entries_by_table_key() {
        let table_schema = schema(&[("pk", KeyType::Hash)]);
        let index_schema = schema(&[("gsi_pk", KeyType::Hash)]);
        let definitions = defs(&[
            ("pk", ScalarAttributeType::S),
            ("gsi_pk", ScalarAttributeType::S),
        ]);
        let shared = AttributeValue::S("same".to_string());
        let a = item(&[("pk", AttributeValue::S("a".to_string())), ("gsi_pk", shared.clone())]);
        let b = item(&[("pk", AttributeValue::S("b".to_string())), ("gsi_pk", shared.clone())]);

        let key_a = create_index_key(&a, &definitions, &table_schema, &index_schema);
        let key_b = create_index_key(&b, &definitions, &table_schema, &index_schema);
        assert_ne!(key_a, key_b);
        // Both share the index-piece prefix.
        let prefix = create_key(&a, &definitions, &index_schema);
        assert!(key_a.starts_with(&prefix));
        assert!(key_b.starts_with(&prefix));
    }
}
