//! Legacy comparison semantics: the `Expected` conditional form and
//! `AttributeUpdates` actions that predate expressions.
//!
//! Unlike the expression validator, nothing here ever rejects a request
//! for a type mismatch at comparison time. A mismatched or missing
//! operand just fails the predicate, which is how the pre-expression API
//! behaved.

use std::collections::HashMap;

use dynamint_model::types::{
    AttributeAction, AttributeValueUpdate, ComparisonOperator, ExpectedAttributeValue, Item,
};
use dynamint_model::AttributeValue;

use crate::expression::evaluator::{add_values, delete_values};

/// Legacy `AttributeUpdates` application failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LegacyUpdateError {
    /// `ADD`/`DELETE` against an existing attribute of an unrelated type.
    #[error("Type mismatch for attribute to update")]
    TypeMismatch,
}

/// Evaluate one legacy comparison predicate.
///
/// `value` is the stored attribute (absent when the item lacks it);
/// `compare_values` is the request's `AttributeValueList`.
#[must_use]
pub fn compare(
    op: ComparisonOperator,
    value: Option<&AttributeValue>,
    compare_values: &[AttributeValue],
) -> bool {
    let first = compare_values.first();
    match op {
        ComparisonOperator::Eq => match (value, first) {
            (Some(v), Some(c)) => v.cmp_eq(c),
            _ => false,
        },
        ComparisonOperator::Ne => match (value, first) {
            (Some(v), Some(c)) => !v.cmp_eq(c),
            // A missing attribute is never equal to anything.
            _ => true,
        },
        ComparisonOperator::Le => ordered(value, first, |v, c| v.cmp_le(c)),
        ComparisonOperator::Lt => ordered(value, first, |v, c| v.cmp_lt(c)),
        ComparisonOperator::Ge => ordered(value, first, |v, c| v.cmp_ge(c)),
        ComparisonOperator::Gt => ordered(value, first, |v, c| v.cmp_gt(c)),
        ComparisonOperator::NotNull => value.is_some(),
        ComparisonOperator::Null => value.is_none(),
        ComparisonOperator::Contains => match (value, first) {
            (Some(v), Some(c)) => legacy_contains(v, c),
            _ => false,
        },
        ComparisonOperator::NotContains => match (value, first) {
            (Some(v), Some(c)) => !legacy_contains(v, c),
            _ => true,
        },
        ComparisonOperator::BeginsWith => match (value, first) {
            (Some(AttributeValue::S(v)), Some(AttributeValue::S(c))) => v.starts_with(c.as_str()),
            (Some(AttributeValue::B(v)), Some(AttributeValue::B(c))) => v.starts_with(c),
            _ => false,
        },
        ComparisonOperator::In => {
            value.is_some_and(|v| compare_values.iter().any(|c| v.cmp_eq(c)))
        }
        ComparisonOperator::Between => match (value, compare_values) {
            (Some(v), [lo, hi, ..]) => {
                v.type_descriptor() == lo.type_descriptor()
                    && v.type_descriptor() == hi.type_descriptor()
                    && matches!(v.cmp_ge(lo), Ok(true))
                    && matches!(v.cmp_le(hi), Ok(true))
            }
            _ => false,
        },
    }
}

/// Ordering operators fail outright on a type mismatch; in particular the
/// cross-type `le`/`ge` leniency of the value model must not leak in here.
fn ordered(
    value: Option<&AttributeValue>,
    compare_value: Option<&AttributeValue>,
    cmp: impl Fn(&AttributeValue, &AttributeValue) -> Result<bool, dynamint_model::ComparisonError>,
) -> bool {
    match (value, compare_value) {
        (Some(v), Some(c)) => {
            v.type_descriptor() == c.type_descriptor() && matches!(cmp(v, c), Ok(true))
        }
        _ => false,
    }
}

/// The legacy `CONTAINS` dispatches on the *comparison* value's type, not
/// the stored attribute's.
fn legacy_contains(value: &AttributeValue, compare_value: &AttributeValue) -> bool {
    match compare_value {
        AttributeValue::S(needle) => match value {
            AttributeValue::S(s) => s.contains(needle.as_str()),
            AttributeValue::Ss(set) => set.iter().any(|s| s == needle),
            AttributeValue::L(list) => list.iter().any(|e| e.cmp_eq(compare_value)),
            _ => false,
        },
        AttributeValue::N(_) => match value {
            AttributeValue::Ns(set) => set
                .iter()
                .any(|n| AttributeValue::N(n.clone()).cmp_eq(compare_value)),
            AttributeValue::L(list) => list.iter().any(|e| e.cmp_eq(compare_value)),
            _ => false,
        },
        AttributeValue::B(needle) => match value {
            AttributeValue::B(b) => {
                !needle.is_empty() && b.windows(needle.len()).any(|w| w == &needle[..])
            }
            AttributeValue::Bs(set) => set.iter().any(|b| b == needle),
            AttributeValue::L(list) => list.iter().any(|e| e.cmp_eq(compare_value)),
            _ => false,
        },
        _ => false,
    }
}

/// Evaluate a legacy `Expected` map against an item. Entries join with
/// `AND` unless the request says `OR`.
#[must_use]
pub fn check_expected(
    expected: &HashMap<String, ExpectedAttributeValue>,
    conditional_operator: Option<&str>,
    item: Option<&Item>,
) -> bool {
    let mut entries = expected.iter().map(|(name, condition)| {
        let value = item.and_then(|i| i.get(name));
        check_expected_entry(condition, value)
    });
    if conditional_operator.is_some_and(|op| op.eq_ignore_ascii_case("OR")) {
        entries.any(|ok| ok)
    } else {
        entries.all(|ok| ok)
    }
}

fn check_expected_entry(condition: &ExpectedAttributeValue, value: Option<&AttributeValue>) -> bool {
    if let Some(op) = condition.comparison_operator {
        return compare(op, value, &condition.attribute_value_list);
    }
    match (condition.exists, &condition.value) {
        (Some(false), _) => value.is_none(),
        (_, Some(expected)) => compare(
            ComparisonOperator::Eq,
            value,
            std::slice::from_ref(expected),
        ),
        // `Exists: true` with no value is rejected earlier; treat a bare
        // entry as an existence check.
        _ => value.is_some(),
    }
}

/// Apply legacy `AttributeUpdates` actions to an item.
///
/// Shapes (`PUT` needs a value, `ADD` needs `N` or a set, `DELETE` value
/// must be a set) are validated before this runs; only a type clash with
/// the stored attribute can fail here.
pub fn apply_attribute_updates(
    updates: &HashMap<String, AttributeValueUpdate>,
    item: &mut Item,
) -> Result<(), LegacyUpdateError> {
    for (name, update) in updates {
        let action = update.action.unwrap_or_default();
        match (action, &update.value) {
            (AttributeAction::Put, Some(value)) => {
                item.insert(name.clone(), value.clone());
            }
            (AttributeAction::Add, Some(value)) => {
                let merged = match item.get(name) {
                    Some(existing) => {
                        add_values(existing, value).map_err(|_| LegacyUpdateError::TypeMismatch)?
                    }
                    None => value.clone(),
                };
                item.insert(name.clone(), merged);
            }
            (AttributeAction::Delete, Some(value)) => {
                let Some(existing) = item.get(name) else {
                    continue;
                };
                match delete_values(existing, value)
                    .map_err(|_| LegacyUpdateError::TypeMismatch)?
                {
                    Some(remaining) => item.insert(name.clone(), remaining),
                    None => item.remove(name),
                };
            }
            (AttributeAction::Delete, None) => {
                item.remove(name);
            }
            // PUT/ADD without a value never reaches application.
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn s(v: &str) -> AttributeValue {
        AttributeValue::S(v.to_string())
    }

    fn n(v: &str) -> AttributeValue {
        AttributeValue::N(v.to_string())
    }

    #[test]
    fn test_should_compare_numbers_by_value_not_spelling() {
        assert!(compare(ComparisonOperator::Eq, Some(&n("1e2")), &[n("100")]));
        assert!(compare(ComparisonOperator::Lt, Some(&n("9.5")), &[n("10")]));
        assert!(compare(
            ComparisonOperator::Between,
            Some(&n("5")),
            &[n("5"), n("9")]
        ));
    }

    #[test]
    fn test_should_fail_ordering_on_type_mismatch_without_raising() {
        assert!(!compare(ComparisonOperator::Lt, Some(&s("5")), &[n("10")]));
        assert!(!compare(ComparisonOperator::Le, Some(&s("5")), &[n("10")]));
        assert!(!compare(ComparisonOperator::Ge, Some(&n("10")), &[s("5")]));
        assert!(!compare(
            ComparisonOperator::Gt,
            Some(&AttributeValue::Bool(true)),
            &[n("0")]
        ));
        assert!(!compare(
            ComparisonOperator::Between,
            Some(&n("5")),
            &[s("a"), s("z")]
        ));
        assert!(!compare(
            ComparisonOperator::Between,
            Some(&n("5")),
            &[n("1"), s("z")]
        ));
    }

    #[test]
    fn test_should_treat_missing_attributes_per_operator() {
        assert!(!compare(ComparisonOperator::Eq, None, &[s("x")]));
        assert!(compare(ComparisonOperator::Ne, None, &[s("x")]));
        assert!(compare(ComparisonOperator::Null, None, &[]));
        assert!(!compare(ComparisonOperator::NotNull, None, &[]));
        assert!(compare(ComparisonOperator::NotContains, None, &[s("x")]));
        assert!(!compare(ComparisonOperator::In, None, &[s("x")]));
    }

    #[test]
    fn test_should_dispatch_contains_on_comparison_value_type() {
        let ss = AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]);
        let ns = AttributeValue::Ns(vec!["1".to_string(), "2.0".to_string()]);
        let list = AttributeValue::L(vec![n("2")]);
        assert!(compare(ComparisonOperator::Contains, Some(&s("abc")), &[s("b")]));
        assert!(compare(ComparisonOperator::Contains, Some(&ss), &[s("b")]));
        assert!(compare(ComparisonOperator::Contains, Some(&ns), &[n("2")]));
        assert!(compare(ComparisonOperator::Contains, Some(&list), &[n("2")]));
        assert!(!compare(ComparisonOperator::Contains, Some(&ss), &[n("1")]));
    }

    #[test]
    fn test_should_find_binary_subsequences() {
        let b = AttributeValue::B(Bytes::from_static(b"\x01\x02\x03\x04"));
        let needle = AttributeValue::B(Bytes::from_static(b"\x02\x03"));
        assert!(compare(ComparisonOperator::Contains, Some(&b), &[needle]));
        assert!(compare(
            ComparisonOperator::BeginsWith,
            Some(&b),
            &[AttributeValue::B(Bytes::from_static(b"\x01"))]
        ));
    }

    fn item(pairs: &[(&str, AttributeValue)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_should_join_expected_entries_with_and_by_default() {
        let stored = item(&[("a", n("1")), ("b", s("x"))]);
        let expected: HashMap<String, ExpectedAttributeValue> = [
            (
                "a".to_string(),
                ExpectedAttributeValue {
                    value: Some(n("1")),
                    ..ExpectedAttributeValue::default()
                },
            ),
            (
                "b".to_string(),
                ExpectedAttributeValue {
                    value: Some(s("y")),
                    ..ExpectedAttributeValue::default()
                },
            ),
        ]
        .into();
        assert!(!check_expected(&expected, None, Some(&stored)));
        assert!(check_expected(&expected, Some("OR"), Some(&stored)));
    }

    #[test]
    fn test_should_check_absence_with_exists_false() {
        let expected: HashMap<String, ExpectedAttributeValue> = [(
            "a".to_string(),
            ExpectedAttributeValue {
                exists: Some(false),
                ..ExpectedAttributeValue::default()
            },
        )]
        .into();
        assert!(check_expected(&expected, None, None));
        assert!(!check_expected(&expected, None, Some(&item(&[("a", n("1"))]))));
    }

    #[test]
    fn test_should_apply_legacy_update_actions() {
        let mut stored = item(&[
            ("count", n("7")),
            ("tags", AttributeValue::Ss(vec!["a".to_string()])),
            ("gone", s("x")),
        ]);
        let updates: HashMap<String, AttributeValueUpdate> = [
            (
                "count".to_string(),
                AttributeValueUpdate {
                    value: Some(n("3")),
                    action: Some(AttributeAction::Add),
                },
            ),
            (
                "tags".to_string(),
                AttributeValueUpdate {
                    value: Some(AttributeValue::Ss(vec!["b".to_string()])),
                    action: Some(AttributeAction::Add),
                },
            ),
            (
                "gone".to_string(),
                AttributeValueUpdate {
                    value: None,
                    action: Some(AttributeAction::Delete),
                },
            ),
            (
                "name".to_string(),
                AttributeValueUpdate {
                    value: Some(s("fresh")),
                    action: None,
                },
            ),
        ]
        .into();
        apply_attribute_updates(&updates, &mut stored).unwrap();
        assert_eq!(stored.get("count"), Some(&n("10")));
        assert_eq!(
            stored.get("tags"),
            Some(&AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]))
        );
        assert!(!stored.contains_key("gone"));
        assert_eq!(stored.get("name"), Some(&s("fresh")));
    }

    #[test]
    fn test_should_reject_add_on_mismatched_existing_type() {
        let mut stored = item(&[("a", s("text"))]);
        let updates: HashMap<String, AttributeValueUpdate> = [(
            "a".to_string(),
            AttributeValueUpdate {
                value: Some(n("1")),
                action: Some(AttributeAction::Add),
            },
        )]
        .into();
        assert_eq!(
            apply_attribute_updates(&updates, &mut stored),
            Err(LegacyUpdateError::TypeMismatch)
        );
    }
}
