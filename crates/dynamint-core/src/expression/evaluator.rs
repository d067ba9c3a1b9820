//! Evaluation of validated expressions against items.
//!
//! Conditions never fail at evaluation time: a missing attribute, a type
//! mismatch, or an unorderable operand simply makes the predicate false.
//! Updates can fail, because a document path that does not fit the stored
//! item shape is a request error.

use std::collections::HashMap;

use dynamint_model::types::Item;
use dynamint_model::{AttributeValue, Decimal};

use super::ast::{
    AttributePath, CompareOp, Expr, FunctionCall, Operand, PathElement, SetValue, UpdateExpr,
};

/// Update application failures, surfaced as `ValidationException` messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    /// A document path does not fit the item's stored shape.
    #[error("The document path provided in the update expression is invalid for update")]
    InvalidDocumentPath,
    /// An operand resolved to a type the operator cannot work with.
    #[error("An operand in the update expression has an incorrect data type")]
    IncorrectOperandType,
    /// A read operand named an attribute the item does not have.
    #[error("The provided expression refers to an attribute that does not exist in the item")]
    MissingAttribute,
}

/// Request-scoped inputs for evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext<'a> {
    /// `ExpressionAttributeNames`, keyed with the `#` marker.
    pub names: Option<&'a HashMap<String, String>>,
    /// `ExpressionAttributeValues`, keyed with the `:` marker.
    pub values: Option<&'a HashMap<String, AttributeValue>>,
}

impl EvalContext<'_> {
    fn resolve_alias<'s>(&'s self, alias: &'s str) -> &'s str {
        self.names
            .and_then(|m| m.get(&format!("#{alias}")))
            .map_or(alias, String::as_str)
    }

    fn resolve_value(&self, value: &str) -> Option<&AttributeValue> {
        self.values?.get(&format!(":{value}"))
    }

    fn element_name<'s>(&'s self, element: &'s PathElement) -> Option<&'s str> {
        match element {
            PathElement::Attribute(name) => Some(name),
            PathElement::Alias(alias) => Some(self.resolve_alias(alias)),
            PathElement::Index(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

/// Follow a document path into an item.
pub fn resolve_path<'a>(
    item: &'a Item,
    path: &AttributePath,
    ctx: &EvalContext<'_>,
) -> Option<&'a AttributeValue> {
    let mut elements = path.elements.iter();
    let first = ctx.element_name(elements.next()?)?;
    let mut current = item.get(first)?;
    for element in elements {
        current = match element {
            PathElement::Index(n) => current.as_l()?.get(*n as usize)?,
            _ => current.as_m()?.get(ctx.element_name(element)?)?,
        };
    }
    Some(current)
}

fn resolve_operand(
    item: Option<&Item>,
    operand: &Operand,
    ctx: &EvalContext<'_>,
) -> Option<AttributeValue> {
    match operand {
        Operand::Path(path) => resolve_path(item?, path, ctx).cloned(),
        Operand::Value(name) => ctx.resolve_value(name).cloned(),
        Operand::Function(call) if call.name == "size" => {
            let Operand::Path(path) = call.args.first()? else {
                return None;
            };
            let target = resolve_path(item?, path, ctx)?;
            Some(AttributeValue::N(value_length(target)?.to_string()))
        }
        Operand::Function(_) => None,
    }
}

/// The length `size()` reports, where one is defined.
fn value_length(value: &AttributeValue) -> Option<usize> {
    Some(match value {
        AttributeValue::S(s) => s.len(),
        AttributeValue::B(b) => b.len(),
        AttributeValue::Ss(s) => s.len(),
        AttributeValue::Ns(s) => s.len(),
        AttributeValue::Bs(s) => s.len(),
        AttributeValue::L(l) => l.len(),
        AttributeValue::M(m) => m.len(),
        _ => None?,
    })
}

// ---------------------------------------------------------------------------
// Condition evaluation
// ---------------------------------------------------------------------------

/// Evaluate a condition against an item. `item` is `None` when the slot is
/// empty, which only `attribute_not_exists` can satisfy.
#[must_use]
pub fn evaluate_condition(expr: &Expr, item: Option<&Item>, ctx: &EvalContext<'_>) -> bool {
    match expr {
        Expr::Compare { op, left, right } => {
            let (Some(left), Some(right)) = (
                resolve_operand(item, left, ctx),
                resolve_operand(item, right, ctx),
            ) else {
                return false;
            };
            let outcome = match op {
                CompareOp::Eq => Ok(left.cmp_eq(&right)),
                CompareOp::Ne => Ok(!left.cmp_eq(&right)),
                CompareOp::Lt => left.cmp_lt(&right),
                CompareOp::Le => left.cmp_le(&right),
                CompareOp::Gt => left.cmp_gt(&right),
                CompareOp::Ge => left.cmp_ge(&right),
            };
            outcome.unwrap_or(false)
        }
        Expr::Between {
            operand,
            lower,
            upper,
        } => {
            let (Some(value), Some(lower), Some(upper)) = (
                resolve_operand(item, operand, ctx),
                resolve_operand(item, lower, ctx),
                resolve_operand(item, upper, ctx),
            ) else {
                return false;
            };
            matches!(value.cmp_ge(&lower), Ok(true)) && matches!(value.cmp_le(&upper), Ok(true))
        }
        Expr::In { operand, list } => {
            let Some(value) = resolve_operand(item, operand, ctx) else {
                return false;
            };
            list.iter().any(|candidate| {
                resolve_operand(item, candidate, ctx).is_some_and(|c| value.cmp_eq(&c))
            })
        }
        Expr::And(a, b) => {
            evaluate_condition(a, item, ctx) && evaluate_condition(b, item, ctx)
        }
        Expr::Or(a, b) => evaluate_condition(a, item, ctx) || evaluate_condition(b, item, ctx),
        Expr::Not(inner) => !evaluate_condition(inner, item, ctx),
        Expr::Paren(inner) => evaluate_condition(inner, item, ctx),
        Expr::Function(call) => evaluate_function(call, item, ctx),
    }
}

fn evaluate_function(call: &FunctionCall, item: Option<&Item>, ctx: &EvalContext<'_>) -> bool {
    let path_target = |arg: Option<&Operand>| -> Option<AttributeValue> {
        let Some(Operand::Path(path)) = arg else {
            return None;
        };
        resolve_path(item?, path, ctx).cloned()
    };

    match call.name.as_str() {
        "attribute_exists" => path_target(call.args.first()).is_some(),
        "attribute_not_exists" => path_target(call.args.first()).is_none(),
        "attribute_type" => {
            let (Some(target), Some(AttributeValue::S(tag))) = (
                path_target(call.args.first()),
                call.args
                    .get(1)
                    .and_then(|arg| resolve_operand(item, arg, ctx)),
            ) else {
                return false;
            };
            target.type_descriptor() == tag
        }
        "begins_with" => {
            let (Some(target), Some(prefix)) = (
                path_target(call.args.first()),
                call.args
                    .get(1)
                    .and_then(|arg| resolve_operand(item, arg, ctx)),
            ) else {
                return false;
            };
            match (&target, &prefix) {
                (AttributeValue::S(s), AttributeValue::S(p)) => s.starts_with(p.as_str()),
                (AttributeValue::B(b), AttributeValue::B(p)) => b.starts_with(p),
                _ => false,
            }
        }
        "contains" => {
            let (Some(container), Some(needle)) = (
                path_target(call.args.first()),
                call.args
                    .get(1)
                    .and_then(|arg| resolve_operand(item, arg, ctx)),
            ) else {
                return false;
            };
            evaluate_contains(&container, &needle)
        }
        _ => false,
    }
}

/// `contains()` dispatches on the container: substring for `S`, membership
/// for sets and lists, subslice for `B`.
fn evaluate_contains(container: &AttributeValue, needle: &AttributeValue) -> bool {
    match (container, needle) {
        (AttributeValue::S(s), AttributeValue::S(n)) => s.contains(n.as_str()),
        (AttributeValue::B(b), AttributeValue::B(n)) => {
            !n.is_empty() && b.windows(n.len()).any(|w| w == &n[..])
        }
        (AttributeValue::Ss(set), AttributeValue::S(n)) => set.iter().any(|s| s == n),
        (AttributeValue::Ns(set), AttributeValue::N(_)) => set
            .iter()
            .any(|s| AttributeValue::N(s.clone()).cmp_eq(needle)),
        (AttributeValue::Bs(set), AttributeValue::B(n)) => set.iter().any(|b| b == n),
        (AttributeValue::L(list), _) => list.iter().any(|element| element.cmp_eq(needle)),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Update application
// ---------------------------------------------------------------------------

/// Apply an update expression to an item. All read operands resolve
/// against the item as it stood before the update.
pub fn apply_update(
    update: &UpdateExpr,
    item: &mut Item,
    ctx: &EvalContext<'_>,
) -> Result<(), UpdateError> {
    let original = item.clone();

    for action in &update.set_actions {
        let value = resolve_set_value(&action.value, &original, ctx)?;
        set_at_path(item, &action.path, value, ctx)?;
    }
    for path in &update.remove_paths {
        remove_at_path(item, path, ctx);
    }
    for action in &update.add_actions {
        let operand = ctx
            .resolve_value(&action.value)
            .cloned()
            .ok_or(UpdateError::IncorrectOperandType)?;
        let merged = match resolve_path(item, &action.path, ctx) {
            Some(existing) => add_values(existing, &operand)?,
            None => operand,
        };
        set_at_path(item, &action.path, merged, ctx)?;
    }
    for action in &update.delete_actions {
        let operand = ctx
            .resolve_value(&action.value)
            .cloned()
            .ok_or(UpdateError::IncorrectOperandType)?;
        let Some(existing) = resolve_path(item, &action.path, ctx) else {
            continue;
        };
        match delete_values(existing, &operand)? {
            Some(remaining) => set_at_path(item, &action.path, remaining, ctx)?,
            None => remove_at_path(item, &action.path, ctx),
        }
    }
    Ok(())
}

fn resolve_set_value(
    value: &SetValue,
    original: &Item,
    ctx: &EvalContext<'_>,
) -> Result<AttributeValue, UpdateError> {
    match value {
        SetValue::Operand(operand) => resolve_set_operand(operand, original, ctx),
        SetValue::Plus(a, b) | SetValue::Minus(a, b) => {
            let (a, b) = (
                resolve_set_operand(a, original, ctx)?,
                resolve_set_operand(b, original, ctx)?,
            );
            let (AttributeValue::N(a), AttributeValue::N(b)) = (&a, &b) else {
                return Err(UpdateError::IncorrectOperandType);
            };
            let (a, b) = (parse_number(a)?, parse_number(b)?);
            let result = if matches!(value, SetValue::Plus(_, _)) {
                a.add(&b)
            } else {
                a.sub(&b)
            };
            Ok(AttributeValue::N(result.to_canonical_string()))
        }
    }
}

fn resolve_set_operand(
    operand: &Operand,
    original: &Item,
    ctx: &EvalContext<'_>,
) -> Result<AttributeValue, UpdateError> {
    match operand {
        Operand::Path(path) => resolve_path(original, path, ctx)
            .cloned()
            .ok_or(UpdateError::MissingAttribute),
        Operand::Value(name) => ctx
            .resolve_value(name)
            .cloned()
            .ok_or(UpdateError::IncorrectOperandType),
        Operand::Function(call) => match call.name.as_str() {
            "if_not_exists" => {
                let Some(Operand::Path(path)) = call.args.first() else {
                    return Err(UpdateError::InvalidDocumentPath);
                };
                if let Some(existing) = resolve_path(original, path, ctx) {
                    return Ok(existing.clone());
                }
                let fallback = call.args.get(1).ok_or(UpdateError::IncorrectOperandType)?;
                resolve_set_operand(fallback, original, ctx)
            }
            "list_append" => {
                let mut lists = call.args.iter();
                let (Some(first), Some(second)) = (lists.next(), lists.next()) else {
                    return Err(UpdateError::IncorrectOperandType);
                };
                let (first, second) = (
                    resolve_set_operand(first, original, ctx)?,
                    resolve_set_operand(second, original, ctx)?,
                );
                let (AttributeValue::L(mut first), AttributeValue::L(second)) = (first, second)
                else {
                    return Err(UpdateError::IncorrectOperandType);
                };
                first.extend(second);
                Ok(AttributeValue::L(first))
            }
            _ => Err(UpdateError::IncorrectOperandType),
        },
    }
}

fn parse_number(s: &str) -> Result<Decimal, UpdateError> {
    Decimal::parse(s).map_err(|_| UpdateError::IncorrectOperandType)
}

pub(crate) fn add_values(
    existing: &AttributeValue,
    operand: &AttributeValue,
) -> Result<AttributeValue, UpdateError> {
    match (existing, operand) {
        (AttributeValue::N(a), AttributeValue::N(b)) => {
            let sum = parse_number(a)?.add(&parse_number(b)?);
            Ok(AttributeValue::N(sum.to_canonical_string()))
        }
        (AttributeValue::Ss(a), AttributeValue::Ss(b)) => {
            let mut merged = a.clone();
            merged.extend(b.iter().filter(|v| !a.contains(v)).cloned());
            Ok(AttributeValue::Ss(merged))
        }
        (AttributeValue::Ns(a), AttributeValue::Ns(b)) => {
            let mut merged = a.clone();
            for candidate in b {
                let value = AttributeValue::N(candidate.clone());
                if !merged
                    .iter()
                    .any(|m| AttributeValue::N(m.clone()).cmp_eq(&value))
                {
                    merged.push(candidate.clone());
                }
            }
            Ok(AttributeValue::Ns(merged))
        }
        (AttributeValue::Bs(a), AttributeValue::Bs(b)) => {
            let mut merged = a.clone();
            merged.extend(b.iter().filter(|v| !a.contains(v)).cloned());
            Ok(AttributeValue::Bs(merged))
        }
        _ => Err(UpdateError::IncorrectOperandType),
    }
}

/// Set difference for `DELETE`; `None` means the set emptied out and the
/// attribute goes away entirely.
pub(crate) fn delete_values(
    existing: &AttributeValue,
    operand: &AttributeValue,
) -> Result<Option<AttributeValue>, UpdateError> {
    let remaining = match (existing, operand) {
        (AttributeValue::Ss(a), AttributeValue::Ss(b)) => AttributeValue::Ss(
            a.iter().filter(|v| !b.contains(v)).cloned().collect(),
        ),
        (AttributeValue::Ns(a), AttributeValue::Ns(b)) => AttributeValue::Ns(
            a.iter()
                .filter(|m| {
                    let value = AttributeValue::N((*m).clone());
                    !b.iter()
                        .any(|c| AttributeValue::N(c.clone()).cmp_eq(&value))
                })
                .cloned()
                .collect(),
        ),
        (AttributeValue::Bs(a), AttributeValue::Bs(b)) => AttributeValue::Bs(
            a.iter().filter(|v| !b.contains(v)).cloned().collect(),
        ),
        _ => return Err(UpdateError::IncorrectOperandType),
    };
    let emptied = match &remaining {
        AttributeValue::Ss(s) => s.is_empty(),
        AttributeValue::Ns(s) => s.is_empty(),
        AttributeValue::Bs(s) => s.is_empty(),
        _ => false,
    };
    Ok(if emptied { None } else { Some(remaining) })
}

/// Write `value` at `path`, creating the final map key or appending past
/// the end of a list, but never inventing intermediate containers.
fn set_at_path(
    item: &mut Item,
    path: &AttributePath,
    value: AttributeValue,
    ctx: &EvalContext<'_>,
) -> Result<(), UpdateError> {
    let mut elements = path.elements.iter();
    let first = elements
        .next()
        .and_then(|e| ctx.element_name(e))
        .ok_or(UpdateError::InvalidDocumentPath)?;
    let rest: Vec<&PathElement> = elements.collect();

    if rest.is_empty() {
        item.insert(first.to_string(), value);
        return Ok(());
    }
    let current = item.get_mut(first).ok_or(UpdateError::InvalidDocumentPath)?;
    set_in_value(current, &rest, value, ctx)
}

fn set_in_value(
    current: &mut AttributeValue,
    rest: &[&PathElement],
    value: AttributeValue,
    ctx: &EvalContext<'_>,
) -> Result<(), UpdateError> {
    let (element, tail) = match rest.split_first() {
        Some(split) => split,
        None => {
            *current = value;
            return Ok(());
        }
    };
    match element {
        PathElement::Index(n) => {
            let AttributeValue::L(list) = current else {
                return Err(UpdateError::InvalidDocumentPath);
            };
            let index = *n as usize;
            if index < list.len() {
                set_in_value(&mut list[index], tail, value, ctx)
            } else if tail.is_empty() {
                list.push(value);
                Ok(())
            } else {
                Err(UpdateError::InvalidDocumentPath)
            }
        }
        _ => {
            let name = ctx
                .element_name(element)
                .ok_or(UpdateError::InvalidDocumentPath)?;
            let AttributeValue::M(map) = current else {
                return Err(UpdateError::InvalidDocumentPath);
            };
            match map.get_mut(name) {
                Some(next) => set_in_value(next, tail, value, ctx),
                None if tail.is_empty() => {
                    map.insert(name.to_string(), value);
                    Ok(())
                }
                None => Err(UpdateError::InvalidDocumentPath),
            }
        }
    }
}

/// Remove the value at `path`. Missing paths are a no-op.
fn remove_at_path(item: &mut Item, path: &AttributePath, ctx: &EvalContext<'_>) {
    let mut elements = path.elements.iter();
    let Some(first) = elements.next().and_then(|e| ctx.element_name(e)) else {
        return;
    };
    let rest: Vec<&PathElement> = elements.collect();
    if rest.is_empty() {
        item.remove(first);
        return;
    }
    if let Some(current) = item.get_mut(first) {
        remove_in_value(current, &rest, ctx);
    }
}

fn remove_in_value(current: &mut AttributeValue, rest: &[&PathElement], ctx: &EvalContext<'_>) {
    let Some((element, tail)) = rest.split_first() else {
        return;
    };
    match element {
        PathElement::Index(n) => {
            let AttributeValue::L(list) = current else {
                return;
            };
            let index = *n as usize;
            if index >= list.len() {
                return;
            }
            if tail.is_empty() {
                list.remove(index);
            } else {
                remove_in_value(&mut list[index], tail, ctx);
            }
        }
        _ => {
            let Some(name) = ctx.element_name(element) else {
                return;
            };
            let AttributeValue::M(map) = current else {
                return;
            };
            if tail.is_empty() {
                map.remove(name);
            } else if let Some(next) = map.get_mut(name) {
                remove_in_value(next, tail, ctx);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Projection application
// ---------------------------------------------------------------------------

/// Graft the projected paths out of an item. Paths that do not resolve are
/// skipped; projected list elements keep their relative order but compact
/// to the front.
#[must_use]
pub fn apply_projection(paths: &[AttributePath], item: &Item, ctx: &EvalContext<'_>) -> Item {
    let mut out = Item::new();
    for path in paths {
        if let Some(value) = resolve_path(item, path, ctx) {
            graft(&mut out, &path.elements, value, ctx);
        }
    }
    out
}

fn graft(out: &mut Item, elements: &[PathElement], value: &AttributeValue, ctx: &EvalContext<'_>) {
    let Some(first) = elements.first().and_then(|e| ctx.element_name(e)) else {
        return;
    };
    let tail = &elements[1..];
    if tail.is_empty() {
        out.insert(first.to_string(), value.clone());
        return;
    }
    let slot = out.entry(first.to_string()).or_insert_with(|| {
        if matches!(tail[0], PathElement::Index(_)) {
            AttributeValue::L(Vec::new())
        } else {
            AttributeValue::M(HashMap::new())
        }
    });
    graft_in_value(slot, tail, value, ctx);
}

fn graft_in_value(
    slot: &mut AttributeValue,
    elements: &[PathElement],
    value: &AttributeValue,
    ctx: &EvalContext<'_>,
) {
    let Some((element, tail)) = elements.split_first() else {
        return;
    };
    match element {
        PathElement::Index(_) => {
            let AttributeValue::L(list) = slot else {
                return;
            };
            if tail.is_empty() {
                list.push(value.clone());
                return;
            }
            let next = if matches!(tail[0], PathElement::Index(_)) {
                AttributeValue::L(Vec::new())
            } else {
                AttributeValue::M(HashMap::new())
            };
            list.push(next);
            if let Some(last) = list.last_mut() {
                graft_in_value(last, tail, value, ctx);
            }
        }
        _ => {
            let Some(name) = ctx.element_name(element) else {
                return;
            };
            let AttributeValue::M(map) = slot else {
                return;
            };
            if tail.is_empty() {
                map.insert(name.to_string(), value.clone());
                return;
            }
            let next = map.entry(name.to_string()).or_insert_with(|| {
                if matches!(tail[0], PathElement::Index(_)) {
                    AttributeValue::L(Vec::new())
                } else {
                    AttributeValue::M(HashMap::new())
                }
            });
            graft_in_value(next, tail, value, ctx);
        }
    }
}
