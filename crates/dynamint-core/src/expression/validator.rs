//! Semantic validation of parsed expressions.
//!
//! Checks run in a fixed order over the whole tree, and the first failing
//! check wins. Client SDKs and test suites match on these message strings,
//! so both the order and the exact wording are load-bearing.

use std::collections::HashMap;

use dynamint_model::AttributeValue;

use super::ast::{
    AttributePath, Expr, FunctionCall, Operand, PathElement, SetValue, UpdateExpr,
    set_value_operands,
};
use super::reserved::is_reserved_word;

const CONDITION_FUNCTIONS: &[(&str, usize)] = &[
    ("attribute_exists", 1),
    ("attribute_not_exists", 1),
    ("attribute_type", 2),
    ("begins_with", 2),
    ("contains", 2),
    ("size", 1),
];

const UPDATE_FUNCTIONS: &[(&str, usize)] = &[("if_not_exists", 2), ("list_append", 2)];

const ATTRIBUTE_TYPE_TAGS: &[&str] = &["S", "N", "B", "SS", "NS", "BS", "BOOL", "NULL", "L", "M"];

/// Request-scoped inputs the validator resolves placeholders against.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext<'a> {
    /// `ExpressionAttributeNames`, keyed with the `#` marker.
    pub names: Option<&'a HashMap<String, String>>,
    /// `ExpressionAttributeValues`, keyed with the `:` marker.
    pub values: Option<&'a HashMap<String, AttributeValue>>,
    /// Key attribute names of the table, for update-target checks.
    pub key_attributes: &'a [String],
}

impl ValidationContext<'_> {
    fn resolve_alias(&self, alias: &str) -> Option<&str> {
        self.names?.get(&format!("#{alias}")).map(String::as_str)
    }

    fn resolve_value(&self, value: &str) -> Option<&AttributeValue> {
        self.values?.get(&format!(":{value}"))
    }

    /// The type tag of a `:value` operand, if the operand is one and it
    /// resolves. Paths and functions have no statically known type.
    fn operand_type(&self, operand: &Operand) -> Option<&'static str> {
        match operand {
            Operand::Value(name) => self.resolve_value(name).map(AttributeValue::type_descriptor),
            _ => None,
        }
    }
}

fn misused(name: &str) -> String {
    format!("The function is not allowed to be used this way in an expression; function: {name}")
}

fn wrong_type(op: &str, type_tag: &str) -> String {
    format!(
        "Incorrect operand type for operator or function; operator or function: {op}, operand type: {type_tag}"
    )
}

fn requires_path(name: &str) -> String {
    format!("Operator or function requires a document path; operator or function: {name}")
}

// ---------------------------------------------------------------------------
// Condition dialect
// ---------------------------------------------------------------------------

/// Validate a condition expression. `None` means valid; `Some` carries the
/// rejection message.
#[must_use]
pub fn validate_condition(expr: &Expr, ctx: &ValidationContext<'_>) -> Option<String> {
    if has_redundant_parens(expr) {
        return Some("The expression has redundant parentheses;".to_string());
    }
    if let Some(msg) = first_call(expr, &mut |call| {
        (!is_function(call, CONDITION_FUNCTIONS)).then(|| unknown_function(&call.name))
    }) {
        return Some(msg);
    }
    if let Some(msg) = find_misused_condition_function(expr) {
        return Some(msg);
    }
    if let Some(msg) = check_paths(expr_paths(expr).into_iter(), ctx) {
        return Some(msg);
    }
    if let Some(msg) = check_values(expr_values(expr).into_iter(), ctx) {
        return Some(msg);
    }
    if let Some(msg) = first_call(expr, &mut |call| check_arity(call, CONDITION_FUNCTIONS)) {
        return Some(msg);
    }
    if let Some(msg) = check_distinct_operands(expr) {
        return Some(msg);
    }
    if let Some(msg) = check_condition_types(expr, ctx) {
        return Some(msg);
    }
    if let Some(msg) = check_between_bounds(expr, ctx) {
        return Some(msg);
    }
    // A bare `size(path)` is only legal as a comparator operand; as a
    // standalone condition it is flagged last, after every other defect.
    find_top_level_size(expr)
}

fn unknown_function(name: &str) -> String {
    format!("Invalid function name; function: {name}")
}

fn is_function(call: &FunctionCall, table: &[(&str, usize)]) -> bool {
    table.iter().any(|(name, _)| *name == call.name)
}

fn check_arity(call: &FunctionCall, table: &[(&str, usize)]) -> Option<String> {
    let (_, arity) = table.iter().find(|(name, _)| *name == call.name)?;
    (call.args.len() != *arity).then(|| {
        format!(
            "Incorrect number of operands for operator or function; operator or function: {}, number of operands: {}",
            call.name,
            call.args.len()
        )
    })
}

fn has_redundant_parens(expr: &Expr) -> bool {
    match expr {
        Expr::Paren(inner) => matches!(**inner, Expr::Paren(_)) || has_redundant_parens(inner),
        Expr::And(a, b) | Expr::Or(a, b) => has_redundant_parens(a) || has_redundant_parens(b),
        Expr::Not(inner) => has_redundant_parens(inner),
        _ => false,
    }
}

/// Visit every function call in the tree, in source order, returning the
/// first message the visitor produces.
fn first_call(expr: &Expr, visit: &mut impl FnMut(&FunctionCall) -> Option<String>) -> Option<String> {
    fn in_operand(
        operand: &Operand,
        visit: &mut impl FnMut(&FunctionCall) -> Option<String>,
    ) -> Option<String> {
        let Operand::Function(call) = operand else {
            return None;
        };
        if let Some(msg) = visit(call) {
            return Some(msg);
        }
        call.args.iter().find_map(|arg| in_operand(arg, visit))
    }

    match expr {
        Expr::Compare { left, right, .. } => {
            in_operand(left, visit).or_else(|| in_operand(right, visit))
        }
        Expr::Between {
            operand,
            lower,
            upper,
        } => in_operand(operand, visit)
            .or_else(|| in_operand(lower, visit))
            .or_else(|| in_operand(upper, visit)),
        Expr::In { operand, list } => in_operand(operand, visit)
            .or_else(|| list.iter().find_map(|o| in_operand(o, visit))),
        Expr::And(a, b) | Expr::Or(a, b) => {
            first_call(a, visit).or_else(|| first_call(b, visit))
        }
        Expr::Not(inner) | Expr::Paren(inner) => first_call(inner, visit),
        Expr::Function(call) => {
            if let Some(msg) = visit(call) {
                return Some(msg);
            }
            call.args.iter().find_map(|arg| in_operand(arg, visit))
        }
    }
}

/// Condition functions other than `size` may only stand alone; `size` may
/// only sit in an operand position. Nothing may nest inside another call's
/// argument list.
fn find_misused_condition_function(expr: &Expr) -> Option<String> {
    fn in_args(call: &FunctionCall) -> Option<String> {
        call.args.iter().find_map(|arg| match arg {
            Operand::Function(inner) => Some(misused(&inner.name)),
            _ => None,
        })
    }

    fn in_operand_position(operand: &Operand) -> Option<String> {
        let Operand::Function(call) = operand else {
            return None;
        };
        if call.name != "size" {
            return Some(misused(&call.name));
        }
        in_args(call)
    }

    match expr {
        Expr::Compare { left, right, .. } => {
            in_operand_position(left).or_else(|| in_operand_position(right))
        }
        Expr::Between {
            operand,
            lower,
            upper,
        } => in_operand_position(operand)
            .or_else(|| in_operand_position(lower))
            .or_else(|| in_operand_position(upper)),
        Expr::In { operand, list } => {
            in_operand_position(operand).or_else(|| list.iter().find_map(in_operand_position))
        }
        Expr::And(a, b) | Expr::Or(a, b) => {
            find_misused_condition_function(a).or_else(|| find_misused_condition_function(b))
        }
        Expr::Not(inner) | Expr::Paren(inner) => find_misused_condition_function(inner),
        Expr::Function(call) => in_args(call),
    }
}

fn find_top_level_size(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Function(call) if call.name == "size" => Some(misused("size")),
        Expr::And(a, b) | Expr::Or(a, b) => {
            find_top_level_size(a).or_else(|| find_top_level_size(b))
        }
        Expr::Not(inner) | Expr::Paren(inner) => find_top_level_size(inner),
        _ => None,
    }
}

fn check_distinct_operands(expr: &Expr) -> Option<String> {
    fn same_path(a: &Operand, b: &Operand) -> bool {
        matches!((a.as_path(), b.as_path()), (Some(p), Some(q)) if p == q)
    }

    match expr {
        Expr::Compare { op, left, right } => same_path(left, right).then(|| {
            let path = left.as_path().map(ToString::to_string).unwrap_or_default();
            format!(
                "The first operand must be distinct from the remaining operands for this operator or function; operator or function: {}, first operand: [{path}]",
                op.as_str()
            )
        }),
        Expr::In { operand, list } => {
            list.iter().any(|o| same_path(operand, o)).then(|| {
                let path = operand.as_path().map(ToString::to_string).unwrap_or_default();
                format!(
                    "The first operand must be distinct from the remaining operands for this operator or function; operator or function: IN, first operand: [{path}]"
                )
            })
        }
        Expr::And(a, b) | Expr::Or(a, b) => {
            check_distinct_operands(a).or_else(|| check_distinct_operands(b))
        }
        Expr::Not(inner) | Expr::Paren(inner) => check_distinct_operands(inner),
        _ => None,
    }
}

/// Ordering comparators and `BETWEEN` only order scalars.
fn orderable(type_tag: &str) -> bool {
    matches!(type_tag, "S" | "N" | "B")
}

fn check_condition_types(expr: &Expr, ctx: &ValidationContext<'_>) -> Option<String> {
    // An operand in an ordering position must be an orderable scalar when
    // its type is statically known; nested `size` calls get their own
    // argument checks.
    let check_operand = |operand: &Operand, op: Option<&str>| -> Option<String> {
        if let Operand::Function(call) = operand {
            return check_function_types(call, ctx);
        }
        let op = op?;
        ctx.operand_type(operand)
            .filter(|t| !orderable(t))
            .map(|t| wrong_type(op, t))
    };

    match expr {
        Expr::Compare { op, left, right } => {
            let ordering = (!matches!(op, super::ast::CompareOp::Eq | super::ast::CompareOp::Ne))
                .then(|| op.as_str());
            [left, right]
                .into_iter()
                .find_map(|o| check_operand(o, ordering))
        }
        Expr::Between {
            operand,
            lower,
            upper,
        } => [operand, lower, upper]
            .into_iter()
            .find_map(|o| check_operand(o, Some("BETWEEN"))),
        Expr::In { operand, list } => std::iter::once(operand)
            .chain(list.iter())
            .find_map(|o| check_operand(o, None)),
        Expr::And(a, b) | Expr::Or(a, b) => {
            check_condition_types(a, ctx).or_else(|| check_condition_types(b, ctx))
        }
        Expr::Not(inner) | Expr::Paren(inner) => check_condition_types(inner, ctx),
        Expr::Function(call) => check_function_types(call, ctx),
    }
}

fn check_function_types(call: &FunctionCall, ctx: &ValidationContext<'_>) -> Option<String> {
    match call.name.as_str() {
        "attribute_exists" | "attribute_not_exists" => {
            (!matches!(call.args.first(), Some(Operand::Path(_))))
                .then(|| requires_path(&call.name))
        }
        // `size` is defined for strings, binaries and collections, so a
        // value argument is fine as long as it is not N, BOOL or NULL.
        "size" => ctx
            .operand_type(call.args.first()?)
            .filter(|t| matches!(*t, "N" | "BOOL" | "NULL"))
            .map(|t| wrong_type("size", t)),
        "attribute_type" => {
            if !matches!(call.args.first(), Some(Operand::Path(_))) {
                return Some(requires_path(&call.name));
            }
            let tag_arg = call.args.get(1)?;
            match ctx.operand_type(tag_arg) {
                Some("S") => {
                    let Operand::Value(name) = tag_arg else {
                        return None;
                    };
                    let Some(AttributeValue::S(tag)) = ctx.resolve_value(name) else {
                        return None;
                    };
                    (!ATTRIBUTE_TYPE_TAGS.contains(&tag.as_str())).then(|| {
                        format!(
                            "Invalid attribute type name found; type: {tag}, valid types: {{B, BOOL, BS, L, M, N, NS, NULL, S, SS}}"
                        )
                    })
                }
                Some(other) => Some(wrong_type("attribute_type", other)),
                None => None,
            }
        }
        "begins_with" => {
            if !matches!(call.args.first(), Some(Operand::Path(_))) {
                return Some(requires_path(&call.name));
            }
            ctx.operand_type(call.args.get(1)?)
                .filter(|t| !matches!(*t, "S" | "B"))
                .map(|t| wrong_type("begins_with", t))
        }
        "contains" => (!matches!(call.args.first(), Some(Operand::Path(_))))
            .then(|| requires_path(&call.name)),
        _ => None,
    }
}

fn check_between_bounds(expr: &Expr, ctx: &ValidationContext<'_>) -> Option<String> {
    match expr {
        Expr::Between { lower, upper, .. } => {
            let (Operand::Value(lo), Operand::Value(hi)) = (lower, upper) else {
                return None;
            };
            let (lo, hi) = (ctx.resolve_value(lo)?, ctx.resolve_value(hi)?);
            matches!(lo.cmp_gt(hi), Ok(true)).then(|| {
                format!(
                    "The BETWEEN operator requires upper bound to be greater than or equal to lower bound; lower bound operand: AttributeValue: {lo}, upper bound operand: AttributeValue: {hi}"
                )
            })
        }
        Expr::And(a, b) | Expr::Or(a, b) => {
            check_between_bounds(a, ctx).or_else(|| check_between_bounds(b, ctx))
        }
        Expr::Not(inner) | Expr::Paren(inner) => check_between_bounds(inner, ctx),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Update dialect
// ---------------------------------------------------------------------------

/// Validate an update expression. `None` means valid.
#[must_use]
pub fn validate_update(update: &UpdateExpr, ctx: &ValidationContext<'_>) -> Option<String> {
    if let Some(section) = update.duplicate_section {
        return Some(format!(
            "The \"{section}\" section can only be used once in an update expression;"
        ));
    }
    if let Some(msg) = first_update_call(update, &mut |call| {
        (!is_function(call, UPDATE_FUNCTIONS) && !is_function(call, CONDITION_FUNCTIONS))
            .then(|| unknown_function(&call.name))
    }) {
        return Some(msg);
    }
    if let Some(msg) = first_update_call(update, &mut |call| {
        is_function(call, CONDITION_FUNCTIONS).then(|| misused(&call.name))
    }) {
        return Some(msg);
    }
    if let Some(msg) = check_paths(update_paths(update).into_iter(), ctx) {
        return Some(msg);
    }
    if let Some(msg) = check_values(update_values(update).into_iter(), ctx) {
        return Some(msg);
    }
    if let Some(msg) = first_update_call(update, &mut |call| check_arity(call, UPDATE_FUNCTIONS)) {
        return Some(msg);
    }
    if let Some(msg) = first_update_call(update, &mut |call| {
        (call.name == "if_not_exists" && !matches!(call.args.first(), Some(Operand::Path(_))))
            .then(|| requires_path("if_not_exists"))
    }) {
        return Some(msg);
    }
    if let Some(msg) = check_update_types(update, ctx) {
        return Some(msg);
    }
    if let Some(msg) = check_key_targets(update, ctx) {
        return Some(msg);
    }
    check_path_relations(&update.target_paths(), ctx)
}

fn first_update_call(
    update: &UpdateExpr,
    visit: &mut impl FnMut(&FunctionCall) -> Option<String>,
) -> Option<String> {
    fn in_operand(
        operand: &Operand,
        visit: &mut impl FnMut(&FunctionCall) -> Option<String>,
    ) -> Option<String> {
        let Operand::Function(call) = operand else {
            return None;
        };
        if let Some(msg) = visit(call) {
            return Some(msg);
        }
        call.args.iter().find_map(|arg| in_operand(arg, visit))
    }

    update.set_actions.iter().find_map(|action| {
        set_value_operands(&action.value)
            .into_iter()
            .find_map(|o| in_operand(o, visit))
    })
}

fn check_update_types(update: &UpdateExpr, ctx: &ValidationContext<'_>) -> Option<String> {
    for action in &update.set_actions {
        let arithmetic = match &action.value {
            SetValue::Operand(_) => None,
            SetValue::Plus(a, b) => Some(("+", a, b)),
            SetValue::Minus(a, b) => Some(("-", a, b)),
        };
        if let Some((op, a, b)) = arithmetic {
            for operand in [a, b] {
                if let Some(t) = ctx.operand_type(operand).filter(|t| *t != "N") {
                    return Some(wrong_type(op, t));
                }
            }
        }
        let msg = set_value_operands(&action.value).into_iter().find_map(|o| {
            let Operand::Function(call) = o else {
                return None;
            };
            check_list_append_types(call, ctx)
        });
        if let Some(msg) = msg {
            return Some(msg);
        }
    }
    for action in &update.add_actions {
        if let Some(value) = ctx.resolve_value(&action.value) {
            let t = value.type_descriptor();
            if !matches!(t, "N" | "SS" | "NS" | "BS") {
                return Some(wrong_type("ADD", t));
            }
        }
    }
    for action in &update.delete_actions {
        if let Some(value) = ctx.resolve_value(&action.value) {
            let t = value.type_descriptor();
            if !matches!(t, "SS" | "NS" | "BS") {
                return Some(wrong_type("DELETE", t));
            }
        }
    }
    None
}

fn check_list_append_types(call: &FunctionCall, ctx: &ValidationContext<'_>) -> Option<String> {
    if call.name == "list_append" {
        for arg in &call.args {
            if let Some(t) = ctx.operand_type(arg).filter(|t| *t != "L") {
                return Some(wrong_type("list_append", t));
            }
        }
    }
    call.args.iter().find_map(|arg| {
        let Operand::Function(inner) = arg else {
            return None;
        };
        check_list_append_types(inner, ctx)
    })
}

fn check_key_targets(update: &UpdateExpr, ctx: &ValidationContext<'_>) -> Option<String> {
    for path in update.target_paths() {
        let name = match path.elements.first() {
            Some(PathElement::Attribute(name)) => name.as_str(),
            Some(PathElement::Alias(alias)) => match ctx.resolve_alias(alias) {
                Some(name) => name,
                None => continue,
            },
            _ => continue,
        };
        if ctx.key_attributes.iter().any(|k| k == name) {
            return Some(format!(
                "One or more parameter values were invalid: Cannot update attribute {name}. This attribute is part of the key"
            ));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Projection dialect
// ---------------------------------------------------------------------------

/// Validate a projection expression. `None` means valid.
#[must_use]
pub fn validate_projection(paths: &[AttributePath], ctx: &ValidationContext<'_>) -> Option<String> {
    if let Some(msg) = check_paths(paths.iter(), ctx) {
        return Some(msg);
    }
    let refs: Vec<&AttributePath> = paths.iter().collect();
    check_path_relations(&refs, ctx)
}

// ---------------------------------------------------------------------------
// Shared path and placeholder checks
// ---------------------------------------------------------------------------

/// Reserved-word check over every path, then alias resolution.
fn check_paths<'a>(
    paths: impl Iterator<Item = &'a AttributePath> + Clone,
    ctx: &ValidationContext<'_>,
) -> Option<String> {
    for path in paths.clone() {
        for element in &path.elements {
            if let PathElement::Attribute(name) = element {
                if is_reserved_word(name) {
                    return Some(format!(
                        "Attribute name is a reserved keyword; reserved keyword: {name}"
                    ));
                }
            }
        }
    }
    for path in paths {
        for element in &path.elements {
            if let PathElement::Alias(alias) = element {
                if ctx.resolve_alias(alias).is_none() {
                    return Some(format!(
                        "An expression attribute name used in the document path is not defined; attribute name: #{alias}"
                    ));
                }
            }
        }
    }
    None
}

fn check_values<'a>(
    values: impl Iterator<Item = &'a str>,
    ctx: &ValidationContext<'_>,
) -> Option<String> {
    for value in values {
        if ctx.resolve_value(value).is_none() {
            return Some(format!(
                "An expression attribute value used in expression is not defined; attribute value: :{value}"
            ));
        }
    }
    None
}

/// Pairwise overlap and conflict detection over document paths, with
/// aliases resolved first so `#a.b` and `a.b` collide when `#a` maps to
/// `a`.
fn check_path_relations(paths: &[&AttributePath], ctx: &ValidationContext<'_>) -> Option<String> {
    #[derive(PartialEq)]
    enum Piece<'a> {
        Name(&'a str),
        Index(u32),
    }

    let resolved: Vec<Vec<Piece<'_>>> = paths
        .iter()
        .map(|path| {
            path.elements
                .iter()
                .map(|element| match element {
                    PathElement::Attribute(name) => Piece::Name(name),
                    PathElement::Alias(alias) => {
                        Piece::Name(ctx.resolve_alias(alias).unwrap_or(alias))
                    }
                    PathElement::Index(n) => Piece::Index(*n),
                })
                .collect()
        })
        .collect();

    for i in 0..resolved.len() {
        for j in (i + 1)..resolved.len() {
            let (a, b) = (&resolved[i], &resolved[j]);
            let mut relation = Some("overlap");
            for (pa, pb) in a.iter().zip(b.iter()) {
                match (pa, pb) {
                    (Piece::Name(x), Piece::Name(y)) if x != y => {
                        relation = None;
                        break;
                    }
                    (Piece::Index(x), Piece::Index(y)) if x != y => {
                        relation = None;
                        break;
                    }
                    (Piece::Name(_), Piece::Index(_)) | (Piece::Index(_), Piece::Name(_)) => {
                        relation = Some("conflict");
                        break;
                    }
                    _ => {}
                }
            }
            if let Some(relation) = relation {
                return Some(format!(
                    "Two document paths {relation} with each other; must remove or rewrite one of these paths; path one: [{}], path two: [{}]",
                    paths[i], paths[j]
                ));
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Reference enumeration in source order
// ---------------------------------------------------------------------------

fn expr_paths(expr: &Expr) -> Vec<&AttributePath> {
    let mut out = Vec::new();
    super::ast::walk_expr_operands(expr, &mut |operand| collect_operand_paths(operand, &mut out));
    out
}

fn collect_operand_paths<'a>(operand: &'a Operand, out: &mut Vec<&'a AttributePath>) {
    match operand {
        Operand::Path(path) => out.push(path),
        Operand::Value(_) => {}
        Operand::Function(call) => {
            for arg in &call.args {
                collect_operand_paths(arg, out);
            }
        }
    }
}

fn expr_values(expr: &Expr) -> Vec<&str> {
    let mut out = Vec::new();
    super::ast::walk_expr_operands(expr, &mut |operand| collect_operand_values(operand, &mut out));
    out
}

fn collect_operand_values<'a>(operand: &'a Operand, out: &mut Vec<&'a str>) {
    match operand {
        Operand::Path(_) => {}
        Operand::Value(name) => out.push(name),
        Operand::Function(call) => {
            for arg in &call.args {
                collect_operand_values(arg, out);
            }
        }
    }
}

fn update_paths(update: &UpdateExpr) -> Vec<&AttributePath> {
    let mut out: Vec<&AttributePath> = update.target_paths();
    for action in &update.set_actions {
        for operand in set_value_operands(&action.value) {
            collect_operand_paths(operand, &mut out);
        }
    }
    out
}

fn update_values(update: &UpdateExpr) -> Vec<&str> {
    let mut out = Vec::new();
    for action in &update.set_actions {
        for operand in set_value_operands(&action.value) {
            collect_operand_values(operand, &mut out);
        }
    }
    out.extend(update.add_actions.iter().map(|a| a.value.as_str()));
    out.extend(update.delete_actions.iter().map(|a| a.value.as_str()));
    out
}

#[cfg(test)]
mod tests {
    use super::super::parser::{parse_condition_ast, parse_update_ast, parse_projection_ast};
    use super::*;

    fn names(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn values(pairs: &[(&str, AttributeValue)]) -> HashMap<String, AttributeValue> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn condition_msg(
        input: &str,
        names: Option<&HashMap<String, String>>,
        values: Option<&HashMap<String, AttributeValue>>,
    ) -> Option<String> {
        let expr = parse_condition_ast(input).unwrap();
        let ctx = ValidationContext {
            names,
            values,
            key_attributes: &[],
        };
        validate_condition(&expr, &ctx)
    }

    #[test]
    fn test_should_accept_valid_conditions() {
        let vals = values(&[
            (":v", AttributeValue::S("x".to_string())),
            (":lo", AttributeValue::N("1".to_string())),
            (":hi", AttributeValue::N("9".to_string())),
        ]);
        let nms = names(&[("#n", "name")]);
        for input in [
            "a = :v",
            "#n <> :v AND attribute_exists(b)",
            "c BETWEEN :lo AND :hi",
            "size(a) > :lo",
            "NOT (a = :v OR begins_with(#n, :v))",
            "a IN (:v, :lo)",
        ] {
            assert_eq!(condition_msg(input, Some(&nms), Some(&vals)), None, "{input}");
        }
    }

    #[test]
    fn test_should_flag_redundant_parentheses() {
        let vals = values(&[(":v", AttributeValue::S("x".to_string()))]);
        assert_eq!(
            condition_msg("((a = :v))", None, Some(&vals)),
            Some("The expression has redundant parentheses;".to_string())
        );
    }

    #[test]
    fn test_should_flag_unknown_functions_before_anything_else() {
        // The unresolved :v would also fail, but function naming wins.
        assert_eq!(
            condition_msg("no_such(a) AND b = :v", None, None),
            Some("Invalid function name; function: no_such".to_string())
        );
    }

    #[test]
    fn test_should_flag_misused_functions() {
        let vals = values(&[(":v", AttributeValue::S("x".to_string()))]);
        assert_eq!(
            condition_msg("attribute_exists(a) = :v", None, Some(&vals)),
            Some(misused("attribute_exists"))
        );
        assert_eq!(
            condition_msg("size(attribute_exists(a)) > :v", None, Some(&vals)),
            Some(misused("attribute_exists"))
        );
    }

    #[test]
    fn test_should_flag_reserved_keywords() {
        let vals = values(&[(":v", AttributeValue::N("1".to_string()))]);
        assert_eq!(
            condition_msg("Count > :v", None, Some(&vals)),
            Some("Attribute name is a reserved keyword; reserved keyword: Count".to_string())
        );
    }

    #[test]
    fn test_should_flag_unresolved_placeholders() {
        let vals = values(&[(":v", AttributeValue::S("x".to_string()))]);
        assert_eq!(
            condition_msg("#missing = :v", None, Some(&vals)),
            Some(
                "An expression attribute name used in the document path is not defined; attribute name: #missing"
                    .to_string()
            )
        );
        assert_eq!(
            condition_msg("a = :gone", None, None),
            Some(
                "An expression attribute value used in expression is not defined; attribute value: :gone"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_should_flag_wrong_operand_counts() {
        let vals = values(&[(":v", AttributeValue::S("x".to_string()))]);
        assert_eq!(
            condition_msg("attribute_exists(a, b)", None, Some(&vals)),
            Some(
                "Incorrect number of operands for operator or function; operator or function: attribute_exists, number of operands: 2"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_should_flag_non_distinct_operands() {
        assert_eq!(
            condition_msg("MyAttr = MyAttr", None, None),
            Some(
                "The first operand must be distinct from the remaining operands for this operator or function; operator or function: =, first operand: [MyAttr]"
                    .to_string()
            )
        );
        let vals = values(&[(":v", AttributeValue::S("x".to_string()))]);
        assert_eq!(
            condition_msg("a IN (:v, a)", None, Some(&vals)),
            Some(
                "The first operand must be distinct from the remaining operands for this operator or function; operator or function: IN, first operand: [a]"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_should_flag_unorderable_comparator_types() {
        let vals = values(&[(":v", AttributeValue::Bool(true))]);
        assert_eq!(
            condition_msg("a < :v", None, Some(&vals)),
            Some(wrong_type("<", "BOOL"))
        );
        let vals = values(&[
            (":lo", AttributeValue::N("1".to_string())),
            (":hi", AttributeValue::M(HashMap::new())),
        ]);
        assert_eq!(
            condition_msg("a BETWEEN :lo AND :hi", None, Some(&vals)),
            Some(wrong_type("BETWEEN", "M"))
        );
    }

    #[test]
    fn test_should_size_value_operands_by_type() {
        // A string value is a legal size() argument; only N, BOOL and NULL
        // are not sizeable.
        let vals = values(&[
            (":v", AttributeValue::S("abc".to_string())),
            (":n", AttributeValue::N("2".to_string())),
        ]);
        assert_eq!(condition_msg("size(:v) > :n", None, Some(&vals)), None);

        let vals = values(&[
            (":set", AttributeValue::Ss(vec!["a".to_string()])),
            (":n", AttributeValue::N("0".to_string())),
        ]);
        assert_eq!(condition_msg("size(:set) > :n", None, Some(&vals)), None);

        let vals = values(&[
            (":b", AttributeValue::Bool(true)),
            (":n", AttributeValue::N("0".to_string())),
        ]);
        assert_eq!(
            condition_msg("size(:b) > :n", None, Some(&vals)),
            Some(wrong_type("size", "BOOL"))
        );
        let vals = values(&[
            (":z", AttributeValue::Null(true)),
            (":n", AttributeValue::N("0".to_string())),
        ]);
        assert_eq!(
            condition_msg("size(:z) > :n", None, Some(&vals)),
            Some(wrong_type("size", "NULL"))
        );
    }

    #[test]
    fn test_should_flag_inverted_between_bounds() {
        let vals = values(&[
            (":lo", AttributeValue::N("9".to_string())),
            (":hi", AttributeValue::N("1".to_string())),
        ]);
        assert_eq!(
            condition_msg("a BETWEEN :lo AND :hi", None, Some(&vals)),
            Some(
                "The BETWEEN operator requires upper bound to be greater than or equal to lower bound; lower bound operand: AttributeValue: {N: 9}, upper bound operand: AttributeValue: {N: 1}"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_should_flag_bad_attribute_type_tags() {
        let vals = values(&[(":t", AttributeValue::S("STR".to_string()))]);
        assert_eq!(
            condition_msg("attribute_type(a, :t)", None, Some(&vals)),
            Some(
                "Invalid attribute type name found; type: STR, valid types: {B, BOOL, BS, L, M, N, NS, NULL, S, SS}"
                    .to_string()
            )
        );
        let vals = values(&[(":t", AttributeValue::N("1".to_string()))]);
        assert_eq!(
            condition_msg("attribute_type(a, :t)", None, Some(&vals)),
            Some(wrong_type("attribute_type", "N"))
        );
    }

    #[test]
    fn test_should_flag_bare_size_last() {
        // The unresolved value is reported before the size misuse.
        assert_eq!(
            condition_msg("size(a) AND b = :gone", None, None),
            Some(
                "An expression attribute value used in expression is not defined; attribute value: :gone"
                    .to_string()
            )
        );
        let vals = values(&[(":v", AttributeValue::S("x".to_string()))]);
        assert_eq!(
            condition_msg("size(a) AND b = :v", None, Some(&vals)),
            Some(misused("size"))
        );
    }

    fn update_msg(
        input: &str,
        vals: Option<&HashMap<String, AttributeValue>>,
        keys: &[String],
    ) -> Option<String> {
        let update = parse_update_ast(input).unwrap();
        let ctx = ValidationContext {
            names: None,
            values: vals,
            key_attributes: keys,
        };
        validate_update(&update, &ctx)
    }

    #[test]
    fn test_should_accept_valid_updates() {
        let vals = values(&[
            (":v", AttributeValue::S("x".to_string())),
            (":inc", AttributeValue::N("1".to_string())),
            (":set", AttributeValue::Ss(vec!["a".to_string()])),
            (":list", AttributeValue::L(vec![])),
        ]);
        for input in [
            "SET a = :v, b = b + :inc REMOVE c",
            "SET d = if_not_exists(d, :v)",
            "SET e = list_append(e, :list)",
            "ADD f :inc, g :set DELETE h :set",
        ] {
            assert_eq!(update_msg(input, Some(&vals), &[]), None, "{input}");
        }
    }

    #[test]
    fn test_should_flag_duplicate_sections_first() {
        assert_eq!(
            update_msg("SET a = :gone SET b = :gone", None, &[]),
            Some("The \"SET\" section can only be used once in an update expression;".to_string())
        );
    }

    #[test]
    fn test_should_flag_condition_functions_in_updates_as_misused() {
        let vals = values(&[(":v", AttributeValue::S("x".to_string()))]);
        assert_eq!(
            update_msg("SET a = attribute_exists(b)", Some(&vals), &[]),
            Some(misused("attribute_exists"))
        );
        assert_eq!(
            update_msg("SET a = no_such(b)", Some(&vals), &[]),
            Some("Invalid function name; function: no_such".to_string())
        );
    }

    #[test]
    fn test_should_flag_wrong_update_value_types() {
        let vals = values(&[(":v", AttributeValue::S("x".to_string()))]);
        assert_eq!(
            update_msg("SET a = a + :v", Some(&vals), &[]),
            Some(wrong_type("+", "S"))
        );
        assert_eq!(
            update_msg("ADD a :v", Some(&vals), &[]),
            Some(wrong_type("ADD", "S"))
        );
        let vals = values(&[(":n", AttributeValue::N("1".to_string()))]);
        assert_eq!(
            update_msg("DELETE a :n", Some(&vals), &[]),
            Some(wrong_type("DELETE", "N"))
        );
        assert_eq!(
            update_msg("SET a = list_append(a, :n)", Some(&vals), &[]),
            Some(wrong_type("list_append", "N"))
        );
    }

    #[test]
    fn test_should_flag_key_attribute_targets() {
        let vals = values(&[(":v", AttributeValue::S("x".to_string()))]);
        assert_eq!(
            update_msg("SET pk = :v", Some(&vals), &["pk".to_string()]),
            Some(
                "One or more parameter values were invalid: Cannot update attribute pk. This attribute is part of the key"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_should_flag_overlapping_and_conflicting_paths() {
        let vals = values(&[(":v", AttributeValue::S("x".to_string()))]);
        assert_eq!(
            update_msg("SET a.b = :v REMOVE a", Some(&vals), &[]),
            Some(
                "Two document paths overlap with each other; must remove or rewrite one of these paths; path one: [a.b], path two: [a]"
                    .to_string()
            )
        );
        assert_eq!(
            update_msg("SET a.b = :v REMOVE a[0]", Some(&vals), &[]),
            Some(
                "Two document paths conflict with each other; must remove or rewrite one of these paths; path one: [a.b], path two: [a[0]]"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_should_resolve_aliases_before_path_comparison() {
        let update = parse_update_ast("SET #x.b = :v REMOVE a.b").unwrap();
        let nms = names(&[("#x", "a")]);
        let vals = values(&[(":v", AttributeValue::S("x".to_string()))]);
        let ctx = ValidationContext {
            names: Some(&nms),
            values: Some(&vals),
            key_attributes: &[],
        };
        let msg = validate_update(&update, &ctx).unwrap();
        assert!(msg.starts_with("Two document paths overlap"), "{msg}");
    }

    #[test]
    fn test_should_validate_projections() {
        let nms = names(&[("#n", "name")]);
        let ctx = ValidationContext {
            names: Some(&nms),
            values: None,
            key_attributes: &[],
        };
        let paths = parse_projection_ast("#n, a.b, c").unwrap();
        assert_eq!(validate_projection(&paths, &ctx), None);

        let paths = parse_projection_ast("a.b, a").unwrap();
        assert!(
            validate_projection(&paths, &ctx)
                .unwrap()
                .starts_with("Two document paths overlap")
        );
    }
}
