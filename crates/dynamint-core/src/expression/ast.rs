//! Expression ASTs for the condition, update, and projection dialects.
//!
//! `#alias` and `:value` placeholders stay opaque in the AST; they are
//! resolved during validation and evaluation, never at parse time. Function
//! names are likewise carried as plain strings so that unknown names
//! survive parsing and get the semantic rejection they deserve.

use std::collections::BTreeSet;
use std::fmt;

/// One element of a document path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    /// A bare attribute name.
    Attribute(String),
    /// A `#alias` placeholder, stored without the `#`.
    Alias(String),
    /// A `[n]` list index.
    Index(u32),
}

/// A document path: one or more elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    /// The path elements in order.
    pub elements: Vec<PathElement>,
}

impl AttributePath {
    /// Collect the aliases referenced anywhere in this path.
    pub fn collect_aliases(&self, out: &mut BTreeSet<String>) {
        for element in &self.elements {
            if let PathElement::Alias(name) = element {
                out.insert(name.clone());
            }
        }
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            match element {
                PathElement::Attribute(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathElement::Alias(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    write!(f, "#{name}")?;
                }
                PathElement::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}

/// Comparison operators of the condition dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// The symbol as written in an expression.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A function call, name unchecked until validation.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// The function name exactly as written.
    pub name: String,
    /// The arguments.
    pub args: Vec<Operand>,
}

/// An operand of a comparator, `BETWEEN`, `IN`, or function argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A document path.
    Path(AttributePath),
    /// A `:value` placeholder, stored without the `:`.
    Value(String),
    /// A nested function call (e.g. `size(p)` as a comparator operand).
    Function(FunctionCall),
}

impl Operand {
    /// The path inside this operand, if it is one.
    #[must_use]
    pub fn as_path(&self) -> Option<&AttributePath> {
        match self {
            Self::Path(path) => Some(path),
            _ => None,
        }
    }
}

/// A condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Binary comparison.
    Compare {
        /// The operator.
        op: CompareOp,
        /// Left operand.
        left: Operand,
        /// Right operand.
        right: Operand,
    },
    /// `operand BETWEEN lower AND upper`, inclusive on both ends.
    Between {
        /// The tested operand.
        operand: Operand,
        /// Inclusive lower bound.
        lower: Operand,
        /// Inclusive upper bound.
        upper: Operand,
    },
    /// `operand IN (o1, o2, …)`.
    In {
        /// The tested operand.
        operand: Operand,
        /// The candidate operands.
        list: Vec<Operand>,
    },
    /// Logical conjunction.
    And(Box<Expr>, Box<Expr>),
    /// Logical disjunction.
    Or(Box<Expr>, Box<Expr>),
    /// Logical negation.
    Not(Box<Expr>),
    /// A function call used as a standalone condition.
    Function(FunctionCall),
    /// A parenthesized group, kept so redundancy can be detected.
    Paren(Box<Expr>),
}

/// The value side of a `SET` action.
#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    /// A single operand.
    Operand(Operand),
    /// `a + b` (exact decimal addition).
    Plus(Operand, Operand),
    /// `a - b` (exact decimal subtraction).
    Minus(Operand, Operand),
}

/// One `SET path = value` action.
#[derive(Debug, Clone, PartialEq)]
pub struct SetAction {
    /// The target path.
    pub path: AttributePath,
    /// The value to assign.
    pub value: SetValue,
}

/// One `ADD path :value` action.
#[derive(Debug, Clone, PartialEq)]
pub struct AddAction {
    /// The target path.
    pub path: AttributePath,
    /// The `:value` placeholder name.
    pub value: String,
}

/// One `DELETE path :value` action.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteAction {
    /// The target path.
    pub path: AttributePath,
    /// The `:value` placeholder name.
    pub value: String,
}

/// A parsed update expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateExpr {
    /// `SET` actions.
    pub set_actions: Vec<SetAction>,
    /// `REMOVE` paths.
    pub remove_paths: Vec<AttributePath>,
    /// `ADD` actions.
    pub add_actions: Vec<AddAction>,
    /// `DELETE` actions.
    pub delete_actions: Vec<DeleteAction>,
    /// First clause keyword that appeared more than once, if any.
    pub duplicate_section: Option<&'static str>,
}

impl UpdateExpr {
    /// All target paths across every clause, in clause order.
    #[must_use]
    pub fn target_paths(&self) -> Vec<&AttributePath> {
        let mut paths: Vec<&AttributePath> = Vec::new();
        paths.extend(self.set_actions.iter().map(|a| &a.path));
        paths.extend(self.remove_paths.iter());
        paths.extend(self.add_actions.iter().map(|a| &a.path));
        paths.extend(self.delete_actions.iter().map(|a| &a.path));
        paths
    }
}

// ---------------------------------------------------------------------------
// Reference collection (for unused-parameter validation)
// ---------------------------------------------------------------------------

/// Collect every `#alias` referenced by a condition expression.
#[must_use]
pub fn collect_aliases_from_expr(expr: &Expr) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    walk_expr_operands(expr, &mut |operand| collect_operand_aliases(operand, &mut out));
    out
}

/// Collect every `:value` referenced by a condition expression.
#[must_use]
pub fn collect_values_from_expr(expr: &Expr) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    walk_expr_operands(expr, &mut |operand| collect_operand_values(operand, &mut out));
    out
}

/// Collect every `#alias` referenced by an update expression.
#[must_use]
pub fn collect_aliases_from_update(update: &UpdateExpr) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for path in update.target_paths() {
        path.collect_aliases(&mut out);
    }
    for action in &update.set_actions {
        for operand in set_value_operands(&action.value) {
            collect_operand_aliases(operand, &mut out);
        }
    }
    out
}

/// Collect every `:value` referenced by an update expression.
#[must_use]
pub fn collect_values_from_update(update: &UpdateExpr) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for action in &update.set_actions {
        for operand in set_value_operands(&action.value) {
            collect_operand_values(operand, &mut out);
        }
    }
    for action in &update.add_actions {
        out.insert(action.value.clone());
    }
    for action in &update.delete_actions {
        out.insert(action.value.clone());
    }
    out
}

/// Collect every `#alias` referenced by a projection.
#[must_use]
pub fn collect_aliases_from_projection(paths: &[AttributePath]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for path in paths {
        path.collect_aliases(&mut out);
    }
    out
}

/// The operands inside a `SET` value, flattened.
#[must_use]
pub fn set_value_operands(value: &SetValue) -> Vec<&Operand> {
    match value {
        SetValue::Operand(a) => vec![a],
        SetValue::Plus(a, b) | SetValue::Minus(a, b) => vec![a, b],
    }
}

/// Visit every operand in a condition expression, including function
/// arguments at any depth.
pub fn walk_expr_operands<'a>(expr: &'a Expr, visit: &mut impl FnMut(&'a Operand)) {
    match expr {
        Expr::Compare { left, right, .. } => {
            visit(left);
            visit(right);
        }
        Expr::Between {
            operand,
            lower,
            upper,
        } => {
            visit(operand);
            visit(lower);
            visit(upper);
        }
        Expr::In { operand, list } => {
            visit(operand);
            for o in list {
                visit(o);
            }
        }
        Expr::And(a, b) | Expr::Or(a, b) => {
            walk_expr_operands(a, visit);
            walk_expr_operands(b, visit);
        }
        Expr::Not(inner) | Expr::Paren(inner) => walk_expr_operands(inner, visit),
        Expr::Function(call) => {
            for arg in &call.args {
                visit(arg);
            }
        }
    }
}

fn collect_operand_aliases(operand: &Operand, out: &mut BTreeSet<String>) {
    match operand {
        Operand::Path(path) => path.collect_aliases(out),
        Operand::Value(_) => {}
        Operand::Function(call) => {
            for arg in &call.args {
                collect_operand_aliases(arg, out);
            }
        }
    }
}

fn collect_operand_values(operand: &Operand, out: &mut BTreeSet<String>) {
    match operand {
        Operand::Path(_) => {}
        Operand::Value(name) => {
            out.insert(name.clone());
        }
        Operand::Function(call) => {
            for arg in &call.args {
                collect_operand_values(arg, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(names: &[&str]) -> AttributePath {
        AttributePath {
            elements: names
                .iter()
                .map(|n| PathElement::Attribute((*n).to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_should_format_paths_with_dots_and_indexes() {
        let mut p = path(&["a", "b"]);
        p.elements.push(PathElement::Index(3));
        assert_eq!(p.to_string(), "a.b[3]");
    }

    #[test]
    fn test_should_hand_out_operand_borrows_outliving_the_walk() {
        let expr = Expr::Compare {
            op: CompareOp::Eq,
            left: Operand::Path(path(&["a"])),
            right: Operand::Value("v".to_string()),
        };
        let mut seen: Vec<&Operand> = Vec::new();
        walk_expr_operands(&expr, &mut |operand| seen.push(operand));
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], &Operand::Value("v".to_string()));
    }

    #[test]
    fn test_should_collect_values_from_nested_functions() {
        let expr = Expr::Compare {
            op: CompareOp::Gt,
            left: Operand::Function(FunctionCall {
                name: "size".to_string(),
                args: vec![Operand::Path(path(&["doc"]))],
            }),
            right: Operand::Value("limit".to_string()),
        };
        let values = collect_values_from_expr(&expr);
        assert_eq!(values.into_iter().collect::<Vec<_>>(), vec!["limit"]);
    }

    #[test]
    fn test_should_collect_aliases_from_update_targets_and_values() {
        let update = UpdateExpr {
            set_actions: vec![SetAction {
                path: AttributePath {
                    elements: vec![PathElement::Alias("target".to_string())],
                },
                value: SetValue::Plus(
                    Operand::Path(AttributePath {
                        elements: vec![PathElement::Alias("source".to_string())],
                    }),
                    Operand::Value("delta".to_string()),
                ),
            }],
            ..UpdateExpr::default()
        };
        let aliases = collect_aliases_from_update(&update);
        assert!(aliases.contains("target"));
        assert!(aliases.contains("source"));
        let values = collect_values_from_update(&update);
        assert!(values.contains("delta"));
    }
}
