/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template evaluation engine.
//!
//! Interprets the template AST against a [`Scope`] of bound names. Nothing
//! here can panic on user input: every failure is returned as an
//! evaluation error.

use crate::ast::{BinaryOp, Expr, LogicalOp, TemplateNode, UnaryOp};
use crate::error::{TemplateError, TemplateResult};
use crate::methods;
use crate::value::Value;

/// Names visible to an expression.
///
/// The root scope holds the template parameters; each callback invocation
/// pushes a child scope with the arrow function's parameters.
#[derive(Debug)]
pub struct Scope<'a> {
    names: &'a [String],
    values: &'a [Value],
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Create a root scope. Values are matched to names by position.
    pub fn new(names: &'a [String], values: &'a [Value]) -> Self {
        Self {
            names,
            values,
            parent: None,
        }
    }

    /// Create a child scope that falls back to this one.
    pub fn child<'b>(&'b self, names: &'b [String], values: &'b [Value]) -> Scope<'b> {
        Scope {
            names,
            values,
            parent: Some(self),
        }
    }

    /// Look up a name, innermost scope first.
    ///
    /// When a name is declared twice the last declaration wins. A declared
    /// name without a value is `undefined`.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        match self.names.iter().rposition(|n| n == name) {
            Some(index) => Some(self.values.get(index).cloned().unwrap_or_default()),
            None => self.parent.and_then(|p| p.lookup(name)),
        }
    }
}

/// Evaluate a list of template nodes to a string.
pub fn evaluate(nodes: &[TemplateNode], scope: &Scope<'_>) -> TemplateResult<String> {
    let mut output = String::new();
    for node in nodes {
        match node {
            TemplateNode::Literal(text) => output.push_str(text),
            TemplateNode::Placeholder(placeholder) => {
                output.push_str(&eval_expr(&placeholder.expr, scope)?.render());
            }
        }
    }
    Ok(output)
}

/// Evaluate a single expression.
pub fn eval_expr(expr: &Expr, scope: &Scope<'_>) -> TemplateResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Template(nodes) => Ok(Value::String(evaluate(nodes, scope)?)),

        Expr::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| eval_expr(item, scope))
                .collect::<TemplateResult<_>>()?,
        )),

        Expr::Identifier(name) => scope
            .lookup(name)
            .ok_or_else(|| TemplateError::eval(format!("{} is not defined", name))),

        // Optional chains yield `undefined` when short-circuited
        Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } => {
            Ok(eval_chain(expr, scope)?.unwrap_or_default())
        }

        Expr::Arrow { .. } => Err(TemplateError::eval(
            "Arrow functions can only be used as callback arguments",
        )),

        Expr::Unary { op, operand } => eval_unary(*op, operand, scope),

        Expr::Binary { op, left, right } => {
            let left = eval_expr(left, scope)?;
            let right = eval_expr(right, scope)?;
            Ok(apply_binary(*op, &left, &right))
        }

        Expr::Logical { op, left, right } => {
            let left = eval_expr(left, scope)?;
            let take_left = match op {
                LogicalOp::And => !left.is_truthy(),
                LogicalOp::Or => left.is_truthy(),
                LogicalOp::Nullish => !left.is_nullish(),
            };
            if take_left {
                Ok(left)
            } else {
                eval_expr(right, scope)
            }
        }

        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if eval_expr(test, scope)?.is_truthy() {
                eval_expr(consequent, scope)
            } else {
                eval_expr(alternate, scope)
            }
        }
    }
}

/// Evaluate a member/index/call chain. `None` means an optional link met a
/// nullish value and the rest of the chain was skipped.
fn eval_chain(expr: &Expr, scope: &Scope<'_>) -> TemplateResult<Option<Value>> {
    match expr {
        Expr::Member {
            object,
            property,
            optional,
        } => {
            let Some(target) = eval_link(object, *optional, scope)? else {
                return Ok(None);
            };
            get_property(&target, property).map(Some)
        }

        Expr::Index {
            object,
            index,
            optional,
        } => {
            let Some(target) = eval_link(object, *optional, scope)? else {
                return Ok(None);
            };
            let index = eval_expr(index, scope)?;
            get_index(&target, &index).map(Some)
        }

        Expr::Call {
            callee,
            args,
            optional,
        } => eval_call(callee, args, *optional, scope),

        other => eval_expr(other, scope).map(Some),
    }
}

/// Evaluate the object of a chain link, applying `?.` short-circuiting.
fn eval_link(object: &Expr, optional: bool, scope: &Scope<'_>) -> TemplateResult<Option<Value>> {
    let Some(target) = eval_chain(object, scope)? else {
        return Ok(None);
    };
    if optional && target.is_nullish() {
        return Ok(None);
    }
    Ok(Some(target))
}

fn eval_call(
    callee: &Expr,
    args: &[Expr],
    optional: bool,
    scope: &Scope<'_>,
) -> TemplateResult<Option<Value>> {
    match callee {
        Expr::Member {
            object,
            property,
            optional: member_optional,
        } => {
            let Some(receiver) = eval_link(object, *member_optional, scope)? else {
                return Ok(None);
            };
            if receiver.is_nullish() {
                return Err(read_nullish_error(&receiver, property));
            }
            methods::call_method(&receiver, property, args, scope, &callee.describe()).map(Some)
        }

        Expr::Identifier(name) if scope.lookup(name).is_none() => {
            match methods::call_global(name, args, scope)? {
                Some(value) => Ok(Some(value)),
                None => Err(TemplateError::eval(format!("{} is not defined", name))),
            }
        }

        other => {
            let Some(value) = eval_chain(other, scope)? else {
                return Ok(None);
            };
            if optional && value.is_nullish() {
                return Ok(None);
            }
            Err(TemplateError::eval(format!(
                "{} is not a function",
                other.describe()
            )))
        }
    }
}

fn read_nullish_error(target: &Value, property: &str) -> TemplateError {
    TemplateError::eval(format!(
        "Cannot read properties of {} (reading '{}')",
        target.render(),
        property
    ))
}

/// Property access: `target.property`.
pub fn get_property(target: &Value, property: &str) -> TemplateResult<Value> {
    match target {
        Value::Undefined | Value::Null => Err(read_nullish_error(target, property)),
        Value::String(s) if property == "length" => Ok(Value::Number(s.chars().count() as f64)),
        Value::Array(items) if property == "length" => Ok(Value::Number(items.len() as f64)),
        Value::Array(items) => Ok(property
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default()),
        Value::Object(map) => Ok(map.get(property).cloned().unwrap_or_default()),
        _ => Ok(Value::Undefined),
    }
}

/// Computed access: `target[index]`.
pub fn get_index(target: &Value, index: &Value) -> TemplateResult<Value> {
    match (target, index) {
        (Value::Undefined | Value::Null, _) => Err(read_nullish_error(target, &index.render())),
        (Value::Array(items), Value::Number(n)) => Ok(array_index(*n, items.len())
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default()),
        (Value::String(s), Value::Number(n)) => Ok(array_index(*n, usize::MAX)
            .and_then(|i| s.chars().nth(i))
            .map_or(Value::Undefined, |c| Value::String(c.to_string()))),
        _ => get_property(target, &index.render()),
    }
}

/// A number usable as an index below `len`.
fn array_index(n: f64, len: usize) -> Option<usize> {
    if n >= 0.0 && n.fract() == 0.0 && n < len as f64 {
        Some(n as usize)
    } else {
        None
    }
}

fn eval_unary(op: UnaryOp, operand: &Expr, scope: &Scope<'_>) -> TemplateResult<Value> {
    if op == UnaryOp::Typeof {
        // `typeof missing` is "undefined" rather than an error
        if let Expr::Identifier(name) = operand {
            if scope.lookup(name).is_none() {
                return Ok(Value::from("undefined"));
            }
        }
    }

    let value = eval_expr(operand, scope)?;
    Ok(match op {
        UnaryOp::Not => Value::Bool(!value.is_truthy()),
        UnaryOp::Negate => Value::Number(-value.to_number()),
        UnaryOp::Plus => Value::Number(value.to_number()),
        UnaryOp::Typeof => Value::from(value.type_name()),
    })
}

/// Apply a binary operator with JavaScript semantics.
pub fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let left = to_primitive(left);
            let right = to_primitive(right);
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                Value::String(left.render() + &right.render())
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Subtract => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Multiply => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Divide => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Remainder => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Less => Value::Bool(compare(left, right, |o| o.is_lt())),
        BinaryOp::LessEqual => Value::Bool(compare(left, right, |o| o.is_le())),
        BinaryOp::Greater => Value::Bool(compare(left, right, |o| o.is_gt())),
        BinaryOp::GreaterEqual => Value::Bool(compare(left, right, |o| o.is_ge())),
        BinaryOp::Equal => Value::Bool(left.loose_equals(right)),
        BinaryOp::NotEqual => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEqual => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEqual => Value::Bool(!left.strict_equals(right)),
    }
}

/// Arrays and objects become their string form before `+` and comparisons.
fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(value.render()),
        other => other.clone(),
    }
}

fn compare(left: &Value, right: &Value, test: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    let left = to_primitive(left);
    let right = to_primitive(right);
    let ordering = match (&left, &right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    };
    // NaN compares false every way
    ordering.is_some_and(test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expression, parse_template};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(source: &str, bindings: &[(&str, serde_json::Value)]) -> TemplateResult<String> {
        let names: Vec<String> = bindings.iter().map(|(n, _)| n.to_string()).collect();
        let values: Vec<Value> = bindings.iter().map(|(_, v)| Value::from(v.clone())).collect();
        let nodes = parse_template(source)?;
        evaluate(&nodes, &Scope::new(&names, &values))
    }

    fn eval(source: &str) -> Value {
        let expr = parse_expression(source).expect("expression should parse");
        eval_expr(&expr, &Scope::new(&[], &[])).expect("expression should evaluate")
    }

    #[test]
    fn test_literal_text() {
        assert_eq!(render("Hello, world!", &[]).unwrap(), "Hello, world!");
    }

    #[test]
    fn test_simple_variable() {
        let out = render("Hello, ${name}!", &[("name", json!("Alice"))]).unwrap();
        assert_eq!(out, "Hello, Alice!");
    }

    #[test]
    fn test_missing_variable_is_an_error() {
        let err = render("Hello, ${name}!", &[]).unwrap_err();
        assert!(err.is_evaluation());
        assert_eq!(err.to_string(), "Evaluation error: name is not defined");
    }

    #[test]
    fn test_nested_property() {
        let out = render(
            "Salary: ${employee.salary}",
            &[("employee", json!({"salary": 50000}))],
        )
        .unwrap();
        assert_eq!(out, "Salary: 50000");
    }

    #[test]
    fn test_missing_property_is_undefined() {
        let out = render("${user.nickname}", &[("user", json!({}))]).unwrap();
        assert_eq!(out, "undefined");
    }

    #[test]
    fn test_property_of_undefined_fails() {
        let err = render("${user.address.city}", &[("user", json!({}))]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Evaluation error: Cannot read properties of undefined (reading 'city')"
        );
    }

    #[test]
    fn test_optional_chain_short_circuits() {
        let out = render("${user?.address.city}", &[("user", json!(null))]).unwrap();
        assert_eq!(out, "undefined");
        let out = render("${user.address?.city ?? 'n/a'}", &[("user", json!({}))]).unwrap();
        assert_eq!(out, "n/a");
    }

    #[test]
    fn test_ternary_with_nested_template_literal() {
        let source = "${maintainedBy ? `a template engine maintained by ${maintainedBy}` : 'not maintained anymore'}.";
        let out = render(source, &[("maintainedBy", json!("Good Samaritans"))]).unwrap();
        assert_eq!(out, "a template engine maintained by Good Samaritans.");

        let out = render(source, &[("maintainedBy", json!(""))]).unwrap();
        assert_eq!(out, "not maintained anymore.");
    }

    #[test]
    fn test_map_join_iteration() {
        let out = render(
            "<ul>${items.map((item, i) => `<li>${i + 1}. ${item.name}</li>`).join('')}</ul>",
            &[("items", json!([{"name": "apple"}, {"name": "pear"}]))],
        )
        .unwrap();
        assert_eq!(out, "<ul><li>1. apple</li><li>2. pear</li></ul>");
    }

    #[test]
    fn test_callback_sees_outer_scope() {
        let out = render(
            "${tags.map(t => prefix + t).join(' ')}",
            &[("tags", json!(["a", "b"])), ("prefix", json!("#"))],
        )
        .unwrap();
        assert_eq!(out, "#a #b");
    }

    #[test]
    fn test_arithmetic_and_concatenation() {
        assert_eq!(eval("1 + 2 * 3"), Value::Number(7.0));
        assert_eq!(eval("'1' + 2"), Value::from("12"));
        assert_eq!(eval("'3' * '4'"), Value::Number(12.0));
        assert_eq!(eval("7 % 3"), Value::Number(1.0));
        assert_eq!(eval("[1, 2] + ''"), Value::from("1,2"));
        assert_eq!(eval("-'5'"), Value::Number(-5.0));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("2 < 10"), Value::Bool(true));
        assert_eq!(eval("'2' < '10'"), Value::Bool(false));
        assert_eq!(eval("1 == '1'"), Value::Bool(true));
        assert_eq!(eval("1 === '1'"), Value::Bool(false));
        assert_eq!(eval("null == undefined"), Value::Bool(true));
        assert_eq!(eval("undefined < 1"), Value::Bool(false));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(eval("0 || 'fallback'"), Value::from("fallback"));
        assert_eq!(eval("'a' && 'b'"), Value::from("b"));
        assert_eq!(eval("0 ?? 'unused'"), Value::Number(0.0));
        assert_eq!(eval("null ?? 'used'"), Value::from("used"));
    }

    #[test]
    fn test_logical_short_circuit_skips_errors() {
        let out = render("${false && missing.name}", &[]).unwrap();
        assert_eq!(out, "false");
    }

    #[test]
    fn test_typeof() {
        assert_eq!(eval("typeof 1"), Value::from("number"));
        assert_eq!(eval("typeof missing"), Value::from("undefined"));
        assert_eq!(eval("typeof null"), Value::from("object"));
    }

    #[test]
    fn test_index_access() {
        let out = render(
            "${items[1]} ${items[5]} ${word[0]} ${map['key']}",
            &[
                ("items", json!(["a", "b"])),
                ("word", json!("hey")),
                ("map", json!({"key": "v"})),
            ],
        )
        .unwrap();
        assert_eq!(out, "b undefined h v");
    }

    #[test]
    fn test_arrow_outside_callback_fails() {
        let err = render("${x => x}", &[]).unwrap_err();
        assert!(err.to_string().contains("only be used as callback arguments"));
    }

    #[test]
    fn test_calling_a_value_fails() {
        let err = render("${title()}", &[("title", json!("x"))]).unwrap_err();
        assert_eq!(err.to_string(), "Evaluation error: title is not a function");
    }

    #[test]
    fn test_scope_lookup_prefers_child_and_last_duplicate() {
        let names = vec!["a".to_string(), "a".to_string()];
        let values = vec![Value::from(1), Value::from(2)];
        let root = Scope::new(&names, &values);
        assert_eq!(root.lookup("a"), Some(Value::Number(2.0)));

        let child_names = vec!["a".to_string(), "b".to_string()];
        let child_values = vec![Value::from("child")];
        let child = root.child(&child_names, &child_values);
        assert_eq!(child.lookup("a"), Some(Value::from("child")));
        assert_eq!(child.lookup("b"), Some(Value::Undefined));
        assert_eq!(child.lookup("c"), None);
    }
}
