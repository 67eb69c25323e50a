/*
 * methods.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Builtin methods and global conversion functions.
//!
//! Templates can call a fixed set of array, string and number methods plus
//! the `String`, `Number` and `Boolean` conversions. Callback methods
//! (`map`, `filter`, ...) take an arrow function, which is invoked with the
//! element and its index.

use crate::ast::Expr;
use crate::error::{TemplateError, TemplateResult};
use crate::evaluator::{Scope, eval_expr};
use crate::value::{Value, format_number, join_values};

/// Longest string a method may produce, in characters.
pub const MAX_STRING_LENGTH: usize = (1 << 29) - 24;

/// Call `receiver.name(args)`.
///
/// `callee` is the source-like description of the callee, used in the
/// "is not a function" error.
pub fn call_method(
    receiver: &Value,
    name: &str,
    args: &[Expr],
    scope: &Scope<'_>,
    callee: &str,
) -> TemplateResult<Value> {
    if name == "toString" {
        return Ok(Value::String(receiver.render()));
    }

    let result = match receiver {
        Value::Array(items) => array_method(items, name, args, scope, callee)?,
        Value::String(s) => string_method(s, name, &eval_args(args, scope)?)?,
        Value::Number(n) => number_method(*n, name, &eval_args(args, scope)?)?,
        _ => None,
    };

    result.ok_or_else(|| TemplateError::eval(format!("{} is not a function", callee)))
}

/// Call a global conversion function. Returns `None` for unknown names.
pub fn call_global(name: &str, args: &[Expr], scope: &Scope<'_>) -> TemplateResult<Option<Value>> {
    let first = match args.first() {
        Some(expr) => Some(eval_expr(expr, scope)?),
        None => None,
    };
    Ok(match name {
        "String" => Some(Value::String(first.map_or_else(String::new, |v| v.render()))),
        "Number" => Some(Value::Number(first.map_or(0.0, |v| v.to_number()))),
        "Boolean" => Some(Value::Bool(first.is_some_and(|v| v.is_truthy()))),
        _ => None,
    })
}

fn eval_args(args: &[Expr], scope: &Scope<'_>) -> TemplateResult<Vec<Value>> {
    args.iter().map(|arg| eval_expr(arg, scope)).collect()
}

fn arg(values: &[Value], index: usize) -> Value {
    values.get(index).cloned().unwrap_or_default()
}

/// An arrow function passed as a callback argument.
struct Callback<'e> {
    params: &'e [String],
    body: &'e Expr,
}

impl<'e> Callback<'e> {
    fn from_args(args: &'e [Expr], callee: &str) -> TemplateResult<Self> {
        match args.first() {
            Some(Expr::Arrow { params, body }) => Ok(Callback { params, body }),
            _ => Err(TemplateError::eval(format!(
                "{} expects an arrow function callback",
                callee
            ))),
        }
    }

    fn invoke(&self, scope: &Scope<'_>, item: &Value, index: usize) -> TemplateResult<Value> {
        let values = [item.clone(), Value::Number(index as f64)];
        let child = scope.child(self.params, &values);
        eval_expr(self.body, &child)
    }
}

fn array_method(
    items: &[Value],
    name: &str,
    args: &[Expr],
    scope: &Scope<'_>,
    callee: &str,
) -> TemplateResult<Option<Value>> {
    let value = match name {
        "map" => {
            let callback = Callback::from_args(args, callee)?;
            let mapped = items
                .iter()
                .enumerate()
                .map(|(i, item)| callback.invoke(scope, item, i))
                .collect::<TemplateResult<Vec<_>>>()?;
            Value::Array(mapped)
        }
        "filter" => {
            let callback = Callback::from_args(args, callee)?;
            let mut kept = Vec::new();
            for (i, item) in items.iter().enumerate() {
                if callback.invoke(scope, item, i)?.is_truthy() {
                    kept.push(item.clone());
                }
            }
            Value::Array(kept)
        }
        "find" => {
            let callback = Callback::from_args(args, callee)?;
            let mut found = Value::Undefined;
            for (i, item) in items.iter().enumerate() {
                if callback.invoke(scope, item, i)?.is_truthy() {
                    found = item.clone();
                    break;
                }
            }
            found
        }
        "some" => {
            let callback = Callback::from_args(args, callee)?;
            let mut any = false;
            for (i, item) in items.iter().enumerate() {
                if callback.invoke(scope, item, i)?.is_truthy() {
                    any = true;
                    break;
                }
            }
            Value::Bool(any)
        }
        "every" => {
            let callback = Callback::from_args(args, callee)?;
            let mut all = true;
            for (i, item) in items.iter().enumerate() {
                if !callback.invoke(scope, item, i)?.is_truthy() {
                    all = false;
                    break;
                }
            }
            Value::Bool(all)
        }
        _ => {
            let values = eval_args(args, scope)?;
            match array_plain_method(items, name, &values) {
                Some(value) => value,
                None => return Ok(None),
            }
        }
    };
    Ok(Some(value))
}

fn array_plain_method(items: &[Value], name: &str, args: &[Value]) -> Option<Value> {
    let value = match name {
        "join" => {
            let separator = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                other => other.render(),
            };
            Value::String(join_values(items, &separator))
        }
        "includes" => {
            let needle = arg(args, 0);
            Value::Bool(items.iter().any(|item| same_value_zero(item, &needle)))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            let position = items.iter().position(|item| item.strict_equals(&needle));
            Value::Number(position.map_or(-1.0, |p| p as f64))
        }
        "slice" => {
            let (start, end) = slice_bounds(args, items.len());
            Value::Array(items.get(start..end).map(<[Value]>::to_vec).unwrap_or_default())
        }
        "concat" => {
            let mut joined = items.to_vec();
            for value in args {
                match value {
                    Value::Array(more) => joined.extend(more.iter().cloned()),
                    other => joined.push(other.clone()),
                }
            }
            Value::Array(joined)
        }
        "reverse" => Value::Array(items.iter().rev().cloned().collect()),
        _ => return None,
    };
    Some(value)
}

fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}

/// Resolve `slice(start, end)` arguments against a length.
fn slice_bounds(args: &[Value], len: usize) -> (usize, usize) {
    let start = relative_index(&arg(args, 0), len, 0);
    let end = relative_index(&arg(args, 1), len, len);
    (start, end.max(start))
}

/// Clamp a possibly negative index into `0..=len`.
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

fn string_method(s: &str, name: &str, args: &[Value]) -> TemplateResult<Option<Value>> {
    let value = match name {
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::from(s.trim()),
        "trimStart" => Value::from(s.trim_start()),
        "trimEnd" => Value::from(s.trim_end()),
        "includes" => Value::Bool(s.contains(&string_arg(args, 0))),
        "startsWith" => Value::Bool(s.starts_with(&string_arg(args, 0))),
        "endsWith" => Value::Bool(s.ends_with(&string_arg(args, 0))),
        "indexOf" => {
            let position = s
                .find(&string_arg(args, 0))
                .map(|byte| s[..byte].chars().count() as f64);
            Value::Number(position.unwrap_or(-1.0))
        }
        "slice" => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(args, chars.len());
            Value::String(chars[start..end].iter().collect())
        }
        "charAt" => {
            let index = arg(args, 0).to_number();
            let index = if index.is_nan() { 0.0 } else { index.trunc() };
            let c = if index >= 0.0 {
                s.chars().nth(index as usize)
            } else {
                None
            };
            Value::String(c.map(String::from).unwrap_or_default())
        }
        "split" => split(s, args),
        "repeat" => {
            let count = arg(args, 0).to_number();
            let count = if count.is_nan() { 0.0 } else { count.trunc() };
            if count < 0.0 || count.is_infinite() {
                return Err(TemplateError::eval(format!(
                    "Invalid count value: {}",
                    format_number(count)
                )));
            }
            if s.is_empty() || count == 0.0 {
                return Ok(Some(Value::from("")));
            }
            if s.chars().count() as f64 * count > MAX_STRING_LENGTH as f64 {
                return Err(invalid_length());
            }
            Value::String(s.repeat(count as usize))
        }
        "padStart" => Value::String(pad(s, args, true)?),
        "padEnd" => Value::String(pad(s, args, false)?),
        "replace" => Value::String(s.replacen(&string_arg(args, 0), &string_arg(args, 1), 1)),
        "replaceAll" => Value::String(s.replace(&string_arg(args, 0), &string_arg(args, 1))),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// A string argument; missing arguments become "undefined", as in JavaScript.
fn string_arg(args: &[Value], index: usize) -> String {
    arg(args, index).render()
}

fn invalid_length() -> TemplateError {
    TemplateError::eval("Invalid string length")
}

/// JavaScript `ToUint32`.
fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

fn split(s: &str, args: &[Value]) -> Value {
    let limit = match arg(args, 1) {
        Value::Undefined => usize::MAX,
        other => to_uint32(other.to_number()) as usize,
    };
    let parts: Vec<Value> = match arg(args, 0) {
        Value::Undefined => vec![Value::from(s)],
        separator => {
            let separator = separator.render();
            if separator.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(separator.as_str()).map(Value::from).collect()
            }
        }
    };
    Value::Array(parts.into_iter().take(limit).collect())
}

fn pad(s: &str, args: &[Value], at_start: bool) -> TemplateResult<String> {
    let target = arg(args, 0).to_number();
    let target = if target.is_nan() { 0.0 } else { target.trunc() };
    let fill = match arg(args, 1) {
        Value::Undefined => " ".to_string(),
        other => other.render(),
    };
    let len = s.chars().count();
    if target <= len as f64 || fill.is_empty() {
        return Ok(s.to_string());
    }
    if target > MAX_STRING_LENGTH as f64 {
        return Err(invalid_length());
    }
    let padding: String = fill.chars().cycle().take(target as usize - len).collect();
    Ok(if at_start {
        padding + s
    } else {
        s.to_string() + &padding
    })
}

fn number_method(n: f64, name: &str, args: &[Value]) -> TemplateResult<Option<Value>> {
    match name {
        "toFixed" => {
            let digits = arg(args, 0).to_number();
            let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
            if !(0.0..=100.0).contains(&digits) {
                return Err(TemplateError::eval(
                    "toFixed() digits argument must be between 0 and 100",
                ));
            }
            // Large magnitudes use the plain number form, as String(n) does
            let text = if n.is_finite() && n.abs() < 1e21 {
                format!("{:.*}", digits as usize, n)
            } else {
                format_number(n)
            };
            Ok(Some(Value::String(text)))
        }
        _ => Ok(None),
    }
}
