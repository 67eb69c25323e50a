/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template AST types.
//!
//! A template is a list of [`TemplateNode`]s: literal text and `${...}`
//! placeholders. Each placeholder holds an [`Expr`] from the restricted
//! expression grammar.

use crate::value::Value;

/// A node in the template AST.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Literal text to be output as-is (escapes already applied).
    Literal(String),

    /// Placeholder: `${expression}`
    Placeholder(Placeholder),
}

/// A `${...}` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    /// The parsed expression.
    pub expr: Expr,
    /// Byte offset of the expression in the template source.
    pub offset: usize,
}

/// An expression inside a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number, string, boolean, `null` or `undefined` literal.
    Literal(Value),

    /// Backtick literal: `` `text ${expr}` ``
    Template(Vec<TemplateNode>),

    /// Array literal: `[a, b]`
    Array(Vec<Expr>),

    /// A name bound as a parameter or callback argument.
    Identifier(String),

    /// Property access: `object.property` or `object?.property`
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },

    /// Computed access: `object[index]` or `object?.[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },

    /// Call: `callee(args)` or `callee?.(args)`
    ///
    /// Only builtin methods (`items.map(...)`) and the global conversions
    /// `String`, `Number` and `Boolean` can be called.
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        optional: bool,
    },

    /// Arrow function: `(item, index) => body`
    ///
    /// Only valid as a callback argument to a builtin method.
    Arrow { params: Vec<String>, body: Box<Expr> },

    /// Prefix operator: `!x`, `-x`, `+x`, `typeof x`
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Arithmetic, comparison and equality operators.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Short-circuit operators: `&&`, `||`, `??`
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Ternary: `test ? consequent : alternate`
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl Expr {
    /// Short source-like description, used in error messages
    /// (`items.map`, `user.name`).
    pub fn describe(&self) -> String {
        match self {
            Expr::Identifier(name) => name.clone(),
            Expr::Member {
                object, property, ..
            } => format!("{}.{}", object.describe(), property),
            Expr::Index { object, .. } => format!("{}[...]", object.describe()),
            Expr::Call { callee, .. } => format!("{}(...)", callee.describe()),
            Expr::Literal(value) => value.render(),
            _ => "expression".to_string(),
        }
    }

    /// Height of the expression tree. Literals and names have depth 1.
    pub fn depth(&self) -> usize {
        let children = match self {
            Expr::Literal(_) | Expr::Identifier(_) => None,
            Expr::Template(nodes) => nodes
                .iter()
                .filter_map(|node| match node {
                    TemplateNode::Placeholder(placeholder) => Some(placeholder.expr.depth()),
                    TemplateNode::Literal(_) => None,
                })
                .max(),
            Expr::Array(items) => items.iter().map(Expr::depth).max(),
            Expr::Member { object, .. } => Some(object.depth()),
            Expr::Index { object, index, .. } => Some(object.depth().max(index.depth())),
            Expr::Call { callee, args, .. } => {
                args.iter().map(Expr::depth).chain([callee.depth()]).max()
            }
            Expr::Arrow { body, .. } => Some(body.depth()),
            Expr::Unary { operand, .. } => Some(operand.depth()),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                Some(left.depth().max(right.depth()))
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => Some(test.depth().max(consequent.depth()).max(alternate.depth())),
        };
        1 + children.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Identifier(name.to_string()))
    }

    #[test]
    fn test_describe_member_chain() {
        let expr = Expr::Member {
            object: Box::new(Expr::Member {
                object: ident("$"),
                property: "user".to_string(),
                optional: false,
            }),
            property: "name".to_string(),
            optional: true,
        };
        assert_eq!(expr.describe(), "$.user.name");
    }

    #[test]
    fn test_describe_call() {
        let expr = Expr::Call {
            callee: Box::new(Expr::Member {
                object: ident("items"),
                property: "map".to_string(),
                optional: false,
            }),
            args: vec![],
            optional: false,
        };
        assert_eq!(expr.describe(), "items.map(...)");
    }

    #[test]
    fn test_depth() {
        assert_eq!(Expr::Identifier("a".to_string()).depth(), 1);
        let expr = Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(Expr::Binary {
                op: BinaryOp::Add,
                left: ident("a"),
                right: Box::new(Expr::Array(vec![])),
            }),
        };
        assert_eq!(expr.depth(), 3);
    }
}
