/*
 * lexer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tokenizer for placeholder expressions, and the scanners that find where a
//! placeholder or template literal ends.
//!
//! All offsets are byte offsets into the full template source, so errors can
//! be reported with a line and column no matter how deeply the expression is
//! nested inside template literals.

use crate::error::{TemplateError, TemplateResult};

/// A token with its byte offset in the template source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(String),
    /// A backtick template literal, split into cooked text and expression
    /// ranges.
    Template(Vec<Segment>),
    Ident(String),

    // Keywords
    True,
    False,
    Null,
    Undefined,
    Typeof,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    QuestionDot,
    Question,
    Colon,
    Arrow,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    AndAnd,
    OrOr,
    QuestionQuestion,

    Eof,
}

impl TokenKind {
    /// Source spelling, used in error messages.
    pub fn describe(&self) -> String {
        let text = match self {
            TokenKind::Number(n) => return crate::value::format_number(*n),
            TokenKind::String(s) => return format!("'{}'", s),
            TokenKind::Template(_) => "template literal",
            TokenKind::Ident(name) => return name.clone(),
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Undefined => "undefined",
            TokenKind::Typeof => "typeof",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::QuestionDot => "?.",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Arrow => "=>",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Bang => "!",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::EqEqEq => "===",
            TokenKind::NotEqEq => "!==",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::QuestionQuestion => "??",
            TokenKind::Eof => "end of expression",
        };
        text.to_string()
    }

    /// The property name this token spells when used after `.`.
    ///
    /// Keywords are valid property names (`a.null`).
    pub fn property_name(&self) -> Option<&str> {
        match self {
            TokenKind::Ident(name) => Some(name),
            TokenKind::True => Some("true"),
            TokenKind::False => Some("false"),
            TokenKind::Null => Some("null"),
            TokenKind::Undefined => Some("undefined"),
            TokenKind::Typeof => Some("typeof"),
            _ => None,
        }
    }
}

/// A piece of template text: either cooked literal text or the byte range of
/// an embedded `${...}` expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expr { start: usize, end: usize },
}

/// How backslashes are treated while splitting template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeMode {
    /// Top-level template text. Only `\$`, `\\` and `` \` `` are escapes;
    /// any other backslash is kept verbatim.
    Template,
    /// Text inside a backtick literal within an expression. Full JavaScript
    /// string escapes apply.
    Literal,
}

/// Line and column (both 1-based) of a byte offset.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let prefix = &source[..offset.min(source.len())];
    let line = prefix.matches('\n').count() + 1;
    let column = match prefix.rfind('\n') {
        Some(pos) => prefix[pos + 1..].chars().count() + 1,
        None => prefix.chars().count() + 1,
    };
    (line, column)
}

pub(crate) fn error_at(source: &str, offset: usize, message: impl AsRef<str>) -> TemplateError {
    let (line, column) = line_col(source, offset);
    TemplateError::parse(format!(
        "{} at line {}, column {}",
        message.as_ref(),
        line,
        column
    ))
}

/// Maximum nesting of expressions, placeholders and template literals.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Why a scan stopped before finding its closing delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    Unterminated,
    TooDeep,
}

/// Find the `}` closing a placeholder whose expression starts at `start`
/// (just after `${`). Braces, quoted strings and nested template literals
/// are skipped.
pub fn scan_expression_end(source: &str, start: usize) -> Result<usize, ScanError> {
    scan_expression(source.as_bytes(), start, 0)
}

/// Find the closing backtick of a template literal whose body starts at
/// `start` (just after the opening backtick).
pub fn scan_template_literal_end(source: &str, start: usize) -> Result<usize, ScanError> {
    scan_template_literal(source.as_bytes(), start, 0)
}

fn scan_expression(bytes: &[u8], start: usize, depth: usize) -> Result<usize, ScanError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(ScanError::TooDeep);
    }
    let mut braces = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                i = skip_quoted(bytes, i + 1, quote).ok_or(ScanError::Unterminated)?;
            }
            b'`' => {
                i = scan_template_literal(bytes, i + 1, depth + 1)?;
            }
            b'{' => braces += 1,
            b'}' => {
                if braces == 0 {
                    return Ok(i);
                }
                braces -= 1;
            }
            _ => {}
        }
        i += 1;
    }
    Err(ScanError::Unterminated)
}

fn scan_template_literal(bytes: &[u8], start: usize, depth: usize) -> Result<usize, ScanError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(ScanError::TooDeep);
    }
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'`' => return Ok(i),
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                i = scan_expression(bytes, i + 2, depth + 1)?;
            }
            _ => {}
        }
        i += 1;
    }
    Err(ScanError::Unterminated)
}

/// Turn a failed scan into a parse error at `offset`.
fn scan_error(source: &str, offset: usize, err: ScanError, unterminated: &str) -> TemplateError {
    match err {
        ScanError::Unterminated => error_at(source, offset, unterminated),
        ScanError::TooDeep => error_at(source, offset, "Expression nested too deeply"),
    }
}

fn within(close: usize, end: usize) -> Result<usize, ScanError> {
    if close < end {
        Ok(close)
    } else {
        Err(ScanError::Unterminated)
    }
}

/// Returns the index of the closing quote.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'\n' => return None,
            b if b == quote => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split `source[start..end]` into literal text and placeholder ranges.
pub fn split_segments(
    source: &str,
    start: usize,
    end: usize,
    mode: EscapeMode,
) -> TemplateResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut i = start;

    while i < end {
        let rest = &source[i..end];
        if rest.starts_with("${") {
            let expr_start = i + 2;
            let close = scan_expression_end(source, expr_start)
                .and_then(|close| within(close, end))
                .map_err(|err| scan_error(source, i, err, "Unterminated placeholder"))?;
            if source[expr_start..close].trim().is_empty() {
                return Err(error_at(source, i, "Empty placeholder"));
            }
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(Segment::Expr {
                start: expr_start,
                end: close,
            });
            i = close + 1;
        } else if rest.starts_with('\\') {
            i = cook_escape(source, i, end, mode, &mut text)?;
        } else {
            let ch = rest.chars().next().unwrap_or_default();
            text.push(ch);
            i += ch.len_utf8();
        }
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Cook the escape sequence starting at the backslash at `at`, appending the
/// result to `out`. Returns the offset just past the sequence.
fn cook_escape(
    source: &str,
    at: usize,
    end: usize,
    mode: EscapeMode,
    out: &mut String,
) -> TemplateResult<usize> {
    let Some(next) = source[at + 1..end].chars().next() else {
        // Trailing backslash
        out.push('\\');
        return Ok(at + 1);
    };
    let after = at + 1 + next.len_utf8();

    if mode == EscapeMode::Template {
        match next {
            '$' | '\\' | '`' => out.push(next),
            _ => {
                out.push('\\');
                return Ok(at + 1);
            }
        }
        return Ok(after);
    }

    match next {
        'n' => out.push('\n'),
        't' => out.push('\t'),
        'r' => out.push('\r'),
        'b' => out.push('\u{8}'),
        'f' => out.push('\u{c}'),
        'v' => out.push('\u{b}'),
        '0' => out.push('\0'),
        // Line continuation
        '\n' => {}
        'x' => {
            let hex = source
                .get(after..after + 2)
                .ok_or_else(|| error_at(source, at, "Invalid hexadecimal escape"))?;
            out.push(decode_hex(source, at, hex)?);
            return Ok(after + 2);
        }
        'u' => {
            if source[after..end].starts_with('{') {
                let close = source[after..end]
                    .find('}')
                    .map(|pos| after + pos)
                    .ok_or_else(|| error_at(source, at, "Invalid Unicode escape"))?;
                out.push(decode_hex(source, at, &source[after + 1..close])?);
                return Ok(close + 1);
            }
            let hex = source
                .get(after..after + 4)
                .ok_or_else(|| error_at(source, at, "Invalid Unicode escape"))?;
            out.push(decode_hex(source, at, hex)?);
            return Ok(after + 4);
        }
        other => out.push(other),
    }
    Ok(after)
}

fn decode_hex(source: &str, at: usize, hex: &str) -> TemplateResult<char> {
    // from_str_radix alone would also accept a leading sign
    Some(hex)
        .filter(|hex| !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()))
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .and_then(char::from_u32)
        .ok_or_else(|| error_at(source, at, format!("Invalid escape sequence '{}'", hex)))
}

/// Tokenize the expression in `source[start..end]`.
pub fn tokenize(source: &str, start: usize, end: usize) -> TemplateResult<Vec<Token>> {
    Lexer {
        source,
        pos: start,
        end,
    }
    .run()
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> TemplateResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let offset = self.pos;
            let Some(ch) = self.peek_char() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    offset,
                });
                return Ok(tokens);
            };

            let kind = if ch.is_ascii_digit()
                || (ch == '.' && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()))
            {
                self.number()?
            } else if ch.is_ascii_alphabetic() || ch == '_' || ch == '$' {
                self.identifier()
            } else if ch == '\'' || ch == '"' {
                self.string(ch)?
            } else if ch == '`' {
                self.template()?
            } else {
                self.punctuation(ch)?
            };
            tokens.push(Token { kind, offset });
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..self.end]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn error(&self, offset: usize, message: impl AsRef<str>) -> TemplateError {
        error_at(self.source, offset, message)
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.end - trimmed.len();
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(_, c)| !pred(*c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += len;
        &rest[..len]
    }

    fn number(&mut self) -> TemplateResult<TokenKind> {
        let start = self.pos;
        let rest = self.rest();
        if rest.starts_with("0x") || rest.starts_with("0X") {
            self.pos += 2;
            let digits = self.take_while(|c| c.is_ascii_hexdigit());
            let value = u64::from_str_radix(digits, 16)
                .map_err(|_| self.error(start, "Invalid hexadecimal literal"))?;
            return self.finish_number(start, value as f64);
        }

        self.take_while(|c| c.is_ascii_digit());
        if self.peek_char() == Some('.') {
            self.pos += 1;
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.pos += 1;
            }
            if self.take_while(|c| c.is_ascii_digit()).is_empty() {
                self.pos = mark;
            }
        }
        let text = &self.source[start..self.pos];
        let value = text
            .parse::<f64>()
            .map_err(|_| self.error(start, format!("Invalid number '{}'", text)))?;
        self.finish_number(start, value)
    }

    fn finish_number(&self, start: usize, value: f64) -> TemplateResult<TokenKind> {
        match self.peek_char() {
            Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '$' => Err(self.error(
                start,
                "Identifier starts immediately after numeric literal",
            )),
            _ => Ok(TokenKind::Number(value)),
        }
    }

    fn identifier(&mut self) -> TokenKind {
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
        match name {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            "typeof" => TokenKind::Typeof,
            _ => TokenKind::Ident(name.to_string()),
        }
    }

    fn string(&mut self, quote: char) -> TemplateResult<TokenKind> {
        let start = self.pos;
        let close = skip_quoted(self.source.as_bytes(), start + 1, quote as u8)
            .filter(|close| *close < self.end)
            .ok_or_else(|| self.error(start, "Unterminated string literal"))?;

        let mut value = String::new();
        let mut i = start + 1;
        while i < close {
            if self.source[i..].starts_with('\\') {
                i = cook_escape(self.source, i, close, EscapeMode::Literal, &mut value)?;
            } else {
                let ch = self.source[i..].chars().next().unwrap_or_default();
                value.push(ch);
                i += ch.len_utf8();
            }
        }
        self.pos = close + 1;
        Ok(TokenKind::String(value))
    }

    fn template(&mut self) -> TemplateResult<TokenKind> {
        let start = self.pos;
        let close = scan_template_literal_end(self.source, start + 1)
            .and_then(|close| within(close, self.end))
            .map_err(|err| scan_error(self.source, start, err, "Unterminated template literal"))?;
        let segments = split_segments(self.source, start + 1, close, EscapeMode::Literal)?;
        self.pos = close + 1;
        Ok(TokenKind::Template(segments))
    }

    fn punctuation(&mut self, ch: char) -> TemplateResult<TokenKind> {
        let start = self.pos;
        let rest = self.rest();

        // Longest match first
        const OPERATORS: &[(&str, TokenKind)] = &[
            ("===", TokenKind::EqEqEq),
            ("!==", TokenKind::NotEqEq),
            ("==", TokenKind::EqEq),
            ("!=", TokenKind::NotEq),
            ("<=", TokenKind::LessEqual),
            (">=", TokenKind::GreaterEqual),
            ("=>", TokenKind::Arrow),
            ("&&", TokenKind::AndAnd),
            ("||", TokenKind::OrOr),
            ("??", TokenKind::QuestionQuestion),
        ];
        for (text, kind) in OPERATORS {
            if rest.starts_with(text) {
                self.pos += text.len();
                return Ok(kind.clone());
            }
        }

        // `a?.5:1` is a ternary, not optional chaining
        if rest.starts_with("?.") && !self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 2;
            return Ok(TokenKind::QuestionDot);
        }

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '!' => TokenKind::Bang,
            '<' => TokenKind::Less,
            '>' => TokenKind::Greater,
            '=' => return Err(self.error(start, "Assignment is not supported in templates")),
            '{' => return Err(self.error(start, "Object literals are not supported in templates")),
            '&' | '|' | '^' | '~' => {
                return Err(self.error(start, "Bitwise operators are not supported in templates"));
            }
            ';' => return Err(self.error(start, "Statements are not supported in templates")),
            other => return Err(self.error(start, format!("Unexpected character '{}'", other))),
        };
        self.pos += ch.len_utf8();
        Ok(kind)
    }
}
