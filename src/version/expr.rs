//! Restricted evaluator for the right-hand side of a version assignment
//!
//! Accepts only literals and trivial operations on them:
//! - strings: `'1.0'`, `"1.0"` (no interpolation), `q(1.0)`, `qq{1.0}`
//! - numbers: `1.23`, `1_000`, v-strings `v1.2.3` and `1.2.3`
//! - parentheses, unary `-`/`+`, `.` concatenation, `+ - * /`
//!
//! Evaluation stops at the first `;` or `#` outside a literal. Nothing else is
//! ever executed.

use std::iter::Peekable;
use std::str::Chars;

use crate::version::error::ExprError;

/// Evaluate an expression and return its string value
pub fn evaluate(source: &str) -> Result<String, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = ExprParser { tokens, pos: 0 };
    let value = parser.parse_additive()?;
    if parser.pos != parser.tokens.len() {
        return Err(ExprError::TrailingInput);
    }
    Ok(value.into_string())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Str(String),
    Num(f64),
    /// Literal kept verbatim, e.g. `v1.2.3`
    Raw(String),
    Op(char),
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Num(f64),
}

impl Value {
    fn into_string(self) -> String {
        match self {
            Value::Str(s) => s,
            Value::Num(n) => format_number(n),
        }
    }

    fn to_number(&self) -> Result<f64, ExprError> {
        match self {
            Value::Num(n) => Ok(*n),
            Value::Str(s) => {
                let trimmed = s.trim();
                trimmed
                    .replace('_', "")
                    .parse()
                    .map_err(|_| ExprError::NotNumeric(trimmed.to_string()))
            }
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ';' | '#' => break,
            c if c.is_whitespace() => {
                chars.next();
            }
            '\'' => {
                chars.next();
                tokens.push(Token::Str(read_single_quoted(&mut chars, '\'', '\'')?));
            }
            '"' => {
                chars.next();
                tokens.push(Token::Str(read_double_quoted(&mut chars, '"', '"')?));
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '.' | '+' | '-' | '*' | '/' => {
                chars.next();
                if c == '.' && chars.peek().is_some_and(char::is_ascii_digit) {
                    tokens.push(read_number(&mut chars, "0.".to_string()));
                } else {
                    tokens.push(Token::Op(c));
                }
            }
            c if c.is_ascii_digit() => tokens.push(read_number(&mut chars, String::new())),
            c if c.is_ascii_alphabetic() => tokens.push(read_word(&mut chars)?),
            other => return Err(ExprError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

fn read_word(chars: &mut Peekable<Chars<'_>>) -> Result<Token, ExprError> {
    let mut word = String::new();
    while let Some(&c) = chars.peek() {
        if !(c.is_ascii_alphanumeric() || c == '_') {
            break;
        }
        word.push(c);
        chars.next();
    }

    match word.as_str() {
        "q" | "qq" => {
            let open = chars.next().ok_or(ExprError::UnexpectedEnd)?;
            let close = closing_delimiter(open).ok_or(ExprError::UnexpectedChar(open))?;
            if word == "q" {
                read_single_quoted(chars, open, close).map(Token::Str)
            } else {
                read_double_quoted(chars, open, close).map(Token::Str)
            }
        }
        w if w.len() > 1
            && w.starts_with('v')
            && w[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            // v-string: v1 or v1.2.3
            let mut raw = w.to_string();
            while chars.peek() == Some(&'.') {
                raw.push('.');
                chars.next();
                while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    raw.push(d);
                    chars.next();
                }
            }
            Ok(Token::Raw(raw))
        }
        _ => Err(ExprError::UnexpectedChar(word.chars().next().unwrap_or('?'))),
    }
}

fn closing_delimiter(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        '<' => Some('>'),
        '/' | '|' | '!' | '\'' | '"' => Some(open),
        _ => None,
    }
}

fn read_single_quoted(
    chars: &mut Peekable<Chars<'_>>,
    open: char,
    close: char,
) -> Result<String, ExprError> {
    let mut out = String::new();
    let mut depth = 0usize;
    loop {
        let c = chars.next().ok_or(ExprError::UnterminatedString)?;
        match c {
            '\\' => match chars.next().ok_or(ExprError::UnterminatedString)? {
                e if e == '\\' || e == close || e == open => out.push(e),
                e => {
                    out.push('\\');
                    out.push(e);
                }
            },
            c if c == close && depth == 0 => return Ok(out),
            c if c == close => {
                depth -= 1;
                out.push(c);
            }
            c if c == open && open != close => {
                depth += 1;
                out.push(c);
            }
            c => out.push(c),
        }
    }
}

fn read_double_quoted(
    chars: &mut Peekable<Chars<'_>>,
    open: char,
    close: char,
) -> Result<String, ExprError> {
    let mut out = String::new();
    let mut depth = 0usize;
    loop {
        let c = chars.next().ok_or(ExprError::UnterminatedString)?;
        match c {
            '\\' => match chars.next().ok_or(ExprError::UnterminatedString)? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                e => out.push(e),
            },
            '$' | '@' => return Err(ExprError::Interpolation),
            c if c == close && depth == 0 => return Ok(out),
            c if c == close => {
                depth -= 1;
                out.push(c);
            }
            c if c == open && open != close => {
                depth += 1;
                out.push(c);
            }
            c => out.push(c),
        }
    }
}

/// Reads `123`, `1_000`, `1.5`, `1e3`; two or more dots make a v-string
fn read_number(chars: &mut Peekable<Chars<'_>>, mut raw: String) -> Token {
    let mut dots = raw.matches('.').count();
    while let Some(&c) = chars.peek() {
        match c {
            '0'..='9' | '_' => raw.push(c),
            '.' if chars.clone().nth(1).is_some_and(|n| n.is_ascii_digit()) => {
                dots += 1;
                raw.push(c);
            }
            'e' | 'E' if dots < 2 => {
                let mut lookahead = chars.clone();
                lookahead.next();
                let mut exponent = String::from("e");
                if let Some(&sign) = lookahead.peek().filter(|s| **s == '+' || **s == '-') {
                    exponent.push(sign);
                    lookahead.next();
                }
                if !lookahead.peek().is_some_and(char::is_ascii_digit) {
                    break;
                }
                while let Some(&d) = lookahead.peek().filter(|d| d.is_ascii_digit()) {
                    exponent.push(d);
                    lookahead.next();
                }
                raw.push_str(&exponent);
                *chars = lookahead;
                break;
            }
            _ => break,
        }
        chars.next();
    }

    if dots >= 2 {
        return Token::Raw(raw);
    }
    match raw.replace('_', "").parse() {
        Ok(n) => Token::Num(n),
        Err(_) => Token::Raw(raw),
    }
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    // additive := multiplicative (('+' | '-' | '.') multiplicative)*
    fn parse_additive(&mut self) -> Result<Value, ExprError> {
        let mut lhs = self.parse_multiplicative()?;
        while let Some(Token::Op(op @ ('+' | '-' | '.'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = match op {
                '.' => Value::Str(lhs.into_string() + &rhs.into_string()),
                '+' => Value::Num(lhs.to_number()? + rhs.to_number()?),
                _ => Value::Num(lhs.to_number()? - rhs.to_number()?),
            };
        }
        Ok(lhs)
    }

    // multiplicative := unary (('*' | '/') unary)*
    fn parse_multiplicative(&mut self) -> Result<Value, ExprError> {
        let mut lhs = self.parse_unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.parse_unary()?.to_number()?;
            let lhs_num = lhs.to_number()?;
            lhs = if op == '*' {
                Value::Num(lhs_num * rhs)
            } else if rhs == 0.0 {
                return Err(ExprError::DivisionByZero);
            } else {
                Value::Num(lhs_num / rhs)
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Value, ExprError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(Value::Num(-self.parse_unary()?.to_number()?))
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Value, ExprError> {
        match self.advance().ok_or(ExprError::UnexpectedEnd)? {
            Token::Str(s) | Token::Raw(s) => Ok(Value::Str(s)),
            Token::Num(n) => Ok(Value::Num(n)),
            Token::Open => {
                let value = self.parse_additive()?;
                match self.advance() {
                    Some(Token::Close) => Ok(value),
                    Some(_) => Err(ExprError::TrailingInput),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Token::Close => Err(ExprError::UnexpectedChar(')')),
            Token::Op(op) => Err(ExprError::UnexpectedChar(op)),
        }
    }
}

/// Stringify a number with 15 significant digits, the way the host does
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    // The exponent after rounding to 15 significant digits decides the notation
    let scientific = format!("{n:.14e}");
    let Some((mantissa, exp)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exp.parse().unwrap_or(0);

    if (-4..15).contains(&exponent) {
        let decimals = (14 - exponent) as usize;
        return trim_fraction(&format!("{n:.decimals$}"));
    }

    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
}

fn trim_fraction(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
