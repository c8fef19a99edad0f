//! Amount entry: arithmetic expressions and BRL display
//!
//! Operators type amounts like `12,50 + 3x2` on the payment form. The
//! expression is parsed with a small recursive-descent parser:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | number | '(' expr ')'
//! ```
//!
//! `,` is accepted as the decimal separator and `x`/`X` as multiplication.

use crate::{Error, Result};

/// Deepest nesting of parentheses and unary signs a parser will follow
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' | 'x' | 'X' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' | ',' => {
                let mut literal = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    match d {
                        '0'..='9' => literal.push(d),
                        '.' | ',' => literal.push('.'),
                        _ => break,
                    }
                    chars.next();
                }
                let has_digit = literal.bytes().any(|b| b.is_ascii_digit());
                if !has_digit || literal.matches('.').count() > 1 {
                    return Err(Error::InvalidExpression(format!(
                        "Invalid number at position {}: {}",
                        start, literal
                    )));
                }
                let value = literal.parse::<f64>().map_err(|e| {
                    Error::InvalidExpression(format!("Invalid number {}: {}", literal, e))
                })?;
                tokens.push(Token::Number(value));
            }
            other => {
                return Err(Error::InvalidExpression(format!(
                    "Unexpected character {:?} at position {}",
                    other, start
                )));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.advance();
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.advance();
            let rhs = self.factor()?;
            value = if op == Token::Star {
                value * rhs
            } else {
                if rhs == 0.0 {
                    return Err(Error::InvalidExpression("Division by zero".to_string()));
                }
                value / rhs
            };
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::InvalidExpression("Expression nested too deeply".to_string()));
        }
        self.depth += 1;
        let value = self.primary();
        self.depth -= 1;
        value
    }

    fn primary(&mut self) -> Result<f64> {
        match self.advance() {
            Some(Token::Plus) => self.factor(),
            Some(Token::Minus) => Ok(-self.factor()?),
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(Error::InvalidExpression("Missing closing parenthesis".to_string())),
                }
            }
            Some(token) => Err(Error::InvalidExpression(format!("Unexpected {:?}", token))),
            None => Err(Error::InvalidExpression("Unexpected end of expression".to_string())),
        }
    }
}

/// Round to cents
fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Evaluate an amount expression, rounded to two decimal places.
pub fn evaluate_expression(input: &str) -> Result<f64> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(Error::InvalidExpression("Empty expression".to_string()));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(Error::InvalidExpression(format!("Unexpected trailing {:?}", token)));
    }
    if !value.is_finite() {
        return Err(Error::InvalidExpression("Result is not a finite number".to_string()));
    }
    Ok(round_cents(value))
}

/// Whether the input contains an arithmetic operator.
pub fn is_expression(input: &str) -> bool {
    input
        .chars()
        .any(|c| matches!(c, '+' | '-' | '*' | '/' | 'x' | 'X'))
}

/// Render an evaluated amount back into the input field, `,` as separator.
pub fn format_amount_input(value: f64) -> String {
    format!("{}", round_cents(value)).replace('.', ",")
}

/// Evaluate operator input into a payable amount (must be positive).
pub fn parse_amount(input: &str) -> Result<f64> {
    let value = evaluate_expression(input).map_err(|e| match e {
        Error::InvalidExpression(msg) => Error::InvalidAmount(msg),
        other => other,
    })?;
    if value <= 0.0 {
        return Err(Error::InvalidAmount(format!(
            "{} must be greater than zero",
            format_amount_input(value)
        )));
    }
    Ok(value)
}

/// Display an amount as Brazilian reais, e.g. `R$ 1.234,56`.
pub fn format_brl(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}R$ {},{:02}", sign, grouped, cents % 100)
}
