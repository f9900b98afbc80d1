//! Restricted expression evaluation
//!
//! Formulas that are not a single function call are arithmetic over
//! numbers, `+ - * /` and parentheses, after every cell reference has been
//! replaced with its value. `IF` conditions use the same machinery with a
//! wider grammar: comparisons, `&&`, `||`, `!`, string literals and
//! `TRUE`/`FALSE`. Nothing is ever handed to a general-purpose interpreter.

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;
use crate::tokenizer::unquoted_segments;
use lazy_regex::{lazy_regex, regex_is_match, Lazy};
use regex::Regex;
use sheetcalc_core::{format_number, CellAddress, ResolvedValue};
use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::CharIndices;

/// Deepest nesting of parentheses and unary operators the parser accepts
pub const MAX_NESTING: usize = 64;

/// A bare `A1`-style label outside of string literals
static REFERENCE: Lazy<Regex> = lazy_regex!(r"\b[A-Za-z]+[0-9]+\b");

/// How a referenced value is written back into the expression text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution {
    /// Numbers only; a text value cannot appear in arithmetic
    Arithmetic,
    /// Text values become quoted string literals
    Condition,
}

/// Replace every cell label outside string literals with the cell's value
///
/// Empty cells become `0` and negative numbers are parenthesized so the
/// result still parses.
pub fn substitute_references(
    expr: &str,
    ctx: &mut EvaluationContext<'_>,
    mode: Substitution,
) -> FormulaResult<String> {
    let mut out = String::with_capacity(expr.len());
    let mut copied = 0;

    for (offset, segment) in unquoted_segments(expr) {
        for m in REFERENCE.find_iter(segment) {
            let start = offset + m.start();
            out.push_str(&expr[copied..start]);

            let addr = CellAddress::parse(m.as_str())
                .map_err(|e| FormulaError::InvalidReference(e.to_string()))?;
            let value = ctx.resolve_cell(addr)?;
            out.push_str(&render(&value, mode, m.as_str())?);

            copied = offset + m.end();
        }
    }

    out.push_str(&expr[copied..]);
    Ok(out)
}

fn render(value: &ResolvedValue, mode: Substitution, label: &str) -> FormulaResult<String> {
    match value {
        ResolvedValue::Empty => Ok("0".to_string()),
        ResolvedValue::Number(n) if *n < 0.0 => Ok(format!("({})", format_number(*n))),
        ResolvedValue::Number(n) => Ok(format_number(*n)),
        ResolvedValue::Text(text) => match mode {
            Substitution::Arithmetic => Err(FormulaError::UnknownName(format!(
                "{} holds text '{}'",
                label, text
            ))),
            Substitution::Condition => Ok(format!("\"{}\"", text.replace('"', "\"\""))),
        },
    }
}

/// Evaluate an arithmetic formula body such as `A1*2+(B1-1)/4`
///
/// Division by zero is reported as [`FormulaError::DivisionByZero`], which
/// the evaluator shows as `#DIV/0!` rather than the catch-all `#ERROR!`.
/// Any other non-finite result is an [`FormulaError::Evaluation`] error.
pub fn evaluate_arithmetic(expr: &str, ctx: &mut EvaluationContext<'_>) -> FormulaResult<f64> {
    let substituted = substitute_references(expr, ctx, Substitution::Arithmetic)?;
    if !regex_is_match!(r"^[0-9+\-*/().\s]+$", &substituted) {
        return Err(FormulaError::UnknownName(expr.to_string()));
    }

    let n = parse_expression(&substituted)?.to_number()?;
    if !n.is_finite() {
        return Err(FormulaError::Evaluation(format!(
            "'{}' does not evaluate to a finite number",
            expr
        )));
    }
    Ok(n)
}

/// Evaluate an `IF` condition; a malformed condition is false
pub fn evaluate_condition(expr: &str, ctx: &mut EvaluationContext<'_>) -> FormulaResult<bool> {
    let substituted = substitute_references(expr, ctx, Substitution::Condition)?;
    match parse_expression(&substituted) {
        Ok(value) => Ok(value.is_truthy()),
        Err(e) => {
            log::debug!("condition '{}' treated as false: {}", expr, e);
            Ok(false)
        }
    }
}

/// Parse and evaluate a substituted expression
pub fn parse_expression(text: &str) -> FormulaResult<Operand> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.or()?;
    match parser.peek() {
        None => Ok(value),
        Some(token) => Err(FormulaError::Parse(format!(
            "unexpected {:?} in '{}'",
            token, text
        ))),
    }
}

/// Value produced while evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Operand {
    fn to_number(&self) -> FormulaResult<f64> {
        match self {
            Operand::Number(n) => Ok(*n),
            Operand::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Operand::Text(s) => Err(FormulaError::InvalidArgument(format!(
                "'{}' used as a number",
                s
            ))),
        }
    }

    /// Nonzero numbers, non-empty strings and `TRUE`
    pub fn is_truthy(&self) -> bool {
        match self {
            Operand::Number(n) => *n != 0.0 && !n.is_nan(),
            Operand::Text(s) => !s.is_empty(),
            Operand::Bool(b) => *b,
        }
    }

    fn compare(&self, other: &Operand) -> Option<Ordering> {
        match (self, other) {
            (Operand::Text(a), Operand::Text(b)) => Some(a.to_lowercase().cmp(&b.to_lowercase())),
            (Operand::Text(_), _) | (_, Operand::Text(_)) => None,
            _ => {
                let a = self.to_number().ok()?;
                let b = other.to_number().ok()?;
                a.partial_cmp(&b)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Bool(bool),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
}

struct Lexer<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().peekable(),
        }
    }

    fn tokenize(mut self) -> FormulaResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some((start, c)) = self.chars.next() {
            let token = match c {
                c if c.is_whitespace() => continue,
                '0'..='9' | '.' => self.scan_number(start)?,
                '"' => self.scan_string()?,
                c if c.is_ascii_alphabetic() => self.scan_word(start)?,
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '(' => Token::LParen,
                ')' => Token::RParen,
                '=' => {
                    self.eat('=');
                    Token::Eq
                }
                '!' if self.eat('=') => Token::Ne,
                '!' => Token::Not,
                '<' if self.eat('=') => Token::Le,
                '<' if self.eat('>') => Token::Ne,
                '<' => Token::Lt,
                '>' if self.eat('=') => Token::Ge,
                '>' => Token::Gt,
                '&' if self.eat('&') => Token::And,
                '|' if self.eat('|') => Token::Or,
                other => {
                    return Err(FormulaError::Parse(format!(
                        "unexpected '{}' in '{}'",
                        other, self.text
                    )))
                }
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn eat(&mut self, expected: char) -> bool {
        self.chars.next_if(|&(_, c)| c == expected).is_some()
    }

    fn scan_number(&mut self, start: usize) -> FormulaResult<Token> {
        let mut end = start + 1;
        while let Some((i, _)) = self.chars.next_if(|&(_, c)| c.is_ascii_digit() || c == '.') {
            end = i + 1;
        }
        let literal = &self.text[start..end];
        literal
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::Parse(format!("invalid number '{}'", literal)))
    }

    fn scan_string(&mut self) -> FormulaResult<Token> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) if self.eat('"') => value.push('"'),
                Some((_, '"')) => return Ok(Token::Str(value)),
                Some((_, c)) => value.push(c),
                None => {
                    return Err(FormulaError::Parse(format!(
                        "unterminated string in '{}'",
                        self.text
                    )))
                }
            }
        }
    }

    fn scan_word(&mut self, start: usize) -> FormulaResult<Token> {
        let mut end = start + 1;
        while let Some((i, c)) = self.chars.next_if(|&(_, c)| c.is_ascii_alphanumeric()) {
            end = i + c.len_utf8();
        }
        let word = &self.text[start..end];
        if word.eq_ignore_ascii_case("TRUE") {
            Ok(Token::Bool(true))
        } else if word.eq_ignore_ascii_case("FALSE") {
            Ok(Token::Bool(false))
        } else {
            Err(FormulaError::UnknownName(word.to_string()))
        }
    }
}

/// Recursive descent, lowest precedence first:
/// `||`, `&&`, comparison, `+ -`, `* /`, unary, primary
///
/// Every parenthesized group and unary operator passes through `unary`,
/// which bounds the recursion at [`MAX_NESTING`].
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn accept(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> FormulaResult<Operand> {
        let mut left = self.and()?;
        while self.accept(&Token::Or) {
            let right = self.and()?;
            left = Operand::Bool(left.is_truthy() || right.is_truthy());
        }
        Ok(left)
    }

    fn and(&mut self) -> FormulaResult<Operand> {
        let mut left = self.comparison()?;
        while self.accept(&Token::And) {
            let right = self.comparison()?;
            left = Operand::Bool(left.is_truthy() && right.is_truthy());
        }
        Ok(left)
    }

    fn comparison(&mut self) -> FormulaResult<Operand> {
        let left = self.additive()?;
        let op = match self.peek() {
            Some(t @ (Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge)) => {
                t.clone()
            }
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.additive()?;

        let ordering = left.compare(&right);
        let result = match op {
            Token::Eq => ordering == Some(Ordering::Equal),
            Token::Ne => ordering != Some(Ordering::Equal),
            Token::Lt => ordering == Some(Ordering::Less),
            Token::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            Token::Gt => ordering == Some(Ordering::Greater),
            _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        };
        Ok(Operand::Bool(result))
    }

    fn additive(&mut self) -> FormulaResult<Operand> {
        let mut left = self.term()?;
        loop {
            if self.accept(&Token::Plus) {
                let right = self.term()?;
                left = Operand::Number(left.to_number()? + right.to_number()?);
            } else if self.accept(&Token::Minus) {
                let right = self.term()?;
                left = Operand::Number(left.to_number()? - right.to_number()?);
            } else {
                return Ok(left);
            }
        }
    }

    fn term(&mut self) -> FormulaResult<Operand> {
        let mut left = self.unary()?;
        loop {
            if self.accept(&Token::Star) {
                let right = self.unary()?;
                left = Operand::Number(left.to_number()? * right.to_number()?);
            } else if self.accept(&Token::Slash) {
                let divisor = self.unary()?.to_number()?;
                if divisor == 0.0 {
                    return Err(FormulaError::DivisionByZero);
                }
                left = Operand::Number(left.to_number()? / divisor);
            } else {
                return Ok(left);
            }
        }
    }

    fn unary(&mut self) -> FormulaResult<Operand> {
        if self.depth >= MAX_NESTING {
            return Err(FormulaError::Parse(format!(
                "expression nested deeper than {} levels",
                MAX_NESTING
            )));
        }
        self.depth += 1;
        let result = self.unary_operand();
        self.depth -= 1;
        result
    }

    fn unary_operand(&mut self) -> FormulaResult<Operand> {
        if self.accept(&Token::Minus) {
            return Ok(Operand::Number(-self.unary()?.to_number()?));
        }
        if self.accept(&Token::Plus) {
            return Ok(Operand::Number(self.unary()?.to_number()?));
        }
        if self.accept(&Token::Not) {
            return Ok(Operand::Bool(!self.unary()?.is_truthy()));
        }
        self.primary()
    }

    fn primary(&mut self) -> FormulaResult<Operand> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Operand::Number(n)),
            Some(Token::Str(s)) => Ok(Operand::Text(s)),
            Some(Token::Bool(b)) => Ok(Operand::Bool(b)),
            Some(Token::LParen) => {
                let value = self.or()?;
                if !self.accept(&Token::RParen) {
                    return Err(FormulaError::Parse("expected ')'".to_string()));
                }
                Ok(value)
            }
            Some(token) => Err(FormulaError::Parse(format!("unexpected {:?}", token))),
            None => Err(FormulaError::Parse("unexpected end of expression".to_string())),
        }
    }
}
