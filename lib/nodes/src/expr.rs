//! Restricted expression evaluator.
//!
//! A small, self-contained interpreter: a lexer, a recursive-descent
//! parser producing an explicit operator tree, and a tree-walk
//! evaluator. It exposes arithmetic (`+ - * / % **`), unary sign,
//! comparisons, boolean connectives (`&& || !`, also spelled
//! `and`/`or`/`not`), and a fixed function allow-list
//! (`abs`, `round`, `min`, `max`, `sum`, `len`).
//!
//! Identifiers resolve only against the caller-supplied scope. An
//! identifier that is neither in scope nor on the allow-list is an
//! error, never a silent default.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Names callable in expressions. Everything else is rejected.
pub const ALLOWED_FUNCTIONS: &[&str] = &["abs", "round", "min", "max", "sum", "len"];

/// Errors from parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprError {
    /// The source text could not be parsed.
    Parse { position: usize, message: String },
    /// An identifier was neither in scope nor a known function.
    UnknownIdentifier { name: String },
    /// A call named a function outside the allow-list.
    UnknownFunction { name: String },
    /// A function was called with the wrong number of arguments.
    WrongArity {
        function: String,
        expected: String,
        got: usize,
    },
    /// An operand had an unusable type.
    TypeMismatch { message: String },
    /// Division or remainder by zero.
    DivisionByZero,
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { position, message } => {
                write!(f, "parse error at offset {position}: {message}")
            }
            Self::UnknownIdentifier { name } => write!(f, "unknown identifier '{name}'"),
            Self::UnknownFunction { name } => write!(f, "unknown function '{name}'"),
            Self::WrongArity {
                function,
                expected,
                got,
            } => write!(f, "{function}() expects {expected} arguments, got {got}"),
            Self::TypeMismatch { message } => write!(f, "type mismatch: {message}"),
            Self::DivisionByZero => write!(f, "division by zero"),
        }
    }
}

impl std::error::Error for ExprError {}

/// A runtime value inside the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    Number(f64),
    Bool(bool),
    Str(String),
}

impl ExprValue {
    /// Coerces to a number, or errors.
    pub fn as_number(&self) -> Result<f64, ExprError> {
        match self {
            Self::Number(n) => Ok(*n),
            other => Err(ExprError::TypeMismatch {
                message: format!("expected a number, got {other:?}"),
            }),
        }
    }

    /// Truthiness: false/0/"" are false, everything else true.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::Str(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// A parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Bool(bool),
    Str(String),
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        function: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Parses source text into an expression tree.
    ///
    /// # Errors
    ///
    /// Returns a parse error with the byte offset of the problem.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = lex(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expression()?;
        parser.expect_end()?;
        Ok(expr)
    }

    /// Collects every free identifier referenced by the tree.
    ///
    /// Function names do not count; their arguments do.
    #[must_use]
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Ident(name) => {
                out.insert(name.clone());
            }
            Self::Unary { operand, .. } => operand.collect_identifiers(out),
            Self::Binary { left, right, .. } => {
                left.collect_identifiers(out);
                right.collect_identifiers(out);
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.collect_identifiers(out);
                }
            }
            Self::Number(_) | Self::Bool(_) | Self::Str(_) => {}
        }
    }

    /// Evaluates the tree against a scope of named values.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown identifiers, type mismatches,
    /// arity violations, or division by zero.
    pub fn eval(&self, scope: &HashMap<String, ExprValue>) -> Result<ExprValue, ExprError> {
        match self {
            Self::Number(n) => Ok(ExprValue::Number(*n)),
            Self::Bool(b) => Ok(ExprValue::Bool(*b)),
            Self::Str(s) => Ok(ExprValue::Str(s.clone())),
            Self::Ident(name) => {
                scope
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ExprError::UnknownIdentifier { name: name.clone() })
            }
            Self::Unary { op, operand } => {
                let value = operand.eval(scope)?;
                match op {
                    UnaryOp::Neg => Ok(ExprValue::Number(-value.as_number()?)),
                    UnaryOp::Not => Ok(ExprValue::Bool(!value.truthy())),
                }
            }
            Self::Binary { op, left, right } => eval_binary(*op, left, right, scope),
            Self::Call { function, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.eval(scope)?);
                }
                call_function(function, &values)
            }
        }
    }
}

/// Parses and evaluates in one step.
pub fn eval_str(
    source: &str,
    scope: &HashMap<String, ExprValue>,
) -> Result<ExprValue, ExprError> {
    Expr::parse(source)?.eval(scope)
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    scope: &HashMap<String, ExprValue>,
) -> Result<ExprValue, ExprError> {
    // Boolean connectives evaluate both sides: conditions must surface
    // errors from either operand, so there is no short-circuit here.
    let lhs = left.eval(scope)?;
    let rhs = right.eval(scope)?;

    match op {
        BinaryOp::And => return Ok(ExprValue::Bool(lhs.truthy() && rhs.truthy())),
        BinaryOp::Or => return Ok(ExprValue::Bool(lhs.truthy() || rhs.truthy())),
        BinaryOp::Eq => return values_equal(&lhs, &rhs).map(ExprValue::Bool),
        BinaryOp::Ne => return values_equal(&lhs, &rhs).map(|eq| ExprValue::Bool(!eq)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            return compare_values(op, &lhs, &rhs).map(ExprValue::Bool);
        }
        _ => {}
    }

    let a = lhs.as_number()?;
    let b = rhs.as_number()?;
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            a / b
        }
        BinaryOp::Rem => {
            if b == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            a % b
        }
        BinaryOp::Pow => a.powf(b),
        _ => unreachable!("comparison and boolean ops handled above"),
    };
    Ok(ExprValue::Number(result))
}

fn values_equal(lhs: &ExprValue, rhs: &ExprValue) -> Result<bool, ExprError> {
    match (lhs, rhs) {
        (ExprValue::Number(a), ExprValue::Number(b)) => Ok(a == b),
        (ExprValue::Bool(a), ExprValue::Bool(b)) => Ok(a == b),
        (ExprValue::Str(a), ExprValue::Str(b)) => Ok(a == b),
        _ => Err(ExprError::TypeMismatch {
            message: format!("cannot compare {lhs:?} with {rhs:?}"),
        }),
    }
}

fn compare_values(op: BinaryOp, lhs: &ExprValue, rhs: &ExprValue) -> Result<bool, ExprError> {
    let ordering = match (lhs, rhs) {
        (ExprValue::Number(a), ExprValue::Number(b)) => {
            a.partial_cmp(b).ok_or(ExprError::TypeMismatch {
                message: "NaN is not comparable".to_string(),
            })?
        }
        (ExprValue::Str(a), ExprValue::Str(b)) => a.cmp(b),
        _ => {
            return Err(ExprError::TypeMismatch {
                message: format!("cannot order {lhs:?} against {rhs:?}"),
            });
        }
    };

    Ok(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => unreachable!("only ordering operators reach here"),
    })
}

fn call_function(name: &str, args: &[ExprValue]) -> Result<ExprValue, ExprError> {
    match name {
        "abs" => {
            let [value] = args else {
                return Err(wrong_arity(name, "1", args.len()));
            };
            Ok(ExprValue::Number(value.as_number()?.abs()))
        }
        "round" => match args {
            [value] => Ok(ExprValue::Number(value.as_number()?.round())),
            [value, digits] => {
                let factor = 10f64.powi(digits.as_number()? as i32);
                Ok(ExprValue::Number(
                    (value.as_number()? * factor).round() / factor,
                ))
            }
            _ => Err(wrong_arity(name, "1 or 2", args.len())),
        },
        "min" | "max" => {
            if args.is_empty() {
                return Err(wrong_arity(name, "at least 1", 0));
            }
            let mut numbers = Vec::with_capacity(args.len());
            for arg in args {
                numbers.push(arg.as_number()?);
            }
            let result = if name == "min" {
                numbers.into_iter().fold(f64::INFINITY, f64::min)
            } else {
                numbers.into_iter().fold(f64::NEG_INFINITY, f64::max)
            };
            Ok(ExprValue::Number(result))
        }
        "sum" => {
            let mut total = 0.0;
            for arg in args {
                total += arg.as_number()?;
            }
            Ok(ExprValue::Number(total))
        }
        "len" => {
            let [value] = args else {
                return Err(wrong_arity(name, "1", args.len()));
            };
            match value {
                ExprValue::Str(s) => Ok(ExprValue::Number(s.chars().count() as f64)),
                other => Err(ExprError::TypeMismatch {
                    message: format!("len() expects a string, got {other:?}"),
                }),
            }
        }
        _ => Err(ExprError::UnknownFunction {
            name: name.to_string(),
        }),
    }
}

fn wrong_arity(function: &str, expected: &str, got: usize) -> ExprError {
    ExprError::WrongArity {
        function: function.to_string(),
        expected: expected.to_string(),
        got,
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Str(String),
    Bool(bool),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
}

struct Spanned {
    token: Token,
    position: usize,
}

fn lex(source: &str) -> Result<Vec<Spanned>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        let position = i;

        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < bytes.len() && matches!(bytes[i] as char, '0'..='9' | '.') {
                    i += 1;
                }
                let text = &source[start..i];
                let number = text.parse().map_err(|_| ExprError::Parse {
                    position,
                    message: format!("invalid number literal '{text}'"),
                })?;
                tokens.push(Spanned {
                    token: Token::Number(number),
                    position,
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len()
                    && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                let token = match &source[start..i] {
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    "and" => Token::AndAnd,
                    "or" => Token::OrOr,
                    "not" => Token::Bang,
                    ident => Token::Ident(ident.to_string()),
                };
                tokens.push(Spanned { token, position });
            }
            '\'' | '"' => {
                let quote = c;
                i += 1;
                let mut text = String::new();
                loop {
                    if i >= bytes.len() {
                        return Err(ExprError::Parse {
                            position,
                            message: "unterminated string literal".to_string(),
                        });
                    }
                    let ch = bytes[i] as char;
                    i += 1;
                    if ch == quote {
                        break;
                    }
                    if ch == '\\' && i < bytes.len() {
                        text.push(bytes[i] as char);
                        i += 1;
                    } else {
                        text.push(ch);
                    }
                }
                tokens.push(Spanned {
                    token: Token::Str(text),
                    position,
                });
            }
            '+' => {
                tokens.push(Spanned {
                    token: Token::Plus,
                    position,
                });
                i += 1;
            }
            '-' => {
                tokens.push(Spanned {
                    token: Token::Minus,
                    position,
                });
                i += 1;
            }
            '*' => {
                if bytes.get(i + 1) == Some(&b'*') {
                    tokens.push(Spanned {
                        token: Token::StarStar,
                        position,
                    });
                    i += 2;
                } else {
                    tokens.push(Spanned {
                        token: Token::Star,
                        position,
                    });
                    i += 1;
                }
            }
            '/' => {
                tokens.push(Spanned {
                    token: Token::Slash,
                    position,
                });
                i += 1;
            }
            '%' => {
                tokens.push(Spanned {
                    token: Token::Percent,
                    position,
                });
                i += 1;
            }
            '(' => {
                tokens.push(Spanned {
                    token: Token::LParen,
                    position,
                });
                i += 1;
            }
            ')' => {
                tokens.push(Spanned {
                    token: Token::RParen,
                    position,
                });
                i += 1;
            }
            ',' => {
                tokens.push(Spanned {
                    token: Token::Comma,
                    position,
                });
                i += 1;
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned {
                        token: Token::EqEq,
                        position,
                    });
                    i += 2;
                } else {
                    return Err(ExprError::Parse {
                        position,
                        message: "assignment is not supported; use '=='".to_string(),
                    });
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned {
                        token: Token::NotEq,
                        position,
                    });
                    i += 2;
                } else {
                    tokens.push(Spanned {
                        token: Token::Bang,
                        position,
                    });
                    i += 1;
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned {
                        token: Token::Le,
                        position,
                    });
                    i += 2;
                } else {
                    tokens.push(Spanned {
                        token: Token::Lt,
                        position,
                    });
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned {
                        token: Token::Ge,
                        position,
                    });
                    i += 2;
                } else {
                    tokens.push(Spanned {
                        token: Token::Gt,
                        position,
                    });
                    i += 1;
                }
            }
            '&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    tokens.push(Spanned {
                        token: Token::AndAnd,
                        position,
                    });
                    i += 2;
                } else {
                    return Err(ExprError::Parse {
                        position,
                        message: "expected '&&'".to_string(),
                    });
                }
            }
            '|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    tokens.push(Spanned {
                        token: Token::OrOr,
                        position,
                    });
                    i += 2;
                } else {
                    return Err(ExprError::Parse {
                        position,
                        message: "expected '||'".to_string(),
                    });
                }
            }
            other => {
                return Err(ExprError::Parse {
                    position,
                    message: format!("unexpected character '{other}'"),
                });
            }
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(usize::MAX, |s| s.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), ExprError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(ExprError::Parse {
                position: self.position(),
                message: format!("expected {what}"),
            })
        }
    }

    fn expect_end(&mut self) -> Result<(), ExprError> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(ExprError::Parse {
                position: self.position(),
                message: "unexpected trailing input".to_string(),
            })
        }
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::OrOr) {
            let right = self.and_expr()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.not_expr()?;
        while self.eat(&Token::AndAnd) {
            let right = self.not_expr()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Bang) {
            let operand = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.additive()?;
        let op = match self.peek() {
            Some(Token::EqEq) => Some(BinaryOp::Eq),
            Some(Token::NotEq) => Some(BinaryOp::Ne),
            Some(Token::Lt) => Some(BinaryOp::Lt),
            Some(Token::Le) => Some(BinaryOp::Le),
            Some(Token::Gt) => Some(BinaryOp::Gt),
            Some(Token::Ge) => Some(BinaryOp::Ge),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(left);
        };
        self.pos += 1;
        let right = self.additive()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        if self.eat(&Token::Plus) {
            // Unary plus is a no-op.
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.primary()?;
        if self.eat(&Token::StarStar) {
            // Right-associative exponent; unary so `2 ** -1` parses.
            let exponent = self.unary()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let position = self.position();
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Bool(b)) => Ok(Expr::Bool(b)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    if !ALLOWED_FUNCTIONS.contains(&name.as_str()) {
                        return Err(ExprError::UnknownFunction { name });
                    }
                    let mut args = Vec::new();
                    if !self.eat(&Token::RParen) {
                        loop {
                            args.push(self.expression()?);
                            if !self.eat(&Token::Comma) {
                                break;
                            }
                        }
                        self.expect(&Token::RParen, "')' after arguments")?;
                    }
                    Ok(Expr::Call {
                        function: name,
                        args,
                    })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(&Token::RParen, "closing ')'")?;
                Ok(inner)
            }
            _ => Err(ExprError::Parse {
                position,
                message: "expected a value".to_string(),
            }),
        }
    }
}
