//! Condition expression parsing.
//!
//! This module provides tokenization and parsing of lowered condition
//! expressions into an Abstract Syntax Tree (AST) for evaluation.
//!
//! The grammar, lowest to highest precedence:
//!
//! ```text
//! or_expr   := and_expr ("or" and_expr)*
//! and_expr  := not_expr ("and" not_expr)*
//! not_expr  := "not" not_expr | cmp_expr
//! cmp_expr  := add_expr (("==" | "!=" | "<" | "<=" | ">" | ">=") add_expr)?
//! add_expr  := mul_expr (("+" | "-") mul_expr)*
//! mul_expr  := unary (("*" | "/" | "%") unary)*
//! unary     := "-" unary | primary
//! primary   := NUMBER | STRING | "(" or_expr ")" | NAME "(" args ")" | NAME
//! ```

use crate::error::{Result, SigmaError};

/// Default bound on parser recursion.
pub const DEFAULT_MAX_EXPRESSION_DEPTH: usize = 64;

/// Tokens in a condition expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(String),
    /// A name; may be a dotted property path (`Process.Name`).
    Identifier(String),
    And,
    Or,
    Not,
    LeftParen,
    RightParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// AST for condition expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    /// Dotted path resolved against the event.
    Property(String),
    Call { name: String, args: Vec<Expr> },
    Not(Box<Expr>),
    Neg(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Names of every function called anywhere in the expression.
    pub fn called_functions(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_calls(&mut names);
        names
    }

    fn collect_calls<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Call { name, args } => {
                names.push(name);
                for arg in args {
                    arg.collect_calls(names);
                }
            }
            Expr::Not(inner) | Expr::Neg(inner) => inner.collect_calls(names),
            Expr::And(left, right) | Expr::Or(left, right) => {
                left.collect_calls(names);
                right.collect_calls(names);
            }
            Expr::Binary { left, right, .. } => {
                left.collect_calls(names);
                right.collect_calls(names);
            }
            Expr::Number(_) | Expr::Str(_) | Expr::Property(_) => {}
        }
    }
}

/// Recursive descent parser for condition expressions.
pub(crate) struct ExpressionParser<'a> {
    tokens: &'a [Token],
    position: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> ExpressionParser<'a> {
    pub(crate) fn new(tokens: &'a [Token], max_depth: usize) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
            max_depth,
        }
    }

    fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.current_token().cloned();
        self.position += 1;
        token
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(SigmaError::CompilationError(format!(
                "Expression nesting exceeds {} levels",
                self.max_depth
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Parse a complete expression; trailing tokens are an error.
    pub(crate) fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_or_expression()?;
        match self.current_token() {
            None => Ok(expr),
            Some(token) => Err(SigmaError::CompilationError(format!(
                "Unexpected token {token:?} after expression"
            ))),
        }
    }

    /// Parse OR expressions (lowest precedence).
    fn parse_or_expression(&mut self) -> Result<Expr> {
        self.enter()?;
        let mut left = self.parse_and_expression()?;

        while let Some(Token::Or) = self.current_token() {
            self.advance();
            let right = self.parse_and_expression()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }

        self.leave();
        Ok(left)
    }

    fn parse_and_expression(&mut self) -> Result<Expr> {
        let mut left = self.parse_not_expression()?;

        while let Some(Token::And) = self.current_token() {
            self.advance();
            let right = self.parse_not_expression()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_not_expression(&mut self) -> Result<Expr> {
        if let Some(Token::Not) = self.current_token() {
            self.advance();
            self.enter()?;
            let operand = self.parse_not_expression()?;
            self.leave();
            Ok(Expr::Not(Box::new(operand)))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;

        let op = match self.current_token() {
            Some(Token::Eq) => BinaryOp::Eq,
            Some(Token::NotEq) => BinaryOp::NotEq,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::LtEq) => BinaryOp::LtEq,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::GtEq) => BinaryOp::GtEq,
            _ => return Ok(left),
        };
        self.advance();

        let right = self.parse_additive()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if let Some(Token::Minus) = self.current_token() {
            self.advance();
            self.enter()?;
            let operand = self.parse_unary()?;
            self.leave();
            Ok(Expr::Neg(Box::new(operand)))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::LeftParen) => {
                let expr = self.parse_or_expression()?;
                if let Some(Token::RightParen) = self.current_token() {
                    self.advance();
                    Ok(expr)
                } else {
                    Err(SigmaError::CompilationError(
                        "Expected closing parenthesis".to_string(),
                    ))
                }
            }
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LeftParen) = self.current_token() {
                    self.advance();
                    let args = self.parse_arguments()?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Property(name))
                }
            }
            Some(token) => Err(SigmaError::CompilationError(format!(
                "Unexpected token {token:?} in expression"
            ))),
            None => Err(SigmaError::CompilationError(
                "Unexpected end of expression".to_string(),
            )),
        }
    }

    /// Parse call arguments after the opening parenthesis.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();

        if let Some(Token::RightParen) = self.current_token() {
            self.advance();
            return Ok(args);
        }

        loop {
            args.push(self.parse_or_expression()?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RightParen) => return Ok(args),
                _ => {
                    return Err(SigmaError::CompilationError(
                        "Expected ',' or ')' in argument list".to_string(),
                    ))
                }
            }
        }
    }
}

/// Tokenize a condition expression.
pub(crate) fn tokenize_expression(expression: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LeftParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RightParen);
                chars.next();
            }
            ',' => {
                tokens.push(Token::Comma);
                chars.next();
            }
            '+' => {
                tokens.push(Token::Plus);
                chars.next();
            }
            '-' => {
                tokens.push(Token::Minus);
                chars.next();
            }
            '*' => {
                tokens.push(Token::Star);
                chars.next();
            }
            '/' => {
                tokens.push(Token::Slash);
                chars.next();
            }
            '%' => {
                tokens.push(Token::Percent);
                chars.next();
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let followed_by_eq = chars.peek() == Some(&'=');
                if followed_by_eq {
                    chars.next();
                }
                let token = match (ch, followed_by_eq) {
                    ('=', true) => Token::Eq,
                    ('!', true) => Token::NotEq,
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::LtEq,
                    ('>', false) => Token::Gt,
                    ('>', true) => Token::GtEq,
                    _ => {
                        return Err(SigmaError::CompilationError(format!(
                            "Unexpected character in expression: '{ch}'"
                        )))
                    }
                };
                tokens.push(token);
            }
            '"' | '\'' => {
                chars.next();
                let mut literal = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some(escaped) => literal.push(escaped),
                            None => break,
                        },
                        c if c == ch => {
                            closed = true;
                            break;
                        }
                        c => literal.push(c),
                    }
                }
                if !closed {
                    return Err(SigmaError::CompilationError(
                        "Unterminated string literal".to_string(),
                    ));
                }
                tokens.push(Token::Str(literal));
            }
            '0'..='9' => {
                let mut number_str = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        number_str.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = number_str.parse::<f64>().map_err(|_| {
                    SigmaError::CompilationError(format!("Invalid number: {number_str}"))
                })?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut identifier = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        identifier.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }

                match identifier.as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "not" => tokens.push(Token::Not),
                    _ => tokens.push(Token::Identifier(identifier)),
                }
            }
            _ => {
                return Err(SigmaError::CompilationError(format!(
                    "Unexpected character in expression: '{ch}'"
                )));
            }
        }
    }

    Ok(tokens)
}

/// Parse an expression string into an AST.
pub fn parse_expression(expression: &str, max_depth: usize) -> Result<Expr> {
    let tokens = tokenize_expression(expression)?;
    if tokens.is_empty() {
        return Err(SigmaError::CompilationError("Empty expression".to_string()));
    }

    ExpressionParser::new(&tokens, max_depth).parse()
}
