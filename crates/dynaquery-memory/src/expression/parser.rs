//! Lexer and recursive-descent parser for store expressions.
//!
//! Keywords and function names are matched case-insensitively.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use super::ast::{AttributePath, CompareOp, Expr, FunctionName, LogicalOp, Operand, PathElement};

/// Errors produced while parsing or evaluating an expression.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    /// An unexpected token was encountered.
    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What was expected.
        expected: String,
        /// What was found.
        found: String,
    },
    /// A `#name` placeholder has no mapping.
    #[error("Unresolved expression attribute name: {name}")]
    UnresolvedName {
        /// The placeholder.
        name: String,
    },
    /// A `:value` placeholder has no mapping.
    #[error("Unresolved expression attribute value: {name}")]
    UnresolvedValue {
        /// The placeholder.
        name: String,
    },
    /// An operand does not fit the operation.
    #[error("Invalid operand for {operation}: {message}")]
    InvalidOperand {
        /// The operation.
        operation: String,
        /// Explanation.
        message: String,
    },
    /// Operand types do not fit the operation.
    #[error("Type mismatch: {message}")]
    TypeMismatch {
        /// Explanation.
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    ExprAttrName(String),
    ExprAttrValue(String),
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    And,
    Or,
    Not,
    Between,
    In,
    AttributeExists,
    AttributeNotExists,
    AttributeType,
    BeginsWith,
    Contains,
    Size,
    Number(usize),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(s) => write!(f, "identifier '{s}'"),
            Self::ExprAttrName(s) => write!(f, "#{s}"),
            Self::ExprAttrValue(s) => write!(f, ":{s}"),
            Self::Eq => write!(f, "'='"),
            Self::Ne => write!(f, "'<>'"),
            Self::Lt => write!(f, "'<'"),
            Self::Le => write!(f, "'<='"),
            Self::Gt => write!(f, "'>'"),
            Self::Ge => write!(f, "'>='"),
            Self::Dot => write!(f, "'.'"),
            Self::Comma => write!(f, "','"),
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::LBracket => write!(f, "'['"),
            Self::RBracket => write!(f, "']'"),
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
            Self::Not => write!(f, "NOT"),
            Self::Between => write!(f, "BETWEEN"),
            Self::In => write!(f, "IN"),
            Self::AttributeExists => write!(f, "attribute_exists"),
            Self::AttributeNotExists => write!(f, "attribute_not_exists"),
            Self::AttributeType => write!(f, "attribute_type"),
            Self::BeginsWith => write!(f, "begins_with"),
            Self::Contains => write!(f, "contains"),
            Self::Size => write!(f, "size"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Eof => write!(f, "EOF"),
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn tokenize(&mut self) -> Result<Vec<Token>, ExpressionError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok == Token::Eof;
            tokens.push(tok);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(char::is_ascii_whitespace) {
            self.chars.next();
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.chars.next();
        token
    }

    fn next_token(&mut self) -> Result<Token, ExpressionError> {
        self.skip_whitespace();

        let Some(&ch) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        match ch {
            '#' => self.read_placeholder('#', Token::ExprAttrName),
            ':' => self.read_placeholder(':', Token::ExprAttrValue),
            '=' => Ok(self.single(Token::Eq)),
            '<' => {
                self.chars.next();
                Ok(match self.chars.peek() {
                    Some('=') => self.single(Token::Le),
                    Some('>') => self.single(Token::Ne),
                    _ => Token::Lt,
                })
            }
            '>' => {
                self.chars.next();
                Ok(match self.chars.peek() {
                    Some('=') => self.single(Token::Ge),
                    _ => Token::Gt,
                })
            }
            '.' => Ok(self.single(Token::Dot)),
            ',' => Ok(self.single(Token::Comma)),
            '(' => Ok(self.single(Token::LParen)),
            ')' => Ok(self.single(Token::RParen)),
            '[' => Ok(self.single(Token::LBracket)),
            ']' => Ok(self.single(Token::RBracket)),
            c if c.is_ascii_digit() => self.read_number(),
            c if is_ident_start(c) => Ok(self.read_identifier_or_keyword()),
            _ => Err(ExpressionError::UnexpectedToken {
                expected: "valid token".to_owned(),
                found: format!("'{ch}'"),
            }),
        }
    }

    fn read_placeholder(
        &mut self,
        prefix: char,
        make: fn(String) -> Token,
    ) -> Result<Token, ExpressionError> {
        self.chars.next();
        let name = self.read_ident_chars();
        if name.is_empty() {
            return Err(ExpressionError::UnexpectedToken {
                expected: format!("placeholder name after '{prefix}'"),
                found: "empty".to_owned(),
            });
        }
        Ok(make(name))
    }

    fn read_number(&mut self) -> Result<Token, ExpressionError> {
        let mut s = String::new();
        while let Some(&c) = self.chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            s.push(c);
            self.chars.next();
        }
        let n: usize = s.parse().map_err(|_| ExpressionError::InvalidOperand {
            operation: "index parse".to_owned(),
            message: format!("'{s}' is not a valid index"),
        })?;
        Ok(Token::Number(n))
    }

    fn read_ident_chars(&mut self) -> String {
        let mut s = String::new();
        while let Some(&c) = self.chars.peek() {
            if !is_ident_continue(c) {
                break;
            }
            s.push(c);
            self.chars.next();
        }
        s
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let ident = self.read_ident_chars();
        match ident.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "between" => Token::Between,
            "in" => Token::In,
            "attribute_exists" => Token::AttributeExists,
            "attribute_not_exists" => Token::AttributeNotExists,
            "attribute_type" => Token::AttributeType,
            "begins_with" => Token::BeginsWith,
            "contains" => Token::Contains,
            "size" => Token::Size,
            _ => Token::Identifier(ident),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<Token, ExpressionError> {
        let tok = self.advance();
        if std::mem::discriminant(&tok) == std::mem::discriminant(expected) {
            Ok(tok)
        } else {
            Err(ExpressionError::UnexpectedToken {
                expected: expected.to_string(),
                found: tok.to_string(),
            })
        }
    }

    fn expect_end(&self) -> Result<(), ExpressionError> {
        match self.peek() {
            Token::Eof => Ok(()),
            other => Err(ExpressionError::UnexpectedToken {
                expected: "end of expression".to_owned(),
                found: other.to_string(),
            }),
        }
    }

    /// OR binds loosest.
    fn parse_or_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_and_expr()?;
        while matches!(self.peek(), Token::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_not_expr()?;
        while matches!(self.peek(), Token::And) {
            self.advance();
            let right = self.parse_not_expr()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr, ExpressionError> {
        if matches!(self.peek(), Token::Not) {
            self.advance();
            let expr = self.parse_not_expr()?;
            return Ok(Expr::Not(Box::new(expr)));
        }
        self.parse_primary_expr()
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ExpressionError> {
        if matches!(self.peek(), Token::LParen) {
            self.advance();
            let expr = self.parse_or_expr()?;
            self.expect(&Token::RParen)?;
            return Ok(expr);
        }

        if let Some(name) = self.peek_function_name() {
            return self.parse_function_expr(name);
        }

        let operand = self.parse_operand()?;
        self.parse_postfix_expr(operand)
    }

    fn peek_function_name(&self) -> Option<FunctionName> {
        match self.peek() {
            Token::AttributeExists => Some(FunctionName::AttributeExists),
            Token::AttributeNotExists => Some(FunctionName::AttributeNotExists),
            Token::AttributeType => Some(FunctionName::AttributeType),
            Token::BeginsWith => Some(FunctionName::BeginsWith),
            Token::Contains => Some(FunctionName::Contains),
            _ => None,
        }
    }

    fn parse_function_expr(&mut self, name: FunctionName) -> Result<Expr, ExpressionError> {
        self.advance();
        self.expect(&Token::LParen)?;
        let args = self.parse_operand_list()?;
        self.expect(&Token::RParen)?;
        if args.len() != name.arity() {
            return Err(ExpressionError::InvalidOperand {
                operation: name.to_string(),
                message: format!("expected {} argument(s), got {}", name.arity(), args.len()),
            });
        }
        Ok(Expr::Function { name, args })
    }

    fn parse_operand_list(&mut self) -> Result<Vec<Operand>, ExpressionError> {
        let mut list = vec![self.parse_operand()?];
        while matches!(self.peek(), Token::Comma) {
            self.advance();
            list.push(self.parse_operand()?);
        }
        Ok(list)
    }

    fn parse_postfix_expr(&mut self, left: Operand) -> Result<Expr, ExpressionError> {
        let op = match self.peek() {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            Token::Between => {
                self.advance();
                let low = self.parse_operand()?;
                self.expect(&Token::And)?;
                let high = self.parse_operand()?;
                return Ok(Expr::Between {
                    value: Box::new(left),
                    low: Box::new(low),
                    high: Box::new(high),
                });
            }
            Token::In => {
                self.advance();
                self.expect(&Token::LParen)?;
                let list = self.parse_operand_list()?;
                self.expect(&Token::RParen)?;
                return Ok(Expr::In {
                    value: Box::new(left),
                    list,
                });
            }
            other => {
                return Err(ExpressionError::UnexpectedToken {
                    expected: "comparison operator, BETWEEN, or IN".to_owned(),
                    found: other.to_string(),
                });
            }
        };
        self.advance();
        let right = self.parse_operand()?;
        Ok(Expr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_operand(&mut self) -> Result<Operand, ExpressionError> {
        match self.advance() {
            Token::ExprAttrValue(name) => Ok(Operand::Value(name)),
            Token::Size => {
                self.expect(&Token::LParen)?;
                let path = self.parse_attribute_path()?;
                self.expect(&Token::RParen)?;
                Ok(Operand::Size(path))
            }
            _ => {
                self.pos -= 1;
                self.parse_attribute_path().map(Operand::Path)
            }
        }
    }

    /// `info.rating`, `#name`, `tags[0].value`
    fn parse_attribute_path(&mut self) -> Result<AttributePath, ExpressionError> {
        let mut elements = vec![self.parse_path_head()?];

        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    elements.push(self.parse_path_head()?);
                }
                Token::LBracket => {
                    self.advance();
                    let Token::Number(idx) = self.advance() else {
                        return Err(ExpressionError::UnexpectedToken {
                            expected: "number".to_owned(),
                            found: "non-number".to_owned(),
                        });
                    };
                    self.expect(&Token::RBracket)?;
                    elements.push(PathElement::Index(idx));
                }
                _ => break,
            }
        }

        Ok(AttributePath { elements })
    }

    fn parse_path_head(&mut self) -> Result<PathElement, ExpressionError> {
        match self.advance() {
            Token::Identifier(name) => Ok(PathElement::Attribute(name)),
            Token::ExprAttrName(name) => Ok(PathElement::Attribute(format!("#{name}"))),
            other => Err(ExpressionError::UnexpectedToken {
                expected: "attribute name or #name".to_owned(),
                found: other.to_string(),
            }),
        }
    }
}

/// Parse a condition, filter or key-condition expression.
///
/// # Errors
///
/// Returns `ExpressionError` if the expression is syntactically invalid.
pub fn parse_condition(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_or_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a comma separated projection expression.
///
/// # Errors
///
/// Returns `ExpressionError` if the expression is syntactically invalid.
pub fn parse_projection(input: &str) -> Result<Vec<AttributePath>, ExpressionError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser::new(tokens);
    let mut paths = vec![parser.parse_attribute_path()?];
    while matches!(parser.peek(), Token::Comma) {
        parser.advance();
        paths.push(parser.parse_attribute_path()?);
    }
    parser.expect_end()?;
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_key_condition_with_between() {
        let expr = parse_condition("PK = :PK AND SK BETWEEN :SK_lower AND :SK_upper").unwrap();
        let Expr::Logical { op, left, right } = expr else {
            panic!("expected AND");
        };
        assert_eq!(op, LogicalOp::And);
        assert!(matches!(*left, Expr::Compare { op: CompareOp::Eq, .. }));
        assert!(matches!(*right, Expr::Between { .. }));
    }

    #[test]
    fn test_should_parse_begins_with() {
        let expr = parse_condition("#PK = :PK AND begins_with(SK, :SK)").unwrap();
        let Expr::Logical { right, .. } = expr else {
            panic!("expected AND");
        };
        assert!(matches!(
            *right,
            Expr::Function { name: FunctionName::BeginsWith, ref args } if args.len() == 2
        ));
    }

    #[test]
    fn test_should_respect_precedence_and_parentheses() {
        let expr = parse_condition("a = :a OR b = :b AND NOT c = :c").unwrap();
        assert!(matches!(expr, Expr::Logical { op: LogicalOp::Or, .. }));

        let expr = parse_condition("(a = :a OR b = :b) AND c = :c").unwrap();
        assert!(matches!(expr, Expr::Logical { op: LogicalOp::And, .. }));
    }

    #[test]
    fn test_should_parse_in_and_size() {
        let expr = parse_condition("#n0 IN (:v0, :v1) AND size(#n1) > :v2").unwrap();
        let Expr::Logical { left, right, .. } = expr else {
            panic!("expected AND");
        };
        assert!(matches!(*left, Expr::In { ref list, .. } if list.len() == 2));
        assert!(matches!(
            *right,
            Expr::Compare { ref left, op: CompareOp::Gt, .. } if matches!(**left, Operand::Size(_))
        ));
    }

    #[test]
    fn test_should_parse_nested_paths() {
        let paths = parse_projection("#n0.#n1[2].c,SK").unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].to_string(), "#n0.#n1[2].c");
        assert_eq!(paths[1].to_string(), "SK");
    }

    #[test]
    fn test_should_reject_malformed_expressions() {
        for bad in ["PK =", "PK :PK", "begins_with(SK)", "a = :a AND", "(a = :a", "a = :a)"] {
            assert!(parse_condition(bad).is_err(), "{bad}");
        }
        assert!(parse_projection("a,,b").is_err());
        assert!(parse_projection("").is_err());
    }
}
