//! Recursive-descent parser for the query language.
//!
//! ```text
//! query      := order_list* expression? order_list*
//! order_list := '[' order (','? order)* ']'
//! order      := '/' IDENT | '\' IDENT
//! expression := and_expr (('|' | '||') and_expr)*
//! and_expr   := unary (('&' | '&&') unary)*
//! unary      := '!' unary | primary
//! primary    := '(' expression ')' | IDENT cmp literal | literal cmp IDENT
//! ```

use std::collections::BTreeSet;

use super::lexer::{caret_report, tokenize, Token, TokenKind};
use super::term::{
    CompareOp, ConjunctionKind, FilterTerm, Literal, OrderTerm, ParsedQuery, Term, MAX_NESTING,
};
use crate::error::Result;

/// At most this many candidates are listed in an error report.
const MAX_EXPECTED: usize = 7;

const END_OF_QUERY: &str = "end of query";

/// Why parsing failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The token at the error position cannot continue the query.
    UnexpectedToken { expected: Vec<String> },
    /// A property name outside the configured allow-list.
    DisallowedIdentifier { allowed: Vec<String> },
    /// More nested parentheses than the parser accepts.
    NestingTooDeep { limit: usize },
}

/// Parse failure pointing at the offending lexeme.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{report}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Offending lexeme, empty at end of input.
    pub lexeme: String,
    pub column: usize,
    report: String,
}

impl ParseError {
    /// The full multi-line message: headline, candidates, query and marker.
    pub fn report(&self) -> &str {
        &self.report
    }
}

/// Parse a query without restricting property names.
pub fn parse(query: &str) -> Result<ParsedQuery> {
    QueryParser::new().parse(query)
}

/// Query parser with an optional property allow-list.
#[derive(Debug, Clone, Default)]
pub struct QueryParser {
    allowed: BTreeSet<String>,
}

impl QueryParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept these property names. An empty set accepts any name.
    pub fn with_allowed_identifiers<I, S>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = identifiers.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_identifiers(&self) -> &BTreeSet<String> {
        &self.allowed
    }

    pub fn parse(&self, query: &str) -> Result<ParsedQuery> {
        let tokens = tokenize(query).collect::<std::result::Result<Vec<_>, _>>()?;
        self.parse_tokens(query, tokens)
    }

    /// Parse an already tokenized query. `query` is only used for error
    /// reports.
    pub fn parse_tokens(&self, query: &str, tokens: Vec<Token>) -> Result<ParsedQuery> {
        let mut parser = Parser {
            query,
            tokens,
            pos: 0,
            depth: 0,
            allowed: &self.allowed,
        };
        Ok(parser.parse_query()?)
    }
}

struct Parser<'a> {
    query: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    /// Open parentheses enclosing the current position.
    depth: usize,
    allowed: &'a BTreeSet<String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    fn parse_query(&mut self) -> std::result::Result<ParsedQuery, ParseError> {
        let mut order = Vec::new();
        while self.at(&TokenKind::LeftBracket) {
            self.order_list(&mut order)?;
        }

        let mut filter = None;
        if self.peek().is_some() {
            filter = Some(self.expression()?);
        }

        while self.at(&TokenKind::LeftBracket) {
            self.order_list(&mut order)?;
        }

        if self.peek().is_some() {
            let expected: &[&str] = if order.is_empty() {
                &["'&'", "'&&'", "'|'", "'||'", "'['", END_OF_QUERY]
            } else {
                &["'['", END_OF_QUERY]
            };
            return Err(self.unexpected(expected));
        }

        Ok(ParsedQuery { filter, order })
    }

    fn order_list(&mut self, order: &mut Vec<OrderTerm>) -> std::result::Result<(), ParseError> {
        self.advance(); // '['
        order.push(self.order()?);
        loop {
            match self.peek() {
                Some(TokenKind::RightBracket) => {
                    self.advance();
                    return Ok(());
                }
                Some(TokenKind::Comma) => {
                    self.advance();
                    order.push(self.order()?);
                }
                Some(TokenKind::Slash) | Some(TokenKind::Backslash) => {
                    order.push(self.order()?);
                }
                _ => return Err(self.unexpected(&["']'", "','", "'/'", "'\\'"])),
            }
        }
    }

    fn order(&mut self) -> std::result::Result<OrderTerm, ParseError> {
        let ascending = match self.peek() {
            Some(TokenKind::Slash) => true,
            Some(TokenKind::Backslash) => false,
            _ => return Err(self.unexpected(&["'/'", "'\\'"])),
        };
        self.advance();
        let property = self.identifier()?;
        Ok(OrderTerm {
            property,
            ascending,
        })
    }

    fn expression(&mut self) -> std::result::Result<Term, ParseError> {
        let mut lhs = self.and_expr()?;
        while matches!(self.peek(), Some(TokenKind::Or) | Some(TokenKind::OrOr)) {
            self.advance();
            let rhs = self.and_expr()?;
            lhs = Term::combine(ConjunctionKind::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> std::result::Result<Term, ParseError> {
        let mut lhs = self.unary()?;
        while matches!(self.peek(), Some(TokenKind::And) | Some(TokenKind::AndAnd)) {
            self.advance();
            let rhs = self.unary()?;
            lhs = Term::combine(ConjunctionKind::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> std::result::Result<Term, ParseError> {
        let mut bangs = 0usize;
        while self.at(&TokenKind::Bang) {
            self.advance();
            bangs += 1;
        }
        let term = self.primary()?;
        Ok(if bangs % 2 == 1 { term.negated() } else { term })
    }

    fn primary(&mut self) -> std::result::Result<Term, ParseError> {
        match self.peek() {
            Some(TokenKind::LeftParen) => {
                if self.depth == MAX_NESTING {
                    return Err(self.too_deep());
                }
                self.advance();
                self.depth += 1;
                let inner = self.expression()?;
                if !self.at(&TokenKind::RightParen) {
                    return Err(self.unexpected(&["')'", "'&'", "'&&'", "'|'", "'||'"]));
                }
                self.advance();
                self.depth -= 1;
                Ok(Term::scope(inner))
            }
            Some(TokenKind::Identifier(_)) => {
                let property = self.identifier()?;
                let op = self.comparator(None)?;
                let value = self.literal(op)?;
                Ok(FilterTerm::new(property, op, value).into())
            }
            Some(TokenKind::String(s)) => {
                let value = Literal::String(s.clone());
                self.reversed(value)
            }
            Some(TokenKind::Integer(i)) => {
                let value = Literal::Integer(*i);
                self.reversed(value)
            }
            Some(TokenKind::Float(f)) => {
                let value = Literal::Float(*f);
                self.reversed(value)
            }
            _ => Err(self.unexpected(&[
                "'!'",
                "'('",
                "identifier",
                "string",
                "integer",
                "float",
            ])),
        }
    }

    /// `literal cmp IDENT`, with the literal already peeked.
    fn reversed(&mut self, value: Literal) -> std::result::Result<Term, ParseError> {
        self.advance();
        let op = self.comparator(Some(&value))?;
        let property = self.identifier()?;
        Ok(FilterTerm::new(property, op.mirrored(), value).into())
    }

    fn identifier(&mut self) -> std::result::Result<String, ParseError> {
        let Some(TokenKind::Identifier(name)) = self.peek() else {
            return Err(self.unexpected(&["identifier"]));
        };
        let name = name.clone();
        if !self.allowed.is_empty() && !self.allowed.contains(&name) {
            return Err(self.disallowed());
        }
        self.advance();
        Ok(name)
    }

    /// Read a comparison operator. With a leading literal, only operators
    /// that accept that literal's type are valid.
    fn comparator(&mut self, lhs: Option<&Literal>) -> std::result::Result<CompareOp, ParseError> {
        let op = match self.peek() {
            Some(TokenKind::Equals) | Some(TokenKind::DoubleEquals) => Some(CompareOp::Eq),
            Some(TokenKind::NotEquals) => Some(CompareOp::NotEq),
            Some(TokenKind::EqualsCaseInsensitive) => Some(CompareOp::EqCaseInsensitive),
            Some(TokenKind::Greater) => Some(CompareOp::Gt),
            Some(TokenKind::GreaterEquals) => Some(CompareOp::Gte),
            Some(TokenKind::Less) => Some(CompareOp::Lt),
            Some(TokenKind::LessEquals) => Some(CompareOp::Lte),
            _ => None,
        };

        let valid: &[&str] = match lhs {
            Some(Literal::String(_)) => &["'='", "'=='", "'!='", "'~='"],
            Some(_) => &["'='", "'=='", "'!='", "'>'", "'>='", "'<'", "'<='"],
            None => &["'='", "'=='", "'!='", "'~='", "'>'", "'>='", "'<'", "'<='"],
        };

        match (op, lhs) {
            (Some(op), Some(Literal::String(_))) if op.is_ordering() => Err(self.unexpected(valid)),
            (Some(CompareOp::EqCaseInsensitive), Some(value)) if value.is_number() => {
                Err(self.unexpected(valid))
            }
            (Some(op), _) => {
                self.advance();
                Ok(op)
            }
            (None, _) => Err(self.unexpected(valid)),
        }
    }

    /// Read the literal after `op`, enforcing its type.
    fn literal(&mut self, op: CompareOp) -> std::result::Result<Literal, ParseError> {
        let expected: &[&str] = if op == CompareOp::EqCaseInsensitive {
            &["string"]
        } else if op.is_ordering() {
            &["integer", "float"]
        } else {
            &["string", "integer", "float"]
        };

        let value = match self.peek() {
            Some(TokenKind::String(s)) if !op.is_ordering() => Literal::String(s.clone()),
            Some(TokenKind::Integer(i)) if op != CompareOp::EqCaseInsensitive => {
                Literal::Integer(*i)
            }
            Some(TokenKind::Float(f)) if op != CompareOp::EqCaseInsensitive => Literal::Float(*f),
            _ => return Err(self.unexpected(expected)),
        };
        self.advance();
        Ok(value)
    }

    /// Position and description of the current token, or end of input.
    fn current(&self) -> (String, String, usize, usize) {
        match self.tokens.get(self.pos) {
            Some(token) => (
                token.to_string(),
                token.lexeme.clone(),
                token.column,
                token.width(),
            ),
            None => (
                END_OF_QUERY.to_string(),
                String::new(),
                self.query.chars().count(),
                1,
            ),
        }
    }

    fn unexpected(&self, expected: &[&str]) -> ParseError {
        let (found, lexeme, column, width) = self.current();
        let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();

        let mut headline = format!("Got {} but expected one of the following types:", found);
        for candidate in expected.iter().take(MAX_EXPECTED) {
            headline.push_str("\n     ");
            headline.push_str(candidate);
        }

        ParseError {
            report: caret_report(&headline, self.query, column, width),
            kind: ParseErrorKind::UnexpectedToken { expected },
            lexeme,
            column,
        }
    }

    fn too_deep(&self) -> ParseError {
        let (_, lexeme, column, width) = self.current();
        let headline = format!("Query nested deeper than {} levels", MAX_NESTING);
        ParseError {
            report: caret_report(&headline, self.query, column, width),
            kind: ParseErrorKind::NestingTooDeep { limit: MAX_NESTING },
            lexeme,
            column,
        }
    }

    fn disallowed(&self) -> ParseError {
        let (found, lexeme, column, width) = self.current();
        let allowed: Vec<String> = self.allowed.iter().cloned().collect();

        let mut headline = format!(
            "Got {} but expected one of the following identifiers:",
            found
        );
        for name in &allowed {
            headline.push_str("\n     ");
            headline.push_str(name);
        }

        ParseError {
            report: caret_report(&headline, self.query, column, width),
            kind: ParseErrorKind::DisallowedIdentifier { allowed },
            lexeme,
            column,
        }
    }
}
