//! Lexer for the query language.
//!
//! Produces tokens lazily; a fresh [`Lexer`] is created for every input, so
//! tokenizing is restartable by calling [`tokenize`] again. Columns count
//! characters (not bytes) and include skipped whitespace, which keeps error
//! markers aligned with the query text.

use std::fmt;

/// Kind of a lexed token, including the decoded literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    String(String),
    Integer(i64),
    Float(f64),
    /// `=`
    Equals,
    /// `==`
    DoubleEquals,
    /// `!=`
    NotEquals,
    /// `~=`
    EqualsCaseInsensitive,
    /// `>`
    Greater,
    /// `>=`
    GreaterEquals,
    /// `<`
    Less,
    /// `<=`
    LessEquals,
    /// `&`
    And,
    /// `&&`
    AndAnd,
    /// `|`
    Or,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    /// `/`, ascending order marker
    Slash,
    /// `\`, descending order marker
    Backslash,
    Comma,
}

impl TokenKind {
    /// Name used for this kind of token in error messages.
    pub fn spell(&self) -> &'static str {
        match self {
            TokenKind::Identifier(_) => "identifier",
            TokenKind::String(_) => "string",
            TokenKind::Integer(_) => "integer",
            TokenKind::Float(_) => "float",
            TokenKind::Equals => "=",
            TokenKind::DoubleEquals => "==",
            TokenKind::NotEquals => "!=",
            TokenKind::EqualsCaseInsensitive => "~=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEquals => ">=",
            TokenKind::Less => "<",
            TokenKind::LessEquals => "<=",
            TokenKind::And => "&",
            TokenKind::AndAnd => "&&",
            TokenKind::Or => "|",
            TokenKind::OrOr => "||",
            TokenKind::Bang => "!",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::Slash => "/",
            TokenKind::Backslash => "\\",
            TokenKind::Comma => ",",
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::String(_) | TokenKind::Integer(_) | TokenKind::Float(_)
        )
    }
}

/// A token with its raw lexeme and source column.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub column: usize,
}

impl Token {
    /// Length of the lexeme in characters.
    pub fn width(&self) -> usize {
        self.lexeme.chars().count()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Identifier(_) | TokenKind::Integer(_) | TokenKind::Float(_) => {
                write!(f, "{} {}", self.kind.spell(), self.lexeme)
            }
            // String lexemes carry their own quotes.
            TokenKind::String(_) => write!(f, "string {}", self.lexeme),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}

/// Why lexing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    /// A character that starts no token.
    UnrecognizedToken,
    /// A string literal without its matching closing quote.
    UnterminatedString,
    /// A malformed or out-of-range numeric literal.
    InvalidNumber,
}

/// Lexing failure with a human-readable report pointing at the lexeme.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{report}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub lexeme: String,
    pub column: usize,
    report: String,
}

impl LexError {
    fn new(kind: LexErrorKind, lexeme: String, column: usize, query: &str) -> Self {
        let headline = match kind {
            LexErrorKind::UnrecognizedToken => format!("Unrecognized token '{}'", lexeme),
            LexErrorKind::UnterminatedString => {
                format!("Unterminated string literal {}", lexeme)
            }
            LexErrorKind::InvalidNumber => format!("Invalid number '{}'", lexeme),
        };
        let report = caret_report(&headline, query, column, lexeme.chars().count());
        Self {
            kind,
            lexeme,
            column,
            report,
        }
    }

    /// The full multi-line message: headline, query and `^---` marker.
    pub fn report(&self) -> &str {
        &self.report
    }
}

/// Build an error report: headline, the query, and a marker line with `^`
/// at `column` followed by dashes up to `width` characters.
pub(crate) fn caret_report(headline: &str, query: &str, column: usize, width: usize) -> String {
    format!(
        "{}\n{}\n{}^{}",
        headline,
        query,
        " ".repeat(column),
        "-".repeat(width.saturating_sub(1))
    )
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// True if `name` lexes as exactly one identifier token.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_identifier_start) && chars.all(is_identifier_char)
}

/// Tokenize a query string.
pub fn tokenize(input: &str) -> Lexer<'_> {
    Lexer::new(input)
}

/// Lazy token stream over a query string.
///
/// Yields at most one error, after which the stream ends.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
            failed: false,
        }
    }

    /// The query being tokenized.
    pub fn input(&self) -> &'a str {
        self.input
    }

    /// Column just past the last character, used to point at end of input.
    pub fn end_column(&self) -> usize {
        self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn error(&mut self, kind: LexErrorKind, start: usize, end: usize) -> LexError {
        self.failed = true;
        let lexeme = self.slice(start, end);
        LexError::new(kind, lexeme, start, self.input)
    }

    fn token(&mut self, kind: TokenKind, start: usize, len: usize) -> Token {
        self.pos = start + len;
        Token {
            kind,
            lexeme: self.slice(start, start + len),
            column: start,
        }
    }

    fn lex_identifier(&mut self, start: usize) -> Token {
        let mut end = start;
        while let Some(&c) = self.chars.get(end) {
            if is_identifier_char(c) {
                end += 1;
            } else {
                break;
            }
        }
        let name = self.slice(start, end);
        self.token(TokenKind::Identifier(name), start, end - start)
    }

    fn lex_string(&mut self, start: usize, quote: char) -> Result<Token, LexError> {
        let mut end = start + 1;
        while let Some(c) = self.chars.get(end) {
            if *c == quote {
                let value = self.slice(start + 1, end);
                return Ok(self.token(TokenKind::String(value), start, end + 1 - start));
            }
            end += 1;
        }
        Err(self.error(LexErrorKind::UnterminatedString, start, self.chars.len()))
    }

    fn lex_number(&mut self, start: usize) -> Result<Token, LexError> {
        let negative = self.chars[start] == '-';
        let digits_start = if negative { start + 1 } else { start };
        let hex = self.chars.get(digits_start) == Some(&'0')
            && matches!(self.chars.get(digits_start + 1), Some('x') | Some('X'));

        // Consume the maximal number-like run so malformed literals such as
        // `0xG` or `5.0ee1` are reported as a whole.
        let mut end = digits_start;
        while let Some(&c) = self.chars.get(end) {
            let exponent_sign = !hex
                && (c == '+' || c == '-')
                && matches!(self.chars.get(end - 1), Some('e') | Some('E'));
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign {
                end += 1;
            } else {
                break;
            }
        }

        let body = self.slice(digits_start, end);
        let kind = match parse_number(&body, negative) {
            Some(kind) => kind,
            None => return Err(self.error(LexErrorKind::InvalidNumber, start, end)),
        };
        Ok(self.token(kind, start, end - start))
    }

    fn lex_operator(&mut self, start: usize, c: char) -> Option<Token> {
        let next = self.peek_at(1);
        let two = match (c, next) {
            ('=', Some('=')) => Some(TokenKind::DoubleEquals),
            ('!', Some('=')) => Some(TokenKind::NotEquals),
            ('~', Some('=')) => Some(TokenKind::EqualsCaseInsensitive),
            ('>', Some('=')) => Some(TokenKind::GreaterEquals),
            ('<', Some('=')) => Some(TokenKind::LessEquals),
            ('&', Some('&')) => Some(TokenKind::AndAnd),
            ('|', Some('|')) => Some(TokenKind::OrOr),
            _ => None,
        };
        if let Some(kind) = two {
            return Some(self.token(kind, start, 2));
        }

        let one = match c {
            '=' => TokenKind::Equals,
            '>' => TokenKind::Greater,
            '<' => TokenKind::Less,
            '&' => TokenKind::And,
            '|' => TokenKind::Or,
            '!' => TokenKind::Bang,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            '/' => TokenKind::Slash,
            '\\' => TokenKind::Backslash,
            ',' => TokenKind::Comma,
            _ => return None,
        };
        Some(self.token(one, start, 1))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }

        let start = self.pos;
        let c = self.peek()?;

        if is_identifier_start(c) {
            return Some(Ok(self.lex_identifier(start)));
        }
        if c == '\'' || c == '"' {
            return Some(self.lex_string(start, c));
        }
        if c.is_ascii_digit() || (c == '-' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
            return Some(self.lex_number(start));
        }
        if let Some(token) = self.lex_operator(start, c) {
            return Some(Ok(token));
        }

        Some(Err(self.error(LexErrorKind::UnrecognizedToken, start, start + 1)))
    }
}

/// Decode the digits of a numeric literal (without its sign).
fn parse_number(body: &str, negative: bool) -> Option<TokenKind> {
    let sign: i128 = if negative { -1 } else { 1 };

    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        let magnitude = i128::from_str_radix(hex, 16).ok()?;
        return i64::try_from(sign * magnitude).ok().map(TokenKind::Integer);
    }

    if body.contains(['.', 'e', 'E']) {
        if body.contains('_') {
            return None;
        }
        let value: f64 = body.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        return Some(TokenKind::Float(if negative { -value } else { value }));
    }

    if !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let radix = if body.len() > 1 && body.starts_with('0') { 8 } else { 10 };
    let magnitude = i128::from_str_radix(body, radix).ok()?;
    i64::try_from(sign * magnitude).ok().map(TokenKind::Integer)
}
