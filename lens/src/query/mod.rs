//! Query language for filtering and sorting browsed data.
//!
//! # Syntax Overview
//!
//! - **Filters**: `property <op> value` or `value <op> property`, with
//!   `= == != ~= > >= < <=`
//! - **Literals**: `'single'` or `"double"` quoted strings, decimal, hex
//!   (`0x15`), octal (`050`) and floating point numbers (`-5.0e15`)
//! - **Conjunctions**: `&` / `&&` (AND) binds tighter than `|` / `||` (OR)
//! - **Grouping and negation**: `(...)`, `!term`, `!(...)`
//! - **Order**: `[/name,\year]`, ascending `/` and descending `\`, before or
//!   after the filter
//!
//! ```
//! use lens::query::parse;
//!
//! let query = parse("year>=2005 & artist='Muse' [/name]").unwrap();
//! assert_eq!(query.to_string(), "year>=2005 & artist='Muse' [/name]");
//! ```

mod lexer;
mod parser;
mod term;

pub use lexer::{tokenize, LexError, LexErrorKind, Lexer, Token, TokenKind};
pub use parser::{parse, ParseError, ParseErrorKind, QueryParser};
pub use term::{
    CompareOp, ConjunctionKind, ConjunctionTerm, FilterTerm, Literal, OrderTerm, ParsedQuery,
    ScopeTerm, Term, MAX_NESTING,
};

#[cfg(test)]
mod tests;
