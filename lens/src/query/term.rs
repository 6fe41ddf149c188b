//! Term tree produced by the query parser.
//!
//! Terms are plain owned values: a filter compares one property against a
//! literal, a conjunction joins two or more terms with AND or OR, and a scope
//! groups a term so that it can be negated as a whole. Rendering a term with
//! [`Display`](std::fmt::Display) gives its canonical query string, which parses
//! back into a structurally equal tree.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::lexer::is_identifier;
use crate::error::{Error, Result};

/// Most scopes a term tree may nest, in parsed queries and decoded ones.
pub const MAX_NESTING: usize = 128;

/// Comparison operator of a filter term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// `=` or `==`
    Eq,
    /// `~=` case-insensitive string equality
    EqCaseInsensitive,
    /// `!=`
    NotEq,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::EqCaseInsensitive => "~=",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }

    /// True for `> >= < <=`, which only compare numbers.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte
        )
    }

    /// The operator that gives the same result with operands swapped.
    pub fn mirrored(self) -> Self {
        match self {
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Gte => CompareOp::Lte,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Lte => CompareOp::Gte,
            other => other,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Literal value on the right-hand side of a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
}

impl Literal {
    pub fn is_number(&self) -> bool {
        matches!(self, Literal::Integer(_) | Literal::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Integer(i) => Some(*i as f64),
            Literal::Float(f) => Some(*f),
            Literal::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{}", i),
            // Debug keeps a fraction or exponent, so the output lexes as a float.
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::String(s) if s.contains('\'') => write!(f, "\"{}\"", s),
            Literal::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Integer(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Integer(v.into())
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::String(v)
    }
}

/// Leaf predicate: `[!]property <op> value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterTerm {
    pub property: String,
    pub op: CompareOp,
    pub value: Literal,
    #[serde(default)]
    pub negated: bool,
}

impl FilterTerm {
    pub fn new(property: impl Into<String>, op: CompareOp, value: impl Into<Literal>) -> Self {
        Self {
            property: property.into(),
            op,
            value: value.into(),
            negated: false,
        }
    }
}

impl fmt::Display for FilterTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("!")?;
        }
        write!(f, "{}{}{}", self.property, self.op, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConjunctionKind {
    And,
    Or,
}

impl ConjunctionKind {
    fn separator(self) -> &'static str {
        match self {
            ConjunctionKind::And => " & ",
            ConjunctionKind::Or => " | ",
        }
    }
}

/// Two or more terms joined by the same conjunction.
///
/// Children never contain a conjunction of the same kind; such operands are
/// merged into this term's list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConjunctionTerm {
    kind: ConjunctionKind,
    terms: Vec<Term>,
}

impl ConjunctionTerm {
    /// Build a conjunction, rejecting fewer than two terms and flattening
    /// children of the same kind.
    pub fn new(kind: ConjunctionKind, terms: Vec<Term>) -> Result<Self> {
        if terms.len() < 2 {
            return Err(Error::InvalidArgument(format!(
                "a conjunction needs at least 2 terms, got {}",
                terms.len()
            )));
        }
        let mut flat = Vec::with_capacity(terms.len());
        for term in terms {
            push_operand(kind, &mut flat, term);
        }
        Ok(Self { kind, terms: flat })
    }

    pub fn kind(&self) -> ConjunctionKind {
        self.kind
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn into_terms(self) -> Vec<Term> {
        self.terms
    }
}

impl fmt::Display for ConjunctionTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(self.kind.separator())?;
            }
            write!(f, "{}", term)?;
        }
        Ok(())
    }
}

/// Explicit grouping: `[!](term)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeTerm {
    pub term: Box<Term>,
    #[serde(default)]
    pub negated: bool,
}

impl fmt::Display for ScopeTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("!")?;
        }
        write!(f, "({})", self.term)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    Filter(FilterTerm),
    Conjunction(ConjunctionTerm),
    Scope(ScopeTerm),
}

impl Term {
    pub fn filter(property: impl Into<String>, op: CompareOp, value: impl Into<Literal>) -> Self {
        Term::Filter(FilterTerm::new(property, op, value))
    }

    pub fn scope(term: Term) -> Self {
        Term::Scope(ScopeTerm {
            term: Box::new(term),
            negated: false,
        })
    }

    /// Join two terms, merging operands that already are conjunctions of
    /// `kind`. An OR operand of an AND is wrapped in a scope so the rendered
    /// form keeps its grouping.
    pub fn combine(kind: ConjunctionKind, lhs: Term, rhs: Term) -> Term {
        let mut terms = Vec::new();
        push_operand(kind, &mut terms, lhs);
        push_operand(kind, &mut terms, rhs);
        Term::Conjunction(ConjunctionTerm { kind, terms })
    }

    /// Apply a `!` prefix.
    ///
    /// Filters and scopes flip their own flag. A conjunction negates only its
    /// leftmost term, matching how `!a=1 & b=2` reads.
    pub fn negate(&mut self) {
        match self {
            Term::Filter(filter) => filter.negated = !filter.negated,
            Term::Scope(scope) => scope.negated = !scope.negated,
            Term::Conjunction(conjunction) => {
                if let Some(first) = conjunction.terms.first_mut() {
                    first.negate();
                }
            }
        }
    }

    /// Consuming variant of [`Term::negate`].
    pub fn negated(mut self) -> Term {
        self.negate();
        self
    }

    /// True if the tree contains a conjunction of `kind`.
    pub fn uses_conjunction(&self, kind: ConjunctionKind) -> bool {
        match self {
            Term::Filter(_) => false,
            Term::Conjunction(conjunction) => {
                conjunction.kind == kind
                    || conjunction.terms.iter().any(|t| t.uses_conjunction(kind))
            }
            Term::Scope(scope) => scope.term.uses_conjunction(kind),
        }
    }

    /// Every property name referenced by the tree.
    pub fn properties(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_properties(&mut out);
        out
    }

    fn collect_properties<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Term::Filter(filter) => {
                out.insert(filter.property.as_str());
            }
            Term::Conjunction(conjunction) => {
                for term in &conjunction.terms {
                    term.collect_properties(out);
                }
            }
            Term::Scope(scope) => scope.term.collect_properties(out),
        }
    }

    /// Binary form for transport to out-of-process backends.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&flatten(self)?)?)
    }

    /// Decode [`Term::encode`] output, checking the tree invariants.
    pub fn decode(bytes: &[u8]) -> Result<Term> {
        let nodes: Vec<Node> = bincode::deserialize(bytes)?;
        unflatten(nodes)
    }
}

fn push_operand(kind: ConjunctionKind, terms: &mut Vec<Term>, operand: Term) {
    match operand {
        Term::Conjunction(inner) if inner.kind == kind => terms.extend(inner.terms),
        Term::Conjunction(inner) if kind == ConjunctionKind::And => {
            terms.push(Term::scope(Term::Conjunction(inner)))
        }
        other => terms.push(other),
    }
}

/// Encoded term tree node, in pre-order. A conjunction is followed by its
/// `len` operands and a scope by its one inner term.
#[derive(Serialize, Deserialize)]
enum Node {
    Filter(FilterTerm),
    Conjunction { kind: ConjunctionKind, len: u32 },
    Scope { negated: bool },
}

fn flatten(root: &Term) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    let mut stack = vec![root];
    while let Some(term) = stack.pop() {
        match term {
            Term::Filter(filter) => nodes.push(Node::Filter(filter.clone())),
            Term::Conjunction(conjunction) => {
                let len = u32::try_from(conjunction.terms.len())
                    .map_err(|_| Error::Codec("conjunction too large to encode".to_string()))?;
                nodes.push(Node::Conjunction {
                    kind: conjunction.kind,
                    len,
                });
                stack.extend(conjunction.terms.iter().rev());
            }
            Term::Scope(scope) => {
                nodes.push(Node::Scope {
                    negated: scope.negated,
                });
                stack.push(scope.term.as_ref());
            }
        }
    }
    Ok(nodes)
}

/// Partially rebuilt parent of the nodes being decoded.
enum Frame {
    Conjunction {
        kind: ConjunctionKind,
        remaining: usize,
        terms: Vec<Term>,
    },
    Scope {
        negated: bool,
    },
}

/// Rebuild a tree from pre-order nodes without recursing, rejecting any
/// shape the parser cannot produce.
fn unflatten(nodes: Vec<Node>) -> Result<Term> {
    let mut frames: Vec<Frame> = Vec::new();
    let mut scopes = 0usize;
    let mut nodes = nodes.into_iter();

    while let Some(node) = nodes.next() {
        let mut done = match node {
            Node::Filter(filter) => {
                if !is_identifier(&filter.property) {
                    return Err(Error::Codec(format!(
                        "invalid property name '{}'",
                        filter.property
                    )));
                }
                Term::Filter(filter)
            }
            Node::Conjunction { kind, len } => {
                if len < 2 {
                    return Err(Error::Codec(format!("conjunction with {} term(s)", len)));
                }
                frames.push(Frame::Conjunction {
                    kind,
                    remaining: len as usize,
                    terms: Vec::new(),
                });
                continue;
            }
            Node::Scope { negated } => {
                scopes += 1;
                if scopes > MAX_NESTING {
                    return Err(Error::Codec(format!(
                        "term nested deeper than {} scopes",
                        MAX_NESTING
                    )));
                }
                frames.push(Frame::Scope { negated });
                continue;
            }
        };

        // Hand the finished term up, closing every parent it completes.
        loop {
            match frames.last_mut() {
                None => {
                    if nodes.next().is_some() {
                        return Err(Error::Codec("trailing nodes after term".to_string()));
                    }
                    return Ok(done);
                }
                Some(Frame::Scope { negated }) => {
                    let negated = *negated;
                    frames.pop();
                    scopes -= 1;
                    done = Term::Scope(ScopeTerm {
                        term: Box::new(done),
                        negated,
                    });
                }
                Some(Frame::Conjunction {
                    kind,
                    remaining,
                    terms,
                }) => {
                    check_operand(*kind, &done)?;
                    terms.push(done);
                    *remaining -= 1;
                    if *remaining > 0 {
                        break;
                    }
                    let conjunction = ConjunctionTerm {
                        kind: *kind,
                        terms: std::mem::take(terms),
                    };
                    frames.pop();
                    done = Term::Conjunction(conjunction);
                }
            }
        }
    }
    Err(Error::Codec("truncated term".to_string()))
}

/// Operands merged by [`push_operand`] never reappear as children.
fn check_operand(kind: ConjunctionKind, operand: &Term) -> Result<()> {
    match operand {
        Term::Conjunction(inner) if inner.kind == kind => Err(Error::Codec(
            "nested conjunction of the same kind".to_string(),
        )),
        Term::Conjunction(_) if kind == ConjunctionKind::And => Err(Error::Codec(
            "OR operand of an AND must be scoped".to_string(),
        )),
        _ => Ok(()),
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Filter(filter) => filter.fmt(f),
            Term::Conjunction(conjunction) => conjunction.fmt(f),
            Term::Scope(scope) => scope.fmt(f),
        }
    }
}

impl From<FilterTerm> for Term {
    fn from(filter: FilterTerm) -> Self {
        Term::Filter(filter)
    }
}

/// One sort key: `/property` ascending or `\property` descending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderTerm {
    pub property: String,
    pub ascending: bool,
}

impl OrderTerm {
    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: true,
        }
    }

    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: false,
        }
    }
}

impl fmt::Display for OrderTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.ascending { '/' } else { '\\' };
        write!(f, "{}{}", marker, self.property)
    }
}

/// Result of parsing a query: an optional filter plus the sort keys, highest
/// priority first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub filter: Option<Term>,
    pub order: Vec<OrderTerm>,
}

impl ParsedQuery {
    /// True when the query neither filters nor sorts.
    pub fn is_empty(&self) -> bool {
        self.filter.is_none() && self.order.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let filter = match &self.filter {
            Some(term) => flatten(term)?,
            None => Vec::new(),
        };
        Ok(bincode::serialize(&EncodedQuery {
            filter,
            order: self.order.clone(),
        })?)
    }

    pub fn decode(bytes: &[u8]) -> Result<ParsedQuery> {
        let encoded: EncodedQuery = bincode::deserialize(bytes)?;
        if let Some(order) = encoded.order.iter().find(|o| !is_identifier(&o.property)) {
            return Err(Error::Codec(format!(
                "invalid property name '{}'",
                order.property
            )));
        }
        let filter = if encoded.filter.is_empty() {
            None
        } else {
            Some(unflatten(encoded.filter)?)
        };
        Ok(ParsedQuery {
            filter,
            order: encoded.order,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct EncodedQuery {
    filter: Vec<Node>,
    order: Vec<OrderTerm>,
}

impl fmt::Display for ParsedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(filter) = &self.filter {
            write!(f, "{}", filter)?;
            if !self.order.is_empty() {
                f.write_str(" ")?;
            }
        }
        if !self.order.is_empty() {
            f.write_str("[")?;
            for (i, order) in self.order.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", order)?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Term {
        let ab = Term::combine(
            ConjunctionKind::And,
            Term::filter("a", CompareOp::Eq, 1),
            Term::filter("b", CompareOp::Eq, 2),
        );
        Term::combine(ConjunctionKind::And, ab, Term::filter("c", CompareOp::Eq, 3))
    }

    #[test]
    fn test_combine_flattens_same_kind() {
        let Term::Conjunction(conjunction) = abc() else {
            panic!("expected a conjunction");
        };
        assert_eq!(conjunction.kind(), ConjunctionKind::And);
        assert_eq!(conjunction.terms().len(), 3);
    }

    #[test]
    fn test_combine_scopes_or_under_and() {
        let or = Term::combine(
            ConjunctionKind::Or,
            Term::filter("a", CompareOp::Eq, 1),
            Term::filter("b", CompareOp::Eq, 2),
        );
        let and = Term::combine(ConjunctionKind::And, or, Term::filter("c", CompareOp::Eq, 3));
        assert_eq!(and.to_string(), "(a=1 | b=2) & c=3");
    }

    #[test]
    fn test_negate_conjunction_touches_leftmost_only() {
        let term = abc().negated();
        assert_eq!(term.to_string(), "!a=1 & b=2 & c=3");
    }

    #[test]
    fn test_negate_scope_flips_flag() {
        let mut term = Term::scope(abc());
        term.negate();
        assert_eq!(term.to_string(), "!(a=1 & b=2 & c=3)");
        term.negate();
        assert_eq!(term.to_string(), "(a=1 & b=2 & c=3)");
    }

    #[test]
    fn test_literal_rendering() {
        assert_eq!(Literal::Integer(-3).to_string(), "-3");
        assert_eq!(Literal::Float(5.0).to_string(), "5.0");
        assert_eq!(Literal::Float(1e16).to_string(), "1e16");
        assert_eq!(Literal::from("Muse").to_string(), "'Muse'");
        assert_eq!(Literal::from("it's").to_string(), "\"it's\"");
    }

    #[test]
    fn test_mirrored_ops() {
        assert_eq!(CompareOp::Gt.mirrored(), CompareOp::Lt);
        assert_eq!(CompareOp::Lte.mirrored(), CompareOp::Gte);
        assert_eq!(CompareOp::NotEq.mirrored(), CompareOp::NotEq);
        assert_eq!(CompareOp::EqCaseInsensitive.mirrored(), CompareOp::EqCaseInsensitive);
    }

    #[test]
    fn test_conjunction_requires_two_terms() {
        let result = ConjunctionTerm::new(
            ConjunctionKind::Or,
            vec![Term::filter("a", CompareOp::Eq, 1)],
        );
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_decode_rejects_short_conjunction() {
        // Serialize a hand-built invalid tree; encode itself does not validate.
        let broken = Term::Conjunction(ConjunctionTerm {
            kind: ConjunctionKind::And,
            terms: vec![Term::filter("a", CompareOp::Eq, 1)],
        });
        let bytes = broken.encode().unwrap();
        assert!(matches!(Term::decode(&bytes), Err(Error::Codec(_))));
    }

    #[test]
    fn test_encode_preserves_flags_and_kind() {
        let mut term = Term::combine(
            ConjunctionKind::Or,
            Term::scope(abc()).negated(),
            Term::filter("name", CompareOp::EqCaseInsensitive, "mu*"),
        );
        term.negate();
        let decoded = Term::decode(&term.encode().unwrap()).unwrap();
        assert_eq!(decoded, term);
        assert_eq!(decoded.to_string(), "(a=1 & b=2 & c=3) | name~='mu*'");
    }

    #[test]
    fn test_decode_rejects_unscoped_or_under_and() {
        let or = Term::combine(
            ConjunctionKind::Or,
            Term::filter("a", CompareOp::Eq, 1),
            Term::filter("b", CompareOp::Eq, 2),
        );
        let broken = Term::Conjunction(ConjunctionTerm {
            kind: ConjunctionKind::And,
            terms: vec![or, Term::filter("c", CompareOp::Eq, 3)],
        });
        let bytes = broken.encode().unwrap();
        assert!(matches!(Term::decode(&bytes), Err(Error::Codec(_))));
    }

    #[test]
    fn test_decode_rejects_invalid_property() {
        for property in ["", "two words", "9lives", "a=b"] {
            let bytes = Term::filter(property, CompareOp::Eq, 1).encode().unwrap();
            assert!(
                matches!(Term::decode(&bytes), Err(Error::Codec(_))),
                "accepted {:?}",
                property
            );
        }

        let query = ParsedQuery {
            filter: None,
            order: vec![OrderTerm::ascending("no good")],
        };
        let bytes = query.encode().unwrap();
        assert!(matches!(ParsedQuery::decode(&bytes), Err(Error::Codec(_))));
    }

    #[test]
    fn test_decode_limits_nesting() {
        let mut term = Term::filter("a", CompareOp::Eq, 1);
        for _ in 0..MAX_NESTING {
            term = Term::scope(term);
        }
        let bytes = term.encode().unwrap();
        assert_eq!(Term::decode(&bytes).unwrap(), term);

        let deeper = Term::scope(term).encode().unwrap();
        assert!(matches!(Term::decode(&deeper), Err(Error::Codec(_))));
    }

    #[test]
    fn test_decode_rejects_truncated_and_trailing_nodes() {
        let mut truncated = flatten(&abc()).unwrap();
        truncated.pop();
        let bytes = bincode::serialize(&truncated).unwrap();
        assert!(matches!(Term::decode(&bytes), Err(Error::Codec(_))));

        let mut trailing = flatten(&abc()).unwrap();
        trailing.push(Node::Filter(FilterTerm::new("d", CompareOp::Eq, 4)));
        let bytes = bincode::serialize(&trailing).unwrap();
        assert!(matches!(Term::decode(&bytes), Err(Error::Codec(_))));
        assert!(matches!(Term::decode(&[]), Err(Error::Codec(_))));
    }

    #[test]
    fn test_parsed_query_codec() {
        let query = ParsedQuery {
            filter: Some(Term::scope(abc()).negated()),
            order: vec![OrderTerm::descending("year")],
        };
        assert_eq!(ParsedQuery::decode(&query.encode().unwrap()).unwrap(), query);

        let order_only = ParsedQuery {
            filter: None,
            order: vec![OrderTerm::ascending("name")],
        };
        assert_eq!(
            ParsedQuery::decode(&order_only.encode().unwrap()).unwrap(),
            order_only
        );
    }

    #[test]
    fn test_uses_conjunction() {
        let term = Term::combine(
            ConjunctionKind::Or,
            Term::scope(abc()),
            Term::filter("d", CompareOp::Eq, 4),
        );
        assert!(term.uses_conjunction(ConjunctionKind::Or));
        assert!(term.uses_conjunction(ConjunctionKind::And));
        assert!(!Term::filter("d", CompareOp::Eq, 4).uses_conjunction(ConjunctionKind::And));
    }

    #[test]
    fn test_properties() {
        let term = abc();
        let props: Vec<&str> = term.properties().into_iter().collect();
        assert_eq!(props, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parsed_query_display() {
        let query = ParsedQuery {
            filter: Some(Term::filter("id", CompareOp::Lt, 50)),
            order: vec![OrderTerm::descending("id")],
        };
        assert_eq!(query.to_string(), "id<50 [\\id]");

        let order_only = ParsedQuery {
            filter: None,
            order: vec![OrderTerm::ascending("name"), OrderTerm::descending("year")],
        };
        assert_eq!(order_only.to_string(), "[/name,\\year]");
        assert!(ParsedQuery::default().is_empty());
    }

    #[test]
    fn test_json_tags() {
        let json = serde_json::to_value(Term::filter("year", CompareOp::Gte, 2005)).unwrap();
        assert_eq!(json["filter"]["op"], "gte");
        assert_eq!(json["filter"]["value"]["integer"], 2005);
    }
}
