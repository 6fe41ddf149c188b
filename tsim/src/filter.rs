//! Term evaluation and ordering over in-memory records.

use std::cmp::Ordering;

use lens::query::{CompareOp, ConjunctionKind, FilterTerm, Literal, OrderTerm, Term};
use lens::Record;
use serde_json::Value;

/// True if `record` passes `term`.
///
/// A comparison against a missing or incomparable field is false before
/// negation is applied.
pub fn matches(term: &Term, record: &Record) -> bool {
    match term {
        Term::Filter(filter) => matches_filter(filter, record),
        Term::Conjunction(conjunction) => match conjunction.kind() {
            ConjunctionKind::And => conjunction.terms().iter().all(|t| matches(t, record)),
            ConjunctionKind::Or => conjunction.terms().iter().any(|t| matches(t, record)),
        },
        Term::Scope(scope) => matches(&scope.term, record) != scope.negated,
    }
}

fn matches_filter(filter: &FilterTerm, record: &Record) -> bool {
    let result = record
        .field(&filter.property)
        .is_some_and(|value| compare(&value, filter.op, &filter.value));
    result != filter.negated
}

fn compare(value: &Value, op: CompareOp, literal: &Literal) -> bool {
    if op == CompareOp::EqCaseInsensitive {
        if let (Value::String(text), Literal::String(pattern)) = (value, literal) {
            return like(pattern, text);
        }
    }

    let Some(ordering) = compare_values(value, &literal_value(literal)) else {
        return false;
    };
    match op {
        CompareOp::Eq | CompareOp::EqCaseInsensitive => ordering == Ordering::Equal,
        CompareOp::NotEq => ordering != Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Gte => ordering != Ordering::Less,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Lte => ordering != Ordering::Greater,
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Integer(i) => Value::from(*i),
        Literal::Float(f) => Value::from(*f),
        Literal::String(s) => Value::from(s.as_str()),
    }
}

/// Order two JSON values of the same kind. Numbers compare as `f64`,
/// strings lexicographically; mixed kinds are incomparable.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Case-insensitive match where `*` in `pattern` stands for any run of
/// characters.
pub fn like(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position after the last `*` and the text position it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            p += 1;
            backtrack = Some((p, t));
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star_p, star_t)) = backtrack {
            p = star_p;
            t = star_t + 1;
            backtrack = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

/// Stable multi-key ordering. Records missing a property sort before those
/// that have it, as in SQL ascending order.
pub fn compare_records(order: &[OrderTerm], a: &Record, b: &Record) -> Ordering {
    for term in order {
        let ordering = match (a.field(&term.property), b.field(&term.property)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => compare_values(&x, &y).unwrap_or(Ordering::Equal),
        };
        let ordering = if term.ascending {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

pub fn sort_records(records: &mut [Record], order: &[OrderTerm]) {
    if !order.is_empty() {
        records.sort_by(|a, b| compare_records(order, a, b));
    }
}
