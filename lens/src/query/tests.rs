//! Tests for the query parser.

use super::*;
use crate::Error;

fn canonical(query: &str) -> String {
    parse(query).unwrap().to_string()
}

fn parse_error(query: &str) -> ParseError {
    match parse(query) {
        Err(Error::Parse(e)) => e,
        other => panic!("expected a parse error for {:?}, got {:?}", query, other),
    }
}

fn lex_error(query: &str) -> LexError {
    match parse(query) {
        Err(Error::Lex(e)) => e,
        other => panic!("expected a lex error for {:?}, got {:?}", query, other),
    }
}

#[test]
fn test_empty_query() {
    let q = parse("").unwrap();
    assert!(q.is_empty());
    assert!(parse("   ").unwrap().is_empty());
}

#[test]
fn test_string_filters() {
    assert_eq!(canonical("blubb='foo'"), "blubb='foo'");
    assert_eq!(canonical("blubb=\"foo\""), "blubb='foo'");
    assert_eq!(canonical("blubb=='foo'"), "blubb='foo'");
    assert_eq!(canonical("blubb!='foo'"), "blubb!='foo'");
    assert_eq!(canonical("blubb~=\"foo\""), "blubb~='foo'");
}

#[test]
fn test_string_with_single_quote_keeps_double_quotes() {
    assert_eq!(canonical("title=\"Don't\""), "title=\"Don't\"");
}

#[test]
fn test_integer_filters() {
    for query in ["foo>5", "foo>=5", "foo=5", "foo<5", "foo<=5", "foo!=5", "foo>-5", "foo<=-5"] {
        assert_eq!(canonical(query), query);
    }
    assert_eq!(canonical("foo==5"), "foo=5");
    assert_eq!(canonical("foo==-5"), "foo=-5");
}

#[test]
fn test_float_filters() {
    assert_eq!(canonical("foo>5.1"), "foo>5.1");
    assert_eq!(canonical("foo==-5.1"), "foo=-5.1");

    let q = parse("foo!=-5.0e15").unwrap();
    let Some(Term::Filter(filter)) = &q.filter else {
        panic!("expected a filter");
    };
    assert_eq!(filter.value, Literal::Float(-5.0e15));
    assert_eq!(parse(&q.to_string()).unwrap(), q);

    for query in ["foo!=-5.0E15", "foo!=-5.0e-15", "foo!=-5.0e+15"] {
        let q = parse(query).unwrap();
        assert_eq!(parse(&q.to_string()).unwrap(), q, "round trip of {}", query);
    }
}

#[test]
fn test_hex_and_octal_normalized() {
    assert_eq!(canonical("foo!=050"), "foo!=40");
    assert_eq!(canonical("foo!=0x15"), "foo!=21");
    assert_eq!(canonical("foo!=0X15"), "foo!=21");
}

#[test]
fn test_reversed_comparisons() {
    assert_eq!(canonical("5>foo"), "foo<5");
    assert_eq!(canonical("5>=foo"), "foo<=5");
    assert_eq!(canonical("5<foo"), "foo>5");
    assert_eq!(canonical("5<=foo"), "foo>=5");
    assert_eq!(canonical("5=foo"), "foo=5");
    assert_eq!(canonical("'mu*'~=name"), "name~='mu*'");
    assert_eq!(canonical("5>foo"), canonical("foo<5"));
}

#[test]
fn test_parentheses() {
    assert_eq!(canonical("(foo!=5)"), "(foo!=5)");
    assert_eq!(
        canonical("(foo!=5 || bar>3) & testVal!='test'"),
        "(foo!=5 | bar>3) & testVal!='test'"
    );
    assert_eq!(
        canonical("(foo!=5 | bar>3) & (testVal!='test')"),
        "(foo!=5 | bar>3) & (testVal!='test')"
    );
}

#[test]
fn test_and_binds_tighter_than_or() {
    let q = parse("foo!=5 | bar>3 & (testVal!='test')").unwrap();
    assert_eq!(q.to_string(), "foo!=5 | bar>3 & (testVal!='test')");

    let Some(Term::Conjunction(or)) = &q.filter else {
        panic!("expected a conjunction");
    };
    assert_eq!(or.kind(), ConjunctionKind::Or);
    assert_eq!(or.terms().len(), 2);
    assert!(matches!(&or.terms()[1], Term::Conjunction(c) if c.kind() == ConjunctionKind::And));
}

#[test]
fn test_negation() {
    let query = "!(!foo!=5 | !bar>3) & !(!testVal!='test')";
    assert_eq!(canonical(query), query);
    assert_eq!(canonical("!!foo=1"), "foo=1");
}

#[test]
fn test_long_negation_chain() {
    let even = format!("{}a=1", "!".repeat(3000));
    assert_eq!(canonical(&even), "a=1");
    let odd = format!("{}(a=1 | b=2)", "!".repeat(3001));
    assert_eq!(canonical(&odd), "!(a=1 | b=2)");
}

#[test]
fn test_nesting_limit() {
    let deepest = format!("{}a=1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
    assert_eq!(canonical(&deepest), deepest);

    let query = format!("{}a=1{}", "(".repeat(3000), ")".repeat(3000));
    let err = parse_error(&query);
    assert_eq!(err.kind, ParseErrorKind::NestingTooDeep { limit: MAX_NESTING });
    assert_eq!(err.column, MAX_NESTING);
    assert_eq!(err.lexeme, "(");
    assert!(err.report().starts_with("Query nested deeper than 128 levels\n"));
}

#[test]
fn test_negation_distribution() {
    let mut filter = parse("a=1 & b=2").unwrap().filter.unwrap();
    filter.negate();

    let Term::Conjunction(and) = &filter else {
        panic!("expected a conjunction");
    };
    assert!(matches!(&and.terms()[0], Term::Filter(f) if f.negated));
    assert!(matches!(&and.terms()[1], Term::Filter(f) if !f.negated));
    assert_eq!(filter.to_string(), "!a=1 & b=2");
}

#[test]
fn test_conjunction_flattening() {
    let q = parse("a=1 & b=2 & c=3").unwrap();
    let Some(Term::Conjunction(and)) = &q.filter else {
        panic!("expected a conjunction");
    };
    assert_eq!(and.kind(), ConjunctionKind::And);
    assert_eq!(and.terms().len(), 3);
    assert!(and.terms().iter().all(|t| matches!(t, Term::Filter(_))));

    let q = parse("a=1 || b=2 | c=3 || d=4").unwrap();
    let Some(Term::Conjunction(or)) = &q.filter else {
        panic!("expected a conjunction");
    };
    assert_eq!(or.terms().len(), 4);
}

#[test]
fn test_order_lists() {
    let q = parse("[/name]").unwrap();
    assert!(q.filter.is_none());
    assert_eq!(q.order, vec![OrderTerm::ascending("name")]);

    let q = parse("[/name,\\year][\\id]").unwrap();
    assert_eq!(
        q.order,
        vec![
            OrderTerm::ascending("name"),
            OrderTerm::descending("year"),
            OrderTerm::descending("id"),
        ]
    );

    let q = parse("[/name \\year]").unwrap();
    assert_eq!(q.order.len(), 2);
}

#[test]
fn test_order_after_filter() {
    let q = parse("id<50[\\id]").unwrap();
    assert_eq!(q.to_string(), "id<50 [\\id]");
    assert_eq!(q.order, vec![OrderTerm::descending("id")]);

    let q = parse("[/name] year>=2005").unwrap();
    assert_eq!(q.to_string(), "year>=2005 [/name]");
}

#[test]
fn test_round_trip() {
    let queries = [
        "artist='Muse' & year>=2005",
        "genre='Rock' & year>=2010",
        "!(a=1 | b~='x*') & c<=0x10 [/name,\\year]",
        "5>foo | (bar!=\"it's\" & baz=1.5e-3)",
        "((a=1))",
        "!(!(a=1 & b=2) | c=3)",
    ];
    for query in queries {
        let first = parse(query).unwrap();
        let second = parse(&first.to_string()).unwrap();
        assert_eq!(first, second, "round trip of {}", query);
        assert_eq!(first.to_string(), second.to_string());
    }
}

#[test]
fn test_encode_decode_parsed_query() {
    let q = parse("!(a=1 | b=2) & c~='x' [\\c]").unwrap();
    let decoded = ParsedQuery::decode(&q.encode().unwrap()).unwrap();
    assert_eq!(decoded, q);
}

#[test]
fn test_allowed_identifiers() {
    let parser = QueryParser::new().with_allowed_identifiers(["year", "name"]);
    assert!(parser.parse("year>5 & name='x' [/name]").is_ok());

    let err = match parser.parse("year>5 & genre='x'") {
        Err(Error::Parse(e)) => e,
        other => panic!("expected a parse error, got {:?}", other),
    };
    assert_eq!(
        err.kind,
        ParseErrorKind::DisallowedIdentifier {
            allowed: vec!["name".to_string(), "year".to_string()]
        }
    );
    assert_eq!(err.lexeme, "genre");
    assert_eq!(err.column, 9);
    assert_eq!(
        err.report(),
        "Got identifier genre but expected one of the following identifiers:\n     name\n     year\nyear>5 & genre='x'\n         ^----"
    );
}

#[test]
fn test_allowed_identifiers_apply_to_order() {
    let parser = QueryParser::new().with_allowed_identifiers(["year"]);
    assert!(parser.parse("[/year]").is_ok());
    assert!(matches!(
        parser.parse("[/name]"),
        Err(Error::Parse(ParseError {
            kind: ParseErrorKind::DisallowedIdentifier { .. },
            ..
        }))
    ));
}

#[test]
fn test_empty_allow_list_accepts_everything() {
    let parser = QueryParser::new().with_allowed_identifiers(Vec::<String>::new());
    assert!(parser.parse("anything=1").is_ok());
}

#[test]
fn test_invalid_queries() {
    // Type mismatches between operator and literal.
    parse_error("blubb~=5");
    parse_error("blubb>='foo'");
    parse_error("'foo'>blubb");
    parse_error("5~=blubb");
    // Identifier or literal on both sides.
    parse_error("blubb>=foo");
    parse_error("blubb==foo");
    parse_error("5=5");
    // Structure.
    parse_error("blubb=5,1");
    parse_error("((blubb=5)");
    parse_error("(blubb=5) || && (foo=\"barl\")");
    parse_error("(blubb=5) (foo=\"barl\")");
    parse_error("blubb=5 &");
    parse_error("!");
    parse_error("[/name");
    parse_error("[name]");
    parse_error("[/name] a=1 [/b] c=2");
}

#[test]
fn test_invalid_literals_fail_in_lexer() {
    assert_eq!(lex_error("blubb=\"foo'").kind, LexErrorKind::UnterminatedString);
    assert_eq!(lex_error("blubb==5.0ee1").kind, LexErrorKind::InvalidNumber);
    assert_eq!(lex_error("blubb=0xG").kind, LexErrorKind::InvalidNumber);
    assert_eq!(lex_error("a=1 ; b=2").kind, LexErrorKind::UnrecognizedToken);
}

#[test]
fn test_error_report_marker() {
    let err = parse_error("blubb>=foo");
    assert_eq!(err.column, 7);
    assert_eq!(
        err.report(),
        "Got identifier foo but expected one of the following types:\n     integer\n     float\nblubb>=foo\n       ^--"
    );
}

#[test]
fn test_error_at_end_of_query() {
    let err = parse_error("((blubb=5)");
    assert_eq!(err.lexeme, "");
    assert_eq!(err.column, 10);
    assert!(err.report().starts_with("Got end of query but expected"));
    assert!(err.report().ends_with("((blubb=5)\n          ^"));
}

#[test]
fn test_error_lists_at_most_seven_candidates() {
    let err = parse_error("foo 5");
    let ParseErrorKind::UnexpectedToken { expected } = &err.kind else {
        panic!("expected an unexpected token error");
    };
    assert_eq!(expected.len(), 8);

    let candidate_lines = err
        .report()
        .lines()
        .filter(|line| line.starts_with("     '"))
        .count();
    assert_eq!(candidate_lines, 7);
}

#[test]
fn test_parse_tokens() {
    let query = "year>=2005";
    let tokens: Vec<Token> = tokenize(query).map(|t| t.unwrap()).collect();
    let q = QueryParser::new().parse_tokens(query, tokens).unwrap();
    assert_eq!(q, parse(query).unwrap());
}

#[test]
fn test_properties_of_parsed_query() {
    let q = parse("a=1 & (b=2 | !c=3) & a=4").unwrap();
    let props: Vec<&str> = q.filter.as_ref().unwrap().properties().into_iter().collect();
    assert_eq!(props, vec!["a", "b", "c"]);
}
