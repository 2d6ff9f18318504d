//! Store integration tests.
//!
//! Exercises the entry points of `SqliteQuadStore` end to end against
//! in-memory and file-backed databases.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use sqlquad::models::{ComparisonTest, Filter, Quad, QuadPattern, Term, XSD};
use sqlquad::storage::SqliteQuadStore;
use sqlquad::{Error, StoreConfig};
use std::collections::HashSet;
use tempfile::TempDir;

fn iri(local: &str) -> Term {
    Term::named_node(format!("http://ex.com/{local}"))
}

fn integer(n: i64) -> Term {
    Term::typed_literal(n.to_string(), format!("{XSD}integer"))
}

fn memory_store() -> SqliteQuadStore {
    let store = SqliteQuadStore::in_memory().expect("open in-memory store");
    store.create_tables().expect("create tables");
    store
}

fn collect(store: &SqliteQuadStore, pattern: &QuadPattern) -> HashSet<Quad> {
    store
        .matches(pattern)
        .unwrap()
        .collect::<sqlquad::Result<_>>()
        .unwrap()
}

#[test]
fn test_three_quad_scenario() {
    let store = memory_store();
    let (s1, s2, p1, o1, o2, g1) = (iri("s1"), iri("s2"), iri("p1"), iri("o1"), iri("o2"), iri("g1"));
    let quads = vec![
        Quad::new(s1.clone(), p1.clone(), o1.clone(), g1.clone()),
        Quad::new(s1.clone(), p1.clone(), o2.clone(), g1.clone()),
        Quad::new(s2.clone(), p1.clone(), o1.clone(), g1.clone()),
    ];

    store.import(quads.clone()).unwrap();
    assert_eq!(store.vertex_count().unwrap(), 6);
    assert_eq!(store.edge_count().unwrap(), 3);

    let removed = store
        .remove_matches(&QuadPattern::new().with_subject(s1.clone()))
        .unwrap();
    assert_eq!(removed.rows_deleted, 2);
    assert_eq!(store.edge_count().unwrap(), 1);
    // Deletion never touches vertexes.
    assert_eq!(store.vertex_count().unwrap(), 6);

    let result = store.vacuum().unwrap();
    assert_eq!(result.vertexes_deleted, 2);
    assert_eq!(store.vertex_count().unwrap(), 4);

    let remaining = collect(&store, &QuadPattern::new());
    assert_eq!(remaining, HashSet::from([quads[2].clone()]));
}

#[test]
fn test_import_is_idempotent() {
    let store = memory_store();
    let quads: Vec<Quad> = (0..25)
        .map(|n| Quad::triple(iri(&format!("s{n}")), iri("p"), integer(n % 5)))
        .collect();

    store.import(quads.clone()).unwrap();
    let vertexes = store.vertex_count().unwrap();
    let second = store.import(quads).unwrap();

    assert_eq!(second.edges_inserted, 0);
    assert_eq!(second.duplicate_edges, 25);
    assert_eq!(second.vertexes_inserted, 0);
    assert_eq!(store.edge_count().unwrap(), 25);
    assert_eq!(store.vertex_count().unwrap(), vertexes);
}

#[test]
fn test_round_trip_preserves_terms() {
    let store = memory_store();
    let quads = HashSet::from([
        Quad::new(iri("s"), iri("p"), Term::literal("plain"), Term::DefaultGraph),
        Quad::new(iri("s"), iri("p"), Term::language_literal("plain", "en"), iri("g")),
        Quad::new(Term::blank_node("b0"), iri("p"), integer(42), iri("g")),
        Quad::new(
            Term::blank_node("b0"),
            iri("p"),
            Term::typed_literal("2021-03-04T05:06:07Z", format!("{XSD}dateTime")),
            Term::DefaultGraph,
        ),
        Quad::new(iri("s"), iri("p"), Term::literal(""), Term::DefaultGraph),
    ]);

    store.import(quads.clone()).unwrap();
    assert_eq!(collect(&store, &QuadPattern::new()), quads);
}

#[test]
fn test_literal_annotations_are_distinct() {
    let store = memory_store();
    store
        .import([
            Quad::triple(iri("s"), iri("p"), Term::literal("a")),
            Quad::triple(iri("s"), iri("p"), Term::language_literal("a", "en")),
            Quad::triple(iri("s"), iri("p"), Term::typed_literal("a", format!("{XSD}string"))),
            Quad::triple(iri("s"), iri("p"), iri("a")),
        ])
        .unwrap();

    assert_eq!(store.edge_count().unwrap(), 4);
    let exact = QuadPattern::new().with_object(Term::literal("a"));
    assert_eq!(store.count(&exact).unwrap(), 1);
    let tagged = QuadPattern::new().with_object(Term::language_literal("a", "en"));
    assert_eq!(store.count(&tagged).unwrap(), 1);
}

#[test]
fn test_filter_correctness() {
    let store = memory_store();
    store
        .import((0..10).map(|n| Quad::triple(iri(&format!("s{n}")), iri("v"), integer(n))))
        .unwrap();

    let pattern = QuadPattern::new()
        .with_object_filter(Filter::new(ComparisonTest::Gt, integer(4)))
        .with_object_filter(Filter::new(ComparisonTest::Lt, integer(8)));
    let objects: HashSet<Term> = collect(&store, &pattern)
        .into_iter()
        .map(|quad| quad.object)
        .collect();

    assert_eq!(objects, HashSet::from([integer(5), integer(6), integer(7)]));
    assert_eq!(store.count(&pattern).unwrap(), 3);
}

#[test]
fn test_filter_compares_across_numeric_datatypes() {
    let store = memory_store();
    store
        .import([
            Quad::triple(iri("a"), iri("v"), Term::typed_literal("2.5", format!("{XSD}decimal"))),
            Quad::triple(iri("b"), iri("v"), Term::typed_literal("3", format!("{XSD}int"))),
            Quad::triple(iri("c"), iri("v"), Term::typed_literal("1e1", format!("{XSD}double"))),
            Quad::triple(iri("d"), iri("v"), Term::typed_literal("not a number", format!("{XSD}int"))),
            Quad::triple(iri("e"), iri("v"), Term::literal("5")),
        ])
        .unwrap();

    let gte = QuadPattern::new().with_object_filter(Filter::new(ComparisonTest::Gte, integer(3)));
    let subjects: HashSet<Term> = collect(&store, &gte).into_iter().map(|q| q.subject).collect();
    assert_eq!(subjects, HashSet::from([iri("b"), iri("c")]));

    let neq = QuadPattern::new().with_object_filter(Filter::new(ComparisonTest::Neq, integer(3)));
    assert_eq!(store.count(&neq).unwrap(), 2);
}

#[test]
fn test_date_filter() {
    let store = memory_store();
    let date = |d: &str| Term::typed_literal(d, format!("{XSD}date"));
    store
        .import([
            Quad::triple(iri("a"), iri("on"), date("2020-01-01")),
            Quad::triple(iri("b"), iri("on"), date("2021-06-15")),
            Quad::triple(
                iri("c"),
                iri("on"),
                Term::typed_literal("2022-02-02T10:00:00+02:00", format!("{XSD}dateTime")),
            ),
        ])
        .unwrap();

    let pattern = QuadPattern::new().with_object_filter(Filter::new(ComparisonTest::Gt, date("2021-01-01")));
    assert_eq!(store.count(&pattern).unwrap(), 2);
}

#[test]
fn test_unparseable_comparate() {
    let store = memory_store();
    let pattern = QuadPattern::new().with_object_filter(Filter::new(
        ComparisonTest::Lt,
        Term::typed_literal("soon", format!("{XSD}date")),
    ));
    let err = store.count(&pattern).unwrap_err();
    assert!(matches!(err, Error::UnparseableComparate { ref value, .. } if value == "soon"));
}

#[test]
fn test_delete_graph_only_touches_that_graph() {
    let store = memory_store();
    store
        .import([
            Quad::new(iri("s"), iri("p"), iri("o"), iri("g1")),
            Quad::new(iri("s"), iri("p"), iri("o"), iri("g2")),
            Quad::new(iri("s"), iri("p"), iri("o"), Term::DefaultGraph),
        ])
        .unwrap();

    let summary = store.delete_graph(&iri("g1")).unwrap();
    assert_eq!(summary.rows_deleted, 1);
    assert_eq!(store.count(&QuadPattern::in_graph(iri("g2"))).unwrap(), 1);
    assert_eq!(store.count(&QuadPattern::in_graph(Term::DefaultGraph)).unwrap(), 1);

    store.delete_graph(&Term::DefaultGraph).unwrap();
    assert_eq!(store.edge_count().unwrap(), 1);
}

#[test]
fn test_remove_exact_quads() {
    let store = memory_store();
    let keep = Quad::triple(iri("s"), iri("p"), Term::literal("keep"));
    let drop = Quad::triple(iri("s"), iri("p"), Term::literal("drop"));
    store.import([keep.clone(), drop.clone()]).unwrap();

    let summary = store
        .remove([drop.clone(), Quad::triple(iri("x"), iri("y"), iri("z"))])
        .unwrap();
    assert_eq!(summary.items_received, 2);
    assert_eq!(summary.rows_deleted, 1);
    assert_eq!(collect(&store, &QuadPattern::new()), HashSet::from([keep]));
}

#[test]
fn test_stream_pages_in_id_order() {
    let config = StoreConfig::default().with_stream_page_size(4);
    let store = SqliteQuadStore::in_memory_with_config(config).unwrap();
    store.create_tables().unwrap();
    let quads: Vec<Quad> = (0..10).map(|n| Quad::triple(iri("s"), iri("v"), integer(n))).collect();
    store.import(quads.clone()).unwrap();

    let streamed = store.matches(&QuadPattern::new()).unwrap().try_collect().unwrap();
    assert_eq!(streamed, quads);
}

#[test]
fn test_estimate_equals_exact_below_threshold() {
    let store = memory_store();
    store
        .import((0..40).map(|n| Quad::triple(iri(&format!("s{n}")), iri("p"), integer(n))))
        .unwrap();
    store.analyze().unwrap();

    for pattern in [
        QuadPattern::new(),
        QuadPattern::new().with_predicate(iri("p")),
        QuadPattern::new().with_object_filter(Filter::new(ComparisonTest::Lt, integer(10))),
    ] {
        assert_eq!(
            store.count_estimate(&pattern).unwrap(),
            store.count(&pattern).unwrap()
        );
    }
}

#[test]
fn test_unknown_stored_kind_surfaces_from_stream() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quads.db");
    let store = SqliteQuadStore::open(&path).unwrap();
    store.create_tables().unwrap();
    store
        .import([
            Quad::triple(iri("s"), iri("p"), iri("first")),
            Quad::triple(iri("s"), iri("p"), iri("second")),
        ])
        .unwrap();

    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.pragma_update(None, "ignore_check_constraints", "ON").unwrap();
    raw.execute(
        "UPDATE vertexes SET term_type = 'Quoted' WHERE value = 'http://ex.com/second'",
        [],
    )
    .unwrap();
    drop(raw);

    let mut stream = store.matches(&QuadPattern::new()).unwrap();
    assert!(stream.next().unwrap().is_ok());
    let err = stream.next().unwrap().unwrap_err();
    assert!(matches!(err, Error::UnsupportedTermKind(ref tag) if tag == "Quoted"));
    assert!(stream.next().is_none());
}

#[test]
fn test_drop_tables() {
    let store = memory_store();
    store.import([Quad::triple(iri("s"), iri("p"), iri("o"))]).unwrap();
    store.drop_tables().unwrap();
    assert!(matches!(store.edge_count(), Err(Error::OperationFailed { .. })));
    store.create_tables().unwrap();
    assert_eq!(store.edge_count().unwrap(), 0);
}

#[test]
fn test_empty_annotation_matches_simple_literal() {
    let store = memory_store();
    let simple = Quad::triple(iri("s"), iri("p"), Term::literal("x"));
    let empty_tag = Quad::triple(iri("s"), iri("p"), Term::language_literal("x", ""));
    store.import([simple.clone(), empty_tag.clone()]).unwrap();

    assert_eq!(store.edge_count().unwrap(), 1);
    assert_eq!(store.count(&QuadPattern::exact(&empty_tag)).unwrap(), 1);
    assert_eq!(collect(&store, &QuadPattern::new()), HashSet::from([simple]));

    let line = r#"{"subject":{"termType":"NamedNode","value":"http://ex.com/s"},"predicate":{"termType":"NamedNode","value":"http://ex.com/p"},"object":{"termType":"Literal","value":"x","language":""}}"#;
    assert!(serde_json::from_str::<Quad>(line).is_err());
}
