//! Behaviour tests for search graph compilation.
//!
//! These scenarios compile named JSON graphs against the contact catalogue
//! and check the resulting predicate or the accumulated errors.

use std::cell::RefCell;

use entity_backend::domain::query::{CompiledSearch, SearchCompiler, SearchGraph};
use entity_backend::test_support::contact_registry;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

struct SearchWorld {
    compiler: RefCell<Option<SearchCompiler>>,
    outcome: RefCell<Option<CompiledSearch>>,
}

impl SearchWorld {
    fn new() -> Self {
        Self {
            compiler: RefCell::new(None),
            outcome: RefCell::new(None),
        }
    }

    fn with_outcome<F>(&self, f: F)
    where
        F: FnOnce(&CompiledSearch),
    {
        let outcome = self.outcome.borrow();
        f(outcome.as_ref().expect("graph should have been compiled"));
    }
}

fn named_graph(name: &str) -> &'static str {
    match name {
        "related" => r#"{"if": ["company.size", ">=", 10]}"#,
        "broken" => {
            r#"{
                "and": [
                    {"if": ["height", "=", 180]},
                    {"if": ["owner.name", "=", "Ada"]},
                    {"if": ["age", ">", "old"]}
                ],
                "order": [{"field": "name", "dir": "sideways"}]
            }"#
        }
        other => panic!("unknown graph fixture: {other}"),
    }
}

#[fixture]
fn world() -> SearchWorld {
    SearchWorld::new()
}

#[given("the contact catalogue")]
fn the_contact_catalogue(world: &SearchWorld) {
    let registry = contact_registry().expect("contact catalogue should build");
    *world.compiler.borrow_mut() = Some(SearchCompiler::new(registry));
}

#[when("the {name} graph is compiled for {entity}")]
fn the_graph_is_compiled(world: &SearchWorld, name: String, entity: String) {
    let graph = SearchGraph::parse(named_graph(&name)).expect("graph fixture should parse");
    let compiled = world
        .compiler
        .borrow()
        .as_ref()
        .expect("catalogue should be loaded")
        .compile(&graph, &entity);
    *world.outcome.borrow_mut() = Some(compiled);
}

#[then("a predicate is produced")]
fn a_predicate_is_produced(world: &SearchWorld) {
    world.with_outcome(|outcome| assert!(outcome.predicate.is_some()));
}

#[then("no predicate is produced")]
fn no_predicate_is_produced(world: &SearchWorld) {
    world.with_outcome(|outcome| assert!(outcome.predicate.is_none()));
}

#[then("the predicate is {expected}")]
fn the_predicate_is(world: &SearchWorld, expected: String) {
    world.with_outcome(|outcome| {
        let rendered = outcome.predicate.as_ref().map(ToString::to_string);
        assert_eq!(rendered.as_deref(), Some(expected.as_str()));
    });
}

#[then("no errors are reported")]
fn no_errors_are_reported(world: &SearchWorld) {
    world.with_outcome(|outcome| assert!(outcome.errors.is_empty(), "{:?}", outcome.errors));
}

#[then("an error is reported for {key}")]
fn an_error_is_reported_for(world: &SearchWorld, key: String) {
    world.with_outcome(|outcome| {
        assert!(
            outcome.errors.contains_key(&key),
            "expected an error under {key}: {:?}",
            outcome.errors
        );
    });
}

#[scenario(
    path = "tests/features/search_graph.feature",
    name = "A relationship filter compiles to a predicate"
)]
fn a_relationship_filter_compiles(world: SearchWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/search_graph.feature",
    name = "Every invalid leaf is reported"
)]
fn every_invalid_leaf_is_reported(world: SearchWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/search_graph.feature",
    name = "An unregistered entity is rejected"
)]
fn an_unregistered_entity_is_rejected(world: SearchWorld) {
    drop(world);
}
