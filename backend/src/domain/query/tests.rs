//! Regression coverage for operator dispatch and graph compilation.

use insta::assert_snapshot;
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::domain::schema::{EntityDescriptor, EntityRegistry, FieldType, Value};
use crate::domain::{ENTITY_KEY, ORDER_KEY, SEARCH_KEY};

#[fixture]
fn registry() -> EntityRegistry {
    let mut builder = EntityRegistry::builder();
    builder
        .register(
            EntityDescriptor::builder("contact")
                .field("name", FieldType::String)
                .field("email", FieldType::String)
                .field("age", FieldType::Int)
                .field("score", FieldType::Float)
                .field("active", FieldType::Bool)
                .field(
                    "status",
                    FieldType::Enum(vec!["active".to_owned(), "pending".to_owned()]),
                )
                .edge("company", "company")
                .build(),
        )
        .and_then(|b| {
            b.register(
                EntityDescriptor::builder("company")
                    .field("name", FieldType::String)
                    .field("size", FieldType::Int)
                    .edge("parent", "company")
                    .build(),
            )
        })
        .expect("fixture descriptors register");
    builder.build().expect("fixture edges resolve")
}

#[fixture]
fn compiler(registry: EntityRegistry) -> SearchCompiler {
    SearchCompiler::new(registry)
}

fn graph(value: serde_json::Value) -> SearchGraph {
    serde_json::from_value(value).expect("graph fixture is valid")
}

fn compile_ok(compiler: &SearchCompiler, value: serde_json::Value) -> Predicate {
    let compiled = compiler.compile(&graph(value), "contact");
    assert!(compiled.errors.is_empty(), "unexpected errors: {}", compiled.errors);
    compiled.predicate.expect("valid graph yields a predicate")
}

#[rstest]
fn comparison_coerces_to_the_field_type(compiler: SearchCompiler) {
    let predicate = compile_ok(&compiler, json!({ "if": ["age", ">", "30"] }));
    assert_eq!(predicate, Predicate::compare("age", CompareOp::Gt, Value::Int(30)));
    assert_snapshot!(predicate.to_string(), @"age > 30");
}

#[rstest]
fn numeric_wire_parts_are_stringified(compiler: SearchCompiler) {
    let predicate = compile_ok(&compiler, json!({ "if": ["age", ">=", 30] }));
    assert_snapshot!(predicate.to_string(), @"age >= 30");
}

#[rstest]
fn collection_keeps_raw_values(compiler: SearchCompiler) {
    let predicate = compile_ok(&compiler, json!({ "if": ["status", "in", "active", "pending"] }));
    assert_eq!(
        predicate,
        Predicate::one_of("status", vec!["active".to_owned(), "pending".to_owned()])
    );
    assert_snapshot!(predicate.to_string(), @"status IN ('active', 'pending')");
}

#[rstest]
fn negated_collection_renders_not_in(compiler: SearchCompiler) {
    let predicate = compile_ok(&compiler, json!({ "if": ["age", "not_in", "1", "2"] }));
    assert_snapshot!(predicate.to_string(), @"age NOT IN ('1', '2')");
}

#[rstest]
#[case("is_set", "email IS NOT NULL")]
#[case("not_set", "email IS NULL")]
fn null_checks_take_no_values(compiler: SearchCompiler, #[case] op: &str, #[case] expected: &str) {
    let predicate = compile_ok(&compiler, json!({ "if": ["email", op] }));
    assert_eq!(predicate.to_string(), expected);
}

#[rstest]
#[case("contains", "name ILIKE '%ac%'")]
#[case("~", "name ILIKE '%ac%'")]
#[case("!~", "name NOT ILIKE '%ac%'")]
#[case("startswith", "name ILIKE 'ac%'")]
#[case("!^", "name NOT ILIKE 'ac%'")]
#[case("$", "name ILIKE '%ac'")]
#[case("!endswith", "name NOT ILIKE '%ac'")]
fn text_operators_and_aliases(compiler: SearchCompiler, #[case] op: &str, #[case] expected: &str) {
    let predicate = compile_ok(&compiler, json!({ "if": ["name", op, "ac"] }));
    assert_eq!(predicate.to_string(), expected);
}

#[rstest]
#[case("age")]
#[case("score")]
#[case("active")]
#[case("status")]
fn text_operators_on_non_textual_fields_are_rejected(
    compiler: SearchCompiler,
    #[case] field: &str,
) {
    let compiled = compiler.compile(&graph(json!({ "if": [field, "~", "1"] })), "contact");
    assert!(compiled.predicate.is_none());
    let messages = compiled.errors.get(field).expect("error keyed by field");
    assert_eq!(
        messages,
        [format!("invalid operator '~' in condition '{field} ~ 1'")].as_slice()
    );
}

#[rstest]
#[case(json!({ "if": ["age", ">", "1", "2"] }), "expects exactly one value")]
#[case(json!({ "if": ["age", "in"] }), "expects at least one value")]
#[case(json!({ "if": ["email", "is_set", "x"] }), "expects no values")]
#[case(json!({ "if": ["name", "^"] }), "expects exactly one value")]
#[case(json!({ "if": ["age", "=", "old"] }), "is not a valid int")]
#[case(
    json!({ "if": ["nickname", "=", "x"] }),
    "field 'nickname' does not exist on entity 'contact'"
)]
fn condition_errors_are_keyed_by_field(
    compiler: SearchCompiler,
    #[case] value: serde_json::Value,
    #[case] fragment: &str,
) {
    let compiled = compiler.compile(&graph(value), "contact");
    assert_eq!(compiled.errors.len(), 1);
    let (_, messages) = compiled.errors.iter().next().expect("one error");
    assert!(messages.iter().any(|m| m.contains(fragment)), "{messages:?}");
}

#[rstest]
#[case(json!({ "if": ["age"] }), SEARCH_KEY)]
#[case(json!({ "if": ["", "=", "1"] }), SEARCH_KEY)]
#[case(json!({ "if": ["age", "=", null] }), "age")]
#[case(json!({ "if": ["age", "", "1"] }), "age")]
fn malformed_conditions_fail_shape_checks(
    compiler: SearchCompiler,
    #[case] value: serde_json::Value,
    #[case] key: &str,
) {
    let compiled = compiler.compile(&graph(value), "contact");
    assert!(compiled.predicate.is_none());
    assert!(compiled.errors.contains_key(key), "{}", compiled.errors);
}

#[rstest]
fn dotted_paths_traverse_edges(compiler: SearchCompiler) {
    let predicate = compile_ok(&compiler, json!({ "if": ["company.name", "^", "Acme"] }));
    assert_snapshot!(predicate.to_string(), @"EXISTS company WHERE name ILIKE 'Acme%'");
}

#[rstest]
fn dotted_paths_recurse_to_any_depth(compiler: SearchCompiler) {
    let predicate = compile_ok(
        &compiler,
        json!({ "if": ["company.parent.parent.size", ">", "10"] }),
    );
    assert_snapshot!(
        predicate.to_string(),
        @"EXISTS company WHERE EXISTS parent WHERE EXISTS parent WHERE size > 10"
    );
}

#[rstest]
fn unknown_edges_are_unrecognized_relationships(compiler: SearchCompiler) {
    let compiled = compiler.compile(&graph(json!({ "if": ["team.name", "=", "x"] })), "contact");
    assert_eq!(
        compiled.errors.get("team.name"),
        Some(["unrecognized relationship 'team' on entity 'contact'".to_owned()].as_slice())
    );
}

#[rstest]
fn and_joins_children(compiler: SearchCompiler) {
    let value = json!({ "and": [ { "if": ["age", "=", "1"] }, { "if": ["score", "=", "2"] } ] });
    assert_snapshot!(compile_ok(&compiler, value).to_string(), @"age = 1 AND score = 2");
}

#[rstest]
fn nested_groups_are_parenthesised(compiler: SearchCompiler) {
    let value = json!({
        "or": [
            { "if": ["active", "=", "true"] },
            { "and": [ { "if": ["age", "<", "18"] }, { "if": ["email", "not_set"] } ] }
        ]
    });
    assert_snapshot!(
        compile_ok(&compiler, value).to_string(),
        @"active = true OR (age < 18 AND email IS NULL)"
    );
}

#[rstest]
#[case(json!({}))]
#[case(json!({ "and": [] }))]
#[case(json!({ "or": [] }))]
fn empty_nodes_match_everything(compiler: SearchCompiler, #[case] value: serde_json::Value) {
    let compiled = compiler.compile(&graph(value), "contact");
    assert_eq!(compiled.predicate, Some(Predicate::MatchAll));
    assert!(compiled.order.is_empty());
    assert!(compiled.is_valid());
}

#[rstest]
fn child_errors_accumulate(compiler: SearchCompiler) {
    let value = json!({
        "and": [
            { "if": ["age", "=", "old"] },
            { "if": ["name", "=", "ok"] },
            { "or": [ { "if": ["score", "~", "x"] } ] }
        ]
    });
    let compiled = compiler.compile(&graph(value), "contact");
    assert!(compiled.predicate.is_none());
    assert_eq!(compiled.errors.len(), 2);
    assert!(compiled.errors.contains_key("age"));
    assert!(compiled.errors.contains_key("score"));
}

#[rstest]
fn nodes_with_several_keys_are_rejected(compiler: SearchCompiler) {
    let value = json!({ "if": ["age", "=", "1"], "and": [ { "if": ["age", "=", "2"] } ] });
    let compiled = compiler.compile(&graph(value), "contact");
    assert!(compiled.predicate.is_none());
    assert!(compiled.errors.contains_key(SEARCH_KEY));
}

#[rstest]
#[case(json!({ "iff": ["age", ">", "30"] }), "iff")]
#[case(json!({ "and": [ { "if": ["age", ">", "30"] }, { "orr": [] } ] }), "orr")]
fn unknown_node_keys_are_rejected(
    compiler: SearchCompiler,
    #[case] value: serde_json::Value,
    #[case] key: &str,
) {
    let compiled = compiler.compile(&graph(value), "contact");
    assert!(compiled.predicate.is_none());
    assert_eq!(
        compiled.errors.get(SEARCH_KEY),
        Some([format!("unknown search node key '{key}'")].as_slice())
    );
}

#[rstest]
fn unregistered_entities_yield_exactly_one_error(compiler: SearchCompiler) {
    let value = json!({ "if": ["age", "=", "1"], "order": [ { "field": "age", "dir": "up" } ] });
    let compiled = compiler.compile(&graph(value), "invoice");
    assert!(compiled.predicate.is_none());
    assert_eq!(compiled.errors.len(), 1);
    assert_eq!(
        compiled.errors.get(ENTITY_KEY),
        Some(["entity 'invoice' is not registered".to_owned()].as_slice())
    );
}

#[rstest]
fn order_clauses_are_validated_independently(compiler: SearchCompiler) {
    let value = json!({
        "order": [
            { "field": "name", "dir": "asc" },
            { "field": "age", "dir": "sideways" },
            { "field": "nickname", "dir": "desc" },
            { "field": "score", "dir": "desc" }
        ]
    });
    let compiled = compiler.compile(&graph(value), "contact");
    assert_eq!(compiled.errors.get(ORDER_KEY).map(<[String]>::len), Some(2));
    let rendered: Vec<String> = compiled.order.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, ["name ASC", "score DESC"]);
    assert!(compiled.predicate.is_none());
}

#[rstest]
fn valid_order_clauses_accompany_the_predicate(compiler: SearchCompiler) {
    let graph = SearchGraph::new(SearchNode::condition(Condition::new(["age", ">", "30"])))
        .with_order(SearchOrder::new("age", "desc"));
    let (predicate, order) = compiler
        .compile(&graph, "contact")
        .into_result()
        .expect("valid graph");
    assert_eq!(predicate.to_string(), "age > 30");
    assert_eq!(order, vec![OrderOption::new("age", SortDirection::Desc)]);
}

#[rstest]
fn compilation_is_deterministic(compiler: SearchCompiler) {
    let value = json!({
        "or": [ { "if": ["company.name", "~", "acme"] }, { "if": ["status", "in", "active"] } ]
    });
    let first = compiler.compile(&graph(value.clone()), "contact");
    let second = compiler.compile(&graph(value), "contact");
    assert_eq!(first, second);
}

#[rstest]
fn graphs_round_trip_through_json() {
    let graph = SearchGraph::new(SearchNode::or(vec![
        SearchNode::condition(Condition::new(["age", ">", "30"])),
        SearchNode::and(vec![]),
    ]))
    .with_order(SearchOrder::new("name", "asc"));
    let value = serde_json::to_value(&graph).expect("serialize graph");
    assert_eq!(
        value,
        json!({
            "or": [ { "if": ["age", ">", "30"] }, { "and": [] } ],
            "order": [ { "field": "name", "dir": "asc" } ]
        })
    );
}

#[rstest]
#[case("=", Some(OperatorFamily::Comparison))]
#[case("not_in", Some(OperatorFamily::Collection))]
#[case("is_set", Some(OperatorFamily::Null))]
#[case("!contains", Some(OperatorFamily::Text))]
#[case("like", None)]
fn operators_resolve_in_family_order(#[case] symbol: &str, #[case] family: Option<OperatorFamily>) {
    assert_eq!(Operator::resolve(symbol, true).map(Operator::family), family);
}
