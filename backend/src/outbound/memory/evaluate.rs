//! Predicate and order evaluation over serialized records.
//!
//! Records are inspected as JSON objects. Edges resolve to the nested object
//! (or array of objects) stored under the edge name. Missing and `null`
//! fields never satisfy comparison, text or membership tests.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::domain::query::{OrderOption, Predicate, SortDirection};
use crate::domain::schema::Value;

/// Whether `document` satisfies `predicate`.
pub(super) fn matches(predicate: &Predicate, document: &JsonValue) -> bool {
    match predicate {
        Predicate::MatchAll => true,
        Predicate::Compare { field, op, value } => present(document, field)
            .and_then(|actual| compare_value(actual, value))
            .is_some_and(|ordering| op.holds(ordering)),
        Predicate::Text { field, op, needle } => present(document, field)
            .and_then(JsonValue::as_str)
            .is_some_and(|text| op.matches(text, needle)),
        Predicate::In { field, values } => present(document, field)
            .and_then(scalar_text)
            .is_some_and(|text| values.iter().any(|value| *value == text)),
        Predicate::IsNull { field } => present(document, field).is_none(),
        Predicate::Related { edge, inner, .. } => match document.get(edge) {
            Some(JsonValue::Array(rows)) => rows.iter().any(|row| matches(inner, row)),
            Some(row @ JsonValue::Object(_)) => matches(inner, row),
            _ => false,
        },
        Predicate::And(children) => children.iter().all(|child| matches(child, document)),
        Predicate::Or(children) => children.iter().any(|child| matches(child, document)),
        Predicate::Not(inner) => !matches(inner, document),
    }
}

/// Whether every `field = value` criterion holds, comparing scalar text.
pub(super) fn matches_criteria<'a>(
    document: &JsonValue,
    mut criteria: impl Iterator<Item = (&'a String, &'a String)>,
) -> bool {
    criteria.all(|(field, expected)| {
        present(document, field)
            .and_then(scalar_text)
            .is_some_and(|actual| actual == *expected)
    })
}

/// Total order over two documents for the given sort clauses.
pub(super) fn compare_documents(a: &JsonValue, b: &JsonValue, order: &[OrderOption]) -> Ordering {
    order
        .iter()
        .map(|clause| {
            let ordering = compare_fields(present(a, &clause.field), present(b, &clause.field));
            match clause.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn present<'a>(document: &'a JsonValue, field: &str) -> Option<&'a JsonValue> {
    document.get(field).filter(|value| !value.is_null())
}

fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Number(number) => Some(number.to_string()),
        JsonValue::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn compare_value(actual: &JsonValue, expected: &Value) -> Option<Ordering> {
    match expected {
        Value::Int(number) => actual.as_i64().map(|found| found.cmp(number)),
        Value::Float(number) => actual.as_f64().and_then(|found| found.partial_cmp(number)),
        Value::Bool(flag) => actual.as_bool().map(|found| found.cmp(flag)),
        Value::String(text) | Value::Enum(text) => {
            actual.as_str().map(|found| found.cmp(text.as_str()))
        }
        Value::Time(at) => actual
            .as_str()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|found| found.with_timezone(&Utc).cmp(at)),
    }
}

/// Nulls sort first; values of different JSON kinds compare equal.
fn compare_fields(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        (Some(JsonValue::Bool(x)), Some(JsonValue::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::query::{CompareOp, TextOp};
    use rstest::rstest;
    use serde_json::json;

    fn ada() -> JsonValue {
        json!({
            "name": "Ada",
            "age": 36,
            "email": null,
            "joined": "2024-03-01T00:00:00Z",
            "company": { "name": "Acme Analytical", "size": 12 }
        })
    }

    #[rstest]
    #[case(Predicate::compare("age", CompareOp::Gte, Value::Int(36)), true)]
    #[case(Predicate::compare("age", CompareOp::Lt, Value::Int(36)), false)]
    #[case(Predicate::compare("email", CompareOp::Ne, Value::String("x".to_owned())), false)]
    #[case(Predicate::text("name", TextOp::StartsWith, "aD"), true)]
    #[case(Predicate::one_of("age", vec!["35".to_owned(), "36".to_owned()]), true)]
    #[case(Predicate::is_null("email"), true)]
    #[case(Predicate::is_null("missing"), true)]
    #[case(Predicate::negate(Predicate::is_null("name")), true)]
    #[case(
        Predicate::related("company", "company", Predicate::text("name", TextOp::Contains, "acme")),
        true
    )]
    #[case(Predicate::related("manager", "contact", Predicate::MatchAll), false)]
    fn evaluates_predicates(#[case] predicate: Predicate, #[case] expected: bool) {
        assert_eq!(matches(&predicate, &ada()), expected, "{predicate}");
    }

    #[rstest]
    fn compares_timestamps_in_utc() {
        let cutoff = DateTime::parse_from_rfc3339("2024-02-29T23:00:00-02:00")
            .map(|at| at.with_timezone(&Utc))
            .expect("valid timestamp");
        let predicate = Predicate::compare("joined", CompareOp::Lt, Value::Time(cutoff));
        assert!(matches(&predicate, &ada()));
    }

    #[rstest]
    fn sorts_nulls_first_then_by_later_clauses() {
        let order = [
            OrderOption::new("email", SortDirection::Asc),
            OrderOption::new("age", SortDirection::Desc),
        ];
        let with_email = json!({ "email": "a@x.test", "age": 50 });
        let older = json!({ "email": null, "age": 60 });
        let younger = json!({ "age": 20 });

        assert_eq!(compare_documents(&older, &with_email, &order), Ordering::Less);
        assert_eq!(compare_documents(&older, &younger, &order), Ordering::Less);
    }
}
