//! Wire format of the search-graph DSL.
//!
//! ```json
//! {
//!   "or": [
//!     { "if": ["age", ">", 30] },
//!     { "and": [ { "if": ["company.name", "^", "Acme"] }, { "if": ["email", "is_set"] } ] }
//!   ],
//!   "order": [ { "field": "name", "dir": "asc" } ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One `[field, operator, ...values]` tuple.
///
/// Wire parts may be strings, numbers or booleans; scalars are stringified
/// and `null` becomes an empty part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<JsonValue>", into = "Vec<String>")]
pub struct Condition {
    parts: Vec<String>,
}

impl Condition {
    /// Build a condition from textual parts.
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Every part in order.
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Field path, the first part.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.parts.first().map(String::as_str)
    }

    /// Operator, the second part.
    #[must_use]
    pub fn operator(&self) -> Option<&str> {
        self.parts.get(1).map(String::as_str)
    }

    /// Operand values after the operator.
    #[must_use]
    pub fn values(&self) -> &[String] {
        self.parts.get(2..).unwrap_or_default()
    }
}

impl From<Vec<JsonValue>> for Condition {
    fn from(parts: Vec<JsonValue>) -> Self {
        Self {
            parts: parts
                .into_iter()
                .map(|part| match part {
                    JsonValue::Null => String::new(),
                    JsonValue::String(text) => text,
                    other => other.to_string(),
                })
                .collect(),
        }
    }
}

impl From<Condition> for Vec<String> {
    fn from(condition: Condition) -> Self {
        condition.parts
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join(" "))
    }
}

/// One node of the boolean tree.
///
/// Exactly one of `if`, `and` and `or` may be populated; a node with none
/// matches everything. Any other key is kept in `unknown` so the compiler can
/// reject it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchNode {
    /// Leaf condition.
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Conjunction of child nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<SearchNode>>,
    /// Disjunction of child nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<SearchNode>>,
    /// Keys outside the DSL.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, JsonValue>,
}

impl SearchNode {
    /// Leaf node holding `condition`.
    #[must_use]
    pub fn condition(condition: Condition) -> Self {
        Self {
            condition: Some(condition),
            ..Self::default()
        }
    }

    /// Conjunction node.
    #[must_use]
    pub fn and(children: Vec<SearchNode>) -> Self {
        Self {
            and: Some(children),
            ..Self::default()
        }
    }

    /// Disjunction node.
    #[must_use]
    pub fn or(children: Vec<SearchNode>) -> Self {
        Self {
            or: Some(children),
            ..Self::default()
        }
    }

    /// Number of populated keys.
    #[must_use]
    pub fn populated_keys(&self) -> usize {
        usize::from(self.condition.is_some())
            + usize::from(self.and.is_some())
            + usize::from(self.or.is_some())
    }
}

/// Requested sort clause before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOrder {
    /// Field to sort by.
    pub field: String,
    /// `asc` or `desc`.
    pub dir: String,
}

impl SearchOrder {
    /// Build a clause.
    pub fn new(field: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: dir.into(),
        }
    }
}

/// Root of a search request: a node plus ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchGraph {
    /// Root boolean node.
    #[serde(flatten)]
    pub root: SearchNode,
    /// Sort clauses applied in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<SearchOrder>,
}

impl SearchGraph {
    /// Graph over `root` with no ordering.
    #[must_use]
    pub fn new(root: SearchNode) -> Self {
        Self {
            root,
            order: Vec::new(),
        }
    }

    /// Append a sort clause.
    #[must_use]
    pub fn with_order(mut self, order: SearchOrder) -> Self {
        self.order.push(order);
        self
    }

    /// Parse the JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] for malformed documents.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
