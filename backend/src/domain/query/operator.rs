//! Operator families and per-family condition compilation.
//!
//! Resolution tries comparison, collection, null and text operators in that
//! order; text operators are only considered for textual fields.

use thiserror::Error;

use super::{CompareOp, Condition, Predicate, TextOp};
use crate::domain::schema::{EntityDescriptor, SchemaError};

/// Operator family; each has its own arity and coercion rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorFamily {
    /// Single typed operand.
    Comparison,
    /// One or more raw operands.
    Collection,
    /// No operands.
    Null,
    /// Single operand matched case-insensitively.
    Text,
}

/// Resolved operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`, `!=`, `>`, `>=`, `<`, `<=`.
    Compare(CompareOp),
    /// `in` or, when negated, `not_in`.
    Collection {
        /// `not_in`.
        negated: bool,
    },
    /// `not_set` or, when `set`, `is_set`.
    Null {
        /// `is_set`.
        set: bool,
    },
    /// Text match with optional `!` negation.
    Text {
        /// Match kind.
        op: TextOp,
        /// Negated symbol.
        negated: bool,
    },
}

/// Errors raised while compiling one condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    /// No family recognises the operator for this field.
    #[error("invalid operator '{operator}' in condition '{condition}'")]
    InvalidOperator {
        /// Operator text.
        operator: String,
        /// Rendered condition.
        condition: String,
    },
    /// Wrong number of operands for the operator family.
    #[error("operator '{operator}' expects {expected} but condition '{condition}' has {actual}")]
    Arity {
        /// Operator text.
        operator: String,
        /// Human-readable expected arity.
        expected: &'static str,
        /// Operands supplied.
        actual: usize,
        /// Rendered condition.
        condition: String,
    },
    /// Field lookup or coercion failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

fn compare_from_symbol(symbol: &str) -> Option<CompareOp> {
    match symbol {
        "=" => Some(CompareOp::Eq),
        "!=" => Some(CompareOp::Ne),
        ">" => Some(CompareOp::Gt),
        ">=" => Some(CompareOp::Gte),
        "<" => Some(CompareOp::Lt),
        "<=" => Some(CompareOp::Lte),
        _ => None,
    }
}

fn collection_from_symbol(symbol: &str) -> Option<bool> {
    match symbol {
        "in" => Some(false),
        "not_in" => Some(true),
        _ => None,
    }
}

fn null_from_symbol(symbol: &str) -> Option<bool> {
    match symbol {
        "is_set" => Some(true),
        "not_set" => Some(false),
        _ => None,
    }
}

fn text_from_symbol(symbol: &str) -> Option<(TextOp, bool)> {
    let (negated, base) = match symbol.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, symbol),
    };
    let op = match base {
        "contains" | "~" => TextOp::Contains,
        "startswith" | "^" => TextOp::StartsWith,
        "endswith" | "$" => TextOp::EndsWith,
        _ => return None,
    };
    Some((op, negated))
}

impl Operator {
    /// Resolve `symbol` for a field, trying each family in dispatch order.
    ///
    /// ```
    /// use entity_backend::domain::query::{Operator, OperatorFamily};
    ///
    /// let op = Operator::resolve("^", true).expect("text operator on text field");
    /// assert_eq!(op.family(), OperatorFamily::Text);
    /// assert!(Operator::resolve("^", false).is_none());
    /// ```
    #[must_use]
    pub fn resolve(symbol: &str, textual: bool) -> Option<Self> {
        compare_from_symbol(symbol)
            .map(Self::Compare)
            .or_else(|| collection_from_symbol(symbol).map(|negated| Self::Collection { negated }))
            .or_else(|| null_from_symbol(symbol).map(|set| Self::Null { set }))
            .or_else(|| {
                textual
                    .then(|| text_from_symbol(symbol))
                    .flatten()
                    .map(|(op, negated)| Self::Text { op, negated })
            })
    }

    /// Family of this operator.
    #[must_use]
    pub fn family(self) -> OperatorFamily {
        match self {
            Self::Compare(_) => OperatorFamily::Comparison,
            Self::Collection { .. } => OperatorFamily::Collection,
            Self::Null { .. } => OperatorFamily::Null,
            Self::Text { .. } => OperatorFamily::Text,
        }
    }
}

fn arity_error(
    condition: &Condition,
    operator: &str,
    expected: &'static str,
    actual: usize,
) -> ConditionError {
    ConditionError::Arity {
        operator: operator.to_owned(),
        expected,
        actual,
        condition: condition.to_string(),
    }
}

/// Compile `field operator values...` against `descriptor`.
///
/// `field` is the last segment of the condition path; `condition` is only
/// used to render diagnostics.
///
/// # Errors
///
/// Returns [`ConditionError`] for unknown fields, unknown operators, wrong
/// arity and failed coercion.
pub fn compile_condition(
    descriptor: &EntityDescriptor,
    field: &str,
    condition: &Condition,
) -> Result<Predicate, ConditionError> {
    let field_type = descriptor.field_type(field)?;
    let symbol = condition.operator().unwrap_or_default();
    let values = condition.values();
    let operator = Operator::resolve(symbol, field_type.is_textual()).ok_or_else(|| {
        ConditionError::InvalidOperator {
            operator: symbol.to_owned(),
            condition: condition.to_string(),
        }
    })?;

    match operator {
        Operator::Compare(op) => {
            let [raw] = values else {
                return Err(arity_error(condition, symbol, "exactly one value", values.len()));
            };
            let value = descriptor.match_field_type(field, raw)?;
            Ok(Predicate::compare(field, op, value))
        }
        Operator::Collection { negated } => {
            if values.is_empty() {
                return Err(arity_error(condition, symbol, "at least one value", 0));
            }
            let membership = Predicate::one_of(field, values.to_vec());
            Ok(if negated { Predicate::negate(membership) } else { membership })
        }
        Operator::Null { set } => {
            if !values.is_empty() {
                return Err(arity_error(condition, symbol, "no values", values.len()));
            }
            let null = Predicate::is_null(field);
            Ok(if set { Predicate::negate(null) } else { null })
        }
        Operator::Text { op, negated } => {
            let [needle] = values else {
                return Err(arity_error(condition, symbol, "exactly one value", values.len()));
            };
            let matched = Predicate::text(field, op, needle.as_str());
            Ok(if negated { Predicate::negate(matched) } else { matched })
        }
    }
}
