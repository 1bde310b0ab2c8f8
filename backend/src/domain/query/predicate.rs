//! Storage-neutral predicate tree and order clauses.

use std::cmp::Ordering;
use std::fmt;

use crate::domain::schema::{write_quoted, Value};

/// Comparison operators applied to coerced values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
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
    /// Wire symbol for the operator.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    /// Whether `ordering` of actual against expected satisfies the operator.
    #[must_use]
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering.is_eq(),
            Self::Ne => ordering.is_ne(),
            Self::Gt => ordering.is_gt(),
            Self::Gte => ordering.is_ge(),
            Self::Lt => ordering.is_lt(),
            Self::Lte => ordering.is_le(),
        }
    }
}

/// Case-insensitive text match kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextOp {
    /// Needle appears anywhere.
    Contains,
    /// Text begins with the needle.
    StartsWith,
    /// Text ends with the needle.
    EndsWith,
}

impl TextOp {
    /// `LIKE` pattern for `needle`.
    #[must_use]
    pub fn pattern(self, needle: &str) -> String {
        match self {
            Self::Contains => format!("%{needle}%"),
            Self::StartsWith => format!("{needle}%"),
            Self::EndsWith => format!("%{needle}"),
        }
    }

    /// Evaluate the match against `haystack`, ignoring case.
    #[must_use]
    pub fn matches(self, haystack: &str, needle: &str) -> bool {
        let haystack = haystack.to_lowercase();
        let needle = needle.to_lowercase();
        match self {
            Self::Contains => haystack.contains(&needle),
            Self::StartsWith => haystack.starts_with(&needle),
            Self::EndsWith => haystack.ends_with(&needle),
        }
    }
}

/// Compiled boolean filter consumed by repository adapters.
///
/// Renders to a SQL-like text form for logs and diagnostics.
///
/// # Examples
/// ```
/// use entity_backend::domain::query::{CompareOp, Predicate};
/// use entity_backend::domain::schema::Value;
///
/// let predicate = Predicate::all(vec![
///     Predicate::compare("x", CompareOp::Eq, Value::Int(1)),
///     Predicate::compare("y", CompareOp::Eq, Value::Int(2)),
/// ]);
/// assert_eq!(predicate.to_string(), "x = 1 AND y = 2");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row.
    MatchAll,
    /// Field compared with a typed value.
    Compare {
        /// Field name.
        field: String,
        /// Comparison operator.
        op: CompareOp,
        /// Coerced operand.
        value: Value,
    },
    /// Case-insensitive text match.
    Text {
        /// Field name.
        field: String,
        /// Match kind.
        op: TextOp,
        /// Raw needle.
        needle: String,
    },
    /// Field value is one of the listed raw texts.
    In {
        /// Field name.
        field: String,
        /// Accepted values.
        values: Vec<String>,
    },
    /// Field holds no value.
    IsNull {
        /// Field name.
        field: String,
    },
    /// A related row reached through `edge` matches `inner`.
    Related {
        /// Edge name on the source entity.
        edge: String,
        /// Target entity name.
        target: String,
        /// Predicate over the target entity.
        inner: Box<Predicate>,
    },
    /// Every child matches.
    And(Vec<Predicate>),
    /// At least one child matches.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Comparison predicate.
    pub fn compare(field: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value,
        }
    }

    /// Text match predicate.
    pub fn text(field: impl Into<String>, op: TextOp, needle: impl Into<String>) -> Self {
        Self::Text {
            field: field.into(),
            op,
            needle: needle.into(),
        }
    }

    /// Membership predicate.
    pub fn one_of(field: impl Into<String>, values: Vec<String>) -> Self {
        Self::In {
            field: field.into(),
            values,
        }
    }

    /// Null check.
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull {
            field: field.into(),
        }
    }

    /// Related-row existence predicate.
    pub fn related(edge: impl Into<String>, target: impl Into<String>, inner: Predicate) -> Self {
        Self::Related {
            edge: edge.into(),
            target: target.into(),
            inner: Box::new(inner),
        }
    }

    /// Negate a predicate.
    #[must_use]
    pub fn negate(inner: Predicate) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Conjunction. No children matches everything; one child is returned
    /// unchanged.
    #[must_use]
    pub fn all(mut children: Vec<Predicate>) -> Self {
        match children.len() {
            0 => Self::MatchAll,
            1 => children.pop().unwrap_or(Self::MatchAll),
            _ => Self::And(children),
        }
    }

    /// Disjunction. No children matches everything; one child is returned
    /// unchanged.
    #[must_use]
    pub fn any(mut children: Vec<Predicate>) -> Self {
        match children.len() {
            0 => Self::MatchAll,
            1 => children.pop().unwrap_or(Self::MatchAll),
            _ => Self::Or(children),
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Self::And(_) | Self::Or(_))
    }
}

fn write_nested(f: &mut fmt::Formatter<'_>, predicate: &Predicate) -> fmt::Result {
    if predicate.is_compound() {
        write!(f, "({predicate})")
    } else {
        write!(f, "{predicate}")
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    children: &[Predicate],
    separator: &str,
) -> fmt::Result {
    for (index, child) in children.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }
        write_nested(f, child)?;
    }
    Ok(())
}

fn write_values(f: &mut fmt::Formatter<'_>, values: &[String]) -> fmt::Result {
    f.write_str("(")?;
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write_quoted(f, value)?;
    }
    f.write_str(")")
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchAll => f.write_str("TRUE"),
            Self::Compare { field, op, value } => write!(f, "{field} {} {value}", op.symbol()),
            Self::Text { field, op, needle } => {
                write!(f, "{field} ILIKE ")?;
                write_quoted(f, &op.pattern(needle))
            }
            Self::In { field, values } => {
                write!(f, "{field} IN ")?;
                write_values(f, values)
            }
            Self::IsNull { field } => write!(f, "{field} IS NULL"),
            Self::Related { edge, inner, .. } => {
                write!(f, "EXISTS {edge} WHERE ")?;
                write_nested(f, inner)
            }
            Self::And(children) => write_joined(f, children, " AND "),
            Self::Or(children) => write_joined(f, children, " OR "),
            Self::Not(inner) => match inner.as_ref() {
                Self::IsNull { field } => write!(f, "{field} IS NOT NULL"),
                Self::In { field, values } => {
                    write!(f, "{field} NOT IN ")?;
                    write_values(f, values)
                }
                Self::Text { field, op, needle } => {
                    write!(f, "{field} NOT ILIKE ")?;
                    write_quoted(f, &op.pattern(needle))
                }
                other => write!(f, "NOT ({other})"),
            },
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// Parse the wire form `asc` or `desc`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Validated sort clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderOption {
    /// Field to sort by.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl OrderOption {
    /// Build a clause.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

impl fmt::Display for OrderOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        write!(f, "{} {direction}", self.field)
    }
}
