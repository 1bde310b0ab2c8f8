//! Entity schema metadata: field types, runtime values and descriptors.
//!
//! A descriptor is built once while modules register their entities and is
//! immutable afterwards. The search compiler consults descriptors to resolve
//! field types and relationship edges; nothing here touches storage.

mod registry;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::domain::query::Predicate;

pub use registry::{EntityRegistry, EntityRegistryBuilder, RegistryError};

/// Semantic type of an entity field.
///
/// The set is closed; adapters map each variant to their own column types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Free text. The only textual type.
    String,
    /// Signed 64-bit integer.
    Int,
    /// 64-bit floating point number.
    Float,
    /// Boolean flag.
    Bool,
    /// UTC timestamp.
    Time,
    /// Named enumeration restricted to the listed variants.
    Enum(Vec<String>),
}

impl FieldType {
    /// Whether text operators apply to this type.
    #[must_use]
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::String)
    }

    /// Lower-case type name used in catalogues and messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Time => "time",
            Self::Enum(_) => "enum",
        }
    }

    /// Convert raw condition text into a value of this type.
    ///
    /// Timestamps accept RFC 3339 or a bare `YYYY-MM-DD` date taken as
    /// midnight UTC. Booleans accept `true`/`false`/`1`/`0` in any case.
    ///
    /// # Examples
    /// ```
    /// use entity_backend::domain::schema::{FieldType, Value};
    ///
    /// assert_eq!(FieldType::Int.coerce("30"), Some(Value::Int(30)));
    /// assert_eq!(FieldType::Int.coerce("thirty"), None);
    /// ```
    #[must_use]
    pub fn coerce(&self, raw: &str) -> Option<Value> {
        match self {
            Self::String => Some(Value::String(raw.to_owned())),
            Self::Int => raw.trim().parse().ok().map(Value::Int),
            Self::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .map(Value::Float),
            Self::Bool => parse_bool(raw).map(Value::Bool),
            Self::Time => parse_time(raw).map(Value::Time),
            Self::Enum(variants) => variants
                .iter()
                .any(|variant| variant == raw)
                .then(|| Value::Enum(raw.to_owned())),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum(variants) => write!(f, "enum({})", variants.join("|")),
            other => f.write_str(other.name()),
        }
    }
}

/// Error returned when a catalogue names a type outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field type '{0}'")]
pub struct UnknownFieldType(pub String);

impl FromStr for FieldType {
    type Err = UnknownFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "bool" => Ok(Self::Bool),
            "time" => Ok(Self::Time),
            other => Err(UnknownFieldType(other.to_owned())),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        Some(false)
    } else {
        None
    }
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        })
}

/// Typed runtime value produced by coercing condition text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text value.
    String(String),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// UTC timestamp.
    Time(DateTime<Utc>),
    /// Enumeration variant name.
    Enum(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(text) | Self::Enum(text) => write_quoted(f, text),
            Self::Int(number) => write!(f, "{number}"),
            Self::Float(number) => write!(f, "{number}"),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Time(at) => write_quoted(f, &at.to_rfc3339()),
        }
    }
}

/// Write `text` as a single-quoted literal, doubling embedded quotes.
pub(crate) fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    write!(f, "'{}'", text.replace('\'', "''"))
}

/// Errors raised while resolving fields against a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The descriptor declares no such field.
    #[error("field '{field}' does not exist on entity '{entity}'")]
    FieldNotFound {
        /// Entity that was searched.
        entity: String,
        /// Requested field name.
        field: String,
    },
    /// The raw value cannot be converted to the declared type.
    #[error("value '{value}' for field '{field}' on entity '{entity}' is not a valid {expected}")]
    TypeMismatch {
        /// Entity owning the field.
        entity: String,
        /// Field whose type was expected.
        field: String,
        /// Declared type name.
        expected: String,
        /// Raw value that failed to convert.
        value: String,
    },
}

/// Wraps a child predicate compiled against an edge target into a predicate
/// over the source entity.
pub trait EdgeCombinator: Send + Sync + fmt::Debug {
    /// Combine `inner`, compiled against `target`, for the edge `edge`.
    fn wrap(&self, edge: &str, target: &str, inner: Predicate) -> Predicate;
}

/// Default combinator: a related row exists that matches the inner predicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct HasRelated;

impl EdgeCombinator for HasRelated {
    fn wrap(&self, edge: &str, target: &str, inner: Predicate) -> Predicate {
        Predicate::related(edge, target, inner)
    }
}

/// Named relation from one entity to another.
#[derive(Debug, Clone)]
pub struct EdgeDescriptor {
    target: String,
    combinator: Arc<dyn EdgeCombinator>,
}

impl EdgeDescriptor {
    /// Edge to `target` using the [`HasRelated`] combinator.
    pub fn new(target: impl Into<String>) -> Self {
        Self::with_combinator(target, Arc::new(HasRelated))
    }

    /// Edge to `target` using a custom combinator.
    pub fn with_combinator(target: impl Into<String>, combinator: Arc<dyn EdgeCombinator>) -> Self {
        Self {
            target: target.into(),
            combinator,
        }
    }

    /// Name of the entity this edge points at.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Wrap a predicate compiled against the target entity.
    #[must_use]
    pub fn wrap(&self, edge: &str, inner: Predicate) -> Predicate {
        self.combinator.wrap(edge, &self.target, inner)
    }
}

/// Schema metadata for one entity.
///
/// # Examples
/// ```
/// use entity_backend::domain::schema::{EntityDescriptor, FieldType};
///
/// let descriptor = EntityDescriptor::builder("contact")
///     .field("name", FieldType::String)
///     .field("age", FieldType::Int)
///     .edge("company", "company")
///     .build();
/// assert_eq!(descriptor.field_type("age"), Ok(&FieldType::Int));
/// assert_eq!(descriptor.edge("company").map(|edge| edge.target()), Some("company"));
/// ```
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    name: String,
    fields: BTreeMap<String, FieldType>,
    edges: BTreeMap<String, EdgeDescriptor>,
}

impl EntityDescriptor {
    /// Start building a descriptor for `name`.
    pub fn builder(name: impl Into<String>) -> EntityDescriptorBuilder {
        EntityDescriptorBuilder {
            name: name.into(),
            fields: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    /// Globally unique entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldType)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    /// Declared edges in name order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &EdgeDescriptor)> {
        self.edges.iter().map(|(name, edge)| (name.as_str(), edge))
    }

    /// Edge named `name`, if declared.
    #[must_use]
    pub fn edge(&self, name: &str) -> Option<&EdgeDescriptor> {
        self.edges.get(name)
    }

    /// Declared type of `field`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::FieldNotFound`] when the field is not declared.
    pub fn field_type(&self, field: &str) -> Result<&FieldType, SchemaError> {
        self.fields
            .get(field)
            .ok_or_else(|| SchemaError::FieldNotFound {
                entity: self.name.clone(),
                field: field.to_owned(),
            })
    }

    /// Convert `raw` to the declared type of `field`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::FieldNotFound`] for undeclared fields and
    /// [`SchemaError::TypeMismatch`] when the text does not convert.
    pub fn match_field_type(&self, field: &str, raw: &str) -> Result<Value, SchemaError> {
        let field_type = self.field_type(field)?;
        field_type
            .coerce(raw)
            .ok_or_else(|| SchemaError::TypeMismatch {
                entity: self.name.clone(),
                field: field.to_owned(),
                expected: field_type.to_string(),
                value: raw.to_owned(),
            })
    }
}

/// Builder returned by [`EntityDescriptor::builder`].
#[derive(Debug)]
pub struct EntityDescriptorBuilder {
    name: String,
    fields: BTreeMap<String, FieldType>,
    edges: BTreeMap<String, EdgeDescriptor>,
}

impl EntityDescriptorBuilder {
    /// Declare a field. Redeclaring a name replaces its type.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    /// Declare an edge using the default combinator.
    #[must_use]
    pub fn edge(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.edge_with(name, EdgeDescriptor::new(target))
    }

    /// Declare an edge with an explicit descriptor.
    #[must_use]
    pub fn edge_with(mut self, name: impl Into<String>, edge: EdgeDescriptor) -> Self {
        self.edges.insert(name.into(), edge);
        self
    }

    /// Freeze the descriptor.
    #[must_use]
    pub fn build(self) -> EntityDescriptor {
        EntityDescriptor {
            name: self.name,
            fields: self.fields,
            edges: self.edges,
        }
    }
}
