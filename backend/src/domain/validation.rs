//! Field-keyed, multi-valued validation errors.
//!
//! Every pipeline step appends to one shared collection instead of failing on
//! the first problem, so a single response reports every malformed field,
//! condition, or order clause together.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reserved key for optimistic-concurrency conflicts.
pub const ETAG_KEY: &str = "etag";

/// Reserved key for missing records.
pub const ID_KEY: &str = "id";

/// Key for page and size validation failures.
pub const PAGE_KEY: &str = "page";

/// Key for errors in a search graph that cannot be attributed to a field.
pub const SEARCH_KEY: &str = "search";

/// Key for order clause errors.
pub const ORDER_KEY: &str = "order";

/// Key for errors naming an unregistered entity.
pub const ENTITY_KEY: &str = "entity";

/// Accumulated validation messages keyed by field.
///
/// # Examples
/// ```
/// use entity_backend::domain::ValidationErrors;
///
/// let mut errors = ValidationErrors::new();
/// errors.add("name", "must not be empty");
/// errors.add("name", "must be at most 64 characters");
/// assert_eq!(errors.len(), 2);
/// assert_eq!(errors.get("name").map(<[String]>::len), Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection holding one message.
    #[must_use]
    pub fn single(key: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(key, message);
        errors
    }

    /// Append a message under `key`.
    pub fn add(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(message.into());
    }

    /// Append every message from `other`, preserving order per key.
    pub fn merge(&mut self, other: ValidationErrors) {
        for (key, messages) in other.0 {
            self.0.entry(key).or_default().extend(messages);
        }
    }

    /// Whether no message has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of messages across all keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Messages recorded for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// Whether any message is recorded for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate over keys and their messages in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(key, messages)| (key.as_str(), messages.as_slice()))
    }

    /// Convert into `Err(self)` when any message is present.
    ///
    /// # Errors
    ///
    /// Returns the collection itself when it is not empty.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (key, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                write!(f, "{key}: {message}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
