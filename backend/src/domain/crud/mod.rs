//! Generic CRUD orchestration.
//!
//! [`CrudService`] runs the same validation-first pipeline for every entity:
//! a per-entity [`EntityFlow`] contributes defaults, validation and business
//! rules; an [`EntityRepository`](crate::domain::ports::EntityRepository)
//! performs the storage calls; optimistic concurrency is enforced with
//! [`Etag`]s minted on every successful mutation.

mod envelope;
mod error;
mod flow;
mod search;
mod service;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use envelope::{ClientError, CrudResult};
pub use error::CrudError;
pub use flow::{EntityFlow, PermissiveFlow, StepResult, ValidateMode};
pub use service::CrudService;

/// Opaque optimistic-concurrency token.
///
/// # Examples
/// ```
/// use entity_backend::domain::crud::Etag;
///
/// assert_ne!(Etag::mint(), Etag::mint());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Etag(String);

impl Etag {
    /// Generate a fresh random token.
    #[must_use]
    pub fn mint() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap an existing token.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Etag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Persisted model handled by the orchestrator.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Registry name used to compile searches.
    const NAME: &'static str;

    /// Stable record identifier.
    fn id(&self) -> &str;

    /// Current concurrency token, if any.
    fn etag(&self) -> Option<&Etag>;

    /// Replace the concurrency token.
    fn set_etag(&mut self, etag: Etag);
}

/// Pipeline operation name used in logs and unexpected-error tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a record.
    Create,
    /// Update a record.
    Update,
    /// Permanently delete a record.
    DeleteHard,
    /// Fetch one record.
    GetOne,
    /// Fetch every matching record.
    ListAll,
    /// Paged graph search.
    Search,
}

impl Operation {
    /// Stable lower-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::DeleteHard => "delete_hard",
            Self::GetOne => "get_one",
            Self::ListAll => "list_all",
            Self::Search => "search",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch one record by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GetQuery {
    /// Record identifier.
    pub id: String,
}

impl GetQuery {
    /// Query for `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Unpaged listing with adapter-interpreted equality criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    /// Field to expected value.
    #[serde(default)]
    pub criteria: BTreeMap<String, String>,
}

impl ListQuery {
    /// Query without criteria.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality criterion.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.criteria.insert(field.into(), value.into());
        self
    }
}

/// Permanently delete a record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommand {
    /// Record identifier.
    pub id: String,
    /// Fetch the record first and report `id` not found when absent.
    #[serde(default = "default_assert_exists")]
    pub assert_exists: bool,
}

fn default_assert_exists() -> bool {
    true
}

impl DeleteCommand {
    /// Delete `id`, asserting it exists.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            assert_exists: true,
        }
    }

    /// Skip the existence check and delete-rule hook.
    #[must_use]
    pub fn without_existence_check(mut self) -> Self {
        self.assert_exists = false;
        self
    }
}

/// Paged search request as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Zero-based page index; defaults to the first page.
    #[serde(default)]
    pub page: Option<u32>,
    /// Page size; defaults to the configured size.
    #[serde(default)]
    pub size: Option<u32>,
    /// Serialized search graph; absent or blank matches everything.
    #[serde(default)]
    pub graph: Option<String>,
}

impl SearchQuery {
    /// Query for the first page with default size and no filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a page.
    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Select a page size.
    #[must_use]
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Attach a serialized search graph.
    #[must_use]
    pub fn graph(mut self, graph: impl Into<String>) -> Self {
        self.graph = Some(graph.into());
        self
    }
}

/// Result of a hard delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    /// Rows removed by the repository.
    pub deleted_count: u64,
    /// Clock reading taken after the delete.
    pub deleted_at: DateTime<Utc>,
}
