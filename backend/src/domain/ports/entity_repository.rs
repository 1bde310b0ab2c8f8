//! Port abstraction for entity persistence adapters and their errors.
use async_trait::async_trait;

use crate::domain::crud::{Entity, Etag, ListQuery};
use crate::domain::query::{OrderOption, Predicate};
use crate::domain::RequestContext;
use pagination::PageRequest;

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by entity repository adapters.
    pub enum EntityRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "entity repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "entity repository query failed: {message}",
        /// The etag-guarded write affected no row.
        EtagConflict { id: String } => "record {id} was modified concurrently",
        /// The addressed record does not exist.
        NotFound { id: String } => "record {id} does not exist",
        /// A record with the same identifier already exists.
        DuplicateKey { id: String } => "record {id} already exists",
        /// The request deadline passed before the call ran.
        DeadlineExceeded { operation: String } => "deadline exceeded before {operation}",
    }
}

/// Compiled search handed to [`EntityRepository::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Filter over the entity.
    pub predicate: Predicate,
    /// Sort clauses applied in order.
    pub order: Vec<OrderOption>,
    /// Window to return.
    pub page: PageRequest,
}

impl SearchRequest {
    /// Bundle a compiled search.
    #[must_use]
    pub fn new(predicate: Predicate, order: Vec<OrderOption>, page: PageRequest) -> Self {
        Self {
            predicate,
            order,
            page,
        }
    }
}

/// One page of search results plus the unpaged match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage<E> {
    /// Records in the requested window.
    pub items: Vec<E>,
    /// Matches before paging.
    pub total: u64,
}

/// Storage operations the CRUD pipeline relies on.
///
/// Every call receives the caller's [`RequestContext`] so adapters can honour
/// its deadline and correlate logs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityRepository<E: Entity>: Send + Sync {
    /// Insert a new record and return it as stored.
    async fn create(&self, ctx: &RequestContext, model: &E) -> Result<E, EntityRepositoryError>;

    /// Replace a record only if its stored etag still equals `previous`.
    ///
    /// The comparison and the write must be atomic. A write that affects no
    /// row returns [`EntityRepositoryError::EtagConflict`].
    async fn update(
        &self,
        ctx: &RequestContext,
        model: &E,
        previous: &Etag,
    ) -> Result<E, EntityRepositoryError>;

    /// Permanently delete a record, returning the number of rows removed.
    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<u64, EntityRepositoryError>;

    /// Fetch one record by identifier.
    async fn find_one(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<Option<E>, EntityRepositoryError>;

    /// Fetch every record matching the equality criteria.
    async fn list_all(
        &self,
        ctx: &RequestContext,
        query: &ListQuery,
    ) -> Result<Vec<E>, EntityRepositoryError>;

    /// Run a compiled search.
    async fn search(
        &self,
        ctx: &RequestContext,
        request: &SearchRequest,
    ) -> Result<SearchPage<E>, EntityRepositoryError>;
}
