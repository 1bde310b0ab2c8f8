//! In-memory entity repository.
//!
//! Holds records in a sorted map keyed by identifier and evaluates compiled
//! predicates against each record's JSON form. Suitable for tests, demos and
//! the CLI; production deployments plug a database adapter into the same
//! port.

mod evaluate;

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::domain::RequestContext;
use crate::domain::crud::{Entity, Etag, ListQuery};
use crate::domain::ports::{EntityRepository, EntityRepositoryError, SearchPage, SearchRequest};

/// Repository adapter backed by a mutex-guarded map.
#[derive(Debug)]
pub struct InMemoryRepository<E> {
    records: Mutex<BTreeMap<String, E>>,
}

impl<E> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<E: Entity + Serialize> InMemoryRepository<E> {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository seeded with `records`; later duplicates replace earlier ones.
    pub fn with_records(records: impl IntoIterator<Item = E>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.id().to_owned(), record))
            .collect();
        Self {
            records: Mutex::new(map),
        }
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map_or(0, |records| records.len())
    }

    /// Whether the repository holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the stored record with `id`.
    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<E> {
        self.lock().ok().and_then(|records| records.get(id).cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, E>>, EntityRepositoryError> {
        self.records
            .lock()
            .map_err(|_| EntityRepositoryError::query("in-memory store lock poisoned"))
    }

    fn documents(&self) -> Result<Vec<(JsonValue, E)>, EntityRepositoryError> {
        let records: Vec<E> = self.lock()?.values().cloned().collect();
        records
            .into_iter()
            .map(|record| {
                serde_json::to_value(&record)
                    .map(|document| (document, record))
                    .map_err(|err| EntityRepositoryError::query(err.to_string()))
            })
            .collect()
    }
}

fn ensure_live(ctx: &RequestContext, operation: &str) -> Result<(), EntityRepositoryError> {
    if ctx.is_expired() {
        warn!(trace_id = %ctx.trace_id(), operation, "deadline passed before repository call");
        return Err(EntityRepositoryError::deadline_exceeded(operation));
    }
    Ok(())
}

#[async_trait]
impl<E: Entity + Serialize> EntityRepository<E> for InMemoryRepository<E> {
    async fn create(&self, ctx: &RequestContext, model: &E) -> Result<E, EntityRepositoryError> {
        ensure_live(ctx, "create")?;
        let mut records = self.lock()?;
        if records.contains_key(model.id()) {
            return Err(EntityRepositoryError::duplicate_key(model.id()));
        }
        records.insert(model.id().to_owned(), model.clone());
        debug!(entity = E::NAME, id = model.id(), "record inserted");
        Ok(model.clone())
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        model: &E,
        previous: &Etag,
    ) -> Result<E, EntityRepositoryError> {
        ensure_live(ctx, "update")?;
        let mut records = self.lock()?;
        let stored = records
            .get_mut(model.id())
            .ok_or_else(|| EntityRepositoryError::not_found(model.id()))?;
        if stored.etag() != Some(previous) {
            debug!(entity = E::NAME, id = model.id(), %previous, "etag guard rejected write");
            return Err(EntityRepositoryError::etag_conflict(model.id()));
        }
        *stored = model.clone();
        debug!(entity = E::NAME, id = model.id(), "record replaced");
        Ok(model.clone())
    }

    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<u64, EntityRepositoryError> {
        ensure_live(ctx, "delete")?;
        let removed = self.lock()?.remove(id).map_or(0, |_| 1);
        debug!(entity = E::NAME, id, removed, "record delete");
        Ok(removed)
    }

    async fn find_one(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<Option<E>, EntityRepositoryError> {
        ensure_live(ctx, "find_one")?;
        Ok(self.lock()?.get(id).cloned())
    }

    async fn list_all(
        &self,
        ctx: &RequestContext,
        query: &ListQuery,
    ) -> Result<Vec<E>, EntityRepositoryError> {
        ensure_live(ctx, "list_all")?;
        Ok(self
            .documents()?
            .into_iter()
            .filter(|(document, _)| evaluate::matches_criteria(document, query.criteria.iter()))
            .map(|(_, record)| record)
            .collect())
    }

    async fn search(
        &self,
        ctx: &RequestContext,
        request: &SearchRequest,
    ) -> Result<SearchPage<E>, EntityRepositoryError> {
        ensure_live(ctx, "search")?;
        let mut matched: Vec<(JsonValue, E)> = self
            .documents()?
            .into_iter()
            .filter(|(document, _)| evaluate::matches(&request.predicate, document))
            .collect();
        matched.sort_by(|(a, _), (b, _)| evaluate::compare_documents(a, b, &request.order));

        let total = u64::try_from(matched.len()).unwrap_or(u64::MAX);
        let offset = usize::try_from(request.page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(request.page.limit()).unwrap_or(usize::MAX);
        let items: Vec<E> = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, record)| record)
            .collect();
        debug!(
            entity = E::NAME,
            predicate = %request.predicate,
            total,
            returned = items.len(),
            "search evaluated"
        );
        Ok(SearchPage { items, total })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::query::{CompareOp, OrderOption, Predicate, SortDirection};
    use crate::domain::schema::Value;
    use crate::test_support::Contact;
    use pagination::PageRequest;
    use rstest::{fixture, rstest};
    use std::time::{Duration, Instant};

    #[fixture]
    fn repo() -> InMemoryRepository<Contact> {
        InMemoryRepository::with_records([
            Contact::new("c1", "Ada", 36)
                .with_status("pending")
                .with_etag("e1"),
            Contact::new("c2", "Grace", 45).with_status("active"),
            Contact::new("c3", "Linus", 28).with_status("active"),
        ])
    }

    fn ctx() -> RequestContext {
        RequestContext::new()
    }

    #[rstest]
    #[tokio::test]
    async fn rejects_duplicate_identifiers(repo: InMemoryRepository<Contact>) {
        let err = repo
            .create(&ctx(), &Contact::new("c1", "Other", 1))
            .await
            .expect_err("duplicate id");
        assert_eq!(err, EntityRepositoryError::duplicate_key("c1"));
        assert_eq!(repo.len(), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn update_requires_matching_etag(repo: InMemoryRepository<Contact>) {
        let edited = Contact::new("c1", "Ada Lovelace", 36).with_etag("e2");

        let err = repo
            .update(&ctx(), &edited, &Etag::from("stale"))
            .await
            .expect_err("stale etag");
        assert_eq!(err, EntityRepositoryError::etag_conflict("c1"));
        assert_eq!(repo.snapshot("c1").map(|c| c.name), Some("Ada".to_owned()));

        repo.update(&ctx(), &edited, &Etag::from("e1"))
            .await
            .expect("fresh etag");
        assert_eq!(
            repo.snapshot("c1").map(|c| c.name),
            Some("Ada Lovelace".to_owned())
        );
    }

    #[rstest]
    #[tokio::test]
    async fn update_of_missing_record_is_not_found(repo: InMemoryRepository<Contact>) {
        let err = repo
            .update(&ctx(), &Contact::new("zz", "Nobody", 1), &Etag::from("e1"))
            .await
            .expect_err("missing");
        assert_eq!(err, EntityRepositoryError::not_found("zz"));
    }

    #[rstest]
    #[tokio::test]
    async fn delete_reports_removed_rows(repo: InMemoryRepository<Contact>) {
        assert_eq!(repo.delete(&ctx(), "c2").await.expect("delete"), 1);
        assert_eq!(repo.delete(&ctx(), "c2").await.expect("delete"), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn list_all_filters_on_criteria(repo: InMemoryRepository<Contact>) {
        let found = repo
            .list_all(&ctx(), &ListQuery::new().with("status", "active"))
            .await
            .expect("list");
        let ids: Vec<&str> = found.iter().map(Entity::id).collect();
        assert_eq!(ids, ["c2", "c3"]);
    }

    #[rstest]
    #[tokio::test]
    async fn search_filters_sorts_and_pages(repo: InMemoryRepository<Contact>) {
        let request = SearchRequest::new(
            Predicate::compare("age", CompareOp::Gt, Value::Int(30)),
            vec![OrderOption::new("age", SortDirection::Desc)],
            PageRequest::new(1, 1),
        );
        let page = repo.search(&ctx(), &request).await.expect("search");
        assert_eq!(page.total, 2);
        let ids: Vec<&str> = page.items.iter().map(Entity::id).collect();
        assert_eq!(ids, ["c2"]);
    }

    #[rstest]
    #[tokio::test]
    async fn expired_deadline_short_circuits(repo: InMemoryRepository<Contact>) {
        let expired = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .expect("instant in range");
        let ctx = RequestContext::new().with_deadline(expired);
        let err = repo.find_one(&ctx, "c1").await.expect_err("expired");
        assert_eq!(err, EntityRepositoryError::deadline_exceeded("find_one"));
    }
}
