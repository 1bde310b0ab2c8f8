//! Paged graph search pipeline.

use pagination::Paginated;
use tracing::debug;

use super::{CrudError, CrudResult, CrudService, Entity, EntityFlow, Operation, SearchQuery};
use crate::domain::ports::{EntityRepository, SearchRequest};
use crate::domain::query::{CompiledSearch, Predicate, SearchGraph};
use crate::domain::{RequestContext, ValidationErrors, PAGE_KEY, SEARCH_KEY};

impl<E, R, F> CrudService<E, R, F>
where
    E: Entity,
    R: EntityRepository<E>,
    F: EntityFlow<E>,
{
    /// Compile the query's search graph and fetch one page of matches.
    ///
    /// Missing page and size fall back to the configured defaults. A missing
    /// or blank graph matches every record.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError`] for panics and storage faults; page, graph and
    /// order problems are reported in the envelope.
    pub async fn search(
        &self,
        ctx: &RequestContext,
        query: SearchQuery,
    ) -> Result<CrudResult<Paginated<E>>, CrudError> {
        Self::guarded(Operation::Search, ctx, self.perform_search(ctx, query)).await
    }

    async fn perform_search(
        &self,
        ctx: &RequestContext,
        query: SearchQuery,
    ) -> Result<CrudResult<Paginated<E>>, CrudError> {
        let page = self.limits.fill(query.page, query.size);
        let mut errors = ValidationErrors::new();
        if let Err(err) = self.limits.check(&page) {
            errors.add(PAGE_KEY, err.to_string());
        }

        let mut predicate = Predicate::MatchAll;
        let mut order = Vec::new();
        if let Some(raw) = query.graph.as_deref().filter(|raw| !raw.trim().is_empty()) {
            match SearchGraph::parse(raw) {
                Ok(graph) => {
                    let CompiledSearch {
                        predicate: compiled,
                        order: clauses,
                        errors: compile_errors,
                    } = self.compiler.compile(&graph, E::NAME);
                    errors.merge(compile_errors);
                    predicate = compiled.unwrap_or(Predicate::MatchAll);
                    order = clauses;
                }
                Err(err) => {
                    errors.add(SEARCH_KEY, format!("search graph is not valid JSON: {err}"));
                }
            }
        }
        if !errors.is_empty() {
            return Ok(Self::reject(Operation::Search, errors));
        }

        debug!(
            entity = E::NAME,
            %predicate,
            page = page.page(),
            size = page.size(),
            "running search"
        );
        let request = SearchRequest::new(predicate, order, page);
        match self.repo.search(ctx, &request).await {
            Ok(found) => Ok(CrudResult::success(Paginated::new(found.items, found.total, page))),
            Err(err) => Self::repository_outcome(Operation::Search, err),
        }
    }
}
