//! Create, update, delete and fetch pipelines.

use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use mockable::Clock;
use pagination::{PageError, PageLimits};
use tracing::{debug, error, warn};

use super::{
    CrudError, CrudResult, DeleteCommand, DeleteOutcome, Entity, EntityFlow, Etag, GetQuery,
    ListQuery, Operation, ValidateMode,
};
use crate::domain::ports::{EntityRepository, EntityRepositoryError};
use crate::domain::query::SearchCompiler;
use crate::domain::schema::{EntityRegistry, RegistryError};
use crate::domain::{Error, RequestContext, TraceId, ValidationErrors, ETAG_KEY, ID_KEY};
use crate::settings::QuerySettings;

/// Validation-first CRUD pipeline for one entity type.
///
/// The service is stateless per request. It shares the read-only registry
/// and never calls a mutating repository method while validation errors are
/// outstanding.
pub struct CrudService<E, R, F> {
    pub(super) compiler: SearchCompiler,
    pub(super) repo: Arc<R>,
    pub(super) flow: Arc<F>,
    pub(super) limits: PageLimits,
    clock: Arc<dyn Clock>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, R, F> Clone for CrudService<E, R, F> {
    fn clone(&self) -> Self {
        Self {
            compiler: self.compiler.clone(),
            repo: Arc::clone(&self.repo),
            flow: Arc::clone(&self.flow),
            limits: self.limits,
            clock: Arc::clone(&self.clock),
            _entity: PhantomData,
        }
    }
}

impl<E, R, F> CrudService<E, R, F>
where
    E: Entity,
    R: EntityRepository<E>,
    F: EntityFlow<E>,
{
    /// Create a service for `E`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MissingDescriptor`] when `E::NAME` is not
    /// registered.
    pub fn new(
        registry: EntityRegistry,
        repo: Arc<R>,
        flow: Arc<F>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RegistryError> {
        registry.descriptor(E::NAME)?;
        Ok(Self {
            compiler: SearchCompiler::new(registry),
            repo,
            flow,
            limits: PageLimits::default(),
            clock,
            _entity: PhantomData,
        })
    }

    /// Replace the default page limits.
    #[must_use]
    pub fn with_page_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Apply the paging limits from loaded settings.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::InvalidLimits`] when the configured default size
    /// is zero or exceeds the maximum.
    pub fn with_settings(self, settings: &QuerySettings) -> Result<Self, PageError> {
        Ok(self.with_page_limits(settings.page_limits()?))
    }

    /// Page limits applied to searches.
    #[must_use]
    pub fn page_limits(&self) -> PageLimits {
        self.limits
    }

    /// Validate and insert a new record.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError`] for panics and storage faults; validation and
    /// business-rule failures are reported in the envelope.
    pub async fn create<C>(
        &self,
        ctx: &RequestContext,
        command: C,
    ) -> Result<CrudResult<E>, CrudError>
    where
        C: Into<E> + Send,
    {
        Self::guarded(Operation::Create, ctx, self.perform_create(ctx, command)).await
    }

    /// Validate and replace an existing record under optimistic concurrency.
    ///
    /// The command must carry the etag the client last read.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError`] for panics and storage faults.
    pub async fn update<C>(
        &self,
        ctx: &RequestContext,
        command: C,
    ) -> Result<CrudResult<E>, CrudError>
    where
        C: Into<E> + Send,
    {
        Self::guarded(Operation::Update, ctx, self.perform_update(ctx, command)).await
    }

    /// Permanently delete a record.
    ///
    /// When the repository removes no row the envelope succeeds without
    /// data.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError`] for panics and storage faults.
    pub async fn delete_hard(
        &self,
        ctx: &RequestContext,
        command: DeleteCommand,
    ) -> Result<CrudResult<DeleteOutcome>, CrudError> {
        Self::guarded(Operation::DeleteHard, ctx, self.perform_delete(ctx, command)).await
    }

    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError`] for panics and storage faults.
    pub async fn get_one(
        &self,
        ctx: &RequestContext,
        query: GetQuery,
    ) -> Result<CrudResult<E>, CrudError> {
        Self::guarded(Operation::GetOne, ctx, async move {
            match self.repo.find_one(ctx, &query.id).await {
                Ok(Some(model)) => Ok(CrudResult::success(model)),
                Ok(None) => Ok(Self::reject(
                    Operation::GetOne,
                    ValidationErrors::single(ID_KEY, not_found_message(&query.id)),
                )),
                Err(err) => Self::repository_outcome(Operation::GetOne, err),
            }
        })
        .await
    }

    /// Fetch every record matching the query criteria, unpaged.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError`] for panics and storage faults.
    pub async fn list_all(
        &self,
        ctx: &RequestContext,
        query: ListQuery,
    ) -> Result<CrudResult<Vec<E>>, CrudError> {
        Self::guarded(Operation::ListAll, ctx, async move {
            match self.repo.list_all(ctx, &query).await {
                Ok(models) => Ok(CrudResult::success(models)),
                Err(err) => Self::repository_outcome(Operation::ListAll, err),
            }
        })
        .await
    }

    async fn perform_create<C: Into<E>>(
        &self,
        ctx: &RequestContext,
        command: C,
    ) -> Result<CrudResult<E>, CrudError> {
        let mut model: E = command.into();
        self.flow.set_defaults(&mut model);
        let mut errors = ValidationErrors::new();
        self.flow.validate(&model, ValidateMode::Create, &mut errors);
        self.flow.sanitize(&mut model);
        if errors.is_empty() {
            if let Err(hard) = self.flow.assert_create_rules(ctx, &model, &mut errors).await {
                return Ok(Self::abort(Operation::Create, hard));
            }
        }
        if !errors.is_empty() {
            return Ok(Self::reject(Operation::Create, errors));
        }

        model.set_etag(Etag::mint());
        match self.repo.create(ctx, &model).await {
            Ok(created) => Ok(CrudResult::success(created)),
            Err(err) => Self::repository_outcome(Operation::Create, err),
        }
    }

    async fn perform_update<C: Into<E>>(
        &self,
        ctx: &RequestContext,
        command: C,
    ) -> Result<CrudResult<E>, CrudError> {
        let mut model: E = command.into();
        let mut errors = ValidationErrors::new();
        self.flow.validate(&model, ValidateMode::Edit, &mut errors);
        if !errors.is_empty() {
            return Ok(Self::reject(Operation::Update, errors));
        }

        let Some(stored) = self
            .assert_exists(ctx, Operation::Update, model.id(), &mut errors)
            .await?
        else {
            return Ok(Self::reject(Operation::Update, errors));
        };
        let previous = match check_etag(model.etag(), stored.etag()) {
            Ok(previous) => previous,
            Err(message) => {
                errors.add(ETAG_KEY, message);
                return Ok(Self::reject(Operation::Update, errors));
            }
        };

        model.set_etag(Etag::mint());
        match self.repo.update(ctx, &model, &previous).await {
            Ok(updated) => Ok(CrudResult::success(updated)),
            Err(err) => Self::repository_outcome(Operation::Update, err),
        }
    }

    async fn perform_delete(
        &self,
        ctx: &RequestContext,
        command: DeleteCommand,
    ) -> Result<CrudResult<DeleteOutcome>, CrudError> {
        let mut errors = ValidationErrors::new();
        if command.assert_exists {
            let existing = self
                .assert_exists(ctx, Operation::DeleteHard, &command.id, &mut errors)
                .await?;
            if let Some(model) = existing {
                if let Err(hard) = self.flow.assert_delete_rules(ctx, &model, &mut errors).await {
                    return Ok(Self::abort(Operation::DeleteHard, hard));
                }
            }
        }
        if !errors.is_empty() {
            return Ok(Self::reject(Operation::DeleteHard, errors));
        }

        match self.repo.delete(ctx, &command.id).await {
            Ok(0) => {
                debug!(entity = E::NAME, id = %command.id, "delete removed no rows");
                Ok(CrudResult::empty())
            }
            Ok(deleted_count) => Ok(CrudResult::success(DeleteOutcome {
                deleted_count,
                deleted_at: self.clock.utc(),
            })),
            Err(err) => Self::repository_outcome(Operation::DeleteHard, err),
        }
    }

    /// Fetch the stored model, appending a not-found error when absent.
    async fn assert_exists(
        &self,
        ctx: &RequestContext,
        operation: Operation,
        id: &str,
        errors: &mut ValidationErrors,
    ) -> Result<Option<E>, CrudError> {
        match self.repo.find_one(ctx, id).await {
            Ok(Some(model)) => Ok(Some(model)),
            Ok(None) | Err(EntityRepositoryError::NotFound { .. }) => {
                errors.add(ID_KEY, not_found_message(id));
                Ok(None)
            }
            Err(err) => {
                error!(%operation, entity = E::NAME, error = %err, "existence check failed");
                Err(CrudError::repository(operation, err))
            }
        }
    }

    /// Run `body` inside the trace scope, converting panics into
    /// [`CrudError::Unexpected`].
    pub(super) async fn guarded<T, Fut>(
        operation: Operation,
        ctx: &RequestContext,
        body: Fut,
    ) -> Result<T, CrudError>
    where
        Fut: Future<Output = Result<T, CrudError>>,
    {
        let trace_id = ctx.trace_id();
        debug!(%operation, entity = E::NAME, %trace_id, "crud operation started");
        let outcome = TraceId::scope(trace_id, AssertUnwindSafe(body).catch_unwind()).await;
        match outcome {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    %operation,
                    entity = E::NAME,
                    %trace_id,
                    %message,
                    "crud operation panicked"
                );
                Err(CrudError::unexpected(operation, message))
            }
        }
    }

    pub(super) fn reject<T>(operation: Operation, errors: ValidationErrors) -> CrudResult<T> {
        warn!(%operation, entity = E::NAME, %errors, "crud operation rejected");
        CrudResult::invalid(errors)
    }

    fn abort<T>(operation: Operation, hard: Error) -> CrudResult<T> {
        warn!(
            %operation,
            entity = E::NAME,
            code = ?hard.code(),
            message = hard.message(),
            "crud operation aborted by business rule"
        );
        CrudResult::failed(hard)
    }

    /// Map adapter errors: recoverable ones become envelope errors, storage
    /// faults escape as [`CrudError::Repository`].
    pub(super) fn repository_outcome<T>(
        operation: Operation,
        err: EntityRepositoryError,
    ) -> Result<CrudResult<T>, CrudError> {
        match err {
            EntityRepositoryError::EtagConflict { id } => Ok(Self::reject(
                operation,
                ValidationErrors::single(
                    ETAG_KEY,
                    format!("record '{id}' was modified concurrently; reload and retry"),
                ),
            )),
            EntityRepositoryError::NotFound { id } => Ok(Self::reject(
                operation,
                ValidationErrors::single(ID_KEY, not_found_message(&id)),
            )),
            EntityRepositoryError::DuplicateKey { id } => Ok(Self::reject(
                operation,
                ValidationErrors::single(ID_KEY, format!("record '{id}' already exists")),
            )),
            other => {
                error!(%operation, entity = E::NAME, error = %other, "repository call failed");
                Err(CrudError::repository(operation, other))
            }
        }
    }
}

fn not_found_message(id: &str) -> String {
    format!("record '{id}' not found")
}

/// Compare the submitted etag with the stored one, returning the token the
/// conditional write must match.
fn check_etag(submitted: Option<&Etag>, stored: Option<&Etag>) -> Result<Etag, String> {
    match (submitted, stored) {
        (None, _) => Err("etag is required to update a record".to_owned()),
        (Some(submitted), Some(stored)) if submitted == stored => Ok(submitted.clone()),
        (Some(submitted), Some(stored)) => Err(format!(
            "etag '{submitted}' does not match current etag '{stored}'"
        )),
        (Some(submitted), None) => Err(format!(
            "etag '{submitted}' does not match a record without an etag"
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_owned()
    }
}
