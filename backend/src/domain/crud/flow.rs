//! Per-entity hooks plugged into the CRUD pipeline.

use async_trait::async_trait;

use super::Entity;
use crate::domain::{Error, RequestContext, ValidationErrors};

/// Outcome of a business-rule hook. `Err` aborts the operation at once with
/// a coded client error; soft problems are appended to the shared
/// [`ValidationErrors`] instead.
pub type StepResult = Result<(), Error>;

/// Which pipeline is validating the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidateMode {
    /// New record.
    Create,
    /// Existing record.
    Edit,
}

/// Entity-specific behaviour for the CRUD pipeline.
///
/// Every hook defaults to a no-op so flows override only what they need.
#[async_trait]
pub trait EntityFlow<E: Entity>: Send + Sync {
    /// Fill defaults before validation on create.
    fn set_defaults(&self, _model: &mut E) {}

    /// Append validation messages for `model`.
    fn validate(&self, _model: &E, _mode: ValidateMode, _errors: &mut ValidationErrors) {}

    /// Normalise the model after validation.
    fn sanitize(&self, _model: &mut E) {}

    /// Business rules checked before create, only when validation is clean.
    async fn assert_create_rules(
        &self,
        _ctx: &RequestContext,
        _model: &E,
        _errors: &mut ValidationErrors,
    ) -> StepResult {
        Ok(())
    }

    /// Business rules checked against the stored model before delete.
    async fn assert_delete_rules(
        &self,
        _ctx: &RequestContext,
        _model: &E,
        _errors: &mut ValidationErrors,
    ) -> StepResult {
        Ok(())
    }
}

/// Flow that accepts every model unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveFlow;

#[async_trait]
impl<E: Entity> EntityFlow<E> for PermissiveFlow {}
