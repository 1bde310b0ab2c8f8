//! Uniform result envelope returned by every CRUD operation.

use serde::Serialize;

use crate::domain::{Error, ValidationErrors};

/// Client-facing failure: field-keyed validation messages or one coded error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClientError {
    /// Field-keyed validation messages, including `etag` conflicts and `id`
    /// not-found reports.
    Validation(ValidationErrors),
    /// Hard failure raised by a business-rule hook.
    Coded(Error),
}

/// `{ data, hasData, error }` envelope.
///
/// # Examples
/// ```
/// use entity_backend::domain::crud::CrudResult;
/// use entity_backend::domain::ValidationErrors;
///
/// let ok = CrudResult::success(7);
/// assert!(ok.has_data());
///
/// let rejected: CrudResult<i32> =
///     CrudResult::invalid(ValidationErrors::single("name", "required"));
/// assert!(!rejected.has_data());
/// assert!(rejected.validation_errors().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrudResult<T> {
    data: Option<T>,
    has_data: bool,
    error: Option<ClientError>,
}

impl<T> CrudResult<T> {
    /// Successful result carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            has_data: true,
            error: None,
        }
    }

    /// Succeeded with nothing to return.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            data: None,
            has_data: false,
            error: None,
        }
    }

    /// Rejected with validation messages.
    #[must_use]
    pub fn invalid(errors: ValidationErrors) -> Self {
        Self {
            data: None,
            has_data: false,
            error: Some(ClientError::Validation(errors)),
        }
    }

    /// Aborted by a coded error.
    #[must_use]
    pub fn failed(error: Error) -> Self {
        Self {
            data: None,
            has_data: false,
            error: Some(ClientError::Coded(error)),
        }
    }

    /// Payload, if any.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Consume the envelope, returning the payload.
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Whether a payload is present.
    pub fn has_data(&self) -> bool {
        self.has_data
    }

    /// Whether the operation completed without a client error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Client error, if any.
    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    /// Validation messages, when the failure was a validation failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match &self.error {
            Some(ClientError::Validation(errors)) => Some(errors),
            _ => None,
        }
    }

    /// Coded error, when a hook aborted the operation.
    pub fn coded_error(&self) -> Option<&Error> {
        match &self.error {
            Some(ClientError::Coded(error)) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ETAG_KEY;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn success_serializes_with_null_error() {
        let value = serde_json::to_value(CrudResult::success(json!({ "id": "c-1" })))
            .expect("serialize envelope");
        assert_eq!(
            value,
            json!({ "data": { "id": "c-1" }, "hasData": true, "error": null })
        );
    }

    #[rstest]
    fn empty_success_serializes_without_data_or_error() {
        let result: CrudResult<()> = CrudResult::empty();
        let value = serde_json::to_value(&result).expect("serialize envelope");
        assert_eq!(value, json!({ "data": null, "hasData": false, "error": null }));
        assert!(result.is_success());
        assert!(!result.has_data());
    }

    #[rstest]
    fn validation_errors_serialize_as_a_field_map() {
        let result: CrudResult<()> =
            CrudResult::invalid(ValidationErrors::single(ETAG_KEY, "etag mismatch"));
        let value = serde_json::to_value(&result).expect("serialize envelope");
        assert_eq!(
            value,
            json!({ "data": null, "hasData": false, "error": { "etag": ["etag mismatch"] } })
        );
    }

    #[rstest]
    fn coded_errors_serialize_with_their_code() {
        let result: CrudResult<()> = CrudResult::failed(Error::forbidden("locked"));
        let value = serde_json::to_value(&result).expect("serialize envelope");
        assert_eq!(
            value,
            json!({
                "data": null,
                "hasData": false,
                "error": { "code": "forbidden", "message": "locked" }
            })
        );
        assert!(result.coded_error().is_some());
        assert!(result.validation_errors().is_none());
    }
}
