//! Sample `contact` entity wired for the CRUD pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::crud::{Entity, EntityFlow, Etag, StepResult, ValidateMode};
use crate::domain::schema::{EntityDescriptor, EntityRegistry, FieldType, RegistryError};
use crate::domain::{Error, RequestContext, ValidationErrors};

/// Email domain rejected by [`ContactFlow::assert_create_rules`].
pub const BLOCKED_EMAIL_DOMAIN: &str = "blocked.test";

/// Company embedded in a contact; the target of the `company` edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Company name.
    pub name: String,
    /// Head count.
    pub size: i64,
}

impl Company {
    /// Company called `name` with `size` employees.
    pub fn new(name: impl Into<String>, size: i64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Sample persisted contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Record identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional email address.
    pub email: Option<String>,
    /// Age in years.
    pub age: i64,
    /// `active` or `pending`.
    pub status: String,
    /// Employer, if any.
    pub company: Option<Company>,
    /// Concurrency token.
    pub etag: Option<Etag>,
}

impl Contact {
    /// Contact with the given identity and defaults elsewhere.
    pub fn new(id: impl Into<String>, name: impl Into<String>, age: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            age,
            status: "active".to_owned(),
            company: None,
            etag: None,
        }
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Set the employer.
    #[must_use]
    pub fn with_company(mut self, company: Company) -> Self {
        self.company = Some(company);
        self
    }

    /// Set the concurrency token.
    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(Etag::new(etag));
        self
    }
}

impl Entity for Contact {
    const NAME: &'static str = "contact";

    fn id(&self) -> &str {
        &self.id
    }

    fn etag(&self) -> Option<&Etag> {
        self.etag.as_ref()
    }

    fn set_etag(&mut self, etag: Etag) {
        self.etag = Some(etag);
    }
}

/// Create command mapped onto [`Contact`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewContact {
    /// Client-chosen identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Age in years.
    pub age: i64,
    /// Status; [`ContactFlow`] defaults it to `pending`.
    #[serde(default)]
    pub status: Option<String>,
}

impl NewContact {
    /// Command with no email or status.
    pub fn new(id: impl Into<String>, name: impl Into<String>, age: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            age,
            status: None,
        }
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

impl From<NewContact> for Contact {
    fn from(command: NewContact) -> Self {
        Self {
            id: command.id,
            name: command.name,
            email: command.email,
            age: command.age,
            status: command.status.unwrap_or_default(),
            company: None,
            etag: None,
        }
    }
}

/// Flow with a few representative rules.
///
/// - `status` defaults to `pending`.
/// - `name` is required and `age` must not be negative.
/// - Names are trimmed and emails lower-cased.
/// - Emails at [`BLOCKED_EMAIL_DOMAIN`] are forbidden on create.
/// - Active contacts cannot be deleted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactFlow;

#[async_trait]
impl EntityFlow<Contact> for ContactFlow {
    fn set_defaults(&self, model: &mut Contact) {
        if model.status.is_empty() {
            "pending".clone_into(&mut model.status);
        }
    }

    fn validate(&self, model: &Contact, _mode: ValidateMode, errors: &mut ValidationErrors) {
        if model.name.trim().is_empty() {
            errors.add("name", "name is required");
        }
        if model.age < 0 {
            errors.add("age", "age must not be negative");
        }
    }

    fn sanitize(&self, model: &mut Contact) {
        model.name = model.name.trim().to_owned();
        if let Some(email) = model.email.as_mut() {
            *email = email.to_lowercase();
        }
    }

    async fn assert_create_rules(
        &self,
        _ctx: &RequestContext,
        model: &Contact,
        _errors: &mut ValidationErrors,
    ) -> StepResult {
        let blocked = model
            .email
            .as_deref()
            .is_some_and(|email| email.ends_with(&format!("@{BLOCKED_EMAIL_DOMAIN}")));
        if blocked {
            return Err(Error::forbidden(format!(
                "emails at {BLOCKED_EMAIL_DOMAIN} are not accepted"
            )));
        }
        Ok(())
    }

    async fn assert_delete_rules(
        &self,
        _ctx: &RequestContext,
        model: &Contact,
        errors: &mut ValidationErrors,
    ) -> StepResult {
        if model.status == "active" {
            errors.add("status", "active contacts cannot be deleted");
        }
        Ok(())
    }
}

/// Registry holding `contact` and `company`.
///
/// # Errors
///
/// Never in practice; the descriptors are static.
pub fn contact_registry() -> Result<EntityRegistry, RegistryError> {
    let mut builder = EntityRegistry::builder();
    builder
        .register(
            EntityDescriptor::builder("contact")
                .field("id", FieldType::String)
                .field("name", FieldType::String)
                .field("email", FieldType::String)
                .field("age", FieldType::Int)
                .field(
                    "status",
                    FieldType::Enum(vec!["active".to_owned(), "pending".to_owned()]),
                )
                .edge("company", "company")
                .build(),
        )?
        .register(
            EntityDescriptor::builder("company")
                .field("name", FieldType::String)
                .field("size", FieldType::Int)
                .build(),
        )?;
    builder.build()
}
