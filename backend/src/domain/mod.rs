//! Domain primitives and the query and CRUD engine.
//!
//! Purpose: hold the transport- and storage-agnostic core. The registry and
//! search compiler are pure; the CRUD service talks to storage only through
//! [`ports::EntityRepository`].

pub mod crud;
pub mod module;
pub mod ports;
pub mod query;
pub mod schema;

mod context;
mod error;
mod trace_id;
mod validation;

pub use self::context::RequestContext;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::trace_id::TraceId;
pub use self::validation::{
    ValidationErrors, ENTITY_KEY, ETAG_KEY, ID_KEY, ORDER_KEY, PAGE_KEY, SEARCH_KEY,
};
