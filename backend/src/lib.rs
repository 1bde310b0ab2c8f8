//! Entity backend library.
//!
//! Compiles client search graphs into typed predicates over registered
//! entities and runs validated CRUD pipelines against pluggable repositories.

pub mod domain;
pub mod outbound;
pub mod settings;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
