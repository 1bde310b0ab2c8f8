//! Outbound adapters implementing domain ports.
//!
//! Adapters translate between domain types and a storage representation and
//! contain no business logic.
//!
//! - **memory**: map-backed [`EntityRepository`](crate::domain::ports::EntityRepository)
//!   that evaluates compiled predicates in process.

pub mod memory;
