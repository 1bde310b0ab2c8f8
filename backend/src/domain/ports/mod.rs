//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod entity_repository;

#[cfg(test)]
pub use entity_repository::MockEntityRepository;
pub use entity_repository::{EntityRepository, EntityRepositoryError, SearchPage, SearchRequest};
