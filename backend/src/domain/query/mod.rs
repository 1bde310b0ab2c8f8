//! Search-graph DSL and its compiler.
//!
//! Requests arrive as a JSON boolean tree ([`SearchGraph`]). The
//! [`SearchCompiler`] validates every condition against the
//! [`EntityRegistry`](crate::domain::schema::EntityRegistry) and produces a
//! storage-neutral [`Predicate`] plus [`OrderOption`]s, or the full set of
//! validation errors.

mod compiler;
mod graph;
mod operator;
mod predicate;

pub use compiler::{CompiledSearch, SearchCompiler};
pub use graph::{Condition, SearchGraph, SearchNode, SearchOrder};
pub use operator::{compile_condition, ConditionError, Operator, OperatorFamily};
pub use predicate::{CompareOp, OrderOption, Predicate, SortDirection, TextOp};

#[cfg(test)]
mod tests;
