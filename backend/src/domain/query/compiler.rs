//! Recursive compiler from search graphs to predicates and order clauses.

use tracing::debug;

use super::operator::compile_condition;
use super::{Condition, OrderOption, Predicate, SearchGraph, SearchNode, SearchOrder, SortDirection};
use crate::domain::schema::{EntityDescriptor, EntityRegistry};
use crate::domain::{ValidationErrors, ENTITY_KEY, ORDER_KEY, SEARCH_KEY};

/// Outcome of compiling one search graph.
///
/// `predicate` is present only when `errors` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSearch {
    /// Combined filter.
    pub predicate: Option<Predicate>,
    /// Validated sort clauses.
    pub order: Vec<OrderOption>,
    /// Every problem found, keyed by field path or reserved key.
    pub errors: ValidationErrors,
}

impl CompiledSearch {
    /// Whether compilation produced no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Split into the predicate and order clauses, or the errors.
    ///
    /// # Errors
    ///
    /// Returns the accumulated [`ValidationErrors`] when any were recorded.
    pub fn into_result(self) -> Result<(Predicate, Vec<OrderOption>), ValidationErrors> {
        match self.predicate {
            Some(predicate) if self.errors.is_empty() => Ok((predicate, self.order)),
            _ => Err(self.errors),
        }
    }
}

/// Compiles search graphs against a shared registry.
///
/// Compilation is pure: the same graph always yields an equal result.
///
/// # Examples
/// ```
/// use entity_backend::domain::query::{SearchCompiler, SearchGraph};
/// use entity_backend::domain::schema::EntityRegistry;
///
/// let registry = EntityRegistry::from_json(
///     r#"{ "entities": [ { "name": "contact", "fields": { "age": "int" } } ] }"#,
/// )
/// .expect("catalogue is valid");
/// let graph = SearchGraph::parse(r#"{ "if": ["age", ">", "30"] }"#).expect("valid JSON");
/// let compiled = SearchCompiler::new(registry).compile(&graph, "contact");
/// let predicate = compiled.predicate.expect("no errors");
/// assert_eq!(predicate.to_string(), "age > 30");
/// ```
#[derive(Debug, Clone)]
pub struct SearchCompiler {
    registry: EntityRegistry,
}

impl SearchCompiler {
    /// Create a compiler over `registry`.
    #[must_use]
    pub fn new(registry: EntityRegistry) -> Self {
        Self { registry }
    }

    /// Registry used for lookups.
    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Compile `graph` for `entity`.
    #[must_use]
    pub fn compile(&self, graph: &SearchGraph, entity: &str) -> CompiledSearch {
        let Some(descriptor) = self.registry.lookup(entity) else {
            return CompiledSearch {
                predicate: None,
                order: Vec::new(),
                errors: unregistered(entity),
            };
        };

        let (predicate, mut errors) = match self.compile_node(&graph.root, entity) {
            Ok(predicate) => (Some(predicate), ValidationErrors::new()),
            Err(errors) => (None, errors),
        };
        let (order, order_errors) = compile_order(descriptor, &graph.order);
        errors.merge(order_errors);

        debug!(
            entity,
            errors = errors.len(),
            order_clauses = order.len(),
            "search graph compiled"
        );
        CompiledSearch {
            predicate: predicate.filter(|_| errors.is_empty()),
            order,
            errors,
        }
    }

    /// Compile one node. Child errors accumulate without short-circuiting.
    ///
    /// # Errors
    ///
    /// Returns every validation problem found in the subtree.
    pub fn compile_node(
        &self,
        node: &SearchNode,
        entity: &str,
    ) -> Result<Predicate, ValidationErrors> {
        if !node.unknown.is_empty() {
            let mut errors = ValidationErrors::new();
            for key in node.unknown.keys() {
                errors.add(SEARCH_KEY, format!("unknown search node key '{key}'"));
            }
            return Err(errors);
        }
        if node.populated_keys() > 1 {
            return Err(ValidationErrors::single(
                SEARCH_KEY,
                "search node must populate only one of 'if', 'and' and 'or'",
            ));
        }
        if let Some(condition) = &node.condition {
            return self.compile_leaf(condition, entity);
        }
        if let Some(children) = &node.and {
            return self.compile_children(children, entity).map(Predicate::all);
        }
        if let Some(children) = &node.or {
            return self.compile_children(children, entity).map(Predicate::any);
        }
        Ok(Predicate::MatchAll)
    }

    fn compile_children(
        &self,
        children: &[SearchNode],
        entity: &str,
    ) -> Result<Vec<Predicate>, ValidationErrors> {
        let mut predicates = Vec::with_capacity(children.len());
        let mut errors = ValidationErrors::new();
        for child in children {
            match self.compile_node(child, entity) {
                Ok(predicate) => predicates.push(predicate),
                Err(child_errors) => errors.merge(child_errors),
            }
        }
        errors.into_result().map(|()| predicates)
    }

    fn compile_leaf(
        &self,
        condition: &Condition,
        entity: &str,
    ) -> Result<Predicate, ValidationErrors> {
        let parts = condition.parts();
        if parts.len() < 2 || parts.iter().any(String::is_empty) {
            let key = condition
                .field()
                .filter(|field| !field.is_empty())
                .unwrap_or(SEARCH_KEY);
            return Err(ValidationErrors::single(
                key,
                format!("condition '{condition}' needs [field, operator, ...values], none empty"),
            ));
        }
        let path = condition.field().unwrap_or_default();
        self.compile_path(entity, path, condition)
    }

    fn compile_path(
        &self,
        entity: &str,
        path: &str,
        condition: &Condition,
    ) -> Result<Predicate, ValidationErrors> {
        let key = condition.field().unwrap_or(SEARCH_KEY);
        let descriptor = self
            .registry
            .lookup(entity)
            .ok_or_else(|| unregistered(entity))?;

        match path.split_once('.') {
            Some((edge_name, rest)) => {
                let edge = descriptor.edge(edge_name).ok_or_else(|| {
                    ValidationErrors::single(
                        key,
                        format!("unrecognized relationship '{edge_name}' on entity '{entity}'"),
                    )
                })?;
                let inner = self.compile_path(edge.target(), rest, condition)?;
                Ok(edge.wrap(edge_name, inner))
            }
            None => compile_condition(descriptor, path, condition)
                .map_err(|err| ValidationErrors::single(key, err.to_string())),
        }
    }
}

fn unregistered(entity: &str) -> ValidationErrors {
    ValidationErrors::single(ENTITY_KEY, format!("entity '{entity}' is not registered"))
}

fn compile_order(
    descriptor: &EntityDescriptor,
    requested: &[SearchOrder],
) -> (Vec<OrderOption>, ValidationErrors) {
    let mut order = Vec::with_capacity(requested.len());
    let mut errors = ValidationErrors::new();
    for clause in requested {
        let direction = SortDirection::parse(&clause.dir);
        if direction.is_none() {
            errors.add(
                ORDER_KEY,
                format!(
                    "invalid direction '{}' for field '{}'; expected 'asc' or 'desc'",
                    clause.dir, clause.field
                ),
            );
        }
        let field_known = match descriptor.field_type(&clause.field) {
            Ok(_) => true,
            Err(err) => {
                errors.add(ORDER_KEY, err.to_string());
                false
            }
        };
        if let (Some(direction), true) = (direction, field_known) {
            order.push(OrderOption::new(clause.field.as_str(), direction));
        }
    }
    (order, errors)
}
