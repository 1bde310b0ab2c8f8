//! Start-up assembly of the registry from business modules.

use tracing::info;

use crate::domain::schema::{EntityDescriptor, EntityRegistry, RegistryError};

/// A business module contributing entity descriptors.
pub trait EntityModule {
    /// Module name used in start-up logs.
    fn name(&self) -> &str;

    /// Descriptors owned by the module.
    fn descriptors(&self) -> Vec<EntityDescriptor>;
}

/// Register every module's descriptors in order and freeze the registry.
///
/// # Errors
///
/// Returns the first [`RegistryError`]: a duplicate entity name across or
/// within modules, or an edge whose target no module registered.
///
/// # Examples
/// ```
/// use entity_backend::domain::module::{bootstrap_registry, EntityModule};
/// use entity_backend::domain::schema::{EntityDescriptor, FieldType};
///
/// struct Contacts;
///
/// impl EntityModule for Contacts {
///     fn name(&self) -> &str {
///         "contacts"
///     }
///
///     fn descriptors(&self) -> Vec<EntityDescriptor> {
///         vec![EntityDescriptor::builder("contact").field("name", FieldType::String).build()]
///     }
/// }
///
/// let registry = bootstrap_registry(&[&Contacts]).expect("registry builds");
/// assert!(registry.lookup("contact").is_some());
/// ```
pub fn bootstrap_registry(modules: &[&dyn EntityModule]) -> Result<EntityRegistry, RegistryError> {
    let mut builder = EntityRegistry::builder();
    for module in modules {
        let descriptors = module.descriptors();
        let count = descriptors.len();
        for descriptor in descriptors {
            builder.register(descriptor)?;
        }
        info!(module = module.name(), entities = count, "module entities registered");
    }
    let registry = builder.build()?;
    info!(entities = registry.len(), "entity registry ready");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::schema::FieldType;
    use rstest::rstest;

    struct StaticModule {
        name: &'static str,
        descriptors: Vec<EntityDescriptor>,
    }

    impl EntityModule for StaticModule {
        fn name(&self) -> &str {
            self.name
        }

        fn descriptors(&self) -> Vec<EntityDescriptor> {
            self.descriptors.clone()
        }
    }

    fn entity(name: &str) -> EntityDescriptor {
        EntityDescriptor::builder(name)
            .field("name", FieldType::String)
            .build()
    }

    #[rstest]
    fn modules_may_reference_each_others_entities() {
        let identity = StaticModule {
            name: "identity",
            descriptors: vec![entity("user")],
        };
        let contacts = StaticModule {
            name: "contacts",
            descriptors: vec![EntityDescriptor::builder("contact")
                .field("name", FieldType::String)
                .edge("owner", "user")
                .build()],
        };

        let registry = bootstrap_registry(&[&contacts, &identity]).expect("registry builds");

        assert_eq!(registry.names(), vec!["contact", "user"]);
    }

    #[rstest]
    fn duplicate_names_across_modules_are_fatal() {
        let first = StaticModule {
            name: "inventory",
            descriptors: vec![entity("item")],
        };
        let second = StaticModule {
            name: "catalogue",
            descriptors: vec![entity("item")],
        };

        let err = bootstrap_registry(&[&first, &second]).expect_err("duplicate entity");

        assert_eq!(
            err,
            RegistryError::AlreadyRegistered {
                name: "item".to_owned()
            }
        );
    }
}
