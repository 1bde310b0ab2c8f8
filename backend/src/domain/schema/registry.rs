//! Write-once catalogue of entity descriptors.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cap_std::{ambient_authority, fs::Dir};
use serde::Deserialize;
use thiserror::Error;

use super::{EntityDescriptor, FieldType};

/// Configuration errors raised while assembling the registry.
///
/// Every variant is fatal at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A descriptor with the same name was registered earlier.
    #[error("entity '{name}' is already registered")]
    AlreadyRegistered {
        /// Duplicate entity name.
        name: String,
    },
    /// A lookup named an entity that was never registered.
    #[error("entity '{name}' is not registered")]
    MissingDescriptor {
        /// Requested entity name.
        name: String,
    },
    /// An edge targets an entity that is not registered.
    #[error("edge '{edge}' on entity '{entity}' targets unregistered entity '{target}'")]
    DanglingEdge {
        /// Entity declaring the edge.
        entity: String,
        /// Edge name.
        edge: String,
        /// Missing target entity.
        target: String,
    },
    /// A catalogue field names a type outside the closed set.
    #[error("field '{field}' on entity '{entity}' has unknown type '{type_name}'")]
    UnknownFieldType {
        /// Entity declaring the field.
        entity: String,
        /// Field name.
        field: String,
        /// Unrecognised type name.
        type_name: String,
    },
    /// The catalogue document is not valid JSON of the expected shape.
    #[error("invalid entity catalogue: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },
    /// The catalogue file could not be read.
    #[error("failed to read entity catalogue {}: {message}", .path.display())]
    Io {
        /// Catalogue path.
        path: PathBuf,
        /// I/O diagnostic.
        message: String,
    },
}

/// Mutable registry used during start-up.
///
/// # Examples
/// ```
/// use entity_backend::domain::schema::{EntityDescriptor, EntityRegistryBuilder, FieldType};
///
/// let mut builder = EntityRegistryBuilder::new();
/// builder
///     .register(EntityDescriptor::builder("contact").field("name", FieldType::String).build())
///     .expect("first registration succeeds");
/// let registry = builder.build().expect("no dangling edges");
/// assert!(registry.lookup("contact").is_some());
/// ```
#[derive(Debug, Default)]
pub struct EntityRegistryBuilder {
    descriptors: HashMap<String, EntityDescriptor>,
}

impl EntityRegistryBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyRegistered`] when the name is taken.
    pub fn register(&mut self, descriptor: EntityDescriptor) -> Result<&mut Self, RegistryError> {
        if self.descriptors.contains_key(descriptor.name()) {
            return Err(RegistryError::AlreadyRegistered {
                name: descriptor.name().to_owned(),
            });
        }
        self.descriptors
            .insert(descriptor.name().to_owned(), descriptor);
        Ok(self)
    }

    /// Register every entity declared in a JSON catalogue document.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] for malformed documents,
    /// [`RegistryError::UnknownFieldType`] for unsupported type names and
    /// [`RegistryError::AlreadyRegistered`] for duplicates.
    pub fn register_catalogue(&mut self, json: &str) -> Result<&mut Self, RegistryError> {
        let catalogue: CatalogueDocument =
            serde_json::from_str(json).map_err(|err| RegistryError::Parse {
                message: err.to_string(),
            })?;
        for entity in catalogue.entities {
            self.register(entity.into_descriptor()?)?;
        }
        Ok(self)
    }

    /// Freeze the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DanglingEdge`] for the first edge, in entity
    /// and edge name order, whose target is not registered.
    pub fn build(self) -> Result<EntityRegistry, RegistryError> {
        let mut names: Vec<&String> = self.descriptors.keys().collect();
        names.sort();
        for name in names {
            let Some(descriptor) = self.descriptors.get(name) else {
                continue;
            };
            for (edge, target) in descriptor.edges() {
                if !self.descriptors.contains_key(target.target()) {
                    return Err(RegistryError::DanglingEdge {
                        entity: name.clone(),
                        edge: edge.to_owned(),
                        target: target.target().to_owned(),
                    });
                }
            }
        }
        Ok(EntityRegistry {
            descriptors: Arc::new(self.descriptors),
        })
    }
}

/// Immutable, cheaply clonable handle to the registered descriptors.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    descriptors: Arc<HashMap<String, EntityDescriptor>>,
}

impl EntityRegistry {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> EntityRegistryBuilder {
        EntityRegistryBuilder::new()
    }

    /// Build a registry from a JSON catalogue document.
    ///
    /// ```
    /// use entity_backend::domain::schema::{EntityRegistry, FieldType};
    ///
    /// let registry = EntityRegistry::from_json(
    ///     r#"{ "entities": [ { "name": "contact", "fields": { "age": "int" } } ] }"#,
    /// )
    /// .expect("catalogue is valid");
    /// let contact = registry.lookup("contact").expect("registered");
    /// assert_eq!(contact.field_type("age"), Ok(&FieldType::Int));
    /// ```
    ///
    /// # Errors
    ///
    /// See [`EntityRegistryBuilder::register_catalogue`] and
    /// [`EntityRegistryBuilder::build`].
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let mut builder = EntityRegistryBuilder::new();
        builder.register_catalogue(json)?;
        builder.build()
    }

    /// Read and load a JSON catalogue file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Io`] when the file cannot be read, otherwise
    /// the errors of [`EntityRegistry::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let json = read_catalogue(path).map_err(|err| RegistryError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Descriptor registered under `name`, if any.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&EntityDescriptor> {
        self.descriptors.get(name)
    }

    /// Descriptor registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MissingDescriptor`] when absent.
    pub fn descriptor(&self, name: &str) -> Result<&EntityDescriptor, RegistryError> {
        self.lookup(name)
            .ok_or_else(|| RegistryError::MissingDescriptor {
                name: name.to_owned(),
            })
    }

    /// Registered entity names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.descriptors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Read the catalogue through a capability handle on its parent directory.
fn read_catalogue(path: &Path) -> io::Result<String> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "catalogue path has no file name")
    })?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let directory = Dir::open_ambient_dir(parent, ambient_authority())?;
    directory.read_to_string(file_name)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogueDocument {
    entities: Vec<CatalogueEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogueEntity {
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, CatalogueFieldType>,
    #[serde(default)]
    edges: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogueFieldType {
    Named(String),
    Enum {
        #[serde(rename = "enum")]
        variants: Vec<String>,
    },
}

impl CatalogueEntity {
    fn into_descriptor(self) -> Result<EntityDescriptor, RegistryError> {
        let Self {
            name,
            fields,
            edges,
        } = self;
        let mut builder = EntityDescriptor::builder(name.clone());
        for (field, declared) in fields {
            let field_type = match declared {
                CatalogueFieldType::Named(type_name) => {
                    type_name.parse::<FieldType>().map_err(|unknown| {
                        RegistryError::UnknownFieldType {
                            entity: name.clone(),
                            field: field.clone(),
                            type_name: unknown.0,
                        }
                    })?
                }
                CatalogueFieldType::Enum { variants } => FieldType::Enum(variants),
            };
            builder = builder.field(field, field_type);
        }
        for (edge, target) in edges {
            builder = builder.edge(edge, target);
        }
        Ok(builder.build())
    }
}
