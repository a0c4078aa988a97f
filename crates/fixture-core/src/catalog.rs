//! Type catalog: the reified type graph that fixtures are generated from.
//!
//! A catalog holds the definitions of every user type reachable from a
//! fixture root. Built-in leaves and containers (`i32`, `Vec<T>`, `Map<K, V>`,
//! `Option<T>`) need no definition.
//!
//! ## YAML Format
//!
//! ```yaml
//! types:
//!   - name: Pair
//!     params: [L, R]
//!     shape:
//!       type: record
//!       fields:
//!         - name: left
//!           type: L
//!         - name: right
//!           type: R
//!           setter: set_right
//!   - name: Color
//!     shape:
//!       type: enum
//!       variants: [Red, Green, Blue]
//!   - name: Boxed
//!     params: [T]
//!     shape:
//!       type: wrapper
//!       wraps: T
//!   - name: Url
//!     shape:
//!       type: opaque
//! ```

use crate::types::TypeRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Error type for catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Error reading catalog file
    #[error("Failed to read catalog file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Two definitions share a name
    #[error("Type '{0}' is defined more than once")]
    DuplicateType(String),

    /// A definition references a type that is not in the catalog
    #[error("Type '{referenced}' referenced by '{owner}' is not defined")]
    UnknownType { owner: String, referenced: String },

    /// Two fields of one record share a name
    #[error("Field '{field}' is declared more than once in '{owner}'")]
    DuplicateField { owner: String, field: String },
}

/// A member of a record type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDef {
    /// Field name
    pub name: String,

    /// Declared field type; may reference the owner's generic parameters
    #[serde(rename = "type")]
    pub ty: TypeRef,

    /// Setter used when the assignment type is `method`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setter: Option<String>,

    /// Read-only fields are not populated
    #[serde(default)]
    pub read_only: bool,
}

impl FieldDef {
    /// Create a new writable field.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            setter: None,
            read_only: false,
        }
    }

    /// Attach a setter name to this field.
    pub fn with_setter(mut self, setter: impl Into<String>) -> Self {
        self.setter = Some(setter.into());
        self
    }

    /// Mark this field read-only.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Structural shape of a user type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeShape {
    /// Compound object with named fields
    Record {
        #[serde(default)]
        fields: Vec<FieldDef>,
    },

    /// Closed set of variant names
    Enum { variants: Vec<String> },

    /// Single-value container around `wraps`
    Wrapper { wraps: TypeRef },

    /// Leaf with no structure; needs a registered plug-in generator
    Opaque,
}

/// A user type definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeDef {
    /// Type name
    pub name: String,

    /// Generic parameter names, in declaration order
    #[serde(default)]
    pub params: Vec<String>,

    /// Structural shape
    pub shape: TypeShape,
}

impl TypeDef {
    /// Create a record definition.
    pub fn record(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            shape: TypeShape::Record { fields },
        }
    }

    /// Create an enum definition.
    pub fn enumeration(name: impl Into<String>, variants: &[&str]) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            shape: TypeShape::Enum {
                variants: variants.iter().map(|v| v.to_string()).collect(),
            },
        }
    }

    /// Create a wrapper definition.
    pub fn wrapper(name: impl Into<String>, wraps: TypeRef) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            shape: TypeShape::Wrapper { wraps },
        }
    }

    /// Create an opaque definition.
    pub fn opaque(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            shape: TypeShape::Opaque,
        }
    }

    /// Declare generic parameters.
    pub fn with_params(mut self, params: &[&str]) -> Self {
        self.params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Fields of a record; empty for every other shape.
    pub fn fields(&self) -> &[FieldDef] {
        match &self.shape {
            TypeShape::Record { fields } => fields,
            _ => &[],
        }
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Rewrite parameter references in every member type.
    fn normalize(&mut self) {
        let params = self.params.clone();
        match &mut self.shape {
            TypeShape::Record { fields } => {
                for field in fields.iter_mut() {
                    field.ty = field.ty.clone().with_params(&params);
                }
            }
            TypeShape::Wrapper { wraps } => {
                *wraps = wraps.clone().with_params(&params);
            }
            TypeShape::Enum { .. } | TypeShape::Opaque => {}
        }
    }

    fn member_types(&self) -> Vec<&TypeRef> {
        match &self.shape {
            TypeShape::Record { fields } => fields.iter().map(|f| &f.ty).collect(),
            TypeShape::Wrapper { wraps } => vec![wraps],
            TypeShape::Enum { .. } | TypeShape::Opaque => Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    types: Vec<TypeDef>,
}

/// Registry of user type definitions.
///
/// Read-only once built; one catalog can back any number of concurrent
/// generation calls.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: IndexMap<String, TypeDef>,
}

impl TypeCatalog {
    /// Build and validate a catalog from definitions.
    pub fn new(defs: Vec<TypeDef>) -> Result<Self, CatalogError> {
        let mut types = IndexMap::with_capacity(defs.len());
        for mut def in defs {
            def.normalize();
            if types.contains_key(&def.name) {
                return Err(CatalogError::DuplicateType(def.name));
            }
            types.insert(def.name.clone(), def);
        }

        let catalog = Self { types };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load catalog from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse catalog from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.types)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        for def in self.types.values() {
            let mut seen = Vec::new();
            for field in def.fields() {
                if seen.contains(&field.name.as_str()) {
                    return Err(CatalogError::DuplicateField {
                        owner: def.name.clone(),
                        field: field.name.clone(),
                    });
                }
                seen.push(field.name.as_str());
            }

            for ty in def.member_types() {
                if let Some(missing) = ty
                    .named_types()
                    .into_iter()
                    .find(|name| !self.types.contains_key(*name))
                {
                    return Err(CatalogError::UnknownType {
                        owner: def.name.clone(),
                        referenced: missing.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Get a type definition by name.
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Check whether a type is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// All type names, in definition order.
    pub fn type_names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
