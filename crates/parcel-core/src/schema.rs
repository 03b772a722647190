//! Declarations loaded from JSON or TOML documents
//!
//! ```toml
//! [classes.User]
//! properties = { name = "string", age = ["null", "int"], tags = "string[]" }
//! defaults = { age = 0 }
//!
//! [classes.Admin]
//! extends = "User"
//! implements = ["Privileged"]
//! properties = { level = "int" }
//!
//! [collections]
//! UserCollection = "User"
//! ```
//!
//! Casts cannot be expressed in documents; register them on the factory.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::declaration::{ClassDeclaration, CollectionDeclaration, DeclarationRegistry};
use crate::error::{DtoError, DtoResult};
use crate::value::Value;

/// Declaration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaDocument {
    /// Class declarations by name
    pub classes: IndexMap<String, ClassSchema>,
    /// Collection name to element class
    pub collections: IndexMap<String, String>,
}

/// One class of a [`SchemaDocument`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassSchema {
    /// Parent class
    pub extends: Option<String>,
    /// Implemented interfaces
    pub implements: Vec<String>,
    /// Property type tokens in declaration order
    pub properties: IndexMap<String, TypeSpec>,
    /// Explicit defaults
    pub defaults: IndexMap<String, serde_json::Value>,
}

/// Type tokens of a property: `"null|string"` or `["null", "string"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    /// Single, possibly pipe-separated, declaration
    Single(String),
    /// List of alternatives
    List(Vec<String>),
}

impl TypeSpec {
    /// Tokens as declared
    pub fn tokens(&self) -> Vec<String> {
        match self {
            TypeSpec::Single(token) => vec![token.clone()],
            TypeSpec::List(tokens) => tokens.clone(),
        }
    }
}

impl SchemaDocument {
    /// Parse a JSON document
    pub fn from_json_str(s: &str) -> DtoResult<Self> {
        serde_json::from_str(s).map_err(|e| DtoError::Schema(e.to_string()))
    }

    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> DtoResult<Self> {
        toml::from_str(s).map_err(|e| DtoError::Schema(e.to_string()))
    }

    /// Class declarations described by this document
    pub fn declarations(&self) -> Vec<ClassDeclaration> {
        self.classes
            .iter()
            .map(|(name, schema)| schema.declaration(name))
            .collect()
    }

    /// Register every class and collection into `registry`
    pub fn register_into(&self, registry: &DeclarationRegistry) {
        for declaration in self.declarations() {
            registry.register(declaration);
        }
        for (name, item_class) in &self.collections {
            registry.register_collection(CollectionDeclaration::new(name, item_class));
        }
    }

    /// A new registry holding this document's declarations
    pub fn into_registry(self) -> DeclarationRegistry {
        let registry = DeclarationRegistry::new();
        self.register_into(&registry);
        registry
    }
}

impl ClassSchema {
    fn declaration(&self, name: &str) -> ClassDeclaration {
        let mut declaration = ClassDeclaration::new(name);
        if let Some(parent) = &self.extends {
            declaration = declaration.extends(parent);
        }
        for interface in &self.implements {
            declaration = declaration.implements(interface);
        }
        for (property, spec) in &self.properties {
            declaration = declaration.property(property.as_str(), spec.tokens());
        }
        for (property, value) in &self.defaults {
            declaration = declaration.default(property.as_str(), Value::from(value.clone()));
        }
        declaration
    }
}
