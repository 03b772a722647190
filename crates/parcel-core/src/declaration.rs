//! Class declarations and declaration sources
//!
//! The engine never introspects live types. Everything it knows about a
//! class comes from a [`ClassDeclaration`]: ordered property names with
//! their type tokens, explicit defaults, and cast overrides. Declarations
//! are looked up by name through a [`DeclarationSource`].

use std::fmt;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::cast::PropertyCast;
use crate::value::Value;

/// Strip the optional leading namespace separator from a class name
pub(crate) fn normalize_class_name(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

/// Declaration of a DTO class
///
/// Built with chained calls:
///
/// ```ignore
/// let decl = ClassDeclaration::new("Child")
///     .property("first_name", ["string"])
///     .property("parent", ["null", "Parent"])
///     .default("parent", Value::Null);
/// ```
#[derive(Clone)]
pub struct ClassDeclaration {
    name: String,
    extends: Option<String>,
    implements: Vec<String>,
    properties: IndexMap<String, Vec<String>>,
    defaults: IndexMap<String, Value>,
    property_casts: FxHashMap<String, Vec<Arc<dyn PropertyCast>>>,
    casts: Vec<Arc<dyn PropertyCast>>,
}

impl ClassDeclaration {
    /// Start a declaration for `name`
    pub fn new(name: impl AsRef<str>) -> Self {
        ClassDeclaration {
            name: normalize_class_name(name.as_ref()).to_string(),
            extends: None,
            implements: Vec::new(),
            properties: IndexMap::new(),
            defaults: IndexMap::new(),
            property_casts: FxHashMap::default(),
            casts: Vec::new(),
        }
    }

    /// Inherit properties, defaults and casts from `parent`
    pub fn extends(mut self, parent: impl AsRef<str>) -> Self {
        self.extends = Some(normalize_class_name(parent.as_ref()).to_string());
        self
    }

    /// Declare that instances satisfy the `interface` class token
    pub fn implements(mut self, interface: impl AsRef<str>) -> Self {
        let interface = normalize_class_name(interface.as_ref()).to_string();
        if !self.implements.contains(&interface) {
            self.implements.push(interface);
        }
        self
    }

    /// Declare a property with its type tokens
    ///
    /// Redeclaring a name replaces its tokens but keeps its position.
    pub fn property<I, S>(mut self, name: impl Into<String>, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties
            .insert(name.into(), tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Declare an explicit default value
    ///
    /// An instance default ([`Value::Dto`]) holds the [`Factory`](crate::Factory)
    /// that built it, so the declaration keeps that factory alive. When the
    /// same factory's source also owns this declaration the two form an `Arc`
    /// cycle and are never freed; build instance defaults with a long-lived
    /// factory such as [`Factory::shared`](crate::Factory::shared).
    pub fn default(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// Register a cast that only applies to one property
    pub fn property_cast(mut self, name: impl Into<String>, cast: Arc<dyn PropertyCast>) -> Self {
        self.property_casts.entry(name.into()).or_default().push(cast);
        self
    }

    /// Register a cast for every property of this class
    pub fn cast(mut self, cast: Arc<dyn PropertyCast>) -> Self {
        self.casts.push(cast);
        self
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent class, if any
    pub fn parent(&self) -> Option<&str> {
        self.extends.as_deref()
    }

    /// Declared interfaces
    pub fn interfaces(&self) -> &[String] {
        &self.implements
    }

    /// Properties and their tokens in declaration order
    pub fn properties(&self) -> &IndexMap<String, Vec<String>> {
        &self.properties
    }

    /// Explicit defaults
    pub fn defaults(&self) -> &IndexMap<String, Value> {
        &self.defaults
    }

    /// Casts registered for `property`
    pub fn casts_for(&self, property: &str) -> &[Arc<dyn PropertyCast>] {
        self.property_casts
            .get(property)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Names of properties with dedicated casts
    pub fn property_cast_names(&self) -> impl Iterator<Item = &str> {
        self.property_casts.keys().map(String::as_str)
    }

    /// Class-wide casts
    pub fn class_casts(&self) -> &[Arc<dyn PropertyCast>] {
        &self.casts
    }
}

impl fmt::Debug for ClassDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDeclaration")
            .field("name", &self.name)
            .field("extends", &self.extends)
            .field("implements", &self.implements)
            .field("properties", &self.properties)
            .field("defaults", &self.defaults)
            .field("casts", &self.casts.len())
            .finish()
    }
}

/// Declaration of a typed collection such as `UserCollection` of `User`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDeclaration {
    /// Collection type name
    pub name: String,
    /// Class of every element
    pub item_class: String,
}

impl CollectionDeclaration {
    /// Declare collection `name` holding `item_class` instances
    pub fn new(name: impl AsRef<str>, item_class: impl AsRef<str>) -> Self {
        CollectionDeclaration {
            name: normalize_class_name(name.as_ref()).to_string(),
            item_class: normalize_class_name(item_class.as_ref()).to_string(),
        }
    }
}

/// Provider of class declarations
pub trait DeclarationSource: Send + Sync {
    /// Look up the declaration of `name`
    fn class(&self, name: &str) -> Option<Arc<ClassDeclaration>>;

    /// Look up a typed collection declaration
    fn collection(&self, _name: &str) -> Option<Arc<CollectionDeclaration>> {
        None
    }
}

impl<T: DeclarationSource + ?Sized> DeclarationSource for Arc<T> {
    fn class(&self, name: &str) -> Option<Arc<ClassDeclaration>> {
        (**self).class(name)
    }

    fn collection(&self, name: &str) -> Option<Arc<CollectionDeclaration>> {
        (**self).collection(name)
    }
}

/// Global registry, created on first use
static SHARED_REGISTRY: LazyLock<Arc<DeclarationRegistry>> =
    LazyLock::new(|| Arc::new(DeclarationRegistry::new()));

/// Thread-safe in-memory declaration source
#[derive(Debug, Default)]
pub struct DeclarationRegistry {
    classes: RwLock<FxHashMap<String, Arc<ClassDeclaration>>>,
    collections: RwLock<FxHashMap<String, Arc<CollectionDeclaration>>>,
}

impl DeclarationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry backing [`crate::Factory::shared`]
    pub fn shared() -> Arc<DeclarationRegistry> {
        Arc::clone(&SHARED_REGISTRY)
    }

    /// Register (or replace) a class declaration
    ///
    /// Factories that already cached metadata for the class keep using it
    /// until their cache is cleared.
    pub fn register(&self, declaration: ClassDeclaration) {
        self.classes
            .write()
            .insert(declaration.name.clone(), Arc::new(declaration));
    }

    /// Register (or replace) a collection declaration
    pub fn register_collection(&self, declaration: CollectionDeclaration) {
        self.collections
            .write()
            .insert(declaration.name.clone(), Arc::new(declaration));
    }

    /// Check if a class is registered
    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(normalize_class_name(name))
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    /// Check if no class is registered
    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }
}

impl DeclarationSource for DeclarationRegistry {
    fn class(&self, name: &str) -> Option<Arc<ClassDeclaration>> {
        self.classes.read().get(normalize_class_name(name)).cloned()
    }

    fn collection(&self, name: &str) -> Option<Arc<CollectionDeclaration>> {
        self.collections
            .read()
            .get(normalize_class_name(name))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_order() {
        let decl = ClassDeclaration::new("\\App\\Child")
            .property("last_name", ["string"])
            .property("first_name", ["string"])
            .property("last_name", ["null", "string"]);

        assert_eq!(decl.name(), "App\\Child");
        let names: Vec<&String> = decl.properties().keys().collect();
        assert_eq!(names, vec!["last_name", "first_name"]);
        assert_eq!(decl.properties()["last_name"], vec!["null", "string"]);
    }

    #[test]
    fn test_registry_lookup() {
        let registry = DeclarationRegistry::new();
        assert!(registry.is_empty());

        registry.register(ClassDeclaration::new("User").property("name", ["string"]));
        registry.register_collection(CollectionDeclaration::new("UserCollection", "\\User"));

        assert!(registry.contains("\\User"));
        assert_eq!(registry.len(), 1);
        assert!(registry.class("Missing").is_none());

        let collection = registry.collection("UserCollection").unwrap();
        assert_eq!(collection.item_class, "User");
    }

    #[test]
    fn test_interfaces_deduplicated() {
        let decl = ClassDeclaration::new("A")
            .implements("Named")
            .implements("\\Named");
        assert_eq!(decl.interfaces(), &["Named".to_string()]);
    }
}
