//! Resolved class metadata
//!
//! [`ClassMetadata`] is what the factory caches per class: every property's
//! [`PropertyType`] in declaration order, plus the class lineage used for
//! instance-of checks. Inheritance is flattened here, so a child class sees
//! its parents' properties, defaults and casts as its own.

use std::sync::Arc;

use indexmap::IndexMap;
use parcel_types::TypeUnion;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::cast::PropertyCast;
use crate::declaration::{normalize_class_name, ClassDeclaration};
use crate::error::{DtoError, DtoResult};
use crate::factory::Factory;
use crate::property::PropertyType;
use crate::value::Value;

/// Property types of one class, shared by all of its instances
#[derive(Debug)]
pub struct ClassMetadata {
    name: String,
    lineage: Vec<String>,
    properties: IndexMap<String, Arc<PropertyType>>,
}

impl ClassMetadata {
    /// Resolve `name` and its ancestors through the factory's declaration source
    pub fn resolve(name: &str, factory: &Factory) -> DtoResult<Self> {
        let name = normalize_class_name(name);
        let chain = declaration_chain(name, factory)?;

        // Root first, so children override parents
        let mut tokens: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut defaults: FxHashMap<String, Value> = FxHashMap::default();
        let mut property_casts: FxHashMap<String, Vec<Arc<dyn PropertyCast>>> =
            FxHashMap::default();

        for declaration in chain.iter().rev() {
            for (property, property_tokens) in declaration.properties() {
                tokens.insert(property.clone(), property_tokens.clone());
            }

            for (property, value) in declaration.defaults() {
                if !tokens.contains_key(property) {
                    return Err(undeclared(declaration, property, "default"));
                }
                defaults.insert(property.clone(), value.clone());
            }

            for property in declaration.property_cast_names() {
                if !tokens.contains_key(property) {
                    return Err(undeclared(declaration, property, "cast"));
                }
                let mut casts = declaration.casts_for(property).to_vec();
                if let Some(inherited) = property_casts.remove(property) {
                    casts.extend(inherited);
                }
                property_casts.insert(property.to_string(), casts);
            }
        }

        let class_casts: Vec<Arc<dyn PropertyCast>> = chain
            .iter()
            .flat_map(|declaration| declaration.class_casts().iter().cloned())
            .collect();

        let mut properties = IndexMap::with_capacity(tokens.len());
        for (property, property_tokens) in tokens {
            let union = TypeUnion::parse(&property_tokens).map_err(|e| DtoError::Declaration {
                class: name.to_string(),
                reason: format!("property `{}`: {}", property, e),
            })?;

            let mut casts = property_casts.remove(&property).unwrap_or_default();
            casts.extend(class_casts.iter().cloned());
            casts.extend(factory.casts().iter().cloned());

            let resolved = PropertyType::resolve(
                name,
                &property,
                union,
                defaults.remove(&property),
                &casts,
                factory,
            )?;
            properties.insert(property, Arc::new(resolved));
        }

        let mut lineage: Vec<String> = chain
            .iter()
            .skip(1)
            .map(|declaration| declaration.name().to_string())
            .collect();
        for interface in chain.iter().flat_map(|declaration| declaration.interfaces()) {
            if !lineage.contains(interface) {
                lineage.push(interface.clone());
            }
        }

        debug!(
            class = name,
            properties = properties.len(),
            ancestors = chain.len() - 1,
            "resolved class metadata"
        );

        Ok(ClassMetadata {
            name: name.to_string(),
            lineage,
            properties,
        })
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a property type by name
    pub fn property(&self, name: &str) -> Option<&Arc<PropertyType>> {
        self.properties.get(name)
    }

    /// Check if a property is declared
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Declaration position of a property
    pub fn position(&self, name: &str) -> Option<usize> {
        self.properties.get_index_of(name)
    }

    /// All property types in declaration order
    pub fn properties(&self) -> &IndexMap<String, Arc<PropertyType>> {
        &self.properties
    }

    /// Property names in declaration order
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Number of declared properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if no property is declared
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Ancestors (nearest first) followed by implemented interfaces
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// Check if instances of this class satisfy the class token `class`
    pub fn is_instance_of(&self, class: &str) -> bool {
        let class = normalize_class_name(class);
        self.name == class || self.lineage.iter().any(|ancestor| ancestor == class)
    }
}

/// Declarations from `name` up to its root ancestor
fn declaration_chain(name: &str, factory: &Factory) -> DtoResult<Vec<Arc<ClassDeclaration>>> {
    let mut chain: Vec<Arc<ClassDeclaration>> = Vec::new();
    let mut current = Some(name.to_string());

    while let Some(class) = current {
        if let Some(start) = chain.iter().position(|d| d.name() == class) {
            let mut cycle: Vec<&str> = chain[start..].iter().map(|d| d.name()).collect();
            cycle.push(&class);
            return Err(DtoError::CircularInheritance {
                cycle: cycle.join(" -> "),
            });
        }

        let declaration = factory
            .source()
            .class(&class)
            .ok_or(DtoError::UnknownClass { class })?;
        current = declaration.parent().map(str::to_string);
        chain.push(declaration);
    }

    Ok(chain)
}

fn undeclared(declaration: &ClassDeclaration, property: &str, what: &str) -> DtoError {
    DtoError::Declaration {
        class: declaration.name().to_string(),
        reason: format!("{} given for undeclared property `{}`", what, property),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::DeclarationRegistry;

    fn factory(declarations: Vec<ClassDeclaration>) -> Factory {
        let registry = DeclarationRegistry::new();
        for declaration in declarations {
            registry.register(declaration);
        }
        Factory::new(registry)
    }

    #[test]
    fn test_inherited_properties_keep_parent_order() {
        let factory = factory(vec![
            ClassDeclaration::new("Base")
                .property("id", ["int"])
                .property("label", ["string"]),
            ClassDeclaration::new("Derived")
                .extends("Base")
                .property("extra", ["bool"])
                .property("label", ["null", "string"])
                .default("label", Value::Null),
        ]);

        let metadata = ClassMetadata::resolve("Derived", &factory).unwrap();
        let names: Vec<&str> = metadata.property_names().collect();
        assert_eq!(names, vec!["id", "label", "extra"]);

        let label = metadata.property("label").unwrap();
        assert!(label.is_nullable());
        assert_eq!(label.default_value(), Some(&Value::Null));
        assert!(metadata.is_instance_of("Base"));
        assert!(!metadata.is_instance_of("Other"));
    }

    #[test]
    fn test_circular_inheritance() {
        let factory = factory(vec![
            ClassDeclaration::new("A").extends("B"),
            ClassDeclaration::new("B").extends("A"),
        ]);

        match ClassMetadata::resolve("A", &factory).unwrap_err() {
            DtoError::CircularInheritance { cycle } => assert_eq!(cycle, "A -> B -> A"),
            other => panic!("Expected CircularInheritance, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_parent() {
        let factory = factory(vec![ClassDeclaration::new("A").extends("Missing")]);
        assert!(matches!(
            ClassMetadata::resolve("A", &factory),
            Err(DtoError::UnknownClass { class }) if class == "Missing"
        ));
    }

    #[test]
    fn test_default_for_undeclared_property() {
        let factory = factory(vec![ClassDeclaration::new("A").default("ghost", 1)]);
        assert!(matches!(
            ClassMetadata::resolve("A", &factory),
            Err(DtoError::Declaration { .. })
        ));
    }

    #[test]
    fn test_bad_token() {
        let factory = factory(vec![ClassDeclaration::new("A").property("p", ["int|"])]);
        match ClassMetadata::resolve("A", &factory).unwrap_err() {
            DtoError::Declaration { class, reason } => {
                assert_eq!(class, "A");
                assert!(reason.starts_with("property `p`"));
            }
            other => panic!("Expected Declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_interfaces_in_lineage() {
        let factory = factory(vec![
            ClassDeclaration::new("Base").implements("Named"),
            ClassDeclaration::new("Derived").extends("Base").implements("Stamped"),
        ]);

        let metadata = ClassMetadata::resolve("Derived", &factory).unwrap();
        assert_eq!(metadata.lineage(), &["Base", "Stamped", "Named"]);
        assert!(metadata.is_instance_of("\\Named"));
    }
}
