//! Constructed DTO instances
//!
//! A [`Dto`] holds only defined properties; declared but undefined ones
//! are resolved on read through the property's default rules. Flags are
//! fixed at construction time.

use std::fmt;
use std::sync::Arc;

use crate::cast::DataRequest;
use crate::error::{DtoError, DtoResult};
use crate::factory::Factory;
use crate::flags::DtoFlags;
use crate::metadata::ClassMetadata;
use crate::value::{Map, Value};

/// A validated instance of a declared class
#[derive(Clone)]
pub struct Dto {
    // Strong: `set` and `remake` outlive temporary factories
    factory: Factory,
    metadata: Arc<ClassMetadata>,
    properties: Map,
    unknown_properties: Map,
    flags: DtoFlags,
}

impl Dto {
    pub(crate) fn new(
        factory: Factory,
        metadata: Arc<ClassMetadata>,
        properties: Map,
        unknown_properties: Map,
        flags: DtoFlags,
    ) -> Self {
        Dto {
            factory,
            metadata,
            properties,
            unknown_properties,
            flags,
        }
    }

    /// Class name
    pub fn class_name(&self) -> &str {
        self.metadata.name()
    }

    /// Shared class metadata
    pub fn metadata(&self) -> &Arc<ClassMetadata> {
        &self.metadata
    }

    /// Flags the instance was built with
    pub fn flags(&self) -> DtoFlags {
        self.flags
    }

    /// Factory that built the instance
    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    /// Check if the instance satisfies the class token `class`
    pub fn is_instance_of(&self, class: &str) -> bool {
        self.metadata.is_instance_of(class)
    }

    fn unknown(&self, names: Vec<String>) -> DtoError {
        DtoError::UnknownProperties {
            class: self.class_name().to_string(),
            properties: names,
        }
    }

    fn check_known<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> DtoResult<()> {
        let unknown: Vec<String> = names
            .into_iter()
            .filter(|name| !self.metadata.has_property(name))
            .map(str::to_string)
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(self.unknown(unknown))
        }
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// Read a property
    ///
    /// Undefined properties resolve to their default under the instance
    /// flags, or fail with `UndefinedProperties`.
    pub fn get(&self, name: &str) -> DtoResult<Value> {
        let property = self
            .metadata
            .property(name)
            .ok_or_else(|| self.unknown(vec![name.to_string()]))?;

        if let Some(value) = self.properties.get(name) {
            return Ok(value.clone());
        }

        property
            .map_processed_default(self.flags)
            .ok_or_else(|| DtoError::UndefinedProperties {
                class: self.class_name().to_string(),
                properties: vec![name.to_string()],
            })
    }

    /// Borrow a defined property
    pub fn get_ref(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Write a property
    ///
    /// Requires `MUTABLE`. The value goes through the same coercion and
    /// validation as construction input.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> DtoResult<()> {
        if !self.flags.contains(DtoFlags::MUTABLE) {
            return Err(DtoError::ImmutableWrite {
                class: self.class_name().to_string(),
                property: name.to_string(),
            });
        }

        let property = Arc::clone(
            self.metadata
                .property(name)
                .ok_or_else(|| self.unknown(vec![name.to_string()]))?,
        );
        let value = property
            .cast_value_to_type(&self.factory, value.into(), self.flags)
            .map_err(|e| e.with_class(self.metadata.name()))?;

        let is_new = self.properties.insert(name.to_string(), value).is_none();
        if is_new {
            let metadata = &self.metadata;
            self.properties
                .sort_by(|a, _, b, _| metadata.position(a).cmp(&metadata.position(b)));
        }
        Ok(())
    }

    /// Check if a property, or a dotted path into nested instances, is defined
    ///
    /// `parent.first_name` is defined when `parent` holds an instance whose
    /// `first_name` is defined. A non-instance value on the path means
    /// undefined.
    pub fn is_defined(&self, path: &str) -> DtoResult<bool> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        self.check_known([head])?;

        let Some(value) = self.properties.get(head) else {
            return Ok(false);
        };

        match (rest, value) {
            (None, _) => Ok(true),
            (Some(rest), Value::Dto(nested)) => {
                nested.is_defined(rest).map_err(|e| e.prefixed(head))
            }
            (Some(_), _) => Ok(false),
        }
    }

    /// Names of defined properties in declaration order
    pub fn defined_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Defined properties
    pub fn properties(&self) -> &Map {
        &self.properties
    }

    /// Input keys kept under `TRACK_UNKNOWN_PROPERTIES`
    pub fn unknown_properties(&self) -> &Map {
        &self.unknown_properties
    }

    /// Check if any unknown input key was tracked
    pub fn has_unknown_properties(&self) -> bool {
        !self.unknown_properties.is_empty()
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Defined properties as plain data
    pub fn to_array(&self) -> DtoResult<Map> {
        self.serialize(false, |_| true)
    }

    /// Defined properties plus resolvable defaults as plain data
    pub fn to_array_with_defaults(&self) -> DtoResult<Map> {
        self.serialize(true, |_| true)
    }

    /// Plain data of the named properties only
    pub fn only<'n, I>(&self, names: I) -> DtoResult<Map>
    where
        I: IntoIterator<Item = &'n str>,
    {
        let names: Vec<&str> = names.into_iter().collect();
        self.check_known(names.iter().copied())?;
        self.serialize(false, |name| names.contains(&name))
    }

    /// Plain data of every property except the named ones
    pub fn except<'n, I>(&self, names: I) -> DtoResult<Map>
    where
        I: IntoIterator<Item = &'n str>,
    {
        let names: Vec<&str> = names.into_iter().collect();
        self.check_known(names.iter().copied())?;
        self.serialize(false, |name| !names.contains(&name))
    }

    fn serialize(&self, with_defaults: bool, include: impl Fn(&str) -> bool) -> DtoResult<Map> {
        let request = DataRequest {
            flags: self.flags,
            with_defaults,
        };

        let mut data = Map::with_capacity(self.properties.len());
        for (name, property) in self.metadata.properties() {
            if !include(name.as_str()) {
                continue;
            }

            let value = match self.properties.get(name) {
                Some(value) => property.process_value_to_data(value, &request)?,
                None if with_defaults => match property.map_processed_default(self.flags) {
                    Some(default) => property.process_value_to_data(&default, &request)?,
                    None => continue,
                },
                None => continue,
            };
            data.insert(name.clone(), value);
        }
        Ok(data)
    }

    /// Plain data as a JSON value
    pub fn to_json(&self) -> DtoResult<serde_json::Value> {
        Value::Map(self.to_array()?).to_json()
    }

    // ========================================================================
    // Remake
    // ========================================================================

    /// New instance from the defined properties with `overrides` applied
    pub fn remake(&self, overrides: Map) -> DtoResult<Dto> {
        let mut input = self.properties.clone();
        input.extend(overrides);
        self.rebuild(input)
    }

    /// New instance from the named defined properties only
    pub fn remake_only<'n, I>(&self, names: I) -> DtoResult<Dto>
    where
        I: IntoIterator<Item = &'n str>,
    {
        let names: Vec<&str> = names.into_iter().collect();
        self.check_known(names.iter().copied())?;
        let input = self
            .properties
            .iter()
            .filter(|(name, _)| names.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        self.rebuild(input)
    }

    /// New instance from the defined properties minus the named ones
    pub fn remake_except<'n, I>(&self, names: I) -> DtoResult<Dto>
    where
        I: IntoIterator<Item = &'n str>,
    {
        let names: Vec<&str> = names.into_iter().collect();
        self.check_known(names.iter().copied())?;
        let input = self
            .properties
            .iter()
            .filter(|(name, _)| !names.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        self.rebuild(input)
    }

    fn rebuild(&self, input: Map) -> DtoResult<Dto> {
        self.factory.make(self.class_name(), input, self.flags)
    }
}

impl PartialEq for Dto {
    fn eq(&self, other: &Self) -> bool {
        self.class_name() == other.class_name() && self.properties == other.properties
    }
}

impl fmt::Debug for Dto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dto")
            .field("class", &self.class_name())
            .field("properties", &self.properties)
            .field("flags", &self.flags)
            .finish()
    }
}
