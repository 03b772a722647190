//! Construction, access and serialization errors
//!
//! Validation failures for independent properties are never reported one at
//! a time. [`TypeErrorData`] collects every failure of a construction call
//! (including failures raised by nested constructions, re-tagged with their
//! dotted path) and turns them into one error per failure kind.

use std::fmt;

use thiserror::Error;

use crate::value::Value;

/// Result alias used throughout the crate
pub type DtoResult<T> = Result<T, DtoError>;

/// A single value that failed validation against its property's type union
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTypeFailure {
    /// Class reporting the failure
    pub class: String,
    /// Property name, or dotted path for nested failures (`parent.children.0.name`)
    pub property: String,
    /// Human readable union of accepted types (`null|string`)
    pub expected: String,
    /// Summary of the offending value
    pub value: String,
    /// Runtime kind of the offending value
    pub kind: String,
}

impl InvalidTypeFailure {
    /// Describe `value` failing against `expected`
    pub fn new(
        class: impl Into<String>,
        property: impl Into<String>,
        expected: impl Into<String>,
        value: &Value,
    ) -> Self {
        InvalidTypeFailure {
            class: class.into(),
            property: property.into(),
            expected: expected.into(),
            value: value.summary(),
            kind: value.kind().to_string(),
        }
    }
}

impl fmt::Display for InvalidTypeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid type: expected \"{}", self.class)?;
        if !self.property.is_empty() {
            write!(f, "::{}", self.property)?;
        }
        write!(
            f,
            "\" to be of type \"{}\", instead got value \"{}\", which is {}.",
            self.expected, self.value, self.kind
        )
    }
}

/// Errors raised by the DTO engine
#[derive(Debug, Clone, Error)]
pub enum DtoError {
    /// Write attempted on an instance built without `MUTABLE`
    #[error("Cannot write `{property}`: {class} is immutable")]
    ImmutableWrite {
        /// Class of the instance
        class: String,
        /// Property that was written
        property: String,
    },

    /// Input or query keys without a matching property
    #[error("Unknown properties on {class}: {}", .properties.join(", "))]
    UnknownProperties {
        /// Class reporting the failure
        class: String,
        /// Offending names or dotted paths
        properties: Vec<String>,
    },

    /// Required properties left without a value after default resolution
    #[error("Undefined required properties on {class}: {}", .properties.join(", "))]
    UndefinedProperties {
        /// Class reporting the failure
        class: String,
        /// Missing names or dotted paths
        properties: Vec<String>,
    },

    /// Values that failed validation
    #[error("{}", join_lines(.failures))]
    InvalidType {
        /// Every failing value of the call
        failures: Vec<InvalidTypeFailure>,
    },

    /// More than one failure kind occurred in one call; one error per kind
    #[error("{}", join_lines(.errors))]
    Aggregate {
        /// One aggregated error per failure kind
        errors: Vec<DtoError>,
    },

    /// A value has neither a reverse cast nor a native data form
    #[error("Cannot serialize `{property}`: no cast or data form for {type_name}")]
    SerializationUnsupported {
        /// Property name or dotted path
        property: String,
        /// Type name of the value
        type_name: String,
    },

    /// No declaration exists for the requested class
    #[error("Unknown class: {class}")]
    UnknownClass {
        /// Requested class
        class: String,
    },

    /// A declaration is malformed (bad type token, default for an undeclared property, ...)
    #[error("Invalid declaration for {class}: {reason}")]
    Declaration {
        /// Declared class
        class: String,
        /// What is wrong with it
        reason: String,
    },

    /// A class extends itself, directly or through its ancestors
    #[error("Circular inheritance detected: {cycle}")]
    CircularInheritance {
        /// The cycle, e.g. `A -> B -> A`
        cycle: String,
    },

    /// Nested construction went deeper than the configured limit
    #[error("Maximum nesting depth of {max_depth} exceeded")]
    MaxDepthExceeded {
        /// Configured limit
        max_depth: usize,
    },

    /// A cast rejected a value it had claimed
    #[error("Cast failed for `{property}`: {message}")]
    Cast {
        /// Property name or dotted path
        property: String,
        /// Cast specific message
        message: String,
    },

    /// A declaration document could not be read
    #[error("Schema error: {0}")]
    Schema(String),

    /// A configuration value could not be read
    #[error("Configuration error: {0}")]
    Config(String),
}

fn join_lines<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn join_path(prefix: &str, path: &str) -> String {
    if path.is_empty() {
        prefix.to_string()
    } else {
        format!("{}.{}", prefix, path)
    }
}

impl DtoError {
    /// Re-tag every path carried by this error with `prefix`
    ///
    /// Used when a failure crosses a nested-object boundary: `first_name`
    /// raised by `children[0]` becomes `children.0.first_name`.
    pub fn prefixed(self, prefix: &str) -> DtoError {
        match self {
            DtoError::UnknownProperties { class, properties } => DtoError::UnknownProperties {
                class,
                properties: properties.iter().map(|p| join_path(prefix, p)).collect(),
            },
            DtoError::UndefinedProperties { class, properties } => {
                DtoError::UndefinedProperties {
                    class,
                    properties: properties.iter().map(|p| join_path(prefix, p)).collect(),
                }
            }
            DtoError::InvalidType { failures } => DtoError::InvalidType {
                failures: failures
                    .into_iter()
                    .map(|mut failure| {
                        failure.property = join_path(prefix, &failure.property);
                        failure
                    })
                    .collect(),
            },
            DtoError::Aggregate { errors } => DtoError::Aggregate {
                errors: errors.into_iter().map(|e| e.prefixed(prefix)).collect(),
            },
            DtoError::SerializationUnsupported {
                property,
                type_name,
            } => DtoError::SerializationUnsupported {
                property: join_path(prefix, &property),
                type_name,
            },
            DtoError::Cast { property, message } => DtoError::Cast {
                property: join_path(prefix, &property),
                message,
            },
            other => other,
        }
    }

    /// Report every aggregated failure as raised by `class`
    pub fn with_class(self, class: &str) -> DtoError {
        match self {
            DtoError::UnknownProperties { properties, .. } => DtoError::UnknownProperties {
                class: class.to_string(),
                properties,
            },
            DtoError::UndefinedProperties { properties, .. } => DtoError::UndefinedProperties {
                class: class.to_string(),
                properties,
            },
            DtoError::InvalidType { failures } => DtoError::InvalidType {
                failures: failures
                    .into_iter()
                    .map(|mut failure| {
                        failure.class = class.to_string();
                        failure
                    })
                    .collect(),
            },
            DtoError::Aggregate { errors } => DtoError::Aggregate {
                errors: errors.into_iter().map(|e| e.with_class(class)).collect(),
            },
            other => other,
        }
    }

    /// Whether this error can be merged into a [`TypeErrorData`]
    pub fn is_aggregatable(&self) -> bool {
        matches!(
            self,
            DtoError::UnknownProperties { .. }
                | DtoError::UndefinedProperties { .. }
                | DtoError::InvalidType { .. }
                | DtoError::Aggregate { .. }
        )
    }

    /// All invalid-type failures, looking through [`DtoError::Aggregate`]
    pub fn invalid_types(&self) -> Vec<&InvalidTypeFailure> {
        match self {
            DtoError::InvalidType { failures } => failures.iter().collect(),
            DtoError::Aggregate { errors } => errors.iter().flat_map(|e| e.invalid_types()).collect(),
            _ => Vec::new(),
        }
    }

    /// All unknown property names/paths, looking through [`DtoError::Aggregate`]
    pub fn unknown_properties(&self) -> Vec<&str> {
        match self {
            DtoError::UnknownProperties { properties, .. } => {
                properties.iter().map(String::as_str).collect()
            }
            DtoError::Aggregate { errors } => {
                errors.iter().flat_map(|e| e.unknown_properties()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// All undefined property names/paths, looking through [`DtoError::Aggregate`]
    pub fn undefined_properties(&self) -> Vec<&str> {
        match self {
            DtoError::UndefinedProperties { properties, .. } => {
                properties.iter().map(String::as_str).collect()
            }
            DtoError::Aggregate { errors } => {
                errors.iter().flat_map(|e| e.undefined_properties()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Collector for the failures of one construction call
///
/// Failures are grouped by kind. [`TypeErrorData::into_result`] raises one
/// error per non-empty kind (or an [`DtoError::Aggregate`] of them).
#[derive(Debug, Clone, Default)]
pub struct TypeErrorData {
    class: String,
    invalid_types: Vec<InvalidTypeFailure>,
    unknown_properties: Vec<String>,
    undefined_properties: Vec<String>,
}

impl TypeErrorData {
    /// Create an empty collector reporting as `class`
    pub fn new(class: impl Into<String>) -> Self {
        TypeErrorData {
            class: class.into(),
            ..Default::default()
        }
    }

    /// Record an invalid value
    pub fn push_invalid_type(&mut self, mut failure: InvalidTypeFailure) {
        failure.class = self.class.clone();
        self.invalid_types.push(failure);
    }

    /// Record an unknown property name or path
    pub fn push_unknown(&mut self, property: impl Into<String>) {
        push_unique(&mut self.unknown_properties, property.into());
    }

    /// Record an undefined property name or path
    pub fn push_undefined(&mut self, property: impl Into<String>) {
        push_unique(&mut self.undefined_properties, property.into());
    }

    /// Merge an aggregatable error into this collector
    ///
    /// Paths must already be prefixed by the caller. Errors that cannot be
    /// aggregated are fatal and handed back unchanged.
    pub fn absorb(&mut self, error: DtoError) -> DtoResult<()> {
        match error {
            DtoError::InvalidType { failures } => {
                for failure in failures {
                    self.push_invalid_type(failure);
                }
            }
            DtoError::UnknownProperties { properties, .. } => {
                for property in properties {
                    self.push_unknown(property);
                }
            }
            DtoError::UndefinedProperties { properties, .. } => {
                for property in properties {
                    self.push_undefined(property);
                }
            }
            DtoError::Aggregate { errors } => {
                for error in errors {
                    self.absorb(error)?;
                }
            }
            other => return Err(other),
        }
        Ok(())
    }

    /// Check if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.invalid_types.is_empty()
            && self.unknown_properties.is_empty()
            && self.undefined_properties.is_empty()
    }

    /// One error per recorded kind: invalid types, unknown, undefined
    pub fn into_error(self) -> Option<DtoError> {
        let mut errors = Vec::new();
        if !self.invalid_types.is_empty() {
            errors.push(DtoError::InvalidType {
                failures: self.invalid_types,
            });
        }
        if !self.unknown_properties.is_empty() {
            errors.push(DtoError::UnknownProperties {
                class: self.class.clone(),
                properties: self.unknown_properties,
            });
        }
        if !self.undefined_properties.is_empty() {
            errors.push(DtoError::UndefinedProperties {
                class: self.class,
                properties: self.undefined_properties,
            });
        }

        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(DtoError::Aggregate { errors }),
        }
    }

    /// `Ok` if nothing was recorded, the aggregated error otherwise
    pub fn into_result(self) -> DtoResult<()> {
        match self.into_error() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn push_unique(items: &mut Vec<String>, item: String) {
    if !items.contains(&item) {
        items.push(item);
    }
}
