//! Parcel Core
//!
//! Runtime typing engine for data transfer objects:
//! - Per-class property metadata, derived once and cached ([`Factory`])
//! - Value coercion and validation against declared union types ([`PropertyType`])
//! - Pluggable casts between raw data and rich types ([`PropertyCast`])
//! - Aggregated, path-tagged construction errors ([`DtoError`])
//! - Constructed instances with flag-driven access rules ([`Dto`])
//!
//! # Example
//!
//! ```ignore
//! use parcel_core::{ClassDeclaration, DeclarationRegistry, DtoFlags, Factory, Value};
//!
//! let registry = DeclarationRegistry::new();
//! registry.register(
//!     ClassDeclaration::new("User")
//!         .property("name", ["string"])
//!         .property("age", ["null", "int"]),
//! );
//!
//! let factory = Factory::new(registry);
//! let input = Value::from(serde_json::json!({ "name": "Ada", "age": "36" }));
//! let user = factory.make_value("User", input, DtoFlags::NONE)?;
//! assert_eq!(user.get("age")?, Value::Int(36));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cast;
pub mod config;
pub mod declaration;
pub mod dto;
pub mod error;
pub mod factory;
pub mod flags;
pub mod metadata;
pub mod property;
pub mod schema;
pub mod value;

pub use cast::{CastRequest, CollectionCast, DataRequest, DtoCast, DtoCollection, PropertyCast};
pub use config::FactoryConfig;
pub use declaration::{
    ClassDeclaration, CollectionDeclaration, DeclarationRegistry, DeclarationSource,
};
pub use dto::Dto;
pub use error::{DtoError, DtoResult, InvalidTypeFailure, TypeErrorData};
pub use factory::{Factory, FactoryBuilder};
pub use flags::{DtoFlags, DtoOptions};
pub use metadata::ClassMetadata;
pub use property::PropertyType;
pub use schema::SchemaDocument;
pub use value::{Map, RichObject, Value, ValueKind};

pub use parcel_types::{PrimitiveType, TypeToken, TypeUnion};
