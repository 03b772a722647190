//! Pluggable conversions between raw data and rich types
//!
//! A cast is offered every type token of a property when metadata is
//! built ([`PropertyCast::can_handle`]). At construction time the casts
//! attached to a property are asked, in order, whether they claim a raw
//! value ([`PropertyCast::should_cast`]); the first claim wins and converts
//! the value ([`PropertyCast::cast_to_type`]). Serialization asks the same
//! casts to turn rich values back into plain data
//! ([`PropertyCast::cast_to_data`]).
//!
//! Resolution order for one property:
//! 1. casts registered for that property on the class declaration
//! 2. class-wide casts of the declaration (child class before parents)
//! 3. user casts registered on the [`Factory`]
//! 4. built-in casts: [`DtoCast`], [`CollectionCast`]

use std::fmt;
use std::sync::Arc;

use parcel_types::TypeToken;

use crate::dto::Dto;
use crate::error::DtoResult;
use crate::factory::Factory;
use crate::flags::DtoFlags;
use crate::value::{Map, Value};

mod collection;
mod dto;

pub use collection::{CollectionCast, DtoCollection};
pub use dto::DtoCast;

/// Context of one conversion to a rich type
pub struct CastRequest<'a> {
    /// Factory performing the construction
    pub factory: &'a Factory,
    /// Class owning the property
    pub class: &'a str,
    /// Property being cast
    pub property: &'a str,
    /// Token the cast was resolved for
    pub token: &'a TypeToken,
    /// Flags of the construction, transient flags removed
    pub flags: DtoFlags,
    pub(crate) depth: usize,
}

impl<'a> CastRequest<'a> {
    /// Nesting depth of the construction that owns this property
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Build a nested instance of `class` one level deeper
    ///
    /// Errors keep paths relative to the nested instance; the caller
    /// prefixes them with the property name.
    pub fn make(&self, class: &str, input: Map) -> DtoResult<Dto> {
        self.factory
            .make_at(class, input, self.flags, self.depth + 1)
    }
}

impl fmt::Debug for CastRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CastRequest")
            .field("class", &self.class)
            .field("property", &self.property)
            .field("token", &self.token)
            .field("flags", &self.flags)
            .field("depth", &self.depth)
            .finish()
    }
}

/// Context of one conversion back to plain data
#[derive(Debug, Clone, Copy)]
pub struct DataRequest {
    /// Flags of the instance being serialized
    pub flags: DtoFlags,
    /// Nested instances serialize with their defaults filled in
    pub with_defaults: bool,
}

/// Bidirectional converter between raw data and a rich type
pub trait PropertyCast: fmt::Debug + Send + Sync {
    /// Check if this cast can produce values of `token`
    ///
    /// Called once per token while metadata is built.
    fn can_handle(&self, token: &TypeToken, factory: &Factory) -> bool;

    /// Check if this cast claims the raw `value`
    fn should_cast(&self, value: &Value) -> bool;

    /// Convert a claimed raw value to the rich type
    fn cast_to_type(&self, request: &CastRequest<'_>, value: Value) -> DtoResult<Value>;

    /// Convert a rich value back to plain data
    ///
    /// Returns `None` when the value is not of this cast's type.
    fn cast_to_data(&self, _value: &Value, _request: &DataRequest) -> Option<DtoResult<Value>> {
        None
    }
}

/// Casts every factory appends after its user casts
pub fn builtin_casts() -> Vec<Arc<dyn PropertyCast>> {
    vec![Arc::new(DtoCast), Arc::new(CollectionCast)]
}
