//! Per-property type descriptors
//!
//! A [`PropertyType`] is derived once per declared property when class
//! metadata is built and then shared by every instance of the class. It
//! owns the three decisions made for every value of the property:
//! coercion (casts and int parsing), validation against the declared
//! union, and default resolution.

use std::sync::Arc;

use parcel_types::{PrimitiveType, TypeToken, TypeUnion};
use tracing::trace;

use crate::cast::{CastRequest, DataRequest, PropertyCast};
use crate::error::{DtoError, DtoResult, InvalidTypeFailure, TypeErrorData};
use crate::factory::Factory;
use crate::flags::DtoFlags;
use crate::value::Value;

/// A token paired with the cast resolved for it
type ResolvedCast = (TypeToken, Arc<dyn PropertyCast>);

/// Immutable type descriptor of one declared property
#[derive(Debug, Clone)]
pub struct PropertyType {
    class: String,
    name: String,
    union: TypeUnion,
    display: String,
    nullable: bool,
    is_bool: bool,
    is_array: bool,
    is_string: bool,
    is_int: bool,
    is_mixed: bool,
    type_casts: Vec<ResolvedCast>,
    array_type_casts: Vec<ResolvedCast>,
    default: Option<Value>,
}

impl PropertyType {
    /// Resolve casts for every token of `union` and validate `default`
    ///
    /// `casts` is the ordered candidate list; for each token the first cast
    /// whose [`PropertyCast::can_handle`] accepts it is kept.
    pub fn resolve(
        class: &str,
        name: &str,
        union: TypeUnion,
        default: Option<Value>,
        casts: &[Arc<dyn PropertyCast>],
        factory: &Factory,
    ) -> DtoResult<Self> {
        let resolve_tokens = |tokens: &[TypeToken]| -> Vec<ResolvedCast> {
            tokens
                .iter()
                .filter_map(|token| {
                    casts
                        .iter()
                        .find(|cast| cast.can_handle(token, factory))
                        .map(|cast| (token.clone(), Arc::clone(cast)))
                })
                .collect()
        };

        let property = PropertyType {
            class: class.to_string(),
            name: name.to_string(),
            display: union.to_string(),
            nullable: union.is_nullable(),
            is_bool: union.is_bool(),
            is_array: union.is_array(),
            is_string: union.is_string(),
            is_int: union.is_int(),
            is_mixed: union.is_mixed(),
            type_casts: resolve_tokens(union.simple_types()),
            array_type_casts: resolve_tokens(union.array_types()),
            union,
            default,
        };

        if let Some(default) = &property.default {
            if !property.is_valid_value_for_type(default, DtoFlags::NONE) {
                return Err(property.invalid(default));
            }
        }

        Ok(property)
    }

    /// Class declaring the property
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared union
    pub fn union(&self) -> &TypeUnion {
        &self.union
    }

    /// Human readable union, as used in error messages
    pub fn type_display(&self) -> &str {
        &self.display
    }

    /// `null` or `mixed` is accepted
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// `bool` is declared
    pub fn is_bool(&self) -> bool {
        self.is_bool
    }

    /// `array` or `T[]` is declared
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// `string` is declared
    pub fn is_string(&self) -> bool {
        self.is_string
    }

    /// `int` is declared
    pub fn is_int(&self) -> bool {
        self.is_int
    }

    /// `mixed` is declared
    pub fn is_mixed(&self) -> bool {
        self.is_mixed
    }

    /// Explicit default
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Casts resolved for simple tokens, in token order
    pub fn type_casts(&self) -> &[(TypeToken, Arc<dyn PropertyCast>)] {
        &self.type_casts
    }

    /// Casts resolved for array-element tokens, in token order
    pub fn array_type_casts(&self) -> &[(TypeToken, Arc<dyn PropertyCast>)] {
        &self.array_type_casts
    }

    fn invalid(&self, value: &Value) -> DtoError {
        DtoError::InvalidType {
            failures: vec![InvalidTypeFailure::new(
                self.class.as_str(),
                self.name.as_str(),
                self.display.as_str(),
                value,
            )],
        }
    }

    // ========================================================================
    // Coercion and validation
    // ========================================================================

    /// Coerce `value` to this property's type, then validate it
    ///
    /// Properties typed `int` but not `string` accept numeric strings with
    /// an integral value (`"14"`, `" 14.0 "`, `"1e3"`); `"1.5"` is left as
    /// a string and fails validation.
    ///
    /// Failures carry paths starting with the property name
    /// (`children.0.first_name`).
    pub fn cast_value_to_type(
        &self,
        factory: &Factory,
        value: Value,
        flags: DtoFlags,
    ) -> DtoResult<Value> {
        self.cast_value_at(factory, value, flags, 0)
    }

    pub(crate) fn cast_value_at(
        &self,
        factory: &Factory,
        value: Value,
        flags: DtoFlags,
        depth: usize,
    ) -> DtoResult<Value> {
        let value = self
            .coerce(factory, value, flags.without_transient(), depth)
            .map_err(|e| e.prefixed(&self.name))?;

        if self.is_valid_value_for_type(&value, flags) {
            Ok(value)
        } else {
            Err(self.invalid(&value))
        }
    }

    fn coerce(
        &self,
        factory: &Factory,
        value: Value,
        flags: DtoFlags,
        depth: usize,
    ) -> DtoResult<Value> {
        let value = match value {
            Value::List(items) => {
                let element_cast = match items.first() {
                    Some(first) if !first.is_scalar() => self
                        .array_type_casts
                        .iter()
                        .any(|(_, cast)| cast.should_cast(first)),
                    _ => false,
                };
                if element_cast {
                    return self.cast_elements(factory, items, flags, depth);
                }
                Value::List(items)
            }
            other => other,
        };

        if let Some((token, cast)) = self
            .type_casts
            .iter()
            .find(|(_, cast)| cast.should_cast(&value))
        {
            trace!(class = %self.class, property = %self.name, %token, "cast claimed value");
            let request = self.request(factory, token, flags, depth);
            return cast.cast_to_type(&request, value);
        }

        if self.is_int && !self.is_string {
            if let Value::String(s) = &value {
                if let Some(int) = parse_integral(s) {
                    return Ok(Value::Int(int));
                }
            }
        }

        Ok(value)
    }

    fn cast_elements(
        &self,
        factory: &Factory,
        items: Vec<Value>,
        flags: DtoFlags,
        depth: usize,
    ) -> DtoResult<Value> {
        let mut errors = TypeErrorData::new(self.class.as_str());
        let mut cast_items = Vec::with_capacity(items.len());
        let any_list = self.is_mixed || self.union.contains(PrimitiveType::Array);

        for (index, item) in items.into_iter().enumerate() {
            let claim = self
                .array_type_casts
                .iter()
                .find(|(_, cast)| cast.should_cast(&item));

            let Some((token, cast)) = claim else {
                let element_ok = self
                    .union
                    .array_types()
                    .iter()
                    .any(|token| token_matches(token, &item));
                if !any_list && !element_ok {
                    errors.push_invalid_type(InvalidTypeFailure::new(
                        self.class.as_str(),
                        index.to_string(),
                        self.element_display(),
                        &item,
                    ));
                }
                cast_items.push(item);
                continue;
            };

            let request = self.request(factory, token, flags, depth);
            match cast.cast_to_type(&request, item) {
                Ok(cast_item) => cast_items.push(cast_item),
                Err(e) => errors.absorb(e.prefixed(&index.to_string()))?,
            }
        }

        errors.into_result()?;
        trace!(class = %self.class, property = %self.name, len = cast_items.len(), "cast list elements");
        Ok(Value::List(cast_items))
    }

    fn element_display(&self) -> String {
        self.union
            .array_types()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("|")
    }

    fn request<'a>(
        &'a self,
        factory: &'a Factory,
        token: &'a TypeToken,
        flags: DtoFlags,
        depth: usize,
    ) -> CastRequest<'a> {
        CastRequest {
            factory,
            class: &self.class,
            property: &self.name,
            token,
            flags,
            depth,
        }
    }

    /// Check `value` against the declared union
    ///
    /// `NULLABLE` and `NOT_NULLABLE` in `flags` override the declared
    /// nullability for this call only.
    pub fn is_valid_value_for_type(&self, value: &Value, flags: DtoFlags) -> bool {
        if value.is_null() {
            if flags.contains(DtoFlags::NOT_NULLABLE) {
                return false;
            }
            return flags.contains(DtoFlags::NULLABLE) || self.nullable;
        }

        if self.is_mixed {
            return true;
        }

        if self
            .union
            .simple_types()
            .iter()
            .any(|token| token_matches(token, value))
        {
            return true;
        }

        match value {
            Value::List(items) => self
                .union
                .array_types()
                .iter()
                .any(|token| items.iter().all(|item| token_matches(token, item))),
            _ => false,
        }
    }

    /// Default applied to this property while it is undefined
    ///
    /// Later rules override earlier ones: null for nullable properties,
    /// `false` for bools, `[]` for arrays, and finally the explicit default.
    pub fn map_processed_default(&self, flags: DtoFlags) -> Option<Value> {
        let mut default = None;

        if self.nullable && flags.contains(DtoFlags::NULLABLE_DEFAULT_TO_NULL) {
            default = Some(Value::Null);
        }
        if self.is_bool && flags.contains(DtoFlags::BOOL_DEFAULT_TO_FALSE) {
            default = Some(Value::Bool(false));
        }
        if self.is_array && flags.contains(DtoFlags::ARRAY_DEFAULT_TO_EMPTY_ARRAY) {
            default = Some(Value::List(Vec::new()));
        }
        if let Some(explicit) = &self.default {
            default = Some(explicit.clone());
        }

        default
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Convert a stored value back to plain data
    pub fn process_value_to_data(&self, value: &Value, request: &DataRequest) -> DtoResult<Value> {
        let data = match value {
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    self.rich_to_data(item, &self.array_type_casts, request)
                        .map_err(|e| e.prefixed(&index.to_string()))
                })
                .collect::<DtoResult<Vec<_>>>()
                .map(Value::List),
            other => self.rich_to_data(other, &self.type_casts, request),
        };
        data.map_err(|e| e.prefixed(&self.name))
    }

    fn rich_to_data(
        &self,
        value: &Value,
        casts: &[ResolvedCast],
        request: &DataRequest,
    ) -> DtoResult<Value> {
        if matches!(value, Value::Dto(_) | Value::Object(_)) {
            for (_, cast) in casts {
                if let Some(data) = cast.cast_to_data(value, request) {
                    return data;
                }
            }
        }
        value.to_plain(request.with_defaults)
    }
}

/// Check a non-null value against a single token
/// Parse a numeric string whose value is a whole number in `i64` range
fn parse_integral(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(int) = s.parse::<i64>() {
        return Some(int);
    }
    let float = s.parse::<f64>().ok()?;
    // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive
    let in_range = float >= i64::MIN as f64 && float < i64::MAX as f64;
    (float.is_finite() && float.fract() == 0.0 && in_range).then_some(float as i64)
}

fn token_matches(token: &TypeToken, value: &Value) -> bool {
    match token {
        TypeToken::Primitive(primitive) => match primitive {
            PrimitiveType::String => matches!(value, Value::String(_)),
            PrimitiveType::Int => matches!(value, Value::Int(_)),
            PrimitiveType::Float => matches!(value, Value::Float(_)),
            PrimitiveType::Bool => matches!(value, Value::Bool(_)),
            PrimitiveType::Array => matches!(value, Value::List(_) | Value::Map(_)),
            PrimitiveType::Null => value.is_null(),
            PrimitiveType::Mixed => true,
        },
        TypeToken::Class(class) => match value {
            Value::Dto(dto) => dto.is_instance_of(class),
            Value::Object(object) => object.is_instance_of(class),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::DeclarationRegistry;

    fn property(tokens: &[&str], default: Option<Value>) -> DtoResult<PropertyType> {
        let factory = Factory::new(DeclarationRegistry::new());
        let union = TypeUnion::parse(tokens.iter().copied()).unwrap();
        PropertyType::resolve("Test", "prop", union, default, factory.casts(), &factory)
    }

    #[test]
    fn test_null_follows_declared_nullability() {
        let nullable = property(&["null", "string"], None).unwrap();
        let required = property(&["string"], None).unwrap();

        assert!(nullable.is_valid_value_for_type(&Value::Null, DtoFlags::NONE));
        assert!(!required.is_valid_value_for_type(&Value::Null, DtoFlags::NONE));
    }

    #[test]
    fn test_transient_nullability_override() {
        let nullable = property(&["?string"], None).unwrap();
        let required = property(&["string"], None).unwrap();

        assert!(!nullable.is_valid_value_for_type(&Value::Null, DtoFlags::NOT_NULLABLE));
        assert!(required.is_valid_value_for_type(&Value::Null, DtoFlags::NULLABLE));
    }

    #[test]
    fn test_array_tokens_check_every_element() {
        let prop = property(&["int[]", "string[]"], None).unwrap();

        assert!(prop.is_valid_value_for_type(&Value::from(vec![1, 2]), DtoFlags::NONE));
        assert!(prop.is_valid_value_for_type(&Value::from(vec!["a", "b"]), DtoFlags::NONE));
        assert!(prop.is_valid_value_for_type(&Value::List(Vec::new()), DtoFlags::NONE));

        let mixed_list = Value::List(vec![Value::Int(1), Value::from("b")]);
        assert!(!prop.is_valid_value_for_type(&mixed_list, DtoFlags::NONE));
    }

    #[test]
    fn test_mixed_accepts_anything() {
        let prop = property(&[], None).unwrap();
        assert!(prop.is_mixed());
        assert!(prop.is_valid_value_for_type(&Value::Float(1.5), DtoFlags::NONE));
        assert!(prop.is_valid_value_for_type(&Value::Null, DtoFlags::NONE));
    }

    #[test]
    fn test_default_precedence() {
        let prop = property(&["null", "string", "string[]"], Some(Value::from("blim"))).unwrap();
        let all = DtoFlags::NULLABLE_DEFAULT_TO_NULL | DtoFlags::ARRAY_DEFAULT_TO_EMPTY_ARRAY;
        assert_eq!(prop.map_processed_default(all), Some(Value::from("blim")));

        let implicit = property(&["null", "bool", "array"], None).unwrap();
        assert_eq!(
            implicit.map_processed_default(DtoFlags::NULLABLE_DEFAULT_TO_NULL),
            Some(Value::Null)
        );
        assert_eq!(
            implicit.map_processed_default(DtoFlags::IMPLICIT_DEFAULTS),
            Some(Value::List(Vec::new()))
        );
        assert_eq!(implicit.map_processed_default(DtoFlags::NONE), None);
    }

    #[test]
    fn test_invalid_default_fails_fast() {
        let err = property(&["int"], Some(Value::from("abc"))).unwrap_err();
        let failures = err.invalid_types();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].property, "prop");
        assert_eq!(failures[0].expected, "int");
    }

    #[test]
    fn test_int_coercion() {
        let factory = Factory::new(DeclarationRegistry::new());
        let int = property(&["int"], None).unwrap();
        let either = property(&["string", "int"], None).unwrap();

        assert_eq!(
            int.cast_value_to_type(&factory, Value::from(" 14 "), DtoFlags::NONE)
                .unwrap(),
            Value::Int(14)
        );
        assert_eq!(
            either
                .cast_value_to_type(&factory, Value::from("14"), DtoFlags::NONE)
                .unwrap(),
            Value::from("14")
        );
        assert!(int
            .cast_value_to_type(&factory, Value::from("1.5"), DtoFlags::NONE)
            .is_err());
    }

    #[test]
    fn test_integral_numeric_strings() {
        let factory = Factory::new(DeclarationRegistry::new());
        let int = property(&["int"], None).unwrap();

        for (input, expected) in [("14.0", 14), ("1e3", 1000), ("-2", -2), (" 7.00 ", 7)] {
            assert_eq!(
                int.cast_value_to_type(&factory, Value::from(input), DtoFlags::NONE)
                    .unwrap(),
                Value::Int(expected)
            );
        }
        for input in ["1e400", "NaN", "inf", "0x10", ""] {
            assert!(int
                .cast_value_to_type(&factory, Value::from(input), DtoFlags::NONE)
                .is_err());
        }
    }
}
