use std::sync::Arc;

use parcel_types::TypeToken;

use super::{CastRequest, DataRequest, PropertyCast};
use crate::error::{DtoError, DtoResult, InvalidTypeFailure};
use crate::factory::Factory;
use crate::value::Value;

/// Builds nested instances from maps for every declared class token
#[derive(Debug, Clone, Copy, Default)]
pub struct DtoCast;

impl PropertyCast for DtoCast {
    fn can_handle(&self, token: &TypeToken, factory: &Factory) -> bool {
        token.as_class().is_some_and(|class| factory.has_class(class))
    }

    fn should_cast(&self, value: &Value) -> bool {
        value.is_map()
    }

    fn cast_to_type(&self, request: &CastRequest<'_>, value: Value) -> DtoResult<Value> {
        let class = match request.token.as_class() {
            Some(class) => class,
            None => {
                return Err(DtoError::Cast {
                    property: String::new(),
                    message: format!("{} is not a class token", request.token),
                })
            }
        };

        match value {
            Value::Map(input) => Ok(Value::Dto(Arc::new(request.make(class, input)?))),
            other => Err(DtoError::InvalidType {
                failures: vec![InvalidTypeFailure::new(
                    request.class,
                    "",
                    class,
                    &other,
                )],
            }),
        }
    }

    fn cast_to_data(&self, value: &Value, request: &DataRequest) -> Option<DtoResult<Value>> {
        let dto = value.as_dto()?;
        let data = if request.with_defaults {
            dto.to_array_with_defaults()
        } else {
            dto.to_array()
        };
        Some(data.map(Value::Map))
    }
}
