use std::any::Any;
use std::sync::Arc;

use parcel_types::TypeToken;
use tracing::trace;

use super::{CastRequest, DataRequest, PropertyCast};
use crate::dto::Dto;
use crate::error::{DtoError, DtoResult, InvalidTypeFailure, TypeErrorData};
use crate::factory::Factory;
use crate::value::{RichObject, Value};

/// Typed collection of instances, e.g. a `UserCollection` of `User`
#[derive(Debug, Clone)]
pub struct DtoCollection {
    name: String,
    item_class: String,
    items: Vec<Arc<Dto>>,
}

impl DtoCollection {
    /// Collection named `name` holding `item_class` instances
    pub fn new(name: impl Into<String>, item_class: impl Into<String>, items: Vec<Arc<Dto>>) -> Self {
        DtoCollection {
            name: name.into(),
            item_class: item_class.into(),
            items,
        }
    }

    /// Element class
    pub fn item_class(&self) -> &str {
        &self.item_class
    }

    /// Elements in input order
    pub fn items(&self) -> &[Arc<Dto>] {
        &self.items
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if there are no elements
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<&Arc<Dto>> {
        self.items.get(index)
    }

    fn data(&self, with_defaults: bool) -> DtoResult<Value> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let map = if with_defaults {
                    item.to_array_with_defaults()
                } else {
                    item.to_array()
                };
                map.map(Value::Map)
                    .map_err(|e| e.prefixed(&index.to_string()))
            })
            .collect::<DtoResult<Vec<_>>>()
            .map(Value::List)
    }
}

impl RichObject for DtoCollection {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn to_data(&self) -> Option<DtoResult<Value>> {
        Some(self.data(false))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builds [`DtoCollection`]s from lists for every declared collection token
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionCast;

impl PropertyCast for CollectionCast {
    fn can_handle(&self, token: &TypeToken, factory: &Factory) -> bool {
        token
            .as_class()
            .is_some_and(|name| factory.collection(name).is_some())
    }

    fn should_cast(&self, value: &Value) -> bool {
        value.is_list()
    }

    fn cast_to_type(&self, request: &CastRequest<'_>, value: Value) -> DtoResult<Value> {
        let declaration = request
            .token
            .as_class()
            .and_then(|name| request.factory.collection(name))
            .ok_or_else(|| DtoError::UnknownClass {
                class: request.token.to_string(),
            })?;

        let elements = match value {
            Value::List(elements) => elements,
            other => {
                return Err(DtoError::InvalidType {
                    failures: vec![InvalidTypeFailure::new(
                        request.class,
                        "",
                        declaration.name.as_str(),
                        &other,
                    )],
                })
            }
        };

        trace!(
            collection = %declaration.name,
            len = elements.len(),
            "casting collection"
        );

        let mut errors = TypeErrorData::new(request.class);
        let mut items = Vec::with_capacity(elements.len());

        for (index, element) in elements.into_iter().enumerate() {
            let path = index.to_string();
            match element {
                Value::Map(input) => match request.make(&declaration.item_class, input) {
                    Ok(dto) => items.push(Arc::new(dto)),
                    Err(e) => errors.absorb(e.prefixed(&path))?,
                },
                Value::Dto(dto) if dto.is_instance_of(&declaration.item_class) => items.push(dto),
                other => errors.push_invalid_type(InvalidTypeFailure::new(
                    request.class,
                    path,
                    declaration.item_class.as_str(),
                    &other,
                )),
            }
        }

        errors.into_result()?;

        Ok(Value::Object(Arc::new(DtoCollection::new(
            declaration.name.as_str(),
            declaration.item_class.as_str(),
            items,
        ))))
    }

    fn cast_to_data(&self, value: &Value, request: &DataRequest) -> Option<DtoResult<Value>> {
        let collection = value.downcast_ref::<DtoCollection>()?;
        Some(collection.data(request.with_defaults))
    }
}
