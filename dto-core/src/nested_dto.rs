//! NestedDto：由运行时注册表决定形状的 DTO
//!
//! 注册表给出「字段 → DTO 类」，其中每个字段都必须出现在输入里；注册字段被解析为
//! 对应类的实例，未注册的字段原样透传（不校验、不强制转为 DTO）。
//!
//! 构造过程是一个小状态机：
//! `Initializing → ValidatingRegistration → Resolving → Frozen`，任一步失败进入 `Failed`。
//!
use crate::coercion;
use crate::error::{DtoError, DtoResult};
use crate::options::DtoOptions;
use crate::projection;
use crate::schema::DtoClass;
use crate::value::{DtoMap, DtoValue, ToArray, map_to_json};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// 字段名 → 目标 DTO 类
pub type Registration = IndexMap<String, Arc<DtoClass>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedState {
    Initializing,
    ValidatingRegistration,
    Resolving,
    Frozen,
    Failed,
}

#[derive(Debug, Clone)]
pub struct NestedDto {
    registration: Registration,
    options: DtoOptions,
    data: DtoMap,
}

impl NestedDto {
    pub fn new(data: impl Into<DtoValue>, registration: Registration) -> DtoResult<Self> {
        Self::with_options(data, registration, DtoOptions::strict())
    }

    /// `options` 用于构造注册字段对应的 DTO
    pub fn with_options(
        data: impl Into<DtoValue>,
        registration: Registration,
        options: DtoOptions,
    ) -> DtoResult<Self> {
        let data = match data.into() {
            DtoValue::Map(map) => map,
            DtoValue::Object(object) => object.fields().clone(),
            other => {
                return Err(DtoError::InvalidInput {
                    reason: format!("nested dto input must be a mapping, got {}", other.kind()),
                });
            }
        };

        Construction {
            state: NestedState::Initializing,
            registration,
            options,
        }
        .run(data)
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    pub fn options(&self) -> &DtoOptions {
        &self.options
    }

    pub fn data(&self) -> &DtoMap {
        &self.data
    }

    pub fn get(&self, field: &str) -> Option<&DtoValue> {
        self.data.get(field)
    }

    pub fn set(&self, field: &str, _value: impl Into<DtoValue>) -> DtoResult<()> {
        Err(DtoError::Immutable {
            field: field.to_string(),
        })
    }

    pub fn to_array(&self) -> DtoMap {
        projection::project(&self.data)
    }

    pub fn to_json_value(&self) -> Value {
        map_to_json(&self.data)
    }

    pub fn to_json(&self) -> DtoResult<String> {
        Ok(serde_json::to_string(&self.to_json_value())?)
    }
}

impl ToArray for NestedDto {
    fn to_array(&self) -> DtoMap {
        NestedDto::to_array(self)
    }

    fn to_json_value(&self) -> Value {
        NestedDto::to_json_value(self)
    }
}

impl Serialize for NestedDto {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json_value().serialize(serializer)
    }
}

struct Construction {
    state: NestedState,
    registration: Registration,
    options: DtoOptions,
}

impl Construction {
    fn run(mut self, data: DtoMap) -> DtoResult<NestedDto> {
        self.transition(NestedState::ValidatingRegistration);
        if let Err(err) = self.check_registration(&data) {
            self.transition(NestedState::Failed);
            return Err(err);
        }

        self.transition(NestedState::Resolving);
        match self.resolve(data) {
            Ok(data) => {
                self.transition(NestedState::Frozen);
                Ok(NestedDto {
                    registration: self.registration,
                    options: self.options,
                    data,
                })
            }
            Err(err) => {
                self.transition(NestedState::Failed);
                Err(err)
            }
        }
    }

    fn transition(&mut self, next: NestedState) {
        debug!(from = ?self.state, to = ?next, "nested dto state");
        self.state = next;
    }

    fn check_registration(&self, data: &DtoMap) -> DtoResult<()> {
        let missing: IndexMap<String, Arc<DtoClass>> = self
            .registration
            .iter()
            .filter(|(field, _)| !data.contains_key(field.as_str()))
            .map(|(field, class)| (field.clone(), class.clone()))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DtoError::MissingRegistration { missing })
        }
    }

    fn resolve(&self, data: DtoMap) -> DtoResult<DtoMap> {
        data.into_iter()
            .map(|(field, value)| {
                let value = match self.registration.get(&field) {
                    Some(class) => DtoValue::Dto(coercion::resolve_nested(
                        &field,
                        class,
                        value,
                        &self.options,
                    )?),
                    // 未注册字段原样保留
                    None => value,
                };
                Ok::<_, DtoError>((field, value))
            })
            .collect()
    }
}
