//! 持久化状态（SerializedDto）
//!
//! 把实例的完整内部状态（类名、校验器标识、选项、规则集、数据）保存为自描述的
//! JSON 信封，并在读取时可信重建：不重新执行校验，只核对类名与规则是否一致。
//!
//! 值以带标签的 `StoredValue` 保存，时间戳（含原始偏移）与嵌套 DTO 都能原样还原；
//! 实现了 `ToArray` 的自定义值按其投影结果保存为映射。
//!
use crate::error::{DtoError, DtoResult};
use crate::options::DtoOptions;
use crate::schema::{self, DtoClass};
use crate::simple_dto::SimpleDto;
use crate::types::TypeExpr;
use crate::validator::{Rules, ValidatorKind};
use crate::value::{DtoMap, DtoValue, GenericObject};
use bon::Builder;
use chrono::{DateTime, SecondsFormat};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StoredValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<StoredValue>),
    Map(IndexMap<String, StoredValue>),
    Object {
        class: String,
        fields: IndexMap<String, StoredValue>,
    },
    /// RFC 3339，保留原始偏移
    Timestamp(String),
    Dto(Box<SerializedDto>),
}

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct SerializedDto {
    #[builder(into)]
    class: String,
    validator: ValidatorKind,
    options: DtoOptions,
    rules: IndexMap<String, String>,
    data: IndexMap<String, StoredValue>,
}

impl SerializedDto {
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn validator(&self) -> ValidatorKind {
        self.validator
    }

    pub fn options(&self) -> &DtoOptions {
        &self.options
    }

    pub fn rules(&self) -> &IndexMap<String, String> {
        &self.rules
    }

    pub fn data(&self) -> &IndexMap<String, StoredValue> {
        &self.data
    }

    /// 从实例捕获状态
    pub fn from_dto(dto: &SimpleDto) -> Self {
        Self {
            class: dto.class_name().to_string(),
            validator: dto.validator_kind(),
            options: *dto.options(),
            rules: dto
                .rules()
                .iter()
                .map(|(field, ty)| (field.clone(), ty.to_string()))
                .collect(),
            data: dto
                .data()
                .iter()
                .map(|(field, value)| (field.clone(), store(value)))
                .collect(),
        }
    }

    /// 按给定类可信重建（不执行校验）
    pub fn to_dto(&self, class: Arc<DtoClass>) -> DtoResult<SimpleDto> {
        if class.name() != self.class {
            return Err(DtoError::TypeMismatch {
                expected: class.name().to_string(),
                found: self.class.clone(),
            });
        }
        if self.options.validator_kind() != self.validator {
            return Err(DtoError::InvalidPayload {
                reason: format!(
                    "validator {:?} does not match options of {}",
                    self.validator, self.class
                ),
            });
        }

        let rules = self.resolve_rules(&class)?;
        let data = self
            .data
            .iter()
            .map(|(field, stored)| Ok((field.clone(), restore(stored, rules.get(field))?)))
            .collect::<DtoResult<DtoMap>>()?;

        Ok(SimpleDto::from_parts(class, self.options, rules, data))
    }

    /// 通过类注册表解析类名后重建
    pub fn to_registered_dto(&self) -> DtoResult<SimpleDto> {
        let class = schema::lookup_class(&self.class).ok_or_else(|| DtoError::InvalidPayload {
            reason: format!("unknown dto class: {}", self.class),
        })?;
        self.to_dto(class)
    }

    // 以类当前的契约为准重新生成规则，并要求与保存的文本一致
    fn resolve_rules(&self, class: &DtoClass) -> DtoResult<Rules> {
        let rules: Rules = schema::contract(class)?
            .into_iter()
            .map(|p| {
                let ty = if self.options.is_permissive() {
                    p.ty.nullable()
                } else {
                    p.ty
                };
                (p.name, ty)
            })
            .collect();

        let current: IndexMap<String, String> = rules
            .iter()
            .map(|(field, ty)| (field.clone(), ty.to_string()))
            .collect();
        if current != self.rules {
            return Err(DtoError::InvalidPayload {
                reason: format!("stored rules do not match the contract of {}", self.class),
            });
        }
        Ok(rules)
    }
}

fn store(value: &DtoValue) -> StoredValue {
    match value {
        DtoValue::Null => StoredValue::Null,
        DtoValue::Bool(b) => StoredValue::Bool(*b),
        DtoValue::Int(i) => StoredValue::Int(*i),
        DtoValue::Float(f) => StoredValue::Float(*f),
        DtoValue::String(s) => StoredValue::String(s.clone()),
        DtoValue::List(items) => StoredValue::List(items.iter().map(store).collect()),
        DtoValue::Map(map) => StoredValue::Map(store_map(map)),
        DtoValue::Object(object) => StoredValue::Object {
            class: object.class_name().to_string(),
            fields: store_map(object.fields()),
        },
        DtoValue::Timestamp(ts) => {
            StoredValue::Timestamp(ts.to_rfc3339_opts(SecondsFormat::AutoSi, false))
        }
        DtoValue::Dto(dto) => StoredValue::Dto(Box::new(SerializedDto::from_dto(dto))),
        DtoValue::Custom(custom) => StoredValue::Map(store_map(&custom.to_array())),
    }
}

fn store_map(map: &DtoMap) -> IndexMap<String, StoredValue> {
    map.iter()
        .map(|(key, value)| (key.clone(), store(value)))
        .collect()
}

fn restore(stored: &StoredValue, hint: Option<&TypeExpr>) -> DtoResult<DtoValue> {
    let value = match stored {
        StoredValue::Null => DtoValue::Null,
        StoredValue::Bool(b) => DtoValue::Bool(*b),
        StoredValue::Int(i) => DtoValue::Int(*i),
        StoredValue::Float(f) => DtoValue::Float(*f),
        StoredValue::String(s) => DtoValue::String(s.clone()),
        StoredValue::List(items) => {
            let elem = match hint.map(TypeExpr::inner) {
                Some(TypeExpr::List(elem)) => Some(elem.as_ref()),
                _ => None,
            };
            DtoValue::List(
                items
                    .iter()
                    .map(|item| restore(item, elem))
                    .collect::<DtoResult<_>>()?,
            )
        }
        StoredValue::Map(map) => DtoValue::Map(restore_map(map)?),
        StoredValue::Object { class, fields } => {
            let mut object = GenericObject::new(class.clone());
            for (name, value) in restore_map(fields)? {
                object = object.with_field(name, value);
            }
            DtoValue::Object(object)
        }
        StoredValue::Timestamp(text) => DtoValue::Timestamp(
            DateTime::parse_from_rfc3339(text).map_err(|err| DtoError::InvalidPayload {
                reason: format!("bad timestamp {text}: {err}"),
            })?,
        ),
        StoredValue::Dto(nested) => {
            let class = match hint.map(TypeExpr::inner) {
                Some(TypeExpr::Dto(class_ref)) if class_ref.name() == nested.class => {
                    class_ref.get()
                }
                _ => schema::lookup_class(&nested.class).ok_or_else(|| {
                    DtoError::InvalidPayload {
                        reason: format!("unknown dto class: {}", nested.class),
                    }
                })?,
            };
            DtoValue::Dto(Arc::new(nested.to_dto(class)?))
        }
    };
    Ok(value)
}

fn restore_map(map: &IndexMap<String, StoredValue>) -> DtoResult<DtoMap> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), restore(value, None)?)))
        .collect()
}

impl SimpleDto {
    /// 捕获完整内部状态为 JSON 信封
    pub fn serialize_state(&self) -> DtoResult<String> {
        Ok(serde_json::to_string(&SerializedDto::from_dto(self))?)
    }

    /// 从 JSON 信封可信重建（不重新校验）
    pub fn deserialize_state(class: Arc<DtoClass>, payload: &str) -> DtoResult<SimpleDto> {
        let envelope: SerializedDto = serde_json::from_str(payload)?;
        envelope.to_dto(class)
    }
}
