//! 动态值模型
//!
//! `DtoValue` 是构造流水线中流转的值：原始输入、校验结果、强转后的存储值以及
//! `to_array` 投影都使用同一个枚举表达。
//!
use crate::simple_dto::SimpleDto;
use crate::timestamp;
use chrono::{DateTime, FixedOffset, TimeZone};
use indexmap::IndexMap;
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;

/// 按插入顺序保存的「字段名 → 值」映射
pub type DtoMap = IndexMap<String, DtoValue>;

/// 可转换为数组（映射）的能力
///
/// 投影时，实现了该 trait 的值会被替换为 `to_array` 的结果。
pub trait ToArray: fmt::Debug + Send + Sync {
    fn to_array(&self) -> DtoMap;

    fn to_json_value(&self) -> Value {
        map_to_json(&self.to_array())
    }
}

/// 通用结构化对象：不是 DTO，但拥有具名字段
#[derive(Debug, Clone, PartialEq)]
pub struct GenericObject {
    class_name: String,
    fields: DtoMap,
}

impl GenericObject {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            fields: DtoMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<DtoValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn fields(&self) -> &DtoMap {
        &self.fields
    }
}

#[derive(Debug, Clone)]
pub enum DtoValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<DtoValue>),
    Map(DtoMap),
    Object(GenericObject),
    Timestamp(DateTime<FixedOffset>),
    Dto(Arc<SimpleDto>),
    Custom(Arc<dyn ToArray>),
}

impl DtoValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DtoValue::Null)
    }

    /// 值种类的可读名称（用于错误信息）
    pub fn kind(&self) -> &str {
        match self {
            DtoValue::Null => "null",
            DtoValue::Bool(_) => "bool",
            DtoValue::Int(_) => "int",
            DtoValue::Float(_) => "float",
            DtoValue::String(_) => "string",
            DtoValue::List(_) | DtoValue::Map(_) => "array",
            DtoValue::Object(o) => o.class_name(),
            DtoValue::Timestamp(_) => "timestamp",
            DtoValue::Dto(dto) => dto.class_name(),
            DtoValue::Custom(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DtoValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DtoValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DtoValue::Float(f) => Some(*f),
            DtoValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DtoValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DtoValue]> {
        match self {
            DtoValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&DtoMap> {
        match self {
            DtoValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            DtoValue::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn as_dto(&self) -> Option<&SimpleDto> {
        match self {
            DtoValue::Dto(dto) => Some(dto),
            _ => None,
        }
    }

    /// JSON 输出形态：时间戳渲染为带微秒的 UTC ISO-8601 字符串，DTO 渲染为嵌套对象
    pub fn to_json_value(&self) -> Value {
        match self {
            DtoValue::Null => Value::Null,
            DtoValue::Bool(b) => Value::Bool(*b),
            DtoValue::Int(i) => Value::Number((*i).into()),
            DtoValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            DtoValue::String(s) => Value::String(s.clone()),
            DtoValue::List(items) => Value::Array(items.iter().map(Self::to_json_value).collect()),
            DtoValue::Map(map) => map_to_json(map),
            DtoValue::Object(object) => map_to_json(object.fields()),
            DtoValue::Timestamp(ts) => Value::String(timestamp::to_iso_string(ts)),
            DtoValue::Dto(dto) => dto.to_json_value(),
            DtoValue::Custom(custom) => custom.to_json_value(),
        }
    }
}

pub(crate) fn map_to_json(map: &DtoMap) -> Value {
    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), value.to_json_value()))
            .collect(),
    )
}

impl PartialEq for DtoValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DtoValue::Null, DtoValue::Null) => true,
            (DtoValue::Bool(a), DtoValue::Bool(b)) => a == b,
            (DtoValue::Int(a), DtoValue::Int(b)) => a == b,
            (DtoValue::Float(a), DtoValue::Float(b)) => a == b,
            (DtoValue::String(a), DtoValue::String(b)) => a == b,
            (DtoValue::List(a), DtoValue::List(b)) => a == b,
            (DtoValue::Map(a), DtoValue::Map(b)) => a == b,
            (DtoValue::Object(a), DtoValue::Object(b)) => a == b,
            // 比较时间点而非时区表示
            (DtoValue::Timestamp(a), DtoValue::Timestamp(b)) => a == b,
            (DtoValue::Dto(a), DtoValue::Dto(b)) => {
                a.class_name() == b.class_name() && a.to_array() == b.to_array()
            }
            (DtoValue::Custom(a), DtoValue::Custom(b)) => a.to_array() == b.to_array(),
            _ => false,
        }
    }
}

/// JSON 数字能放进 i64 时为 `Int`，否则为 `Float`。
///
/// 超过 `i64::MAX` 的无符号整数因此会丢失精度，且不会通过 `int` 规则的校验。
impl From<Value> for DtoValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => DtoValue::Null,
            Value::Bool(b) => DtoValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => DtoValue::Int(i),
                None => DtoValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => DtoValue::String(s),
            Value::Array(items) => DtoValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => DtoValue::Map(
                map.into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for DtoValue {
    fn from(value: &str) -> Self {
        DtoValue::String(value.to_string())
    }
}

impl From<String> for DtoValue {
    fn from(value: String) -> Self {
        DtoValue::String(value)
    }
}

impl From<i64> for DtoValue {
    fn from(value: i64) -> Self {
        DtoValue::Int(value)
    }
}

impl From<i32> for DtoValue {
    fn from(value: i32) -> Self {
        DtoValue::Int(value.into())
    }
}

impl From<f64> for DtoValue {
    fn from(value: f64) -> Self {
        DtoValue::Float(value)
    }
}

impl From<bool> for DtoValue {
    fn from(value: bool) -> Self {
        DtoValue::Bool(value)
    }
}

impl From<DtoMap> for DtoValue {
    fn from(value: DtoMap) -> Self {
        DtoValue::Map(value)
    }
}

impl From<Vec<DtoValue>> for DtoValue {
    fn from(value: Vec<DtoValue>) -> Self {
        DtoValue::List(value)
    }
}

impl From<GenericObject> for DtoValue {
    fn from(value: GenericObject) -> Self {
        DtoValue::Object(value)
    }
}

impl From<SimpleDto> for DtoValue {
    fn from(value: SimpleDto) -> Self {
        DtoValue::Dto(Arc::new(value))
    }
}

impl From<Arc<SimpleDto>> for DtoValue {
    fn from(value: Arc<SimpleDto>) -> Self {
        DtoValue::Dto(value)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for DtoValue {
    fn from(value: DateTime<Tz>) -> Self {
        DtoValue::Timestamp(value.fixed_offset())
    }
}

impl<T: Into<DtoValue>> From<Option<T>> for DtoValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DtoValue::Null, Into::into)
    }
}
