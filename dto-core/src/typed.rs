//! 强类型层
//!
//! `#[dto]` 宏生成的结构体通过 [`TypedDto`] 接入运行时：类元数据只构建一次，
//! 构造仍走 `SimpleDto` 的完整流水线，之后再把存储值按字段类型提取出来。
//! 字段类型通过 [`DtoField`] 声明自己对应的类型表达式以及提取方式。
//!
use crate::error::{DtoError, DtoResult};
use crate::options::DtoOptions;
use crate::schema::DtoClass;
use crate::simple_dto::SimpleDto;
use crate::types::TypeExpr;
use crate::value::{DtoMap, DtoValue};
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;
use std::sync::Arc;

/// 可作为 DTO 字段的 Rust 类型
pub trait DtoField: Sized {
    fn type_expr() -> TypeExpr;

    /// 从校验并强转后的存储值中提取
    fn from_value(field: &str, value: &DtoValue) -> DtoResult<Self>;
}

fn mismatch<T: DtoField>(field: &str) -> DtoError {
    DtoError::invalid_field(field, format!("{field} is not a valid {}", T::type_expr()))
}

impl DtoField for String {
    fn type_expr() -> TypeExpr {
        TypeExpr::String
    }

    fn from_value(field: &str, value: &DtoValue) -> DtoResult<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch::<Self>(field))
    }
}

impl DtoField for i64 {
    fn type_expr() -> TypeExpr {
        TypeExpr::Int
    }

    fn from_value(field: &str, value: &DtoValue) -> DtoResult<Self> {
        value.as_i64().ok_or_else(|| mismatch::<Self>(field))
    }
}

impl DtoField for i32 {
    fn type_expr() -> TypeExpr {
        TypeExpr::Int
    }

    fn from_value(field: &str, value: &DtoValue) -> DtoResult<Self> {
        value
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .ok_or_else(|| mismatch::<Self>(field))
    }
}

impl DtoField for f64 {
    fn type_expr() -> TypeExpr {
        TypeExpr::Float
    }

    fn from_value(field: &str, value: &DtoValue) -> DtoResult<Self> {
        value.as_f64().ok_or_else(|| mismatch::<Self>(field))
    }
}

impl DtoField for bool {
    fn type_expr() -> TypeExpr {
        TypeExpr::Bool
    }

    fn from_value(field: &str, value: &DtoValue) -> DtoResult<Self> {
        value.as_bool().ok_or_else(|| mismatch::<Self>(field))
    }
}

impl DtoField for DateTime<FixedOffset> {
    fn type_expr() -> TypeExpr {
        TypeExpr::Timestamp
    }

    fn from_value(field: &str, value: &DtoValue) -> DtoResult<Self> {
        value
            .as_timestamp()
            .copied()
            .ok_or_else(|| mismatch::<Self>(field))
    }
}

impl DtoField for DateTime<Utc> {
    fn type_expr() -> TypeExpr {
        TypeExpr::Timestamp
    }

    fn from_value(field: &str, value: &DtoValue) -> DtoResult<Self> {
        value
            .as_timestamp()
            .map(|ts| ts.with_timezone(&Utc))
            .ok_or_else(|| mismatch::<Self>(field))
    }
}

impl DtoField for Value {
    fn type_expr() -> TypeExpr {
        TypeExpr::Any
    }

    fn from_value(_field: &str, value: &DtoValue) -> DtoResult<Self> {
        Ok(value.to_json_value())
    }
}

impl DtoField for DtoValue {
    fn type_expr() -> TypeExpr {
        TypeExpr::Any
    }

    fn from_value(_field: &str, value: &DtoValue) -> DtoResult<Self> {
        Ok(value.clone())
    }
}

/// 元素类型随 `T` 进入规则，校验与强转都逐元素进行
impl<T: DtoField> DtoField for Vec<T> {
    fn type_expr() -> TypeExpr {
        TypeExpr::List(Box::new(T::type_expr()))
    }

    fn from_value(field: &str, value: &DtoValue) -> DtoResult<Self> {
        let items = value.as_list().ok_or_else(|| mismatch::<Self>(field))?;
        items
            .iter()
            .enumerate()
            .map(|(index, item)| T::from_value(&format!("{field}[{index}]"), item))
            .collect()
    }
}

impl<T: DtoField> DtoField for Option<T> {
    fn type_expr() -> TypeExpr {
        T::type_expr().nullable()
    }

    fn from_value(field: &str, value: &DtoValue) -> DtoResult<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(field, value).map(Some)
        }
    }
}

/// 从实例中按字段名提取；字段缺失视同 `Null`
pub fn extract<T: DtoField>(dto: &SimpleDto, field: &str) -> DtoResult<T> {
    T::from_value(field, dto.get(field).unwrap_or(&DtoValue::Null))
}

/// 由 `#[dto]` 宏实现的强类型 DTO
pub trait TypedDto: Sized {
    /// 类元数据（首次调用时构建并登记）
    fn class() -> Arc<DtoClass>;

    fn from_dto(dto: SimpleDto) -> DtoResult<Self>;

    fn as_dto(&self) -> &SimpleDto;

    fn new(data: impl Into<DtoValue>) -> DtoResult<Self> {
        Self::with_options(data, DtoOptions::strict())
    }

    fn new_permissive(data: impl Into<DtoValue>) -> DtoResult<Self> {
        Self::with_options(data, DtoOptions::permissive())
    }

    fn with_options(data: impl Into<DtoValue>, options: DtoOptions) -> DtoResult<Self> {
        Self::from_dto(SimpleDto::with_options(Self::class(), data, options)?)
    }

    fn is_permissive(&self) -> bool {
        self.as_dto().is_permissive()
    }

    fn to_array(&self) -> DtoMap {
        self.as_dto().to_array()
    }

    fn to_json_value(&self) -> Value {
        self.as_dto().to_json_value()
    }

    fn to_json(&self) -> DtoResult<String> {
        self.as_dto().to_json()
    }

    fn set(&self, field: &str, value: impl Into<DtoValue>) -> DtoResult<()> {
        self.as_dto().set(field, value)
    }

    /// 复制并覆盖一个字段，得到新的实例
    fn with(&self, field: &str, value: impl Into<DtoValue>) -> DtoResult<Self> {
        Self::from_dto(self.as_dto().with(field, value)?)
    }

    fn serialize_state(&self) -> DtoResult<String> {
        self.as_dto().serialize_state()
    }

    fn deserialize_state(payload: &str) -> DtoResult<Self> {
        Self::from_dto(SimpleDto::deserialize_state(Self::class(), payload)?)
    }
}
