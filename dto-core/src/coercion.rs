//! 校验后的强转
//!
//! - 时间戳类型：解析为带时区偏移的时间点；
//! - DTO 类型：同类实例原样复用，映射/通用对象/其他 DTO 则按目标类重新构造；
//! - 元素类型确定的列表：逐元素强转，元素失败时以 `字段[下标]` 报告；
//! - 其他类型：原样通过。
//!
//! 嵌套构造失败时以 `Coercion` 透传内部错误，不吞掉、不改写原因。
//!
use crate::error::{DtoError, DtoResult};
use crate::options::DtoOptions;
use crate::schema::DtoClass;
use crate::simple_dto::SimpleDto;
use crate::timestamp;
use crate::types::TypeExpr;
use crate::value::DtoValue;
use std::sync::Arc;
use tracing::debug;

pub(crate) fn coerce(
    field: &str,
    ty: &TypeExpr,
    value: DtoValue,
    options: &DtoOptions,
) -> DtoResult<DtoValue> {
    if value.is_null() {
        return Ok(value);
    }

    match ty.inner() {
        TypeExpr::Timestamp => timestamp::parse(&value, None)
            .map(DtoValue::Timestamp)
            .map_err(|err| {
                debug!(field, error = %err, "timestamp coercion failed");
                DtoError::Coercion {
                    field: field.to_string(),
                    source: Box::new(DtoError::invalid_field(
                        field,
                        format!("{field} is not a valid timestamp"),
                    )),
                }
            }),
        TypeExpr::Dto(class) => resolve_nested(field, &class.get(), value, options).map(DtoValue::Dto),
        TypeExpr::List(elem) => match value {
            DtoValue::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| coerce(&format!("{field}[{index}]"), elem, item, options))
                .collect::<DtoResult<Vec<_>>>()
                .map(DtoValue::List),
            other => Ok(other),
        },
        _ => Ok(value),
    }
}

/// 把输入解析为目标类的实例
///
/// 只认类名身份：同类实例直接复用且不再校验，结构兼容的其他类实例也会被重新构造。
pub(crate) fn resolve_nested(
    field: &str,
    class: &Arc<DtoClass>,
    value: DtoValue,
    options: &DtoOptions,
) -> DtoResult<Arc<SimpleDto>> {
    let input = match value {
        DtoValue::Dto(dto) if dto.class_name() == class.name() => return Ok(dto),
        DtoValue::Dto(dto) => dto.data().clone(),
        DtoValue::Map(map) => map,
        DtoValue::Object(object) => object.fields().clone(),
        DtoValue::Custom(custom) => custom.to_array(),
        other => {
            return Err(DtoError::Coercion {
                field: field.to_string(),
                source: Box::new(DtoError::invalid_field(
                    field,
                    format!("{field} is not a valid {}", class.name()),
                )),
            });
        }
    };

    debug!(field, class = class.name(), "constructing nested dto");
    SimpleDto::with_options(class.clone(), input, *options)
        .map(Arc::new)
        .map_err(|err| DtoError::Coercion {
            field: field.to_string(),
            source: Box::new(err),
        })
}
