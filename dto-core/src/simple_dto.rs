//! SimpleDto：构造、校验、强转与冻结
//!
//! 构造流程：
//! 1. 自省类的声明属性；
//! 2. 生成规则集（宽松模式下全部可空）；
//! 3. 为缺失但有默认值的属性注入默认值；
//! 4. 调用类型校验器；
//! 5. 执行类上的额外校验钩子；
//! 6. 按声明类型强转（时间戳、嵌套 DTO）；
//! 7. 冻结：实例不提供任何修改入口，修改只能通过构造新实例完成。
//!
use crate::coercion;
use crate::error::{DtoError, DtoResult};
use crate::options::DtoOptions;
use crate::projection;
use crate::schema::{self, DtoClass};
use crate::validator::{Rules, ValidatorKind};
use crate::value::{DtoMap, DtoValue};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SimpleDto {
    class: Arc<DtoClass>,
    options: DtoOptions,
    rules: Rules,
    data: DtoMap,
}

impl SimpleDto {
    /// 严格模式构造
    pub fn new(class: Arc<DtoClass>, data: impl Into<DtoValue>) -> DtoResult<Self> {
        Self::with_options(class, data, DtoOptions::strict())
    }

    /// 宽松模式构造：所有属性可空，标量宽松强转
    pub fn permissive(class: Arc<DtoClass>, data: impl Into<DtoValue>) -> DtoResult<Self> {
        Self::with_options(class, data, DtoOptions::permissive())
    }

    pub fn with_options(
        class: Arc<DtoClass>,
        data: impl Into<DtoValue>,
        options: DtoOptions,
    ) -> DtoResult<Self> {
        let mut input = input_map(data.into())?;
        schema::ensure_registered(&class);

        let properties = schema::contract(&class)?;
        let rules: Rules = properties
            .iter()
            .map(|p| {
                let ty = if options.is_permissive() {
                    p.ty.clone().nullable()
                } else {
                    p.ty.clone()
                };
                (p.name.clone(), ty)
            })
            .collect();

        for property in &properties {
            if let Some(default) = &property.default {
                input
                    .entry(property.name.clone())
                    .or_insert_with(|| DtoValue::from(default.clone()));
            }
        }

        let validated = options.validator().validate(&rules, &input).inspect_err(|err| {
            debug!(class = class.name(), error = %err, "dto validation failed");
        })?;

        if let Some(extra_validation) = class.extra_validation() {
            extra_validation(&validated)?;
        }

        let mut data = DtoMap::with_capacity(validated.len());
        for (field, value) in validated {
            let value = match rules.get(&field) {
                Some(ty) => coercion::coerce(&field, ty, value, &options)?,
                None => value,
            };
            data.insert(field, value);
        }

        debug!(
            class = class.name(),
            fields = data.len(),
            mode = ?options.mode(),
            "constructed dto"
        );

        Ok(Self {
            class,
            options,
            rules,
            data,
        })
    }

    /// 可信重建：跳过校验，直接采用给定状态
    pub(crate) fn from_parts(
        class: Arc<DtoClass>,
        options: DtoOptions,
        rules: Rules,
        data: DtoMap,
    ) -> Self {
        Self {
            class,
            options,
            rules,
            data,
        }
    }

    pub fn class(&self) -> &Arc<DtoClass> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn options(&self) -> &DtoOptions {
        &self.options
    }

    pub fn validator_kind(&self) -> ValidatorKind {
        self.options.validator_kind()
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn is_permissive(&self) -> bool {
        self.options.is_permissive()
    }

    /// 原始存储映射（未做数组投影）
    pub fn data(&self) -> &DtoMap {
        &self.data
    }

    pub fn get(&self, field: &str) -> Option<&DtoValue> {
        self.data.get(field)
    }

    /// 实例冻结后任何写入都会失败，且不影响实例本身
    pub fn set(&self, field: &str, _value: impl Into<DtoValue>) -> DtoResult<()> {
        Err(DtoError::Immutable {
            field: field.to_string(),
        })
    }

    /// 复制现有字段并覆盖其中一个，按相同选项构造新实例
    pub fn with(&self, field: &str, value: impl Into<DtoValue>) -> DtoResult<Self> {
        if !self.rules.contains_key(field) {
            return Err(DtoError::InvalidInput {
                reason: format!("{field} is not a declared property of {}", self.class_name()),
            });
        }
        let mut input = self.data.clone();
        input.insert(field.to_string(), value.into());
        Self::with_options(self.class.clone(), input, self.options)
    }

    /// 按声明顺序投影为普通映射
    pub fn to_array(&self) -> DtoMap {
        self.rules
            .keys()
            .filter_map(|field| {
                self.data
                    .get(field)
                    .map(|value| (field.clone(), projection::convert_value_to_array(value)))
            })
            .collect()
    }

    pub fn to_json_value(&self) -> Value {
        Value::Object(
            self.rules
                .keys()
                .filter_map(|field| {
                    self.data
                        .get(field)
                        .map(|value| (field.clone(), value.to_json_value()))
                })
                .collect(),
        )
    }

    pub fn to_json(&self) -> DtoResult<String> {
        Ok(serde_json::to_string(&self.to_json_value())?)
    }
}

impl PartialEq for SimpleDto {
    fn eq(&self, other: &Self) -> bool {
        self.class_name() == other.class_name() && self.to_array() == other.to_array()
    }
}

impl Serialize for SimpleDto {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json_value().serialize(serializer)
    }
}

/// 构造输入必须是映射（或能投影为映射的对象）
fn input_map(value: DtoValue) -> DtoResult<DtoMap> {
    match value {
        DtoValue::Map(map) => Ok(map),
        DtoValue::Object(object) => Ok(object.fields().clone()),
        DtoValue::Dto(dto) => Ok(dto.data().clone()),
        DtoValue::Custom(custom) => Ok(custom.to_array()),
        other => Err(DtoError::InvalidInput {
            reason: format!("dto input must be a mapping, got {}", other.kind()),
        }),
    }
}
