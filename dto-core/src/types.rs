//! 类型表达式
//!
//! 描述一个声明属性允许的取值：基础类型、可空包装、时间戳、其他 DTO 类或不限类型。
//! 文本形式（`?string`、`float|null`、`Address`、`array<timestamp>` 等）用于类型注解与持久化规则。
//!
use crate::error::{DtoError, DtoResult};
use crate::schema::{self, DtoClass};
use std::fmt;
use std::sync::Arc;

/// 被识别为时间戳的类型名
pub const TIMESTAMP_TYPE_NAMES: &[&str] = &[
    "timestamp",
    "datetime",
    "DateTime",
    "DateTimeImmutable",
    "DateTimeInterface",
    "Carbon",
    "CarbonImmutable",
];

/// 对 DTO 类的引用
///
/// `Lazy` 在首次使用时才解析，允许类型在自身元数据初始化期间引用自己。
#[derive(Clone)]
pub enum DtoClassRef {
    Shared(Arc<DtoClass>),
    Lazy(fn() -> Arc<DtoClass>),
}

impl DtoClassRef {
    pub fn get(&self) -> Arc<DtoClass> {
        match self {
            DtoClassRef::Shared(class) => class.clone(),
            DtoClassRef::Lazy(resolve) => resolve(),
        }
    }

    pub fn name(&self) -> String {
        self.get().name().to_string()
    }
}

impl fmt::Debug for DtoClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DtoClassRef({})", self.name())
    }
}

impl From<Arc<DtoClass>> for DtoClassRef {
    fn from(class: Arc<DtoClass>) -> Self {
        DtoClassRef::Shared(class)
    }
}

#[derive(Debug, Clone)]
pub enum TypeExpr {
    String,
    Int,
    Float,
    Bool,
    Array,
    /// 元素类型确定的列表，逐元素校验与强转
    List(Box<TypeExpr>),
    Object,
    Timestamp,
    Dto(DtoClassRef),
    /// 未声明类型，接受任意值
    Any,
    Nullable(Box<TypeExpr>),
}

impl TypeExpr {
    /// 包装为可空（幂等）
    pub fn nullable(self) -> Self {
        match self {
            TypeExpr::Nullable(_) | TypeExpr::Any => self,
            other => TypeExpr::Nullable(Box::new(other)),
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, TypeExpr::Nullable(_) | TypeExpr::Any)
    }

    /// 去掉可空包装后的内部类型
    pub fn inner(&self) -> &TypeExpr {
        match self {
            TypeExpr::Nullable(inner) => inner.inner(),
            other => other,
        }
    }

    /// 解析文本类型表达式
    ///
    /// 支持 `?T`、`T|null`、`null|T`、`array<T>`、`T[]`；DTO 类名通过类注册表解析。
    pub fn parse(text: &str) -> DtoResult<Self> {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix('?') {
            return Ok(Self::parse(rest)?.nullable());
        }
        if let Some(elem) = text
            .strip_prefix("array<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return Ok(TypeExpr::List(Box::new(Self::parse(elem)?)));
        }
        if let Some(elem) = text.strip_suffix("[]") {
            return Ok(TypeExpr::List(Box::new(Self::parse(elem)?)));
        }

        let parts: Vec<&str> = text.split('|').map(str::trim).collect();
        if parts.len() > 1 {
            let non_null: Vec<&str> = parts
                .iter()
                .copied()
                .filter(|p| !p.eq_ignore_ascii_case("null"))
                .collect();
            let has_null = non_null.len() < parts.len();
            return match non_null.as_slice() {
                [single] if has_null => Ok(Self::parse(single)?.nullable()),
                _ => Err(DtoError::UnknownType {
                    name: text.to_string(),
                }),
            };
        }

        if TIMESTAMP_TYPE_NAMES.contains(&text) {
            return Ok(TypeExpr::Timestamp);
        }

        let parsed = match text.to_ascii_lowercase().as_str() {
            "" | "mixed" => TypeExpr::Any,
            "string" => TypeExpr::String,
            "int" | "integer" => TypeExpr::Int,
            "float" | "double" => TypeExpr::Float,
            "bool" | "boolean" => TypeExpr::Bool,
            "array" => TypeExpr::Array,
            "object" => TypeExpr::Object,
            _ => match schema::lookup_class(text) {
                Some(class) => TypeExpr::Dto(DtoClassRef::Shared(class)),
                None => {
                    return Err(DtoError::UnknownType {
                        name: text.to_string(),
                    });
                }
            },
        };
        Ok(parsed)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::String => f.write_str("string"),
            TypeExpr::Int => f.write_str("int"),
            TypeExpr::Float => f.write_str("float"),
            TypeExpr::Bool => f.write_str("bool"),
            TypeExpr::Array => f.write_str("array"),
            TypeExpr::List(elem) => write!(f, "array<{elem}>"),
            TypeExpr::Object => f.write_str("object"),
            TypeExpr::Timestamp => f.write_str("timestamp"),
            TypeExpr::Dto(class) => f.write_str(&class.name()),
            TypeExpr::Any => f.write_str("mixed"),
            TypeExpr::Nullable(inner) => write!(f, "?{inner}"),
        }
    }
}

impl PartialEq for TypeExpr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeExpr::Dto(a), TypeExpr::Dto(b)) => a.name() == b.name(),
            (TypeExpr::Nullable(a), TypeExpr::Nullable(b)) => a == b,
            (TypeExpr::List(a), TypeExpr::List(b)) => a == b,
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}
