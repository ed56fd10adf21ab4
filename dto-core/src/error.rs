//! DTO 统一错误定义
//!
//! 构造期的所有失败（类型校验、额外校验、嵌套 DTO 构造、时间解析）都会中止整个构造，
//! 调用方永远不会拿到半成品实例。每种错误都可以通过 [`DtoError::reasons`] 取得
//! 「字段 → 原因」的结构化视图，便于渲染表单级错误。
//!
use crate::schema::DtoClass;
use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;

/// 字段名 → 原因描述
pub type Reasons = IndexMap<String, String>;

/// 修改已冻结 DTO 时的固定提示
pub const IMMUTABLE_MESSAGE: &str = "DTOs are immutable. Create a new DTO to set a new value.";

/// NestedDto 缺少注册字段时的固定提示
pub const MISSING_INPUT_MESSAGE: &str = "Missing critical DTO input(s).";

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DtoError {
    // --- 构造期校验 ---
    #[error("validation failed: {}", render_reasons(.reasons))]
    Validation { reasons: Reasons },
    #[error("Missing critical DTO input(s).")]
    MissingRegistration {
        missing: IndexMap<String, Arc<DtoClass>>,
    },
    #[error("coercion failed: field={field}, reason={source}")]
    Coercion {
        field: String,
        #[source]
        source: Box<DtoError>,
    },
    #[error("DTOs are immutable. Create a new DTO to set a new value.")]
    Immutable { field: String },

    // --- 输入/元数据 ---
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
    #[error("unknown type: {name}")]
    UnknownType { name: String },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },

    // --- 持久化 ---
    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: String },
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
}

/// 统一 Result 类型别名
pub type DtoResult<T> = Result<T, DtoError>;

impl DtoError {
    /// 单字段校验失败，供 extra_validation 钩子使用
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut reasons = Reasons::new();
        reasons.insert(field.into(), reason.into());
        DtoError::Validation { reasons }
    }

    /// 结构化的「字段 → 原因」视图
    ///
    /// `Coercion` 透传内部错误的原因，不做任何包装。
    pub fn reasons(&self) -> Reasons {
        match self {
            DtoError::Validation { reasons } => reasons.clone(),
            DtoError::MissingRegistration { missing } => missing
                .iter()
                .map(|(field, class)| (field.clone(), class.name().to_string()))
                .collect(),
            DtoError::Coercion { source, .. } => source.reasons(),
            DtoError::Immutable { field } => {
                let mut reasons = Reasons::new();
                reasons.insert(field.clone(), IMMUTABLE_MESSAGE.to_string());
                reasons
            }
            _ => Reasons::new(),
        }
    }

    /// 是否为校验类错误（含透传自嵌套构造的校验错误）
    pub fn is_validation(&self) -> bool {
        match self {
            DtoError::Validation { .. } => true,
            DtoError::Coercion { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}

fn render_reasons(reasons: &Reasons) -> String {
    reasons
        .iter()
        .map(|(field, reason)| format!("{field}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ")
}
