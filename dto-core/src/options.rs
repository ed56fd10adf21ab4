//! 构造选项
//!
//! 校验模式与校验器选择。未显式指定校验器时按模式推导：
//! 严格模式使用 `Strict`，宽松模式使用 `Fuzzy`。
//!
use crate::validator::{TypeValidator, ValidationMode, ValidatorKind};
use bon::Builder;
use serde::{Deserialize, Serialize};

#[derive(Builder, Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtoOptions {
    #[builder(default)]
    mode: ValidationMode,
    validator: Option<ValidatorKind>,
}

impl DtoOptions {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn permissive() -> Self {
        Self::builder().mode(ValidationMode::Permissive).build()
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn is_permissive(&self) -> bool {
        self.mode == ValidationMode::Permissive
    }

    /// 生效的校验器标识
    pub fn validator_kind(&self) -> ValidatorKind {
        self.validator.unwrap_or_else(|| self.mode.into())
    }

    pub fn validator(&self) -> &'static dyn TypeValidator {
        self.validator_kind().validator()
    }
}
