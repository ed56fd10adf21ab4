//! 声明属性元数据与自省
//!
//! `DtoClass` 是一个 DTO 类的静态契约：属性列表（可见性、是否静态、声明类型、
//! 类型注解、默认值、忽略标记）以及可选的额外校验钩子。
//!
//! 只有「protected、非静态、未忽略」的属性参与校验契约。自省结果按类名缓存于
//! 进程级表中；结果是确定的，因此并发重复计算是安全的（后写覆盖即可）。
//!
use crate::error::DtoResult;
use crate::types::TypeExpr;
use crate::value::DtoMap;
use bon::Builder;
use dashmap::DashMap;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// 额外校验钩子：拿到校验后的数据，检查跨字段约束
pub type ExtraValidation = fn(&DtoMap) -> DtoResult<()>;

static PROPERTY_CACHE: LazyLock<DashMap<String, Arc<[DeclaredProperty]>>> =
    LazyLock::new(DashMap::new);

static CLASS_REGISTRY: LazyLock<DashMap<String, Arc<DtoClass>>> = LazyLock::new(DashMap::new);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    Public,
    #[default]
    Protected,
    Private,
}

/// 单个属性的原始声明
#[derive(Debug, Clone, Builder)]
pub struct PropertyDecl {
    #[builder(into)]
    name: String,
    #[builder(default)]
    visibility: Visibility,
    #[builder(default)]
    is_static: bool,
    /// 显式类型声明
    declared: Option<TypeExpr>,
    /// 文本类型注解，在没有可用的显式声明时使用
    #[builder(into)]
    annotation: Option<String>,
    default: Option<Value>,
    #[builder(default)]
    ignored: bool,
}

impl PropertyDecl {
    /// 最常见的形态：protected 且带显式类型
    pub fn protected(name: impl Into<String>, declared: TypeExpr) -> Self {
        Self::builder().name(name).declared(declared).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// 解析最终类型：显式声明优先；声明缺失或为 `Any` 时回退到注解
    pub fn resolve_type(&self) -> DtoResult<TypeExpr> {
        match (&self.declared, &self.annotation) {
            (Some(declared), _) if *declared != TypeExpr::Any => Ok(declared.clone()),
            (_, Some(annotation)) => TypeExpr::parse(annotation),
            (declared, None) => Ok(declared.clone().unwrap_or(TypeExpr::Any)),
        }
    }
}

/// 自省后参与契约的属性
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredProperty {
    pub name: String,
    pub ty: TypeExpr,
    pub default: Option<Value>,
    pub ignored: bool,
}

#[derive(Builder)]
pub struct DtoClass {
    #[builder(into)]
    name: String,
    #[builder(default)]
    properties: Vec<PropertyDecl>,
    extra_validation: Option<ExtraValidation>,
}

impl DtoClass {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &[PropertyDecl] {
        &self.properties
    }

    pub fn extra_validation(&self) -> Option<ExtraValidation> {
        self.extra_validation
    }

    /// 构建并登记到类注册表
    pub fn register(self) -> Arc<DtoClass> {
        register_class(Arc::new(self))
    }
}

impl fmt::Debug for DtoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DtoClass")
            .field("name", &self.name)
            .field(
                "properties",
                &self.properties.iter().map(PropertyDecl::name).collect::<Vec<_>>(),
            )
            .field("extra_validation", &self.extra_validation.is_some())
            .finish()
    }
}

/// 自省：protected 且非静态的属性（含 ignored 标记）
pub fn introspect(class: &DtoClass) -> DtoResult<Arc<[DeclaredProperty]>> {
    if let Some(hit) = PROPERTY_CACHE.get(class.name()) {
        return Ok(hit.value().clone());
    }

    let properties = class
        .properties()
        .iter()
        .filter(|p| p.visibility() == Visibility::Protected && !p.is_static())
        .map(|p| {
            Ok(DeclaredProperty {
                name: p.name().to_string(),
                ty: p.resolve_type()?,
                default: p.default.clone(),
                ignored: p.is_ignored(),
            })
        })
        .collect::<DtoResult<Vec<_>>>()?;

    let properties: Arc<[DeclaredProperty]> = properties.into();
    tracing::debug!(
        class = class.name(),
        count = properties.len(),
        "introspected dto class"
    );
    PROPERTY_CACHE.insert(class.name().to_string(), properties.clone());
    Ok(properties)
}

/// 参与校验契约的属性：自省结果去掉 ignored
pub fn contract(class: &DtoClass) -> DtoResult<Vec<DeclaredProperty>> {
    Ok(introspect(class)?
        .iter()
        .filter(|p| !p.ignored)
        .cloned()
        .collect())
}

/// 登记 DTO 类（同名后写覆盖），返回登记后的引用
pub fn register_class(class: Arc<DtoClass>) -> Arc<DtoClass> {
    CLASS_REGISTRY.insert(class.name().to_string(), class.clone());
    class
}

/// 仅在尚未登记时登记
pub(crate) fn ensure_registered(class: &Arc<DtoClass>) {
    if !CLASS_REGISTRY.contains_key(class.name()) {
        CLASS_REGISTRY.insert(class.name().to_string(), class.clone());
    }
}

pub fn lookup_class(name: &str) -> Option<Arc<DtoClass>> {
    CLASS_REGISTRY.get(name).map(|entry| entry.value().clone())
}
