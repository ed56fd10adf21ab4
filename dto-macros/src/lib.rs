//! DTO 过程宏（dto-macros）
//!
//! `#[dto]` 把具名字段结构体变成静态声明的 DTO 契约，生成代码依赖 `::dto_core` 路径。
//!
use proc_macro::TokenStream;

mod derive_utils;
mod dto;
mod field_utils;

/// DTO 宏
/// - 无可见性修饰的字段参与校验契约；`pub` 字段与 `#[dto(ignore)]` 字段不参与，
///   构造时以 `Default` 填充
/// - 追加隐藏字段保存底层 `SimpleDto`，并为非 `pub` 字段生成只读 getter
/// - 自动实现 `::dto_core::TypedDto`、`::dto_core::DtoField`、`PartialEq` 与 `From<Self> for DtoValue`
/// - 结构体参数：`#[dto(name = "...", extra_validation = path)]`，类名默认为结构体名
/// - 字段参数：`#[dto(rename = "...", default = expr, ty = "...", ignore)]`
#[proc_macro_attribute]
pub fn dto(attr: TokenStream, item: TokenStream) -> TokenStream {
    dto::expand(attr, item)
}
