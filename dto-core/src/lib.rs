//! 不可变 DTO 基础库（dto-core）
//!
//! 以「声明属性即契约」的方式构造数据传输对象：
//! - 自省类的声明属性（`schema`），按类名缓存；
//! - 依据规则集做严格或宽松的类型校验（`validator`）；
//! - 将时间字符串解析为时间点、将映射构造为嵌套 DTO（`coercion`、`timestamp`）；
//! - 构造后的实例不可修改，只能通过 `with` 得到新实例（`simple_dto`）；
//! - 由运行时注册表决定形状的嵌套 DTO（`nested_dto`）；
//! - `to_array` / `to_json` 投影（`projection`）与完整状态持久化（`persist`）。
//!
//! 典型用法：
//! 1. 用 `#[dto]`（见 `dto-macros`）标注具名字段结构体，或手工构建 `DtoClass`；
//! 2. 以映射或 JSON 构造实例，失败时从 `DtoError::reasons` 读取逐字段原因；
//! 3. 通过 `to_json` 输出、通过 `serialize_state` 保存并在之后可信重建。
//!
mod coercion;
pub mod error;
pub mod nested_dto;
pub mod options;
pub mod persist;
pub mod projection;
pub mod schema;
pub mod simple_dto;
pub mod timestamp;
pub mod typed;
pub mod types;
pub mod validator;
pub mod value;

pub use error::{DtoError, DtoResult, Reasons};
pub use nested_dto::{NestedDto, Registration};
pub use options::DtoOptions;
pub use persist::{SerializedDto, StoredValue};
pub use schema::{DtoClass, PropertyDecl, Visibility};
pub use simple_dto::SimpleDto;
pub use typed::{DtoField, TypedDto};
pub use types::{DtoClassRef, TypeExpr};
pub use validator::{ValidationMode, ValidatorKind};
pub use value::{DtoMap, DtoValue, GenericObject, ToArray};

// 生成代码中的默认值表达式通过该路径构造 JSON
#[doc(hidden)]
pub use serde_json;
