//! 类型校验器
//!
//! 给定「字段 → 类型表达式」规则与输入数据，返回校验（及宽松强转）后的数据，
//! 或携带逐字段原因的校验错误。提供两种实现：
//! - `StrictValidator`：类型不符即拒绝；
//! - `FuzzyValidator`：宽松强转标量（如数字字符串 → 数字）。
//!
use crate::error::{DtoError, DtoResult, Reasons};
use crate::types::TypeExpr;
use crate::value::{DtoMap, DtoValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 字段名 → 生效类型
pub type Rules = IndexMap<String, TypeExpr>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    #[default]
    Strict,
    /// 所有声明类型隐式可空，配合宽松校验器
    Permissive,
}

/// 校验器标识（随持久化状态一起保存）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    Strict,
    Fuzzy,
}

impl ValidatorKind {
    pub fn validator(self) -> &'static dyn TypeValidator {
        match self {
            ValidatorKind::Strict => &StrictValidator,
            ValidatorKind::Fuzzy => &FuzzyValidator,
        }
    }
}

impl From<ValidationMode> for ValidatorKind {
    fn from(mode: ValidationMode) -> Self {
        match mode {
            ValidationMode::Strict => ValidatorKind::Strict,
            ValidationMode::Permissive => ValidatorKind::Fuzzy,
        }
    }
}

pub trait TypeValidator: Send + Sync {
    fn kind(&self) -> ValidatorKind;

    /// 检查单个非空值是否符合 `ty`（已去掉可空包装），符合时返回可能被强转的值
    fn check(&self, ty: &TypeExpr, value: &DtoValue) -> Option<DtoValue>;

    fn validate(&self, rules: &Rules, data: &DtoMap) -> DtoResult<DtoMap> {
        let mut validated = DtoMap::new();
        let mut reasons = Reasons::new();

        for (field, ty) in rules {
            match data.get(field) {
                None | Some(DtoValue::Null) => {
                    if ty.is_nullable() {
                        validated.insert(field.clone(), DtoValue::Null);
                    } else {
                        reasons.insert(field.clone(), format!("{field} is required"));
                    }
                }
                Some(value) => match self.check(ty.inner(), value) {
                    Some(value) => {
                        validated.insert(field.clone(), value);
                    }
                    None => {
                        reasons.insert(
                            field.clone(),
                            format!("{field} is not a valid {}", ty.inner()),
                        );
                    }
                },
            }
        }

        if reasons.is_empty() {
            Ok(validated)
        } else {
            Err(DtoError::Validation { reasons })
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StrictValidator;

impl TypeValidator for StrictValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Strict
    }

    fn check(&self, ty: &TypeExpr, value: &DtoValue) -> Option<DtoValue> {
        check_strict(ty, value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyValidator;

impl TypeValidator for FuzzyValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Fuzzy
    }

    fn check(&self, ty: &TypeExpr, value: &DtoValue) -> Option<DtoValue> {
        check_fuzzy(ty, value)
    }
}

fn check_fuzzy(ty: &TypeExpr, value: &DtoValue) -> Option<DtoValue> {
    check_strict(ty, value).or_else(|| check_loose(ty, value))
}

fn check_strict(ty: &TypeExpr, value: &DtoValue) -> Option<DtoValue> {
    let ok = match (ty, value) {
        (TypeExpr::Any, _) => true,
        (TypeExpr::Nullable(inner), value) => return check_strict(inner, value),
        (TypeExpr::String, DtoValue::String(_)) => true,
        (TypeExpr::Int, DtoValue::Int(_)) => true,
        (TypeExpr::Float, DtoValue::Float(_)) => true,
        // 整数拓宽为浮点
        (TypeExpr::Float, DtoValue::Int(i)) => return Some(DtoValue::Float(*i as f64)),
        (TypeExpr::Bool, DtoValue::Bool(_)) => true,
        (TypeExpr::Array, DtoValue::List(_) | DtoValue::Map(_)) => true,
        (TypeExpr::List(elem), DtoValue::List(items)) => {
            return check_items(elem, items, check_strict);
        }
        (
            TypeExpr::Object,
            DtoValue::Map(_) | DtoValue::Object(_) | DtoValue::Dto(_) | DtoValue::Custom(_),
        ) => true,
        // 时间字符串/数值交给强转阶段解析
        (
            TypeExpr::Timestamp,
            DtoValue::String(_) | DtoValue::Int(_) | DtoValue::Float(_) | DtoValue::Timestamp(_),
        ) => true,
        (
            TypeExpr::Dto(_),
            DtoValue::Map(_) | DtoValue::Object(_) | DtoValue::Dto(_) | DtoValue::Custom(_),
        ) => true,
        _ => false,
    };
    ok.then(|| value.clone())
}

fn check_loose(ty: &TypeExpr, value: &DtoValue) -> Option<DtoValue> {
    match (ty, value) {
        (TypeExpr::String, DtoValue::Int(i)) => Some(DtoValue::String(i.to_string())),
        (TypeExpr::String, DtoValue::Float(f)) => Some(DtoValue::String(f.to_string())),
        (TypeExpr::String, DtoValue::Bool(b)) => Some(DtoValue::String(b.to_string())),
        (TypeExpr::Int, DtoValue::String(s)) => s.trim().parse::<i64>().ok().map(DtoValue::Int),
        // 超出 i64 范围的浮点不截断
        (TypeExpr::Int, DtoValue::Float(f))
            if f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f) =>
        {
            Some(DtoValue::Int(*f as i64))
        }
        (TypeExpr::Int, DtoValue::Bool(b)) => Some(DtoValue::Int(i64::from(*b))),
        (TypeExpr::Float, DtoValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(DtoValue::Float),
        (TypeExpr::Float, DtoValue::Bool(b)) => Some(DtoValue::Float(if *b { 1.0 } else { 0.0 })),
        (TypeExpr::Bool, DtoValue::String(s)) => parse_bool(s).map(DtoValue::Bool),
        (TypeExpr::Bool, DtoValue::Int(0)) => Some(DtoValue::Bool(false)),
        (TypeExpr::Bool, DtoValue::Int(1)) => Some(DtoValue::Bool(true)),
        (TypeExpr::List(elem), DtoValue::List(items)) => check_items(elem, items, check_fuzzy),
        _ => None,
    }
}

/// 逐元素检查，任一元素不符则整体不符；空元素仅在元素类型可空时接受
fn check_items(
    elem: &TypeExpr,
    items: &[DtoValue],
    check: fn(&TypeExpr, &DtoValue) -> Option<DtoValue>,
) -> Option<DtoValue> {
    items
        .iter()
        .map(|item| match item {
            DtoValue::Null => elem.is_nullable().then_some(DtoValue::Null),
            item => check(elem.inner(), item),
        })
        .collect::<Option<Vec<_>>>()
        .map(DtoValue::List)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules(pairs: &[(&str, TypeExpr)]) -> Rules {
        pairs
            .iter()
            .map(|(name, ty)| (name.to_string(), ty.clone()))
            .collect()
    }

    fn data(value: serde_json::Value) -> DtoMap {
        match DtoValue::from(value) {
            DtoValue::Map(map) => map,
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn strict_reports_every_mismatch() {
        let rules = rules(&[
            ("lastName", TypeExpr::String.nullable()),
            ("height", TypeExpr::Float.nullable()),
        ]);
        let err = StrictValidator
            .validate(&rules, &data(json!({"lastName": 3, "height": "asdf"})))
            .unwrap_err();
        let reasons = err.reasons();
        assert_eq!(reasons["lastName"], "lastName is not a valid string");
        assert_eq!(reasons["height"], "height is not a valid float");
    }

    #[test]
    fn strict_requires_non_nullable_fields() {
        let rules = rules(&[("name", TypeExpr::String), ("nick", TypeExpr::String.nullable())]);
        let err = StrictValidator.validate(&rules, &DtoMap::new()).unwrap_err();
        let reasons = err.reasons();
        assert_eq!(reasons.len(), 1);
        assert_eq!(reasons["name"], "name is required");
    }

    #[test]
    fn strict_fills_missing_nullable_with_null_and_drops_unknown_keys() {
        let rules = rules(&[("nick", TypeExpr::String.nullable())]);
        let out = StrictValidator
            .validate(&rules, &data(json!({"other": 1})))
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(out["nick"].is_null());
    }

    #[test]
    fn strict_widens_int_to_float() {
        let rules = rules(&[("height", TypeExpr::Float)]);
        let out = StrictValidator
            .validate(&rules, &data(json!({"height": 180})))
            .unwrap();
        assert_eq!(out["height"], DtoValue::Float(180.0));
    }

    #[test]
    fn fuzzy_coerces_loose_scalars() {
        let rules = rules(&[
            ("age", TypeExpr::Int),
            ("height", TypeExpr::Float),
            ("name", TypeExpr::String),
            ("active", TypeExpr::Bool),
        ]);
        let out = FuzzyValidator
            .validate(
                &rules,
                &data(json!({"age": "42", "height": "1.85", "name": 7, "active": "yes"})),
            )
            .unwrap();
        assert_eq!(out["age"], DtoValue::Int(42));
        assert_eq!(out["height"], DtoValue::Float(1.85));
        assert_eq!(out["name"], DtoValue::String("7".into()));
        assert_eq!(out["active"], DtoValue::Bool(true));
    }

    #[test]
    fn fuzzy_still_rejects_garbage() {
        let rules = rules(&[("height", TypeExpr::Float)]);
        let err = FuzzyValidator
            .validate(&rules, &data(json!({"height": "asdf"})))
            .unwrap_err();
        assert_eq!(err.reasons()["height"], "height is not a valid float");
    }

    #[test]
    fn fuzzy_rejects_floats_outside_the_int_range() {
        let rules = rules(&[("n", TypeExpr::Int)]);
        let err = FuzzyValidator
            .validate(&rules, &data(json!({"n": 1e30})))
            .unwrap_err();
        assert_eq!(err.reasons()["n"], "n is not a valid int");

        // u64 超出 i64 的 JSON 数字以浮点保存，同样不能当作 int
        let validators: [&dyn TypeValidator; 2] = [&StrictValidator, &FuzzyValidator];
        for validator in validators {
            let err = validator
                .validate(&rules, &data(json!({"n": u64::MAX})))
                .unwrap_err();
            assert_eq!(err.reasons()["n"], "n is not a valid int");
        }

        let out = FuzzyValidator
            .validate(&rules, &data(json!({"n": -9.0e15})))
            .unwrap();
        assert_eq!(out["n"], DtoValue::Int(-9_000_000_000_000_000));
    }

    #[test]
    fn list_elements_are_checked_one_by_one() {
        let rules = rules(&[
            ("scores", TypeExpr::List(Box::new(TypeExpr::Float))),
            ("tags", TypeExpr::List(Box::new(TypeExpr::String.nullable()))),
        ]);
        let out = StrictValidator
            .validate(&rules, &data(json!({"scores": [1, 2.5], "tags": ["a", null]})))
            .unwrap();
        assert_eq!(
            out["scores"],
            DtoValue::List(vec![DtoValue::Float(1.0), DtoValue::Float(2.5)])
        );
        assert_eq!(out["tags"], DtoValue::List(vec!["a".into(), DtoValue::Null]));

        let err = StrictValidator
            .validate(&rules, &data(json!({"scores": [1, "2"], "tags": {"a": 1}})))
            .unwrap_err();
        let reasons = err.reasons();
        assert_eq!(reasons["scores"], "scores is not a valid array<float>");
        assert_eq!(reasons["tags"], "tags is not a valid array<?string>");

        let out = FuzzyValidator
            .validate(&rules, &data(json!({"scores": [1, "2"], "tags": [3]})))
            .unwrap();
        assert_eq!(
            out["scores"],
            DtoValue::List(vec![DtoValue::Float(1.0), DtoValue::Float(2.0)])
        );
        assert_eq!(out["tags"], DtoValue::List(vec!["3".into()]));
    }

    #[test]
    fn mode_selects_validator() {
        assert_eq!(ValidatorKind::from(ValidationMode::Strict), ValidatorKind::Strict);
        assert_eq!(
            ValidatorKind::from(ValidationMode::Permissive).validator().kind(),
            ValidatorKind::Fuzzy
        );
    }
}
