//! 数组投影
//!
//! 把存储值转换为普通映射：DTO 与实现了 [`ToArray`](crate::value::ToArray) 的值
//! 替换为其 `to_array` 结果，通用对象替换为其字段映射，包含这些值的数组逐元素转换。
//! 时间戳、标量以及只含标量的数组保持不变。
//!
use crate::value::{DtoMap, DtoValue};

pub fn convert_value_to_array(value: &DtoValue) -> DtoValue {
    match value {
        DtoValue::Dto(dto) => DtoValue::Map(dto.to_array()),
        DtoValue::Custom(custom) => DtoValue::Map(custom.to_array()),
        DtoValue::Object(object) => DtoValue::Map(object.fields().clone()),
        DtoValue::List(items) if items.iter().any(is_convertible) => {
            DtoValue::List(items.iter().map(convert_value_to_array).collect())
        }
        DtoValue::Map(map) if map.values().any(is_convertible) => DtoValue::Map(project(map)),
        other => other.clone(),
    }
}

/// 对整张映射逐值投影，保持键顺序
pub fn project(map: &DtoMap) -> DtoMap {
    map.iter()
        .map(|(key, value)| (key.clone(), convert_value_to_array(value)))
        .collect()
}

fn is_convertible(value: &DtoValue) -> bool {
    match value {
        DtoValue::Dto(_) | DtoValue::Custom(_) | DtoValue::Object(_) => true,
        DtoValue::List(items) => items.iter().any(is_convertible),
        DtoValue::Map(map) => map.values().any(is_convertible),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{GenericObject, ToArray};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Money {
        amount: i64,
        currency: &'static str,
    }

    impl ToArray for Money {
        fn to_array(&self) -> DtoMap {
            let mut map = DtoMap::new();
            map.insert("amount".into(), self.amount.into());
            map.insert("currency".into(), self.currency.into());
            map
        }
    }

    fn money(amount: i64) -> DtoValue {
        DtoValue::Custom(Arc::new(Money {
            amount,
            currency: "EUR",
        }))
    }

    #[test]
    fn scalar_arrays_are_left_alone() {
        let list = DtoValue::List(vec![1.into(), "two".into(), true.into()]);
        assert_eq!(convert_value_to_array(&list), list);
    }

    #[test]
    fn arrays_of_convertibles_are_converted_elementwise() {
        let list = DtoValue::List(vec![money(1), money(2)]);
        match convert_value_to_array(&list) {
            DtoValue::List(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[1].as_map().unwrap()["amount"], DtoValue::Int(2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn single_convertible_and_generic_object() {
        let converted = convert_value_to_array(&money(5));
        assert_eq!(converted.as_map().unwrap()["currency"], DtoValue::from("EUR"));

        let object = DtoValue::from(GenericObject::new("Point").with_field("x", 1));
        let converted = convert_value_to_array(&object);
        assert_eq!(converted.as_map().unwrap()["x"], DtoValue::Int(1));
    }

    #[test]
    fn timestamps_and_scalars_are_unchanged() {
        let ts = DtoValue::from(Utc.with_ymd_and_hms(2001, 9, 11, 13, 46, 0).unwrap());
        assert_eq!(convert_value_to_array(&ts), ts);
        assert_eq!(convert_value_to_array(&DtoValue::Int(7)), DtoValue::Int(7));
        assert_eq!(convert_value_to_array(&DtoValue::Null), DtoValue::Null);
    }
}
