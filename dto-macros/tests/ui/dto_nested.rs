use chrono::{DateTime, Utc};
use dto_core::{DtoError, DtoMap, DtoResult, DtoValue, TypedDto};
use dto_macros::dto;
use serde_json::json;

fn require_city(data: &DtoMap) -> DtoResult<()> {
    match data.get("city").and_then(DtoValue::as_str) {
        Some("") => Err(DtoError::invalid_field("city", "city must not be empty")),
        _ => Ok(()),
    }
}

#[dto(extra_validation = require_city)]
struct Address {
    street: String,
    city: String,
}

#[dto]
struct Person {
    name: String,
    address: Option<Address>,
    #[dto(rename = "bornOn")]
    born_on: Option<DateTime<Utc>>,
    #[dto(ty = "?string")]
    nickname: serde_json::Value,
}

fn main() -> DtoResult<()> {
    let person = Person::new(json!({
        "name": "Ada",
        "address": {"street": "Main", "city": "London"},
        "bornOn": "1815-12-10",
    }))?;

    let _: Option<&Address> = person.address().as_ref();
    let _: &Option<DateTime<Utc>> = person.born_on();
    let _: &serde_json::Value = person.nickname();
    let _: DtoValue = person.into();
    Ok(())
}
