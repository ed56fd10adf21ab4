use anyhow::Result as AnyResult;
use chrono::{DateTime, FixedOffset};
use dto_core::error::IMMUTABLE_MESSAGE;
use dto_core::schema::PropertyDecl;
use dto_core::timestamp;
use dto_core::{
    DtoClass, DtoError, DtoMap, DtoResult, DtoValue, SimpleDto, TypeExpr, TypedDto, Visibility,
};
use dto_macros::dto;
use serde_json::json;

#[dto(name = "Example.Address")]
struct Address {
    street: String,
    city: String,
}

#[dto(name = "Example.Person")]
struct Person {
    #[dto(rename = "firstName")]
    first_name: String,
    #[dto(rename = "lastName")]
    last_name: Option<String>,
    height: Option<f64>,
    #[dto(rename = "bornOn")]
    born_on: Option<DateTime<FixedOffset>>,
    address: Option<Address>,
    #[dto(default = 30)]
    age: i64,
    pub password: String,
    #[dto(ignore)]
    cache: Option<String>,
}

fn ada() -> DtoResult<Person> {
    Person::new(json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "height": 165,
        "bornOn": "2001-09-11 8:46 EST",
        "address": {"street": "Main", "city": "London"},
        "password": "hunter2",
        "cache": "warm",
    }))
}

#[test]
fn to_array_holds_only_declared_properties() -> AnyResult<()> {
    let person = ada()?;

    let array = person.to_array();
    let keys: Vec<_> = array.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["firstName", "lastName", "height", "bornOn", "address", "age"]
    );

    assert_eq!(person.first_name(), "Ada");
    assert_eq!(person.last_name().as_deref(), Some("Lovelace"));
    assert_eq!(*person.height(), Some(165.0));
    assert_eq!(*person.age(), 30);
    assert_eq!(person.address().as_ref().map(|a| a.city().as_str()), Some("London"));

    // pub 与 ignore 字段不会从输入取值
    assert_eq!(person.password, "");
    assert_eq!(*person.cache(), None);
    Ok(())
}

#[test]
fn timestamps_render_long_date_and_iso() -> AnyResult<()> {
    let person = ada()?;
    let born = person.born_on().as_ref().expect("bornOn is set");
    assert_eq!(timestamp::long_date(born), "September 11th, 2001");

    // to_array 中仍是时间点对象
    assert!(person.to_array()["bornOn"].as_timestamp().is_some());

    let json = person.to_json_value();
    assert_eq!(json["bornOn"], json!("2001-09-11T13:46:00.000000Z"));
    assert_eq!(json["address"], json!({"street": "Main", "city": "London"}));
    Ok(())
}

#[test]
fn json_round_trip_reproduces_to_array() -> AnyResult<()> {
    let person = ada()?;
    let encoded = person.to_json()?;
    let decoded: serde_json::Value = serde_json::from_str(&encoded)?;
    let rebuilt = Person::new(decoded)?;

    assert_eq!(rebuilt.to_array(), person.to_array());
    assert!(rebuilt == person);
    Ok(())
}

#[test]
fn persisted_state_round_trip_skips_validation() -> AnyResult<()> {
    let person = ada()?;
    let payload = person.serialize_state()?;

    let envelope: serde_json::Value = serde_json::from_str(&payload)?;
    assert_eq!(envelope["class"], json!("Example.Person"));
    assert_eq!(envelope["validator"], json!("strict"));
    assert_eq!(envelope["rules"]["lastName"], json!("?string"));

    let restored = Person::deserialize_state(&payload)?;
    assert_eq!(restored.to_array(), person.to_array());
    assert_eq!(restored.born_on(), person.born_on());
    Ok(())
}

#[test]
fn strict_mode_reports_field_reasons() {
    let err = Person::new(json!({"lastName": 3, "height": "asdf"}))
        .err()
        .expect("construction must fail");

    assert!(err.is_validation());
    let reasons = err.reasons();
    assert_eq!(reasons["lastName"], "lastName is not a valid string");
    assert_eq!(reasons["height"], "height is not a valid float");
    assert_eq!(reasons["firstName"], "firstName is required");
}

#[test]
fn permissive_mode_stores_nulls() -> AnyResult<()> {
    let dto = SimpleDto::permissive(Person::class(), json!({"height": "1.5"}))?;
    assert!(dto.is_permissive());
    assert!(dto.get("firstName").is_some_and(DtoValue::is_null));
    assert!(dto.get("address").is_some_and(DtoValue::is_null));
    assert_eq!(dto.get("height"), Some(&DtoValue::Float(1.5)));

    // 非 Option 字段无法承接 null
    let err = Person::new_permissive(json!({})).err().expect("firstName is not optional");
    assert_eq!(err.reasons()["firstName"], "firstName is not a valid string");
    Ok(())
}

#[test]
fn instances_are_immutable() -> AnyResult<()> {
    let person = ada()?;
    let err = person.set("firstName", "Grace").unwrap_err();
    assert_eq!(err.to_string(), IMMUTABLE_MESSAGE);
    assert!(matches!(err, DtoError::Immutable { .. }));
    assert_eq!(person.first_name(), "Ada");

    let grace = person.with("firstName", "Grace")?;
    assert_eq!(grace.first_name(), "Grace");
    assert_eq!(person.first_name(), "Ada");
    Ok(())
}

#[test]
fn nested_failures_surface_inner_reasons() {
    let err = Person::new(json!({
        "firstName": "Ada",
        "address": {"street": "Main"},
    }))
    .err()
    .expect("address is incomplete");

    assert!(matches!(err, DtoError::Coercion { .. }));
    assert_eq!(err.reasons()["city"], "city is required");
}

#[test]
fn existing_instances_are_reused_for_nested_fields() -> AnyResult<()> {
    let address = Address::new(json!({"street": "Elm", "city": "Paris"}))?;
    let mut input = DtoMap::new();
    input.insert("firstName".into(), "Marie".into());
    input.insert("address".into(), address.clone().into());

    let person = Person::new(input)?;
    assert!(person.address().as_ref() == Some(&address));
    Ok(())
}

fn weekend_check(data: &DtoMap) -> DtoResult<()> {
    let day = data.get("day").and_then(DtoValue::as_str);
    let staffed = data.get("staffed").and_then(DtoValue::as_bool);
    if matches!(day, Some("saturday" | "sunday")) && staffed == Some(true) {
        return Err(DtoError::invalid_field(
            "staffed",
            "staffed cannot be true on weekends",
        ));
    }
    Ok(())
}

#[dto(name = "Example.Shift", extra_validation = weekend_check)]
struct Shift {
    day: String,
    staffed: bool,
}

#[test]
fn extra_validation_uses_the_validation_error_kind() -> AnyResult<()> {
    let err = Shift::new(json!({"day": "sunday", "staffed": true}))
        .err()
        .expect("weekend shifts are unstaffed");
    assert!(err.is_validation());
    assert_eq!(err.reasons()["staffed"], "staffed cannot be true on weekends");

    let shift = Shift::new(json!({"day": "monday", "staffed": true}))?;
    assert!(*shift.staffed());
    Ok(())
}

#[test]
fn static_and_private_properties_never_participate() -> AnyResult<()> {
    let class = DtoClass::builder()
        .name("Example.Visibility")
        .properties(vec![
            PropertyDecl::protected("kept", TypeExpr::String),
            PropertyDecl::builder()
                .name("shared")
                .declared(TypeExpr::String)
                .is_static(true)
                .build(),
            PropertyDecl::builder()
                .name("secret")
                .visibility(Visibility::Private)
                .declared(TypeExpr::String)
                .build(),
            PropertyDecl::builder()
                .name("open")
                .visibility(Visibility::Public)
                .build(),
        ])
        .build()
        .register();

    let dto = SimpleDto::new(
        class,
        json!({"kept": "k", "shared": "s", "secret": "x", "open": 1}),
    )?;
    let keys: Vec<_> = dto.to_array().keys().cloned().collect();
    assert_eq!(keys, vec!["kept".to_string()]);
    Ok(())
}
