use dto_core::{DtoResult, TypedDto};
use dto_macros::dto;
use serde_json::json;

#[dto]
struct Amount {
    value: i64,
    currency: Option<String>,
}

#[dto(name = "Ui.Account")]
#[derive(Clone)]
struct Account {
    #[dto(rename = "ownerName")]
    owner_name: String,
    #[dto(default = 0)]
    balance: f64,
    pub token: String,
    #[dto(ignore)]
    scratch: Vec<i64>,
}

fn main() -> DtoResult<()> {
    let amount = Amount::new(json!({"value": 5}))?;
    let _ = format!("{:?}", amount);
    let _: &i64 = amount.value();
    let _: &Option<String> = amount.currency();

    let account = Account::new(json!({"ownerName": "Ada"}))?;
    let _: &String = account.owner_name();
    let _: &f64 = account.balance();
    let _: &Vec<i64> = account.scratch();
    let _: &String = &account.token;

    // 派生的 Clone 只保留一份
    let copy = account.clone();
    let _eq = copy == account;

    Ok(())
}
