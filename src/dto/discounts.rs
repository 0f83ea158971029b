use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::models::{Discount, DiscountType};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDiscountRequest {
    pub name: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_purchase_amount: Option<i64>,
    pub max_discount_amount: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: Option<bool>,
    pub is_global: Option<bool>,
}

/// Nullable fields use a double `Option` so a PUT can distinguish
/// "leave unchanged" (field absent, outer `None`) from "clear to null"
/// (explicit `null`, `Some(None)`).
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDiscountRequest {
    pub name: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub min_purchase_amount: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_discount_amount: Option<Option<i64>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub is_global: Option<bool>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DiscountList {
    pub items: Vec<Discount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_distinguishes_absent_from_null() {
        let absent: UpdateDiscountRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.max_discount_amount, None);
        assert_eq!(absent.min_purchase_amount, None);

        let cleared: UpdateDiscountRequest =
            serde_json::from_str(r#"{"max_discount_amount": null}"#).unwrap();
        assert_eq!(cleared.max_discount_amount, Some(None));

        let set: UpdateDiscountRequest =
            serde_json::from_str(r#"{"min_purchase_amount": 2000}"#).unwrap();
        assert_eq!(set.min_purchase_amount, Some(Some(2000)));
    }
}
