use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::discounts::{CreateDiscountRequest, DiscountList, UpdateDiscountRequest},
    entity::discounts::{
        ActiveModel as DiscountActive, Column as DiscountCol, Entity as Discounts,
        Model as DiscountModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Discount, DiscountType},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Pick the discount to apply to a purchase of `subtotal`: active, global,
/// currently within its date window, and with its minimum (if any) met.
/// Ties break on the raw `discount_value`, highest first. The comparison
/// deliberately does not normalize percentage against fixed amounts; that
/// matches the observed product behavior.
pub async fn select_active_discount<C: ConnectionTrait>(
    conn: &C,
    subtotal: i64,
) -> Result<Option<DiscountModel>, sea_orm::DbErr> {
    let now = Utc::now();
    Discounts::find()
        .filter(
            Condition::all()
                .add(DiscountCol::IsActive.eq(true))
                .add(DiscountCol::IsGlobal.eq(true))
                .add(DiscountCol::StartDate.lte(now))
                .add(DiscountCol::EndDate.gte(now))
                .add(
                    Condition::any()
                        .add(DiscountCol::MinPurchaseAmount.is_null())
                        .add(DiscountCol::MinPurchaseAmount.lte(subtotal)),
                ),
        )
        .order_by_desc(DiscountCol::DiscountValue)
        .one(conn)
        .await
}

/// Reduction in minor units for a chosen discount. Percentage amounts are
/// capped at `max_discount_amount` when set; fixed amounts are returned
/// as-is and clamped against the subtotal by the caller.
pub fn compute_reduction(
    discount_type: DiscountType,
    discount_value: i64,
    max_discount_amount: Option<i64>,
    subtotal: i64,
) -> i64 {
    match discount_type {
        DiscountType::Percentage => {
            let amount = subtotal * discount_value / 100;
            match max_discount_amount {
                Some(cap) => amount.min(cap),
                None => amount,
            }
        }
        DiscountType::Fixed => discount_value,
    }
}

pub async fn list_discounts(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<DiscountList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Discounts::find().order_by_desc(DiscountCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(discount_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Discounts",
        DiscountList { items },
        Some(meta),
    ))
}

pub async fn create_discount(
    state: &AppState,
    user: &AuthUser,
    payload: CreateDiscountRequest,
) -> AppResult<ApiResponse<Discount>> {
    ensure_admin(user)?;
    validate_discount(
        payload.discount_type,
        payload.discount_value,
        payload.max_discount_amount,
    )?;
    if payload.end_date < payload.start_date {
        return Err(AppError::BadRequest(
            "end_date must not precede start_date".into(),
        ));
    }

    let active = DiscountActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        discount_type: Set(payload.discount_type),
        discount_value: Set(payload.discount_value),
        min_purchase_amount: Set(payload.min_purchase_amount),
        max_discount_amount: Set(payload.max_discount_amount),
        start_date: Set(payload.start_date.into()),
        end_date: Set(payload.end_date.into()),
        is_active: Set(payload.is_active.unwrap_or(true)),
        is_global: Set(payload.is_global.unwrap_or(true)),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let discount = active.insert(&state.orm).await?;

    Ok(ApiResponse::success(
        "Discount created",
        discount_from_entity(discount),
        Some(Meta::empty()),
    ))
}

pub async fn update_discount(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateDiscountRequest,
) -> AppResult<ApiResponse<Discount>> {
    ensure_admin(user)?;
    let existing = Discounts::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(d) => d,
        None => return Err(AppError::NotFound),
    };

    let discount_type = payload.discount_type.unwrap_or(existing.discount_type);
    let discount_value = payload.discount_value.unwrap_or(existing.discount_value);
    // Outer `None` keeps the stored value; `Some(None)` clears it.
    let min_purchase_amount = payload
        .min_purchase_amount
        .unwrap_or(existing.min_purchase_amount);
    let max_discount_amount = payload
        .max_discount_amount
        .unwrap_or(existing.max_discount_amount);
    validate_discount(discount_type, discount_value, max_discount_amount)?;

    let start_date = payload
        .start_date
        .map(Into::into)
        .unwrap_or(existing.start_date);
    let end_date = payload.end_date.map(Into::into).unwrap_or(existing.end_date);
    if end_date < start_date {
        return Err(AppError::BadRequest(
            "end_date must not precede start_date".into(),
        ));
    }

    let mut active: DiscountActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    active.discount_type = Set(discount_type);
    active.discount_value = Set(discount_value);
    active.min_purchase_amount = Set(min_purchase_amount);
    active.max_discount_amount = Set(max_discount_amount);
    active.start_date = Set(start_date);
    active.end_date = Set(end_date);
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(is_global) = payload.is_global {
        active.is_global = Set(is_global);
    }
    active.updated_at = Set(Utc::now().into());

    let discount = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Discount updated",
        discount_from_entity(discount),
        Some(Meta::empty()),
    ))
}

pub async fn delete_discount(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Discounts::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn validate_discount(
    discount_type: DiscountType,
    discount_value: i64,
    max_discount_amount: Option<i64>,
) -> Result<(), AppError> {
    if discount_value <= 0 {
        return Err(AppError::BadRequest(
            "discount_value must be greater than 0".into(),
        ));
    }
    if discount_type == DiscountType::Percentage && discount_value > 100 {
        return Err(AppError::BadRequest(
            "percentage discount cannot exceed 100".into(),
        ));
    }
    // The cap only means anything for percentage discounts.
    if discount_type == DiscountType::Fixed && max_discount_amount.is_some() {
        return Err(AppError::BadRequest(
            "max_discount_amount only applies to percentage discounts".into(),
        ));
    }
    Ok(())
}

fn discount_from_entity(model: DiscountModel) -> Discount {
    Discount {
        id: model.id,
        name: model.name,
        discount_type: model.discount_type,
        discount_value: model.discount_value,
        min_purchase_amount: model.min_purchase_amount,
        max_discount_amount: model.max_discount_amount,
        start_date: model.start_date.with_timezone(&Utc),
        end_date: model.end_date.with_timezone(&Utc),
        is_active: model.is_active,
        is_global: model.is_global,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_reduction() {
        assert_eq!(
            compute_reduction(DiscountType::Percentage, 10, None, 2000),
            200
        );
    }

    #[test]
    fn percentage_reduction_capped_exactly() {
        assert_eq!(
            compute_reduction(DiscountType::Percentage, 50, Some(300), 2000),
            300
        );
        // Below the cap the raw amount wins.
        assert_eq!(
            compute_reduction(DiscountType::Percentage, 10, Some(300), 2000),
            200
        );
    }

    #[test]
    fn fixed_reduction_is_raw_value() {
        assert_eq!(compute_reduction(DiscountType::Fixed, 1500, None, 1000), 1500);
    }

    #[test]
    fn validate_rejects_cap_on_fixed() {
        assert!(validate_discount(DiscountType::Fixed, 500, Some(100)).is_err());
        assert!(validate_discount(DiscountType::Percentage, 10, Some(100)).is_ok());
        assert!(validate_discount(DiscountType::Percentage, 101, None).is_err());
        assert!(validate_discount(DiscountType::Fixed, 0, None).is_err());
    }
}
