use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    analytics::record_event,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartLineDto, CartView, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartItem,
    response::{ApiResponse, Meta},
};

#[derive(FromRow)]
struct CartLineRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    variant_id: Option<Uuid>,
    variant_name: Option<String>,
    unit_price: i64,
    quantity: i32,
}

/// Cart contents with live pricing: the unit price is recomputed from the
/// current product price plus the variant modifier on every read, so a
/// price change between cart-add and checkout shows up here.
pub async fn get_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        r#"
        SELECT ci.id, ci.product_id, p.name AS product_name,
               ci.variant_id, v.name AS variant_name,
               p.price + COALESCE(v.price_modifier, 0) AS unit_price,
               ci.quantity
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        LEFT JOIN product_variants v ON v.id = ci.variant_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    let mut subtotal: i64 = 0;
    let mut item_count: i64 = 0;
    let items: Vec<CartLineDto> = rows
        .into_iter()
        .map(|row| {
            let line_total = row.unit_price * row.quantity as i64;
            subtotal += line_total;
            item_count += row.quantity as i64;
            CartLineDto {
                id: row.id,
                product_id: row.product_id,
                product_name: row.product_name,
                variant_id: row.variant_id,
                variant_name: row.variant_name,
                unit_price: row.unit_price,
                quantity: row.quantity,
                line_total,
            }
        })
        .collect();

    let data = CartView {
        items,
        subtotal,
        item_count,
    };
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product_exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;
    if product_exist.is_none() {
        return Err(AppError::BadRequest("product not found".to_string()));
    }

    if let Some(variant_id) = payload.variant_id {
        let variant_exist: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM product_variants WHERE id = $1 AND product_id = $2",
        )
        .bind(variant_id)
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;
        if variant_exist.is_none() {
            return Err(AppError::BadRequest(
                "variant does not belong to product".to_string(),
            ));
        }
    }

    // Atomic upsert against the user+product+variant unique constraint;
    // two concurrent adds serialize instead of duplicating rows.
    let cart_item = sqlx::query_as::<_, CartItem>(
        r#"
        INSERT INTO cart_items (id, user_id, product_id, variant_id, quantity)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, product_id, variant_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(payload.variant_id)
    .bind(payload.quantity)
    .fetch_one(pool)
    .await?;

    if let Err(err) = record_event(
        pool,
        "cart_add",
        Some(user.user_id),
        Some(payload.product_id),
        None,
        Some(serde_json::json!({ "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "analytics event failed");
    }

    Ok(ApiResponse::success("OK", cart_item, None))
}

/// Set a line's quantity; zero or below deletes the line.
pub async fn update_cart_item(
    pool: &DbPool,
    user: &AuthUser,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.quantity <= 0 {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(payload.item_id)
            .bind(user.user_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        return Ok(ApiResponse::success(
            "Removed from cart",
            serde_json::json!({}),
            Some(Meta::empty()),
        ));
    }

    let updated: Option<CartItem> = sqlx::query_as(
        r#"
        UPDATE cart_items
        SET quantity = $3
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(payload.item_id)
    .bind(user.user_id)
    .bind(payload.quantity)
    .fetch_optional(pool)
    .await?;

    let item = match updated {
        Some(item) => item,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success(
        "OK",
        serde_json::to_value(item).map_err(anyhow::Error::from)?,
        Some(Meta::empty()),
    ))
}

/// Remove one item, or clear the whole cart when no id is given.
pub async fn remove_from_cart(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Option<Uuid>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    match item_id {
        Some(id) => {
            let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user.user_id)
                .execute(pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(AppError::NotFound);
            }
            Ok(ApiResponse::success(
                "Removed from cart",
                serde_json::json!({}),
                Some(Meta::empty()),
            ))
        }
        None => {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
                .bind(user.user_id)
                .execute(pool)
                .await?;
            Ok(ApiResponse::success(
                "Cart cleared",
                serde_json::json!({}),
                Some(Meta::empty()),
            ))
        }
    }
}
