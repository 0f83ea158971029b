use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    analytics::record_event,
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems},
    entity::{
        cart_items::{self, Column as CartCol, Entity as CartItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        product_variants::{Column as VariantCol, Entity as ProductVariants},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::discount_service::{compute_reduction, select_active_discount},
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    // Admins see every order; everyone else only their own.
    if !user.is_admin() {
        condition = condition.add(OrderCol::UserId.eq(user.user_id));
    }
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

/// Convert the caller's cart into an order. The whole sequence (price
/// snapshot, discount, order + item inserts, stock decrements, cart
/// clear) runs in one transaction; any failure rolls everything back.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let shipping_address = payload.shipping_address.trim().to_string();
    if shipping_address.is_empty() {
        return Err(AppError::BadRequest("shipping_address is required".into()));
    }
    let payment_method = payload.payment_method.trim().to_string();
    if payment_method.is_empty() {
        return Err(AppError::BadRequest("payment_method is required".into()));
    }

    let txn = state.orm.begin().await?;

    #[derive(Debug, FromQueryResult)]
    struct CartLineRow {
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: i32,
        price: i64,
        price_modifier: Option<i64>,
    }

    let lines = CartItems::find()
        .select_only()
        .column_as(CartCol::ProductId, "product_id")
        .column_as(CartCol::VariantId, "variant_id")
        .column_as(CartCol::Quantity, "quantity")
        .column_as(ProdCol::Price, "price")
        .column_as(VariantCol::PriceModifier, "price_modifier")
        .join(JoinType::InnerJoin, cart_items::Relation::Products.def())
        .join(
            JoinType::LeftJoin,
            cart_items::Relation::ProductVariants.def(),
        )
        .filter(CartCol::UserId.eq(user.user_id))
        .into_model::<CartLineRow>()
        .all(&txn)
        .await?;

    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let mut subtotal: i64 = 0;
    for line in &lines {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        let unit_price = line.price + line.price_modifier.unwrap_or(0);
        subtotal += unit_price * line.quantity as i64;
    }

    let discount = select_active_discount(&txn, subtotal).await?;
    let discount_applied = match &discount {
        Some(d) => compute_reduction(
            d.discount_type,
            d.discount_value,
            d.max_discount_amount,
            subtotal,
        )
        .min(subtotal),
        None => 0,
    };
    let total_amount = subtotal - discount_applied;

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        order_number: Set(build_order_number()),
        subtotal: Set(subtotal),
        discount_applied: Set(discount_applied),
        total_amount: Set(total_amount),
        status: Set("pending".into()),
        payment_method: Set(payment_method),
        shipping_address: Set(shipping_address),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::new();
    for line in &lines {
        let unit_price = line.price + line.price_modifier.unwrap_or(0);
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            variant_id: Set(line.variant_id),
            quantity: Set(line.quantity),
            price: Set(unit_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        order_items.push(order_item_from_entity(item));

        // Conditional decrement: zero rows affected means there was not
        // enough stock, and the transaction rolls back on the error.
        let affected = match line.variant_id {
            Some(variant_id) => {
                ProductVariants::update_many()
                    .col_expr(
                        VariantCol::Stock,
                        Expr::col(VariantCol::Stock).sub(line.quantity),
                    )
                    .filter(VariantCol::Id.eq(variant_id))
                    .filter(VariantCol::Stock.gte(line.quantity))
                    .exec(&txn)
                    .await?
                    .rows_affected
            }
            None => {
                Products::update_many()
                    .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
                    .filter(ProdCol::Id.eq(line.product_id))
                    .filter(ProdCol::Stock.gte(line.quantity))
                    .exec(&txn)
                    .await?
                    .rows_affected
            }
        };
        if affected == 0 {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}",
                line.product_id
            )));
        }
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    for item in &order_items {
        if let Err(err) = record_event(
            &state.pool,
            "purchase",
            Some(user.user_id),
            Some(item.product_id),
            Some(order.id),
            Some(serde_json::json!({ "quantity": item.quantity, "price": item.price })),
        )
        .await
        {
            tracing::warn!(error = %err, "analytics event failed");
        }
    }

    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems {
            order: order_from_entity(order),
            items: order_items,
        },
        Some(Meta::empty()),
    ))
}

/// Look an order up by UUID, or by its human-readable order number when
/// the key does not parse as a UUID. Non-admins only see their own.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    key: &str,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let mut condition = Condition::all();
    condition = match Uuid::parse_str(key) {
        Ok(id) => condition.add(OrderCol::Id.eq(id)),
        Err(_) => condition.add(OrderCol::OrderNumber.eq(key)),
    };
    if !user.is_admin() {
        condition = condition.add(OrderCol::UserId.eq(user.user_id));
    }

    let order = Orders::find().filter(condition).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        order_number: model.order_number,
        subtotal: model.subtotal,
        discount_applied: model.discount_applied,
        total_amount: model.total_amount,
        status: model.status,
        payment_method: model.payment_method,
        shipping_address: model.shipping_address,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        variant_id: model.variant_id,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

/// `ORD-<base36 millis>-<5 base36 chars>`. The random suffix makes a
/// same-millisecond collision unlikely; no uniqueness re-check is done
/// beyond the column's UNIQUE constraint.
fn build_order_number() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let rand = (Uuid::new_v4().as_u128() % 36u128.pow(5)) as u64;
    format!("ORD-{}-{:0>5}", to_base36(millis), to_base36(rand))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base36_round_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn order_number_format() {
        let number = build_order_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert!(!parts[1].is_empty());
        assert_eq!(parts[2].len(), 5);
        for part in &parts[1..] {
            assert!(
                part.chars()
                    .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
            );
        }
    }

    #[test]
    fn order_numbers_differ() {
        assert_ne!(build_order_number(), build_order_number());
    }
}
