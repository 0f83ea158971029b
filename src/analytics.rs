use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// Insert one analytics event row. Callers treat this as best-effort:
/// failures are logged and never fail the primary operation.
pub async fn record_event(
    pool: &DbPool,
    event_type: &str,
    user_id: Option<Uuid>,
    product_id: Option<Uuid>,
    order_id: Option<Uuid>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO analytics_events (id, user_id, event_type, product_id, order_id, metadata)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(event_type)
    .bind(product_id)
    .bind(order_id)
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}
