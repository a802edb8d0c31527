pub mod auth;
pub mod batches;
pub mod damage;
pub mod dispatches;
pub mod inventory;
pub mod messages;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod returns;
pub mod roles;
pub mod transfers;
pub mod users;
pub mod warehouses;

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;

use crate::{error::ApiResult, middleware::get_current_user, AppState};

#[derive(Serialize)]
pub struct Summary {
    pub warehouse_count: i64,
    pub product_count: i64,
    pub pending_orders: i64,
    pub active_dispatches: i64,
    pub unread_notifications: i64,
}

/// Landing numbers for the authenticated user.
pub async fn summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Summary>> {
    let user = get_current_user(&headers, &state.db).await?;

    let warehouse_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM warehouses WHERE is_active = true")
            .fetch_one(&state.db)
            .await?;

    let product_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE is_active = true")
            .fetch_one(&state.db)
            .await?;

    let pending_orders = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM orders WHERE is_active = true AND status IN ('pending', 'processing')",
    )
    .fetch_one(&state.db)
    .await?;

    let active_dispatches =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM dispatches WHERE is_active = true")
            .fetch_one(&state.db)
            .await?;

    let unread_notifications = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
    )
    .bind(user.id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(Summary {
        warehouse_count,
        product_count,
        pending_orders,
        active_dispatches,
        unread_notifications,
    }))
}
