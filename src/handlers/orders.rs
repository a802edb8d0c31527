use axum::{
    extract::{Path, State},
    http::HeaderMap,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::get_current_user,
    models::{CreateOrder, Order, OrderStatus, UpdateOrderStatus},
    AppState,
};

pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateOrder>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("orders:write")?;

    if payload.quantity <= 0 {
        return Err(ApiError::BadRequest("quantity must be positive".to_string()));
    }
    if payload.customer_name.trim().is_empty() {
        return Err(ApiError::BadRequest("customer name must not be empty".to_string()));
    }

    let product_exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM products WHERE id = $1 AND is_active = true",
    )
    .bind(payload.product_id)
    .fetch_one(&state.db)
    .await?;
    if product_exists == 0 {
        return Err(ApiError::NotFound("product"));
    }

    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (customer_name, product_id, warehouse_id, quantity, notes, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.customer_name.trim())
    .bind(payload.product_id)
    .bind(payload.warehouse_id)
    .bind(payload.quantity)
    .bind(&payload.notes)
    .bind(current_user.id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Order>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("orders:read")?;

    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE is_active = true ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("orders:read")?;

    let order =
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND is_active = true")
            .bind(order_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or(ApiError::NotFound("order"))?;

    Ok(Json(order))
}

/// Advance an order through its lifecycle. Illegal jumps and transitions
/// out of terminal states are rejected.
pub async fn update_order_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatus>,
) -> ApiResult<Json<Order>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("orders:write")?;

    let next = OrderStatus::parse(&payload.status)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown status '{}'", payload.status)))?;

    let mut tx = state.db.begin().await?;

    let order = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE id = $1 AND is_active = true FOR UPDATE",
    )
    .bind(order_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::NotFound("order"))?;

    let current = OrderStatus::parse(&order.status)
        .ok_or_else(|| ApiError::Internal(format!("corrupt order status '{}'", order.status)))?;

    if !current.can_transition_to(next) {
        return Err(ApiError::Conflict(format!(
            "cannot move order from '{}' to '{}'",
            current.as_str(),
            next.as_str()
        )));
    }

    let updated = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(next.as_str())
    .bind(order_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    // Order owners hear about status changes made by someone else.
    if let Some(owner) = updated.created_by {
        if owner != current_user.id {
            state
                .notifier
                .notify(
                    &state.db,
                    owner,
                    &format!("order {} moved to '{}'", updated.id, updated.status),
                    Some(&format!("/api/orders/{}", updated.id)),
                )
                .await;
        }
    }

    Ok(Json(updated))
}

pub async fn delete_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("orders:write")?;

    let result =
        sqlx::query("UPDATE orders SET is_active = false, updated_at = NOW() WHERE id = $1")
            .bind(order_id)
            .execute(&state.db)
            .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("order"));
    }

    Ok(StatusCode::NO_CONTENT)
}
