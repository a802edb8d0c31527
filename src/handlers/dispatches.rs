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
    models::{CreateDispatch, Dispatch},
    stock::{deduct_stock, restore_stock},
    AppState,
};

use super::batches::ensure_product_and_warehouse;
use super::inventory::breaches_reorder_point;

/// Fails closed: an error from either count query skips the notification
/// rather than flagging low stock against a defaulted count.
fn low_stock_after_dispatch(
    on_hand: Result<i64, sqlx::Error>,
    reorder_point: Result<i32, sqlx::Error>,
) -> Result<bool, sqlx::Error> {
    // A dispatch just drew from this pair, so batch history exists.
    Ok(breaches_reorder_point(on_hand?, reorder_point?, true))
}

/// Dispatch stock out of a warehouse: FIFO deduction plus one OUT ledger
/// row, atomically.
pub async fn create_dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateDispatch>,
) -> ApiResult<(StatusCode, Json<Dispatch>)> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("dispatch:write")?;

    if payload.quantity <= 0 {
        return Err(ApiError::BadRequest("quantity must be positive".to_string()));
    }
    if payload.destination.trim().is_empty() {
        return Err(ApiError::BadRequest("destination must not be empty".to_string()));
    }

    ensure_product_and_warehouse(&state, payload.product_id, payload.warehouse_id).await?;

    let mut tx = state.db.begin().await?;

    let dispatch = sqlx::query_as::<_, Dispatch>(
        r#"
        INSERT INTO dispatches (product_id, warehouse_id, quantity, destination, notes, dispatched_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.product_id)
    .bind(payload.warehouse_id)
    .bind(payload.quantity)
    .bind(payload.destination.trim())
    .bind(&payload.notes)
    .bind(current_user.id)
    .fetch_one(&mut *tx)
    .await?;

    deduct_stock(
        &mut tx,
        payload.product_id,
        payload.warehouse_id,
        payload.quantity,
        &format!("dispatch:{}", dispatch.id),
        current_user.id,
    )
    .await?;

    tx.commit().await?;

    // Low-stock heads-up for the dispatcher, outside the transaction.
    let on_hand = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(qty_available), 0) FROM stock_batches WHERE product_id = $1 AND warehouse_id = $2 AND status = 'active'",
    )
    .bind(payload.product_id)
    .bind(payload.warehouse_id)
    .fetch_one(&state.db)
    .await;

    let reorder_point = sqlx::query_scalar::<_, i32>(
        "SELECT reorder_point FROM products WHERE id = $1",
    )
    .bind(payload.product_id)
    .fetch_one(&state.db)
    .await;

    match low_stock_after_dispatch(on_hand, reorder_point) {
        Ok(true) => {
            state
                .notifier
                .notify(
                    &state.db,
                    current_user.id,
                    &format!("stock at or below reorder point after dispatch {}", dispatch.id),
                    Some(&format!("/api/inventory?product_id={}", payload.product_id)),
                )
                .await;
        }
        Ok(false) => {}
        Err(err) => {
            tracing::warn!("low-stock check skipped after dispatch {}: {err}", dispatch.id);
        }
    }

    Ok((StatusCode::CREATED, Json(dispatch)))
}

pub async fn list_dispatches(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Dispatch>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("dispatch:read")?;

    let dispatches = sqlx::query_as::<_, Dispatch>(
        "SELECT * FROM dispatches WHERE is_active = true ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(dispatches))
}

pub async fn get_dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(dispatch_id): Path<Uuid>,
) -> ApiResult<Json<Dispatch>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("dispatch:read")?;

    let dispatch = sqlx::query_as::<_, Dispatch>("SELECT * FROM dispatches WHERE id = $1")
        .bind(dispatch_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("dispatch"))?;

    Ok(Json(dispatch))
}

/// Reverse a dispatch: LIFO restore of the full quantity plus one IN ledger
/// row, then soft-delete the dispatch.
pub async fn delete_dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(dispatch_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("dispatch:delete")?;

    let mut tx = state.db.begin().await?;

    let dispatch = sqlx::query_as::<_, Dispatch>(
        "SELECT * FROM dispatches WHERE id = $1 FOR UPDATE",
    )
    .bind(dispatch_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::NotFound("dispatch"))?;

    if !dispatch.is_active {
        return Err(ApiError::Conflict("dispatch already deleted".to_string()));
    }

    // Returned units were already restored; only the outstanding remainder
    // comes back on reversal.
    let returned = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity), 0) FROM returns WHERE dispatch_id = $1",
    )
    .bind(dispatch_id)
    .fetch_one(&mut *tx)
    .await?;

    let outstanding = dispatch.quantity - returned as i32;
    if outstanding > 0 {
        restore_stock(
            &mut tx,
            dispatch.product_id,
            dispatch.warehouse_id,
            outstanding,
            &format!("dispatch:{dispatch_id}"),
            current_user.id,
        )
        .await?;
    }

    sqlx::query("UPDATE dispatches SET is_active = false, updated_at = NOW() WHERE id = $1")
        .bind(dispatch_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_stock_triggers_low_stock_flag() {
        assert_eq!(low_stock_after_dispatch(Ok(0), Ok(0)).unwrap(), true);
        assert_eq!(low_stock_after_dispatch(Ok(4), Ok(5)).unwrap(), true);
    }

    #[test]
    fn healthy_stock_does_not_trigger() {
        assert_eq!(low_stock_after_dispatch(Ok(20), Ok(5)).unwrap(), false);
    }

    #[test]
    fn query_error_skips_the_check_instead_of_flagging() {
        assert!(low_stock_after_dispatch(Err(sqlx::Error::PoolTimedOut), Ok(0)).is_err());
        assert!(low_stock_after_dispatch(Ok(0), Err(sqlx::Error::PoolTimedOut)).is_err());
    }
}
