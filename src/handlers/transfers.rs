use axum::{
    extract::State,
    http::HeaderMap,
    http::StatusCode,
    Json,
};

use crate::{
    error::{ApiError, ApiResult},
    middleware::get_current_user,
    models::{CreateTransfer, Transfer},
    stock::{append_ledger, deduct_stock, Direction},
    AppState,
};

use super::batches::ensure_product_and_warehouse;

/// Self transfer between two warehouses: FIFO deduction at the source and a
/// fresh batch at the destination, recorded as a paired OUT/IN ledger entry
/// in one transaction.
pub async fn create_transfer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateTransfer>,
) -> ApiResult<(StatusCode, Json<Transfer>)> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("transfers:write")?;

    if payload.quantity <= 0 {
        return Err(ApiError::BadRequest("quantity must be positive".to_string()));
    }
    if payload.from_warehouse_id == payload.to_warehouse_id {
        return Err(ApiError::BadRequest(
            "source and destination warehouse must differ".to_string(),
        ));
    }

    ensure_product_and_warehouse(&state, payload.product_id, payload.from_warehouse_id).await?;
    ensure_product_and_warehouse(&state, payload.product_id, payload.to_warehouse_id).await?;

    let mut tx = state.db.begin().await?;

    let transfer = sqlx::query_as::<_, Transfer>(
        r#"
        INSERT INTO transfers (product_id, from_warehouse_id, to_warehouse_id, quantity, notes, transferred_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.product_id)
    .bind(payload.from_warehouse_id)
    .bind(payload.to_warehouse_id)
    .bind(payload.quantity)
    .bind(&payload.notes)
    .bind(current_user.id)
    .fetch_one(&mut *tx)
    .await?;

    let reference = format!("transfer:{}", transfer.id);

    deduct_stock(
        &mut tx,
        payload.product_id,
        payload.from_warehouse_id,
        payload.quantity,
        &reference,
        current_user.id,
    )
    .await?;

    // Incoming stock lands as a new batch at the destination.
    sqlx::query(
        r#"
        INSERT INTO stock_batches (product_id, warehouse_id, source, qty_received, qty_available, created_by)
        VALUES ($1, $2, $3, $4, $4, $5)
        "#,
    )
    .bind(payload.product_id)
    .bind(payload.to_warehouse_id)
    .bind(&reference)
    .bind(payload.quantity)
    .bind(current_user.id)
    .execute(&mut *tx)
    .await?;

    append_ledger(
        &mut tx,
        payload.product_id,
        payload.to_warehouse_id,
        Direction::In,
        payload.quantity,
        &reference,
        current_user.id,
    )
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(transfer)))
}

pub async fn list_transfers(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Transfer>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("transfers:read")?;

    let transfers =
        sqlx::query_as::<_, Transfer>("SELECT * FROM transfers ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(transfers))
}
