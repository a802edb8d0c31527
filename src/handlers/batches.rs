use axum::{
    extract::{Query, State},
    http::HeaderMap,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::get_current_user,
    models::{CreateBatch, LedgerEntry, StockBatch},
    stock::{append_ledger, Direction},
    AppState,
};

/// Receive a new stock batch. The batch insert and its IN ledger row commit
/// together or not at all.
pub async fn create_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateBatch>,
) -> ApiResult<(StatusCode, Json<StockBatch>)> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:write")?;

    if payload.quantity <= 0 {
        return Err(ApiError::BadRequest("quantity must be positive".to_string()));
    }

    ensure_product_and_warehouse(&state, payload.product_id, payload.warehouse_id).await?;

    let mut tx = state.db.begin().await?;

    let batch = sqlx::query_as::<_, StockBatch>(
        r#"
        INSERT INTO stock_batches (product_id, warehouse_id, source, qty_received, qty_available, created_by)
        VALUES ($1, $2, $3, $4, $4, $5)
        RETURNING *
        "#,
    )
    .bind(payload.product_id)
    .bind(payload.warehouse_id)
    .bind(&payload.source)
    .bind(payload.quantity)
    .bind(current_user.id)
    .fetch_one(&mut *tx)
    .await?;

    append_ledger(
        &mut tx,
        payload.product_id,
        payload.warehouse_id,
        Direction::In,
        payload.quantity,
        &format!("batch:{}", batch.id),
        current_user.id,
    )
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(batch)))
}

#[derive(Deserialize)]
pub struct BatchFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub status: Option<String>,
}

pub async fn list_batches(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<BatchFilter>,
) -> ApiResult<Json<Vec<StockBatch>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:read")?;

    if let Some(status) = &filter.status {
        if status != "active" && status != "exhausted" {
            return Err(ApiError::BadRequest(
                "status must be 'active' or 'exhausted'".to_string(),
            ));
        }
    }

    let batches = sqlx::query_as::<_, StockBatch>(
        r#"
        SELECT * FROM stock_batches
        WHERE ($1::uuid IS NULL OR product_id = $1)
          AND ($2::uuid IS NULL OR warehouse_id = $2)
          AND ($3::text IS NULL OR status = $3)
        ORDER BY created_at ASC
        "#,
    )
    .bind(filter.product_id)
    .bind(filter.warehouse_id)
    .bind(&filter.status)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(batches))
}

#[derive(Deserialize)]
pub struct LedgerFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub reference: Option<String>,
}

/// Audit timeline: the append-only movement log, newest first.
pub async fn list_ledger(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<LedgerFilter>,
) -> ApiResult<Json<Vec<LedgerEntry>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:read")?;

    let entries = sqlx::query_as::<_, LedgerEntry>(
        r#"
        SELECT * FROM inventory_ledger
        WHERE ($1::uuid IS NULL OR product_id = $1)
          AND ($2::uuid IS NULL OR warehouse_id = $2)
          AND ($3::text IS NULL OR reference = $3)
        ORDER BY recorded_at DESC
        LIMIT 500
        "#,
    )
    .bind(filter.product_id)
    .bind(filter.warehouse_id)
    .bind(&filter.reference)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(entries))
}

pub(crate) async fn ensure_product_and_warehouse(
    state: &AppState,
    product_id: Uuid,
    warehouse_id: Uuid,
) -> ApiResult<()> {
    let product_exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM products WHERE id = $1 AND is_active = true",
    )
    .bind(product_id)
    .fetch_one(&state.db)
    .await?;
    if product_exists == 0 {
        return Err(ApiError::NotFound("product"));
    }

    let warehouse_exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM warehouses WHERE id = $1 AND is_active = true",
    )
    .bind(warehouse_id)
    .fetch_one(&state.db)
    .await?;
    if warehouse_exists == 0 {
        return Err(ApiError::NotFound("warehouse"));
    }

    Ok(())
}
