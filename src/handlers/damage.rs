use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::get_current_user,
    models::{CreateDamage, CreateRecovery, DamageLogEntry},
    stock::{deduct_stock, restore_stock},
    AppState,
};

use super::batches::ensure_product_and_warehouse;

/// Write off damaged stock: FIFO deduction, OUT ledger row, damage log row.
pub async fn create_damage(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateDamage>,
) -> ApiResult<(StatusCode, Json<DamageLogEntry>)> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("damage:write")?;

    if payload.quantity <= 0 {
        return Err(ApiError::BadRequest("quantity must be positive".to_string()));
    }

    ensure_product_and_warehouse(&state, payload.product_id, payload.warehouse_id).await?;

    let mut tx = state.db.begin().await?;

    let entry = sqlx::query_as::<_, DamageLogEntry>(
        r#"
        INSERT INTO damage_recovery_log (product_id, warehouse_id, kind, quantity, reason, recorded_by)
        VALUES ($1, $2, 'damage', $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(payload.product_id)
    .bind(payload.warehouse_id)
    .bind(payload.quantity)
    .bind(&payload.reason)
    .bind(current_user.id)
    .fetch_one(&mut *tx)
    .await?;

    deduct_stock(
        &mut tx,
        payload.product_id,
        payload.warehouse_id,
        payload.quantity,
        &format!("damage:{}", entry.id),
        current_user.id,
    )
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// Recover previously damaged units. Cumulative recoveries never exceed the
/// damaged quantity.
pub async fn create_recovery(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(damage_id): Path<Uuid>,
    Json(payload): Json<CreateRecovery>,
) -> ApiResult<(StatusCode, Json<DamageLogEntry>)> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("damage:write")?;

    if payload.quantity <= 0 {
        return Err(ApiError::BadRequest("quantity must be positive".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let damage = sqlx::query_as::<_, DamageLogEntry>(
        "SELECT * FROM damage_recovery_log WHERE id = $1 AND kind = 'damage' FOR UPDATE",
    )
    .bind(damage_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::NotFound("damage entry"))?;

    let recovered = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity), 0) FROM damage_recovery_log WHERE damage_id = $1 AND kind = 'recovery'",
    )
    .bind(damage_id)
    .fetch_one(&mut *tx)
    .await?;

    if recovered as i32 + payload.quantity > damage.quantity {
        return Err(ApiError::Conflict(format!(
            "recovery exceeds damaged quantity: damaged {}, already recovered {}",
            damage.quantity, recovered
        )));
    }

    let entry = sqlx::query_as::<_, DamageLogEntry>(
        r#"
        INSERT INTO damage_recovery_log (product_id, warehouse_id, kind, quantity, reason, damage_id, recorded_by)
        VALUES ($1, $2, 'recovery', $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(damage.product_id)
    .bind(damage.warehouse_id)
    .bind(payload.quantity)
    .bind(&payload.reason)
    .bind(damage_id)
    .bind(current_user.id)
    .fetch_one(&mut *tx)
    .await?;

    restore_stock(
        &mut tx,
        damage.product_id,
        damage.warehouse_id,
        payload.quantity,
        &format!("recovery:{}", entry.id),
        current_user.id,
    )
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Deserialize)]
pub struct DamageFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub kind: Option<String>,
}

pub async fn list_damage(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<DamageFilter>,
) -> ApiResult<Json<Vec<DamageLogEntry>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("damage:read")?;

    if let Some(kind) = &filter.kind {
        if kind != "damage" && kind != "recovery" {
            return Err(ApiError::BadRequest(
                "kind must be 'damage' or 'recovery'".to_string(),
            ));
        }
    }

    let entries = sqlx::query_as::<_, DamageLogEntry>(
        r#"
        SELECT * FROM damage_recovery_log
        WHERE ($1::uuid IS NULL OR product_id = $1)
          AND ($2::uuid IS NULL OR warehouse_id = $2)
          AND ($3::text IS NULL OR kind = $3)
        ORDER BY created_at DESC
        "#,
    )
    .bind(filter.product_id)
    .bind(filter.warehouse_id)
    .bind(&filter.kind)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(entries))
}
