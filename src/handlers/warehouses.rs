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
    models::{CreateWarehouse, Warehouse},
    AppState,
};

pub async fn list_warehouses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Warehouse>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:read")?;

    let warehouses = sqlx::query_as::<_, Warehouse>(
        "SELECT * FROM warehouses WHERE is_active = true ORDER BY name",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(warehouses))
}

pub async fn get_warehouse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(warehouse_id): Path<Uuid>,
) -> ApiResult<Json<Warehouse>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:read")?;

    let warehouse = sqlx::query_as::<_, Warehouse>(
        "SELECT * FROM warehouses WHERE id = $1 AND is_active = true",
    )
    .bind(warehouse_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("warehouse"))?;

    Ok(Json(warehouse))
}

pub async fn create_warehouse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateWarehouse>,
) -> ApiResult<(StatusCode, Json<Warehouse>)> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:write")?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("warehouse name must not be empty".to_string()));
    }

    let warehouse = sqlx::query_as::<_, Warehouse>(
        r#"
        INSERT INTO warehouses (name, location, created_by)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.location)
    .bind(current_user.id)
    .fetch_one(&state.db)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            ApiError::Conflict("warehouse name already exists".to_string())
        }
        other => ApiError::Database(other),
    })?;

    Ok((StatusCode::CREATED, Json(warehouse)))
}

pub async fn update_warehouse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(warehouse_id): Path<Uuid>,
    Json(payload): Json<CreateWarehouse>,
) -> ApiResult<Json<Warehouse>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:write")?;

    let warehouse = sqlx::query_as::<_, Warehouse>(
        r#"
        UPDATE warehouses
        SET name = $1, location = $2, updated_at = NOW()
        WHERE id = $3 AND is_active = true
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.location)
    .bind(warehouse_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("warehouse"))?;

    Ok(Json(warehouse))
}

pub async fn delete_warehouse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(warehouse_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:delete")?;

    // A warehouse holding live stock cannot be retired.
    let live_stock = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(qty_available), 0) FROM stock_batches WHERE warehouse_id = $1 AND status = 'active'",
    )
    .bind(warehouse_id)
    .fetch_one(&state.db)
    .await?;

    if live_stock > 0 {
        return Err(ApiError::Conflict(
            "warehouse still holds available stock".to_string(),
        ));
    }

    let result =
        sqlx::query("UPDATE warehouses SET is_active = false, updated_at = NOW() WHERE id = $1")
            .bind(warehouse_id)
            .execute(&state.db)
            .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("warehouse"));
    }

    Ok(StatusCode::NO_CONTENT)
}
