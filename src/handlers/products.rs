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
    models::{CreateProduct, Product},
    AppState,
};

pub async fn list_products(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Product>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:read")?;

    let products =
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE is_active = true ORDER BY name")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Json<Product>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:read")?;

    let product =
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND is_active = true")
            .bind(product_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or(ApiError::NotFound("product"))?;

    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:write")?;

    if payload.sku.trim().is_empty() || payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("sku and name must not be empty".to_string()));
    }

    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (sku, name, category, description, unit_price, reorder_point, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(payload.sku.trim())
    .bind(payload.name.trim())
    .bind(&payload.category)
    .bind(&payload.description)
    .bind(payload.unit_price)
    .bind(payload.reorder_point.unwrap_or(0))
    .bind(current_user.id)
    .fetch_one(&state.db)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            ApiError::Conflict("sku already exists".to_string())
        }
        other => ApiError::Database(other),
    })?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<CreateProduct>,
) -> ApiResult<Json<Product>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:write")?;

    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET sku = $1, name = $2, category = $3, description = $4,
            unit_price = $5, reorder_point = COALESCE($6, reorder_point), updated_at = NOW()
        WHERE id = $7 AND is_active = true
        RETURNING *
        "#,
    )
    .bind(payload.sku.trim())
    .bind(payload.name.trim())
    .bind(&payload.category)
    .bind(&payload.description)
    .bind(payload.unit_price)
    .bind(payload.reorder_point)
    .bind(product_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("product"))?;

    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:delete")?;

    let live_stock = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(qty_available), 0) FROM stock_batches WHERE product_id = $1 AND status = 'active'",
    )
    .bind(product_id)
    .fetch_one(&state.db)
    .await?;

    if live_stock > 0 {
        return Err(ApiError::Conflict(
            "product still has available stock".to_string(),
        ));
    }

    let result =
        sqlx::query("UPDATE products SET is_active = false, updated_at = NOW() WHERE id = $1")
            .bind(product_id)
            .execute(&state.db)
            .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("product"));
    }

    Ok(StatusCode::NO_CONTENT)
}
