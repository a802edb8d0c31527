use axum::{
    extract::{Path, State},
    http::HeaderMap,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::get_current_user,
    models::{UpdateUser, User, UserResponse},
    AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("team:read")?;

    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE is_active = true ORDER BY last_name, first_name",
    )
    .fetch_all(&state.db)
    .await?
    .into_iter()
    .map(UserResponse::from)
    .collect();

    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("team:read")?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = true")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUser>,
) -> ApiResult<Json<UserResponse>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("team:write")?;

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            email = COALESCE($3, email),
            updated_at = NOW()
        WHERE id = $4 AND is_active = true
        RETURNING *
        "#,
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn lock_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("team:write")?;

    if current_user.id == user_id {
        return Err(ApiError::BadRequest("cannot lock your own account".to_string()));
    }

    let result = sqlx::query(
        "UPDATE users SET is_locked = true, locked_at = NOW(), locked_by = $1 WHERE id = $2 AND is_active = true",
    )
    .bind(current_user.id)
    .bind(user_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("user"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlock_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("team:write")?;

    let result = sqlx::query(
        "UPDATE users SET is_locked = false, locked_at = NULL, locked_by = NULL WHERE id = $1 AND is_active = true",
    )
    .bind(user_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("user"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("team:delete")?;

    if current_user.id == user_id {
        return Err(ApiError::BadRequest("cannot delete your own account".to_string()));
    }

    let result = sqlx::query("UPDATE users SET is_active = false, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("user"));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct AssignRoles {
    pub role_ids: Vec<Uuid>,
}

/// Replace the user's role set.
pub async fn assign_roles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AssignRoles>,
) -> ApiResult<StatusCode> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("team:manage_roles")?;

    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE id = $1 AND is_active = true",
    )
    .bind(user_id)
    .fetch_one(&state.db)
    .await?;
    if exists == 0 {
        return Err(ApiError::NotFound("user"));
    }

    let mut tx = state.db.begin().await?;

    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    for role_id in &payload.role_ids {
        let inserted = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id, assigned_by)
            SELECT $1, id, $3 FROM roles WHERE id = $2 AND is_active = true
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .bind(current_user.id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(ApiError::BadRequest(format!("unknown role {role_id}")));
        }
    }

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
