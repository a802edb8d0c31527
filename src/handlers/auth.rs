use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde::Serialize;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{get_current_user, CurrentUser},
    models::{CreateUser, User, UserResponse},
    utils::{create_token, hash_password, verify_password},
    AppState,
};

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CreateUser>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    if !payload.email.contains('@') {
        return Err(ApiError::BadRequest("invalid email address".to_string()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .fetch_one(&state.db)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            ApiError::Conflict("email already registered".to_string())
        }
        other => ApiError::Database(other),
    })?;

    // New accounts start with the default role when one is configured.
    let _ = sqlx::query(
        r#"
        INSERT INTO user_roles (user_id, role_id)
        SELECT $1, id FROM roles WHERE name = 'staff' AND is_active = true
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(user.id)
    .execute(&state.db)
    .await;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[derive(serde::Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE email = $1 AND is_active = true AND is_locked = false",
    )
    .bind(&payload.email)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&payload.password, &user.password_hash).unwrap_or(false) {
        return Err(ApiError::Unauthorized);
    }

    let token = create_token(user.id, user.email.clone())?;

    let _ = sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&state.db)
        .await;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<CurrentUser>> {
    let user = get_current_user(&headers, &state.db).await?;
    Ok(Json(user))
}
