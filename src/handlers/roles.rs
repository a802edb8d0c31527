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
    models::{get_all_permissions, CreateRole, Permission, Role, RoleDisplay},
    AppState,
};

fn validate_permissions(requested: &[String]) -> ApiResult<()> {
    let catalog = get_all_permissions();
    for key in requested {
        if !catalog.iter().any(|p| &p.key == key) {
            return Err(ApiError::BadRequest(format!("unknown permission {key}")));
        }
    }
    Ok(())
}

pub async fn list_roles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<RoleDisplay>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("team:read")?;

    let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE is_active = true ORDER BY name")
        .fetch_all(&state.db)
        .await?
        .into_iter()
        .map(RoleDisplay::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRole>,
) -> ApiResult<(StatusCode, Json<RoleDisplay>)> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("team:manage_roles")?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("role name must not be empty".to_string()));
    }
    validate_permissions(&payload.permissions)?;

    let role = sqlx::query_as::<_, Role>(
        r#"
        INSERT INTO roles (name, description, permissions, created_by)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(sqlx::types::Json(&payload.permissions))
    .bind(current_user.id)
    .fetch_one(&state.db)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            ApiError::Conflict("role name already exists".to_string())
        }
        other => ApiError::Database(other),
    })?;

    Ok((StatusCode::CREATED, Json(RoleDisplay::from(role))))
}

pub async fn update_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<CreateRole>,
) -> ApiResult<Json<RoleDisplay>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("team:manage_roles")?;

    validate_permissions(&payload.permissions)?;

    let role = sqlx::query_as::<_, Role>(
        r#"
        UPDATE roles
        SET name = $1, description = $2, permissions = $3, updated_at = NOW()
        WHERE id = $4 AND is_active = true
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(sqlx::types::Json(&payload.permissions))
    .bind(role_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("role"))?;

    Ok(Json(RoleDisplay::from(role)))
}

pub async fn delete_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(role_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("team:manage_roles")?;

    let result =
        sqlx::query("UPDATE roles SET is_active = false, updated_at = NOW() WHERE id = $1")
            .bind(role_id)
            .execute(&state.db)
            .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("role"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Permission>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("team:read")?;

    Ok(Json(get_all_permissions()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_permission_is_rejected() {
        let err = validate_permissions(&["warp:drive".to_string()]).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn catalog_permissions_pass_validation() {
        let keys: Vec<String> = get_all_permissions().into_iter().map(|p| p.key).collect();
        assert!(validate_permissions(&keys).is_ok());
    }
}
