use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    models::User,
    utils::verify_token,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub permissions: Vec<String>,
}

impl CurrentUser {
    pub fn from_user_and_permissions(user: User, permissions: Vec<String>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            permissions,
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn require(&self, permission: &str) -> ApiResult<()> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn get_current_user(headers: &HeaderMap, db: &Database) -> ApiResult<CurrentUser> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;

    let claims = verify_token(token)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthorized)?;

    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE id = $1 AND is_active = true AND is_locked = false",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or(ApiError::Unauthorized)?;

    let permissions = get_user_permissions(db, user.id).await?;

    Ok(CurrentUser::from_user_and_permissions(user, permissions))
}

pub async fn get_user_permissions(db: &Database, user_id: Uuid) -> ApiResult<Vec<String>> {
    let permissions: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT jsonb_array_elements_text(r.permissions)
        FROM roles r
        JOIN user_roles ur ON r.id = ur.role_id
        WHERE ur.user_id = $1 AND r.is_active = true
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(permissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;

    fn header_map(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_extracts_value() {
        let headers = header_map("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes() {
        let headers = header_map("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn bearer_token_rejects_empty_token() {
        let headers = header_map("Bearer ");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn bearer_token_requires_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    fn current_user(permissions: Vec<String>) -> CurrentUser {
        CurrentUser::from_user_and_permissions(
            User {
                id: Uuid::new_v4(),
                email: "ops@example.com".to_string(),
                password_hash: String::new(),
                first_name: "Ada".to_string(),
                last_name: "Ops".to_string(),
                is_active: true,
                is_locked: false,
                last_login: None,
                locked_at: None,
                locked_by: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            permissions,
        )
    }

    #[test]
    fn require_checks_permission_string() {
        let user = current_user(vec!["dispatch:write".to_string()]);
        assert!(user.require("dispatch:write").is_ok());
        assert!(matches!(
            user.require("dispatch:delete"),
            Err(ApiError::Forbidden)
        ));
    }
}
