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
    models::{CreateMessage, Message},
    AppState,
};

pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateMessage>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let current_user = get_current_user(&headers, &state.db).await?;

    if payload.body.trim().is_empty() {
        return Err(ApiError::BadRequest("message body must not be empty".to_string()));
    }
    if payload.recipient_id == current_user.id {
        return Err(ApiError::BadRequest("cannot message yourself".to_string()));
    }

    let recipient_exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE id = $1 AND is_active = true",
    )
    .bind(payload.recipient_id)
    .fetch_one(&state.db)
    .await?;
    if recipient_exists == 0 {
        return Err(ApiError::NotFound("recipient"));
    }

    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (sender_id, recipient_id, subject, body)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(current_user.id)
    .bind(payload.recipient_id)
    .bind(&payload.subject)
    .bind(payload.body.trim())
    .fetch_one(&state.db)
    .await?;

    state
        .notifier
        .notify(
            &state.db,
            payload.recipient_id,
            &format!(
                "new message from {} {}",
                current_user.first_name, current_user.last_name
            ),
            Some(&format!("/api/messages/{}", message.id)),
        )
        .await;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn inbox(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Message>>> {
    let current_user = get_current_user(&headers, &state.db).await?;

    let messages = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE recipient_id = $1 ORDER BY created_at DESC",
    )
    .bind(current_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(messages))
}

pub async fn sent(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Message>>> {
    let current_user = get_current_user(&headers, &state.db).await?;

    let messages = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE sender_id = $1 ORDER BY created_at DESC",
    )
    .bind(current_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(messages))
}

/// Fetch one message; visible to its sender and recipient only.
pub async fn get_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    let current_user = get_current_user(&headers, &state.db).await?;

    let message = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE id = $1 AND (recipient_id = $2 OR sender_id = $2)",
    )
    .bind(message_id)
    .bind(current_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("message"))?;

    Ok(Json(message))
}

pub async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let current_user = get_current_user(&headers, &state.db).await?;

    // Only the recipient can mark a message read.
    let result = sqlx::query(
        "UPDATE messages SET is_read = true WHERE id = $1 AND recipient_id = $2",
    )
    .bind(message_id)
    .bind(current_user.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("message"));
    }

    Ok(StatusCode::NO_CONTENT)
}
