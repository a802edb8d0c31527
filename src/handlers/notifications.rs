use axum::{
    extract::{Path, State},
    http::HeaderMap,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use std::convert::Infallible;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::get_current_user,
    models::Notification,
    AppState,
};

pub async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Notification>>> {
    let current_user = get_current_user(&headers, &state.db).await?;

    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT 200",
    )
    .bind(current_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let current_user = get_current_user(&headers, &state.db).await?;

    let result = sqlx::query(
        "UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2",
    )
    .bind(notification_id)
    .bind(current_user.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("notification"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let current_user = get_current_user(&headers, &state.db).await?;

    sqlx::query("UPDATE notifications SET is_read = true WHERE user_id = $1 AND is_read = false")
        .bind(current_user.id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Live notification stream for the authenticated user.
pub async fn stream(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let current_user = get_current_user(&headers, &state.db).await?;

    tracing::debug!(
        "notification stream opened for {} ({} clients connected)",
        current_user.id,
        state.notifier.client_count()
    );

    let stream = state.notifier.subscribe_stream(current_user.id);

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    ))
}
