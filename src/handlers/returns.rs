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
    models::{CreateReturn, Dispatch, ReturnRecord},
    stock::restore_stock,
    AppState,
};

/// Record a customer return against a dispatch: LIFO restore to the
/// dispatch warehouse plus one IN ledger row.
pub async fn create_return(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateReturn>,
) -> ApiResult<(StatusCode, Json<ReturnRecord>)> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("returns:write")?;

    if payload.quantity <= 0 {
        return Err(ApiError::BadRequest("quantity must be positive".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let dispatch = sqlx::query_as::<_, Dispatch>(
        "SELECT * FROM dispatches WHERE id = $1 AND is_active = true FOR UPDATE",
    )
    .bind(payload.dispatch_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::NotFound("dispatch"))?;

    let already_returned = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity), 0) FROM returns WHERE dispatch_id = $1",
    )
    .bind(payload.dispatch_id)
    .fetch_one(&mut *tx)
    .await?;

    if already_returned as i32 + payload.quantity > dispatch.quantity {
        return Err(ApiError::Conflict(format!(
            "return exceeds dispatched quantity: dispatched {}, already returned {}",
            dispatch.quantity, already_returned
        )));
    }

    let record = sqlx::query_as::<_, ReturnRecord>(
        r#"
        INSERT INTO returns (dispatch_id, quantity, reason, received_by)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(payload.dispatch_id)
    .bind(payload.quantity)
    .bind(&payload.reason)
    .bind(current_user.id)
    .fetch_one(&mut *tx)
    .await?;

    restore_stock(
        &mut tx,
        dispatch.product_id,
        dispatch.warehouse_id,
        payload.quantity,
        &format!("return:{}", record.id),
        current_user.id,
    )
    .await?;

    tx.commit().await?;

    // Tell whoever dispatched the goods that stock came back.
    if let Some(dispatcher) = dispatch.dispatched_by {
        state
            .notifier
            .notify(
                &state.db,
                dispatcher,
                &format!(
                    "{} unit(s) returned against dispatch {}",
                    payload.quantity, dispatch.id
                ),
                Some(&format!("/api/returns/{}", record.id)),
            )
            .await;
    }

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_returns(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<ReturnRecord>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("returns:read")?;

    let returns =
        sqlx::query_as::<_, ReturnRecord>("SELECT * FROM returns ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(returns))
}

pub async fn get_return(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(return_id): Path<Uuid>,
) -> ApiResult<Json<ReturnRecord>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("returns:read")?;

    let record = sqlx::query_as::<_, ReturnRecord>("SELECT * FROM returns WHERE id = $1")
        .bind(return_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("return"))?;

    Ok(Json(record))
}
