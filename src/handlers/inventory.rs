use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiResult, middleware::get_current_user, models::InventoryCount, AppState,
};

#[derive(Deserialize)]
pub struct InventoryFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
}

/// On-hand counts per product/warehouse, derived from active batches.
pub async fn inventory_counts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<InventoryFilter>,
) -> ApiResult<Json<Vec<InventoryCount>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:read")?;

    let counts = sqlx::query_as::<_, InventoryCount>(
        r#"
        SELECT p.id AS product_id,
               p.sku,
               p.name AS product_name,
               w.id AS warehouse_id,
               w.name AS warehouse_name,
               COALESCE(SUM(b.qty_available), 0) AS on_hand,
               p.reorder_point
        FROM stock_batches b
        JOIN products p ON p.id = b.product_id
        JOIN warehouses w ON w.id = b.warehouse_id
        WHERE p.is_active = true
          AND w.is_active = true
          AND ($1::uuid IS NULL OR b.product_id = $1)
          AND ($2::uuid IS NULL OR b.warehouse_id = $2)
        GROUP BY p.id, p.sku, p.name, w.id, w.name, p.reorder_point
        ORDER BY p.name, w.name
        "#,
    )
    .bind(filter.product_id)
    .bind(filter.warehouse_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(counts))
}

/// Product/warehouse pairs at or below their reorder point. Driven from
/// products so never-stocked pairs surface too, once a threshold is set.
pub async fn low_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<InventoryCount>>> {
    let current_user = get_current_user(&headers, &state.db).await?;
    current_user.require("inventory:read")?;

    let counts = sqlx::query_as::<_, InventoryCount>(
        r#"
        SELECT p.id AS product_id,
               p.sku,
               p.name AS product_name,
               w.id AS warehouse_id,
               w.name AS warehouse_name,
               COALESCE(SUM(b.qty_available), 0) AS on_hand,
               p.reorder_point
        FROM products p
        CROSS JOIN warehouses w
        LEFT JOIN stock_batches b ON b.product_id = p.id AND b.warehouse_id = w.id
        WHERE p.is_active = true AND w.is_active = true
        GROUP BY p.id, p.sku, p.name, w.id, w.name, p.reorder_point
        HAVING COALESCE(SUM(b.qty_available), 0) <= p.reorder_point
           AND (p.reorder_point > 0 OR COUNT(b.id) > 0)
        ORDER BY p.name, w.name
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(counts))
}

/// Reorder threshold rule shared with the SQL above: a pair is flagged when
/// on-hand is at or below the threshold, except that pairs with no batch
/// history only count once a threshold is actually configured.
pub(crate) fn breaches_reorder_point(on_hand: i64, reorder_point: i32, ever_stocked: bool) -> bool {
    on_hand <= reorder_point as i64 && (reorder_point > 0 || ever_stocked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drained_stock_is_flagged() {
        assert!(breaches_reorder_point(0, 0, true));
        assert!(breaches_reorder_point(3, 5, true));
    }

    #[test]
    fn healthy_stock_is_not_flagged() {
        assert!(!breaches_reorder_point(10, 5, true));
    }

    #[test]
    fn never_stocked_pair_needs_a_configured_threshold() {
        assert!(breaches_reorder_point(0, 5, false));
        assert!(!breaches_reorder_point(0, 0, false));
    }
}
