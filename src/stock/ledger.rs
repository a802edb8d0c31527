use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::error::ApiResult;

use super::plan::{plan_deduction, plan_restore, BatchChange, BatchState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }
}

/// Append one ledger row for a stock movement. Every batch mutation in the
/// same transaction must pair with exactly one of these.
pub async fn append_ledger(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    warehouse_id: Uuid,
    direction: Direction,
    quantity: i32,
    reference: &str,
    actor: Uuid,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_ledger (product_id, warehouse_id, direction, quantity, reference, recorded_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(product_id)
    .bind(warehouse_id)
    .bind(direction.as_str())
    .bind(quantity)
    .bind(reference)
    .bind(actor)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Deduct `quantity` from the oldest active batches first (FIFO) and append
/// the paired OUT ledger row. Rolls back with the caller's transaction.
pub async fn deduct_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
    reference: &str,
    actor: Uuid,
) -> ApiResult<()> {
    let batches: Vec<BatchState> = sqlx::query_as(
        r#"
        SELECT id, qty_received, qty_available
        FROM stock_batches
        WHERE product_id = $1 AND warehouse_id = $2 AND status = 'active'
        ORDER BY created_at ASC, id ASC
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .bind(warehouse_id)
    .fetch_all(&mut **tx)
    .await?;

    let changes = plan_deduction(&batches, quantity)?;
    apply_changes(tx, &changes).await?;

    append_ledger(tx, product_id, warehouse_id, Direction::Out, quantity, reference, actor).await
}

/// Credit `quantity` back to the newest batches first (LIFO), reactivating
/// exhausted batches, and append the paired IN ledger row.
pub async fn restore_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
    reference: &str,
    actor: Uuid,
) -> ApiResult<()> {
    // Scan in the same order as deduct_stock so concurrent movements on one
    // product/warehouse acquire row locks in one canonical order.
    let mut batches: Vec<BatchState> = sqlx::query_as(
        r#"
        SELECT id, qty_received, qty_available
        FROM stock_batches
        WHERE product_id = $1 AND warehouse_id = $2
        ORDER BY created_at ASC, id ASC
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .bind(warehouse_id)
    .fetch_all(&mut **tx)
    .await?;

    // plan_restore wants newest first.
    batches.reverse();

    let changes = plan_restore(&batches, quantity)?;
    apply_changes(tx, &changes).await?;

    append_ledger(tx, product_id, warehouse_id, Direction::In, quantity, reference, actor).await
}

async fn apply_changes(
    tx: &mut Transaction<'_, Postgres>,
    changes: &[BatchChange],
) -> ApiResult<()> {
    for change in changes {
        sqlx::query(
            r#"
            UPDATE stock_batches
            SET qty_available = $1,
                status = CASE WHEN $1 = 0 THEN 'exhausted' ELSE 'active' END
            WHERE id = $2
            "#,
        )
        .bind(change.new_available)
        .bind(change.id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_wire_format() {
        assert_eq!(Direction::In.as_str(), "IN");
        assert_eq!(Direction::Out.as_str(), "OUT");
    }
}
