use thiserror::Error;
use uuid::Uuid;

/// Snapshot of one stock batch as read inside the transaction.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BatchState {
    pub id: Uuid,
    pub qty_received: i32,
    pub qty_available: i32,
}

/// One planned mutation against a single batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchChange {
    pub id: Uuid,
    pub new_available: i32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("restore exceeds drawn stock: requested {requested}, headroom {headroom}")]
    ExceedsHeadroom { requested: i32, headroom: i32 },

    #[error("quantity must be positive")]
    NonPositiveQuantity,
}

/// Plan an outflow of `quantity` across `batches`.
///
/// Batches must be ordered oldest-first; stock is consumed front to back
/// (FIFO). Every touched batch gets one `BatchChange`; a batch whose
/// availability reaches zero is exhausted by the executor.
pub fn plan_deduction(batches: &[BatchState], quantity: i32) -> Result<Vec<BatchChange>, PlanError> {
    if quantity <= 0 {
        return Err(PlanError::NonPositiveQuantity);
    }

    let available: i32 = batches.iter().map(|b| b.qty_available).sum();
    if available < quantity {
        return Err(PlanError::InsufficientStock {
            requested: quantity,
            available,
        });
    }

    let mut remaining = quantity;
    let mut changes = Vec::new();
    for batch in batches {
        if remaining == 0 {
            break;
        }
        if batch.qty_available == 0 {
            continue;
        }
        let take = batch.qty_available.min(remaining);
        changes.push(BatchChange {
            id: batch.id,
            new_available: batch.qty_available - take,
        });
        remaining -= take;
    }

    Ok(changes)
}

/// Plan a reversal of `quantity` back into `batches`.
///
/// Batches must be ordered newest-first; stock is credited front to back
/// (LIFO), never above a batch's `qty_received`. Crediting more than the
/// total headroom would mint stock that was never drawn, so it is rejected.
pub fn plan_restore(batches: &[BatchState], quantity: i32) -> Result<Vec<BatchChange>, PlanError> {
    if quantity <= 0 {
        return Err(PlanError::NonPositiveQuantity);
    }

    let headroom: i32 = batches.iter().map(|b| b.qty_received - b.qty_available).sum();
    if headroom < quantity {
        return Err(PlanError::ExceedsHeadroom {
            requested: quantity,
            headroom,
        });
    }

    let mut remaining = quantity;
    let mut changes = Vec::new();
    for batch in batches {
        if remaining == 0 {
            break;
        }
        let room = batch.qty_received - batch.qty_available;
        if room == 0 {
            continue;
        }
        let put = room.min(remaining);
        changes.push(BatchChange {
            id: batch.id,
            new_available: batch.qty_available + put,
        });
        remaining -= put;
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(received: i32, available: i32) -> BatchState {
        BatchState {
            id: Uuid::new_v4(),
            qty_received: received,
            qty_available: available,
        }
    }

    #[test]
    fn deduction_consumes_oldest_batch_first() {
        let batches = vec![batch(10, 10), batch(10, 10)];
        let changes = plan_deduction(&batches, 4).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, batches[0].id);
        assert_eq!(changes[0].new_available, 6);
    }

    #[test]
    fn deduction_spans_batches_and_exhausts_the_first() {
        let batches = vec![batch(10, 3), batch(10, 10)];
        let changes = plan_deduction(&batches, 5).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].new_available, 0);
        assert_eq!(changes[1].id, batches[1].id);
        assert_eq!(changes[1].new_available, 8);
    }

    #[test]
    fn deduction_skips_exhausted_batches() {
        let batches = vec![batch(10, 0), batch(10, 7)];
        let changes = plan_deduction(&batches, 7).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, batches[1].id);
        assert_eq!(changes[0].new_available, 0);
    }

    #[test]
    fn deduction_rejects_insufficient_stock() {
        let batches = vec![batch(10, 2), batch(10, 1)];
        let err = plan_deduction(&batches, 5).unwrap_err();
        assert_eq!(
            err,
            PlanError::InsufficientStock {
                requested: 5,
                available: 3
            }
        );
    }

    #[test]
    fn deduction_rejects_zero_quantity() {
        let batches = vec![batch(10, 10)];
        assert_eq!(plan_deduction(&batches, 0), Err(PlanError::NonPositiveQuantity));
        assert_eq!(plan_deduction(&batches, -3), Err(PlanError::NonPositiveQuantity));
    }

    #[test]
    fn deduction_of_exact_total_touches_every_batch() {
        let batches = vec![batch(5, 5), batch(5, 5), batch(5, 5)];
        let changes = plan_deduction(&batches, 15).unwrap();
        assert_eq!(changes.len(), 3);
        assert!(changes.iter().all(|c| c.new_available == 0));
    }

    #[test]
    fn restore_credits_newest_batch_first() {
        // Newest-first ordering: first entry is the most recent batch.
        let batches = vec![batch(10, 4), batch(10, 10)];
        let changes = plan_restore(&batches, 3).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, batches[0].id);
        assert_eq!(changes[0].new_available, 7);
    }

    #[test]
    fn restore_spills_into_older_batches() {
        let batches = vec![batch(10, 8), batch(10, 5)];
        let changes = plan_restore(&batches, 6).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].new_available, 10);
        assert_eq!(changes[1].new_available, 9);
    }

    #[test]
    fn restore_never_exceeds_received_quantity() {
        let batches = vec![batch(10, 10), batch(10, 6)];
        let changes = plan_restore(&batches, 4).unwrap();
        // The full batch is skipped; everything lands in the drawn-down one.
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, batches[1].id);
        assert_eq!(changes[0].new_available, 10);
    }

    #[test]
    fn restore_rejects_more_than_headroom() {
        let batches = vec![batch(10, 9), batch(10, 10)];
        let err = plan_restore(&batches, 2).unwrap_err();
        assert_eq!(
            err,
            PlanError::ExceedsHeadroom {
                requested: 2,
                headroom: 1
            }
        );
    }

    #[test]
    fn restore_over_reversed_lock_order_scan_credits_newest() {
        // The executor scans oldest-first (uniform lock order with
        // deduction) and reverses the slice before planning; the newest
        // batch must still be the one credited.
        let oldest_first = vec![batch(10, 5), batch(10, 5)];
        let mut newest_first = oldest_first.clone();
        newest_first.reverse();
        let changes = plan_restore(&newest_first, 5).unwrap();
        assert_eq!(changes[0].id, oldest_first[1].id);
        assert_eq!(changes[0].new_available, 10);
    }

    #[test]
    fn restore_reactivates_exhausted_batch() {
        let batches = vec![batch(10, 0)];
        let changes = plan_restore(&batches, 10).unwrap();
        assert_eq!(changes[0].new_available, 10);
    }
}
