pub mod ledger;
pub mod plan;

pub use ledger::{append_ledger, deduct_stock, restore_stock, Direction};
pub use plan::{plan_deduction, plan_restore, BatchChange, BatchState, PlanError};
