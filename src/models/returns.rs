use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ReturnRecord {
    pub id: Uuid,
    pub dispatch_id: Uuid,
    pub quantity: i32,
    pub reason: Option<String>,
    pub received_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateReturn {
    pub dispatch_id: Uuid,
    pub quantity: i32,
    pub reason: Option<String>,
}

/// One row of the damage/recovery log. Recovery rows link back to the
/// damage row they reverse through `damage_id`.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct DamageLogEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub kind: String,
    pub quantity: i32,
    pub reason: Option<String>,
    pub damage_id: Option<Uuid>,
    pub recorded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDamage {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRecovery {
    pub quantity: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Transfer {
    pub id: Uuid,
    pub product_id: Uuid,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub quantity: i32,
    pub notes: Option<String>,
    pub transferred_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTransfer {
    pub product_id: Uuid,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub quantity: i32,
    pub notes: Option<String>,
}
