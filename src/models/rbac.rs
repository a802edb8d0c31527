use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub permissions: sqlx::types::Json<Vec<String>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleDisplay {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub permission_count: usize,
}

impl From<Role> for RoleDisplay {
    fn from(role: Role) -> Self {
        let permissions = role.permissions.0.clone();
        Self {
            id: role.id,
            name: role.name,
            description: role.description.unwrap_or_default(),
            permission_count: permissions.len(),
            permissions,
            is_active: role.is_active,
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Permission {
    pub key: String,
    pub name: String,
    pub description: String,
    pub category: String,
}

pub fn get_all_permissions() -> Vec<Permission> {
    vec![
        // Warehouse & Inventory
        Permission {
            key: "inventory:read".to_string(),
            name: "View Inventory".to_string(),
            description: "View products, warehouses, stock batches and the ledger".to_string(),
            category: "Inventory".to_string(),
        },
        Permission {
            key: "inventory:write".to_string(),
            name: "Manage Inventory".to_string(),
            description: "Create and edit products, warehouses and stock batches".to_string(),
            category: "Inventory".to_string(),
        },
        Permission {
            key: "inventory:delete".to_string(),
            name: "Delete Inventory".to_string(),
            description: "Deactivate products and warehouses".to_string(),
            category: "Inventory".to_string(),
        },
        // Dispatch
        Permission {
            key: "dispatch:read".to_string(),
            name: "View Dispatches".to_string(),
            description: "View outbound dispatches".to_string(),
            category: "Dispatch".to_string(),
        },
        Permission {
            key: "dispatch:write".to_string(),
            name: "Create Dispatches".to_string(),
            description: "Dispatch stock out of a warehouse".to_string(),
            category: "Dispatch".to_string(),
        },
        Permission {
            key: "dispatch:delete".to_string(),
            name: "Reverse Dispatches".to_string(),
            description: "Delete a dispatch and restore its stock".to_string(),
            category: "Dispatch".to_string(),
        },
        // Returns, damage, transfers
        Permission {
            key: "returns:read".to_string(),
            name: "View Returns".to_string(),
            description: "View customer returns".to_string(),
            category: "Returns".to_string(),
        },
        Permission {
            key: "returns:write".to_string(),
            name: "Record Returns".to_string(),
            description: "Record customer returns against a dispatch".to_string(),
            category: "Returns".to_string(),
        },
        Permission {
            key: "damage:read".to_string(),
            name: "View Damage Log".to_string(),
            description: "View the damage and recovery log".to_string(),
            category: "Damage".to_string(),
        },
        Permission {
            key: "damage:write".to_string(),
            name: "Record Damage".to_string(),
            description: "Record damaged stock and recoveries".to_string(),
            category: "Damage".to_string(),
        },
        Permission {
            key: "transfers:read".to_string(),
            name: "View Transfers".to_string(),
            description: "View warehouse-to-warehouse transfers".to_string(),
            category: "Transfers".to_string(),
        },
        Permission {
            key: "transfers:write".to_string(),
            name: "Create Transfers".to_string(),
            description: "Move stock between warehouses".to_string(),
            category: "Transfers".to_string(),
        },
        // Orders
        Permission {
            key: "orders:read".to_string(),
            name: "View Orders".to_string(),
            description: "View customer orders and their status".to_string(),
            category: "Orders".to_string(),
        },
        Permission {
            key: "orders:write".to_string(),
            name: "Manage Orders".to_string(),
            description: "Create orders and advance their status".to_string(),
            category: "Orders".to_string(),
        },
        // Team Management
        Permission {
            key: "team:read".to_string(),
            name: "View Team".to_string(),
            description: "View team members and their information".to_string(),
            category: "Team Management".to_string(),
        },
        Permission {
            key: "team:write".to_string(),
            name: "Manage Team".to_string(),
            description: "Create and edit team member accounts".to_string(),
            category: "Team Management".to_string(),
        },
        Permission {
            key: "team:delete".to_string(),
            name: "Delete Team Members".to_string(),
            description: "Deactivate team member accounts".to_string(),
            category: "Team Management".to_string(),
        },
        Permission {
            key: "team:manage_roles".to_string(),
            name: "Manage Roles".to_string(),
            description: "Create, edit, and assign roles and permissions".to_string(),
            category: "Team Management".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_keys_are_unique() {
        let permissions = get_all_permissions();
        let mut keys: Vec<_> = permissions.iter().map(|p| p.key.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), permissions.len());
    }

    #[test]
    fn catalog_covers_every_domain() {
        let keys: Vec<_> = get_all_permissions().into_iter().map(|p| p.key).collect();
        for required in [
            "inventory:read",
            "dispatch:write",
            "returns:write",
            "damage:write",
            "transfers:write",
            "orders:write",
            "team:manage_roles",
        ] {
            assert!(keys.contains(&required.to_string()), "missing {required}");
        }
    }

    #[test]
    fn role_display_counts_permissions() {
        let role = Role {
            id: Uuid::new_v4(),
            name: "dispatcher".to_string(),
            description: None,
            permissions: sqlx::types::Json(vec![
                "dispatch:read".to_string(),
                "dispatch:write".to_string(),
            ]),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            created_by: None,
        };
        let display = RoleDisplay::from(role);
        assert_eq!(display.permission_count, 2);
        assert_eq!(display.description, "");
    }
}
