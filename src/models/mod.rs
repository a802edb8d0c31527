pub mod dispatch;
pub mod inventory;
pub mod messaging;
pub mod orders;
pub mod rbac;
pub mod returns;
pub mod user;

// Re-export only the types we actually use
pub use dispatch::{CreateDispatch, Dispatch};
pub use inventory::{
    CreateBatch, CreateProduct, CreateWarehouse, InventoryCount, LedgerEntry, Product, StockBatch,
    Warehouse,
};
pub use messaging::{CreateMessage, Message, Notification};
pub use orders::{CreateOrder, Order, OrderStatus, UpdateOrderStatus};
pub use rbac::{get_all_permissions, CreateRole, Permission, Role, RoleDisplay};
pub use returns::{
    CreateDamage, CreateRecovery, CreateReturn, CreateTransfer, DamageLogEntry, ReturnRecord,
    Transfer,
};
pub use user::{CreateUser, UpdateUser, User, UserResponse};
