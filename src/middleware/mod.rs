pub mod permission;

pub use permission::{bearer_token, get_current_user, CurrentUser};
