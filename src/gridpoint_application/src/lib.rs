pub mod error;
mod notify;
pub mod totp_manager;
pub mod user_manager;

pub use error::AccountError;
pub use totp_manager::{NewTotp, TotpManager};
pub use user_manager::UserManager;
