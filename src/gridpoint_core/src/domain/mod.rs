pub mod account_state;
pub mod email;
pub mod language;
pub mod password;
pub mod role;
pub mod token;
pub mod totp;
pub mod user;
