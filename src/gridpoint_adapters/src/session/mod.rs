pub mod jwt_sessions;

pub use jwt_sessions::{Claims, JwtSessions, SessionError, SessionKeys, SESSION_TTL_MINUTES};
