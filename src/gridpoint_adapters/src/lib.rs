pub mod dns;
pub mod mail;
pub mod persistence;
pub mod session;
pub mod settings;

pub use dns::StaticMxResolver;
pub use mail::{FailingMailSender, RecordingMailSender};
pub use persistence::InMemoryUserRepository;
pub use session::{JwtSessions, SessionError, SessionKeys};
pub use settings::{SessionSettings, Settings};
