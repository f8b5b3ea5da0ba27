pub mod recording_mail_sender;

pub use recording_mail_sender::{FailingMailSender, RecordingMailSender};
