use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use gridpoint_core::{Email, Mail, MailError, MailSender};

/// Mail sender that records every message instead of delivering it.
/// Tests assert on the recorded traffic.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailSender {
    sent: Arc<RwLock<Vec<(Email, Mail)>>>,
}

impl RecordingMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<(Email, Mail)> {
        self.sent.read().await.clone()
    }

    pub async fn sent_to(&self, recipient: &Email) -> Vec<Mail> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|(to, _)| to == recipient)
            .map(|(_, mail)| mail.clone())
            .collect()
    }
}

#[async_trait]
impl MailSender for RecordingMailSender {
    async fn send(&self, recipient: &Email, mail: &Mail) -> Result<(), MailError> {
        self.sent
            .write()
            .await
            .push((recipient.clone(), mail.clone()));
        Ok(())
    }
}

/// Mail sender that always fails. Used to exercise both best-effort
/// swallowing and propagation paths.
#[derive(Debug, Clone, Default)]
pub struct FailingMailSender;

#[async_trait]
impl MailSender for FailingMailSender {
    async fn send(&self, _recipient: &Email, mail: &Mail) -> Result<(), MailError> {
        Err(MailError(format!(
            "smtp unreachable while sending {}",
            mail.template()
        )))
    }
}
