use gridpoint_core::{Email, Mail, MailSender};

/// Sends a notification whose failure must not fail the operation.
/// The failure is still logged so delivery problems stay visible.
pub(crate) async fn send_best_effort<M: MailSender>(sender: &M, recipient: &Email, mail: Mail) {
    if let Err(err) = sender.send(recipient, &mail).await {
        tracing::warn!(
            recipient = %recipient,
            template = mail.template(),
            error = %err,
            "best-effort mail delivery failed"
        );
    }
}
