use serde::{Deserialize, Serialize};

use super::documents::DocumentFile;

/// Outbound message for email/WhatsApp adapters. Delivery is fire-and-forget:
/// the lifecycle operations log failures and never roll back on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<DocumentFile>,
}

impl Notification {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: DocumentFile) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Trait describing outbound delivery hooks (SMTP, WhatsApp, in-memory fakes).
pub trait Notifier: Send + Sync {
    fn send(&self, message: Notification) -> Result<(), NotifierError>;
}

/// Delivery error; always treated as non-fatal by callers.
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
