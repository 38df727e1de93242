//! Outbound email settings.

use serde::Deserialize;

/// Mailer configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MailerConfig {
    /// When disabled, emails are dropped instead of handed to the transport.
    pub enabled: bool,
    /// The `From` address of every outgoing message.
    pub sender: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sender: "Reel <no-reply@reel.local>".to_string(),
        }
    }
}
