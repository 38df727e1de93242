//! Outbound email.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use config::MailerConfig;
use indoc::formatdoc;

use crate::users::User;

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
}

impl Email {
    /// The message sent after registration, carrying the activation token.
    pub fn welcome(user: &User, activation_token: &str) -> Self {
        let body = formatdoc! {r#"
            Hi {name},

            Thanks for signing up for a Reel account. We're excited to have you on board!

            For future reference, your user ID number is {id}.

            Please send a request to the `PUT /v1/users/activated` endpoint with the following JSON
            body to activate your account:

            {{"token": "{activation_token}"}}

            Please note that this is a one-time use token.

            Thanks,

            The Reel Team
        "#,
            name = user.name,
            id = user.id,
            activation_token = activation_token,
        };

        Self {
            to: user.email.clone(),
            subject: "Welcome to Reel!".to_string(),
            body,
        }
    }
}

/// Delivers email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one message.
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

/// Writes messages to the log instead of a mail server.
pub struct LogMailer {
    enabled: bool,
    sender: String,
}

impl LogMailer {
    /// Creates a mailer from the `[mailer]` settings.
    pub fn new(config: &MailerConfig) -> Self {
        Self {
            enabled: config.enabled,
            sender: config.sender.clone(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        if !self.enabled {
            log::debug!("Mailer disabled, dropping '{}' to {}", email.subject, email.to);
            return Ok(());
        }

        log::info!("Sending '{}' from {} to {}", email.subject, self.sender, email.to);
        log::debug!("Message body:\n{}", email.body);

        Ok(())
    }
}

/// Keeps sent messages in memory so they can be inspected.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    /// Every message sent so far, oldest first.
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).push(email);
        Ok(())
    }
}
