//! Contact-form intake.
//!
//! Every valid submission is written to the log, which is the record the
//! operator can always fall back on. Relaying by email is best-effort and
//! only happens when the notifier was built in relay mode.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{error, info};

use crate::{models::contact::ContactMessage, services::mailer::Mailer};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContactError {
    #[error("Please fill all fields correctly.")]
    MissingField,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
}

/// How accepted messages are delivered. Chosen once at startup.
pub enum NotifierMode {
    LogOnly,
    Relay(Mailer),
}

/// What happened to an accepted message beyond the log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Logged,
    Relayed,
    RelayFailed,
}

pub struct ContactNotifier {
    mode: NotifierMode,
}

impl ContactNotifier {
    pub fn new(mode: NotifierMode) -> Self {
        Self { mode }
    }

    pub fn log_only() -> Self {
        Self::new(NotifierMode::LogOnly)
    }

    pub fn mode_name(&self) -> &'static str {
        match &self.mode {
            NotifierMode::LogOnly => "log-only",
            NotifierMode::Relay(mailer) => mailer.transport_name(),
        }
    }

    pub fn validate(contact: &ContactMessage) -> Result<(), ContactError> {
        if [&contact.name, &contact.email, &contact.message]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(ContactError::MissingField);
        }
        if !EMAIL_PATTERN.is_match(&contact.email) {
            return Err(ContactError::InvalidEmail);
        }
        Ok(())
    }

    /// Validate, log and (in relay mode) forward a submission.
    ///
    /// Once validation passes this never fails: relay errors are logged and
    /// reported as [`Delivery::RelayFailed`].
    pub async fn submit(&self, contact: &ContactMessage) -> Result<Delivery, ContactError> {
        Self::validate(contact)?;

        info!(
            name = %contact.name,
            email = %contact.email,
            message = %contact.message,
            "contact form submission"
        );

        let NotifierMode::Relay(mailer) = &self.mode else {
            info!("email relay not configured - message recorded in log only");
            return Ok(Delivery::Logged);
        };

        match mailer.send_contact(contact).await {
            Ok(()) => {
                info!(transport = mailer.transport_name(), "contact email relayed");
                Ok(Delivery::Relayed)
            }
            Err(err) => {
                error!(error = %err, "contact email relay failed, message kept in log");
                Ok(Delivery::RelayFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MailSettings, MailTransportSettings};
    use tracing_test::traced_test;

    fn message(name: &str, email: &str, message: &str) -> ContactMessage {
        ContactMessage {
            name: name.into(),
            email: email.into(),
            message: message.into(),
        }
    }

    fn unreachable_relay() -> ContactNotifier {
        let mailer = Mailer::new(&MailSettings {
            from: "site@example.com".into(),
            to: "owner@example.com".into(),
            transport: MailTransportSettings::Smtp {
                host: "127.0.0.1".into(),
                port: 1,
                username: "site@example.com".into(),
                password: "secret".into(),
                use_tls: false,
            },
        })
        .unwrap();
        ContactNotifier::new(NotifierMode::Relay(mailer))
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert_eq!(
            ContactNotifier::validate(&message("", "a@b.com", "hi")),
            Err(ContactError::MissingField)
        );
        assert_eq!(
            ContactNotifier::validate(&message("A", "a@b.com", "   ")),
            Err(ContactError::MissingField)
        );
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for email in ["not-an-email", "a@b", "a b@c.com", "@b.com", "a@@b.com"] {
            assert_eq!(
                ContactNotifier::validate(&message("A", email, "hi")),
                Err(ContactError::InvalidEmail),
                "{email}"
            );
        }
        assert!(ContactNotifier::validate(&message("A", "a@b.com", "hi")).is_ok());
    }

    #[tokio::test]
    #[traced_test]
    async fn log_only_mode_records_the_message() {
        let notifier = ContactNotifier::log_only();
        assert_eq!(notifier.mode_name(), "log-only");

        let delivery = notifier
            .submit(&message("Ada", "a@b.com", "hi there"))
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Logged);
        assert!(logs_contain("contact form submission"));
        assert!(logs_contain("hi there"));
    }

    #[tokio::test]
    #[traced_test]
    async fn unreachable_relay_still_accepts() {
        let notifier = unreachable_relay();
        let delivery = notifier
            .submit(&message("A", "a@b.com", "hi"))
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::RelayFailed);
        assert!(logs_contain("contact form submission"));
        assert!(logs_contain("contact email relay failed"));
    }

    #[tokio::test]
    async fn invalid_submission_never_reaches_the_relay() {
        let notifier = unreachable_relay();
        assert_eq!(
            notifier.submit(&message("A", "not-an-email", "hi")).await,
            Err(ContactError::InvalidEmail)
        );
    }
}
