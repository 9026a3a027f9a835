//! Outbound mail for contact-form relays.

use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::{
    config::{MailSettings, MailTransportSettings},
    models::contact::ContactMessage,
};

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("invalid mailbox `{address}`: {source}")]
    Address {
        address: String,
        source: lettre::address::AddressError,
    },
    #[error("build email message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("file transport: {0}")]
    File(#[from] lettre::transport::file::Error),
    #[error("create outbox directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Sends contact messages to the site owner.
pub struct Mailer {
    transport: MailTransport,
    from: Mailbox,
    to: Mailbox,
}

enum MailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

impl Mailer {
    pub fn new(settings: &MailSettings) -> Result<Self, MailerError> {
        let transport = match &settings.transport {
            MailTransportSettings::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                };
                let smtp = builder
                    .port(*port)
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .build();
                MailTransport::Smtp(smtp)
            }
            MailTransportSettings::File { dir } => {
                std::fs::create_dir_all(dir)?;
                MailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(dir))
            }
        };

        Ok(Self {
            transport,
            from: parse_mailbox(&settings.from)?,
            to: parse_mailbox(&settings.to)?,
        })
    }

    /// Short transport name for logs.
    pub fn transport_name(&self) -> &'static str {
        match self.transport {
            MailTransport::Smtp(_) => "smtp",
            MailTransport::File(_) => "file",
        }
    }

    /// Relay a contact message to the configured recipient.
    pub async fn send_contact(&self, contact: &ContactMessage) -> Result<(), MailerError> {
        let message = self.build_message(contact)?;
        match &self.transport {
            MailTransport::Smtp(smtp) => {
                smtp.send(message).await?;
            }
            MailTransport::File(file) => {
                file.send(message).await?;
            }
        }
        Ok(())
    }

    fn build_message(&self, contact: &ContactMessage) -> Result<Message, MailerError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(format!("New Contact Form Message from {}", contact.name))
            .header(ContentType::TEXT_HTML);

        // Replies go straight to the visitor when their address is usable.
        if let Ok(reply_to) = contact.email.parse::<Mailbox>() {
            builder = builder.reply_to(reply_to);
        }

        Ok(builder.body(contact_body(contact))?)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailerError> {
    address.parse::<Mailbox>().map_err(|source| MailerError::Address {
        address: address.to_string(),
        source,
    })
}

fn contact_body(contact: &ContactMessage) -> String {
    let name = html_escape(&contact.name);
    let email = html_escape(&contact.email);
    let message = html_escape(&contact.message).replace('\n', "<br>");

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #333;">New Contact Form Message</h2>
  <div style="background-color: #f5f5f5; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <p><strong>Name:</strong> {name}</p>
    <p><strong>Email:</strong> {email}</p>
    <p><strong>Message:</strong></p>
    <p style="background-color: white; padding: 15px; border-radius: 4px; border-left: 4px solid #007bff;">
      {message}
    </p>
  </div>
  <p style="color: #666; font-size: 12px;">
    This message was sent from your portfolio website contact form.
  </p>
</div>"#
    )
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> ContactMessage {
        ContactMessage {
            name: "Ada <script>".into(),
            email: "ada@example.com".into(),
            message: "Hello\nWorld & co".into(),
        }
    }

    fn file_settings(dir: &std::path::Path) -> MailSettings {
        MailSettings {
            from: "site@example.com".into(),
            to: "owner@example.com".into(),
            transport: MailTransportSettings::File {
                dir: dir.to_path_buf(),
            },
        }
    }

    #[test]
    fn body_escapes_user_input() {
        let body = contact_body(&contact());
        assert!(body.contains("Ada &lt;script&gt;"));
        assert!(body.contains("Hello<br>World &amp; co"));
        assert!(!body.contains("<script>"));
    }

    #[test]
    fn invalid_sender_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = file_settings(dir.path());
        settings.from = "not an address".into();
        assert!(matches!(
            Mailer::new(&settings),
            Err(MailerError::Address { .. })
        ));
    }

    #[tokio::test]
    async fn file_transport_writes_eml() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = dir.path().join("outbox");
        let mailer = Mailer::new(&file_settings(&outbox)).unwrap();
        assert_eq!(mailer.transport_name(), "file");

        mailer.send_contact(&contact()).await.unwrap();

        let written: Vec<_> = std::fs::read_dir(&outbox)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "eml"))
            .collect();
        assert_eq!(written.len(), 1);
        let raw = std::fs::read_to_string(&written[0]).unwrap();
        assert!(raw.contains("owner@example.com"));
        assert!(raw.contains("Reply-To: ada@example.com"));
    }
}
