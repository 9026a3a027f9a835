use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt, path::PathBuf, str::FromStr};

use crate::services::gallery_service::UploadLimits;

/// Placeholder shipped in sample `.env` files; treated as "not configured".
const PLACEHOLDER_PASSWORD: &str = "your-app-password-here";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub gallery_dir: PathBuf,
    pub upload_limits: UploadLimits,
    /// `None` means the contact notifier runs in log-only mode.
    pub mail: Option<MailSettings>,
}

/// Where and how contact messages are relayed.
#[derive(Clone)]
pub struct MailSettings {
    pub from: String,
    pub to: String,
    pub transport: MailTransportSettings,
}

#[derive(Clone)]
pub enum MailTransportSettings {
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
        use_tls: bool,
    },
    /// Write messages as `.eml` files (development).
    File { dir: PathBuf },
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Portfolio site API: contact form and image gallery")]
pub struct Args {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where gallery images are stored (overrides GALLERY_DIR)
    #[arg(long)]
    pub gallery_dir: Option<PathBuf>,

    /// Maximum number of images per upload (overrides GALLERY_MAX_FILES)
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Maximum size of one image in bytes (overrides GALLERY_MAX_FILE_SIZE)
    #[arg(long)]
    pub max_file_size: Option<u64>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();
        Self::from_sources(args, |key| env::var(key).ok())
    }

    /// Merge CLI args over values looked up with `env`.
    pub fn from_sources(args: Args, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var::<u16>(&env, "PORT")?.unwrap_or(3001);
        let env_gallery = env("GALLERY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./uploads/gallery"));
        let defaults = UploadLimits::default();
        let env_max_files =
            parse_var::<usize>(&env, "GALLERY_MAX_FILES")?.unwrap_or(defaults.max_files);
        let env_max_size =
            parse_var::<u64>(&env, "GALLERY_MAX_FILE_SIZE")?.unwrap_or(defaults.max_file_size);

        let upload_limits = UploadLimits {
            max_files: args.max_files.unwrap_or(env_max_files),
            max_file_size: args.max_file_size.unwrap_or(env_max_size),
        };
        if upload_limits.max_files == 0 || upload_limits.max_file_size == 0 {
            bail!("upload limits must be greater than zero");
        }

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            gallery_dir: args.gallery_dir.unwrap_or(env_gallery),
            upload_limits,
            mail: mail_settings(&env)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Resolve the mail relay, if any.
///
/// SMTP credentials win; otherwise `MAIL_OUTBOX_DIR` selects the file
/// transport; otherwise there is no relay.
fn mail_settings(env: &impl Fn(&str) -> Option<String>) -> Result<Option<MailSettings>> {
    let sender = non_empty(env("EMAIL_USER"));
    let password = non_empty(env("EMAIL_PASS")).filter(|p| p != PLACEHOLDER_PASSWORD);
    let recipient = non_empty(env("CONTACT_TO"));

    if let Some(password) = password {
        let Some(sender) = sender else {
            bail!("EMAIL_PASS is set but EMAIL_USER is missing");
        };
        let host = env("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".into());
        let port = parse_var::<u16>(env, "SMTP_PORT")?.unwrap_or(587);
        let use_tls = parse_var::<bool>(env, "SMTP_TLS")?.unwrap_or(true);
        return Ok(Some(MailSettings {
            to: recipient.unwrap_or_else(|| sender.clone()),
            from: sender.clone(),
            transport: MailTransportSettings::Smtp {
                host,
                port,
                username: sender,
                password,
                use_tls,
            },
        }));
    }

    if let Some(dir) = non_empty(env("MAIL_OUTBOX_DIR")) {
        let from = sender.unwrap_or_else(|| "portfolio@localhost".into());
        return Ok(Some(MailSettings {
            to: recipient.unwrap_or_else(|| from.clone()),
            from,
            transport: MailTransportSettings::File {
                dir: PathBuf::from(dir),
            },
        }));
    }

    Ok(None)
}

fn parse_var<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", key, value))
        })
        .transpose()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailSettings")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("transport", &self.transport)
            .finish()
    }
}

impl fmt::Debug for MailTransportSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smtp {
                host,
                port,
                username,
                use_tls,
                ..
            } => f
                .debug_struct("Smtp")
                .field("host", host)
                .field("port", port)
                .field("username", username)
                .field("password", &"<redacted>")
                .field("use_tls", use_tls)
                .finish(),
            Self::File { dir } => f.debug_struct("File").field("dir", dir).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_env_or_args() {
        let cfg = AppConfig::from_sources(Args::default(), lookup(&[])).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:3001");
        assert_eq!(cfg.gallery_dir, PathBuf::from("./uploads/gallery"));
        assert_eq!(cfg.upload_limits, UploadLimits::default());
        assert!(cfg.mail.is_none());
    }

    #[test]
    fn args_override_env() {
        let args = Args {
            port: Some(8080),
            max_files: Some(3),
            ..Args::default()
        };
        let cfg = AppConfig::from_sources(
            args,
            lookup(&[("PORT", "9000"), ("HOST", "127.0.0.1"), ("GALLERY_MAX_FILES", "7")]),
        )
        .unwrap();
        assert_eq!(cfg.addr(), "127.0.0.1:8080");
        assert_eq!(cfg.upload_limits.max_files, 3);
    }

    #[test]
    fn bad_port_is_reported_with_context() {
        let err = AppConfig::from_sources(Args::default(), lookup(&[("PORT", "http")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn placeholder_password_means_log_only() {
        let cfg = AppConfig::from_sources(
            Args::default(),
            lookup(&[
                ("EMAIL_USER", "me@example.com"),
                ("EMAIL_PASS", PLACEHOLDER_PASSWORD),
            ]),
        )
        .unwrap();
        assert!(cfg.mail.is_none());
    }

    #[test]
    fn smtp_credentials_enable_relay() {
        let cfg = AppConfig::from_sources(
            Args::default(),
            lookup(&[("EMAIL_USER", "me@example.com"), ("EMAIL_PASS", "app-pass")]),
        )
        .unwrap();
        let mail = cfg.mail.unwrap();
        assert_eq!(mail.to, "me@example.com");
        match mail.transport {
            MailTransportSettings::Smtp {
                host,
                port,
                use_tls,
                ..
            } => {
                assert_eq!(host, "smtp.gmail.com");
                assert_eq!(port, 587);
                assert!(use_tls);
            }
            MailTransportSettings::File { .. } => panic!("expected SMTP transport"),
        }
    }

    #[test]
    fn smtp_tls_can_be_disabled() {
        let cfg = AppConfig::from_sources(
            Args::default(),
            lookup(&[
                ("EMAIL_USER", "me@example.com"),
                ("EMAIL_PASS", "app-pass"),
                ("SMTP_TLS", "false"),
                ("SMTP_PORT", "25"),
            ]),
        )
        .unwrap();
        match cfg.mail.unwrap().transport {
            MailTransportSettings::Smtp { port, use_tls, .. } => {
                assert_eq!(port, 25);
                assert!(!use_tls);
            }
            MailTransportSettings::File { .. } => panic!("expected SMTP transport"),
        }
    }

    #[test]
    fn password_without_user_is_an_error() {
        assert!(
            AppConfig::from_sources(Args::default(), lookup(&[("EMAIL_PASS", "x")])).is_err()
        );
    }

    #[test]
    fn outbox_dir_selects_file_transport() {
        let cfg = AppConfig::from_sources(
            Args::default(),
            lookup(&[("MAIL_OUTBOX_DIR", "/tmp/outbox"), ("CONTACT_TO", "owner@example.com")]),
        )
        .unwrap();
        let mail = cfg.mail.unwrap();
        assert_eq!(mail.to, "owner@example.com");
        assert!(matches!(mail.transport, MailTransportSettings::File { .. }));
    }

    #[test]
    fn debug_output_hides_password() {
        let settings = MailSettings {
            from: "a@b.com".into(),
            to: "a@b.com".into(),
            transport: MailTransportSettings::Smtp {
                host: "smtp.example.com".into(),
                port: 587,
                username: "a@b.com".into(),
                password: "hunter2".into(),
                use_tls: true,
            },
        };
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }
}
