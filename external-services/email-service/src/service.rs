// SMTP delivery of reminder messages
use crate::error::{EmailError, EmailResult};
use crate::gateway::NotificationGateway;
use async_trait::async_trait;
use logger_redacted::PiiRedactor;
use mail_builder::MessageBuilder;
use mail_send::SmtpClientBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Email provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmailProvider {
    /// Generic SMTP server
    Smtp {
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        use_tls: bool,
    },
    /// Gmail SMTP relay with an app password
    Gmail { username: String, password: String },
}

impl EmailProvider {
    fn name(&self) -> &'static str {
        match self {
            EmailProvider::Smtp { .. } => "smtp",
            EmailProvider::Gmail { .. } => "gmail",
        }
    }
}

/// Email service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    pub provider: EmailProvider,
    pub from_email: String,
    pub from_name: String,
    #[serde(default = "default_enabled")]
    pub email_enabled: bool,
    /// Subject line; SMS gateways usually prepend it to the text
    #[serde(default)]
    pub subject: String,
}

fn default_enabled() -> bool {
    true
}

impl EmailConfig {
    /// Load email configuration from environment variables
    pub fn from_env() -> EmailResult<Self> {
        let email_enabled = std::env::var("EMAIL_ENABLED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        let from_email = std::env::var("EMAIL_FROM")
            .map_err(|_| EmailError::Config("EMAIL_FROM is not set".to_string()))?;

        let from_name = std::env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "Billing".to_string());
        let subject = std::env::var("EMAIL_SUBJECT").unwrap_or_default();

        let provider = match std::env::var("EMAIL_PROVIDER").map(|p| p.to_lowercase()).as_deref() {
            Ok("gmail") => EmailProvider::Gmail {
                username: std::env::var("GMAIL_USERNAME").unwrap_or_else(|_| from_email.clone()),
                password: std::env::var("GMAIL_APP_PASSWORD")
                    .map_err(|_| EmailError::Config("GMAIL_APP_PASSWORD is not set".to_string()))?,
            },
            _ => EmailProvider::Smtp {
                host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: std::env::var("SMTP_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(587),
                username: std::env::var("SMTP_USERNAME").ok(),
                password: std::env::var("SMTP_PASSWORD").ok(),
                use_tls: std::env::var("SMTP_TLS_ENABLED")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
            },
        };

        Ok(Self {
            provider,
            from_email,
            from_name,
            email_enabled,
            subject,
        })
    }
}

/// Notification gateway sending plain-text mail via Stalwart `mail-send`
pub struct EmailService {
    config: EmailConfig,
    redactor: PiiRedactor,
}

impl EmailService {
    /// Create a new email service
    pub fn new(config: EmailConfig) -> EmailResult<Self> {
        if config.from_email.trim().is_empty() {
            return Err(EmailError::Config("from_email is required".to_string()));
        }
        if !config.email_enabled {
            info!("Email service disabled by configuration");
        }
        Ok(Self {
            config,
            redactor: PiiRedactor::default(),
        })
    }

    /// Send a plain text email
    pub async fn send_email(&self, to: &str, subject: &str, body: &str) -> EmailResult<String> {
        if to.trim().is_empty() {
            return Err(EmailError::InvalidRecipient(to.to_string()));
        }
        if !self.config.email_enabled {
            debug!(to = %self.redactor.redact(to), "Email disabled, skipping send");
            return Ok(format!("disabled-{}", Uuid::new_v4()));
        }

        let message = MessageBuilder::new()
            .from((self.config.from_name.as_str(), self.config.from_email.as_str()))
            .to(to)
            .subject(subject)
            .text_body(body);

        let message_id = self.deliver(message).await?;
        debug!(
            provider = self.config.provider.name(),
            to = %self.redactor.redact(to),
            message_id = %message_id,
            "Email sent successfully"
        );
        Ok(message_id)
    }

    async fn deliver(&self, message: MessageBuilder<'_>) -> EmailResult<String> {
        let mut client = self
            .smtp_builder()
            .connect()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SMTP connection failed: {}", e)))?;

        let message_id = Uuid::new_v4().to_string();
        client
            .send(message)
            .await
            .map_err(|e| EmailError::SendFailed(format!("Failed to send email: {}", e)))?;
        Ok(message_id)
    }

    fn smtp_builder(&self) -> SmtpClientBuilder<String> {
        match &self.config.provider {
            EmailProvider::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                let builder = SmtpClientBuilder::new(host.clone(), *port).implicit_tls(*use_tls);
                match (username, password) {
                    (Some(user), Some(pass)) => builder.credentials((user.clone(), pass.clone())),
                    _ => builder,
                }
            }
            EmailProvider::Gmail { username, password } => SmtpClientBuilder::new("smtp.gmail.com".to_string(), 587)
                .implicit_tls(false)
                .credentials((username.clone(), password.clone())),
        }
    }
}

#[async_trait]
impl NotificationGateway for EmailService {
    async fn send_message(&self, to: &str, body: &str) -> EmailResult<String> {
        self.send_email(to, &self.config.subject, body).await
    }
}
