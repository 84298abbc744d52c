//! OTP mail delivery.
//!
//! The mailer is the narrow interface the OTP engine talks to. With SMTP
//! configured it sends through lettre's async transport; without it the
//! delivery is logged instead, which keeps local development and the
//! integration tests free of a mail relay.

use crate::config::SmtpConfig;
use crate::error::ApiError;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        ApiError::EmailDelivery(err.to_string())
    }
}

pub enum Mailer {
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    },
    /// No SMTP configured; deliveries are logged at info level.
    LogOnly,
}

impl Mailer {
    /// Build a mailer from optional SMTP settings.
    pub fn from_config(smtp: Option<&SmtpConfig>) -> Result<Self, MailError> {
        match smtp {
            Some(cfg) => {
                let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)?
                    .credentials(Credentials::new(
                        cfg.username.clone(),
                        cfg.password.clone(),
                    ))
                    .build();
                let from = cfg.from.parse::<Mailbox>()?;
                Ok(Mailer::Smtp { transport, from })
            }
            None => Ok(Mailer::LogOnly),
        }
    }

    /// Deliver a one-time code to a recipient.
    pub async fn send_otp(&self, to: &str, code: u32) -> Result<(), MailError> {
        match self {
            Mailer::Smtp { transport, from } => {
                let message = Message::builder()
                    .from(from.clone())
                    .to(to.parse::<Mailbox>()?)
                    .subject("Your OTP Code")
                    .body(format!(
                        "Your Opportune verification code is {}.\n\n\
                         It expires in 10 minutes. If you did not request this code, \
                         you can ignore this mail.",
                        code
                    ))?;

                transport.send(message).await?;
                tracing::info!(action = "otp_sent", to = %to, "OTP delivered via SMTP");
                Ok(())
            }
            Mailer::LogOnly => {
                tracing::info!(action = "otp_sent", to = %to, otp = code, "Log-only OTP delivery");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_only_when_unconfigured() {
        let mailer = Mailer::from_config(None).unwrap();
        assert!(matches!(mailer, Mailer::LogOnly));
    }

    #[tokio::test]
    async fn test_log_only_delivery_succeeds() {
        let mailer = Mailer::from_config(None).unwrap();
        assert!(mailer.send_otp("johndoe@gmail.com", 123_456).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_from_address_rejected() {
        let cfg = SmtpConfig {
            host: "smtp.example.com".to_string(),
            username: "mailer".to_string(),
            password: "secret".to_string(),
            from: "not an address".to_string(),
        };
        let result = Mailer::from_config(Some(&cfg));
        assert!(matches!(result, Err(MailError::Address(_))));
    }
}
