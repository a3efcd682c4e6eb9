use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

use crate::users::repo_types::User;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery backend for outgoing mail.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()>;
}

/// Transport that writes each message to the log instead of delivering it.
#[derive(Clone, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            body = %email.body,
            "email dispatched"
        );
        Ok(())
    }
}

/// Kinds of account email the service sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTemplate {
    EmailVerification,
    ProfessionalUpgrade,
}

impl EmailTemplate {
    fn subject(&self) -> &'static str {
        match self {
            EmailTemplate::EmailVerification => "Verify your account",
            EmailTemplate::ProfessionalUpgrade => "Your account has been upgraded to professional",
        }
    }
}

/// Renders account emails and hands them to a `MailTransport`.
#[derive(Clone)]
pub struct EmailNotifier {
    transport: Arc<dyn MailTransport>,
    from: String,
    base_url: String,
}

impl EmailNotifier {
    pub fn new(transport: Arc<dyn MailTransport>, from: &str, base_url: &str) -> Self {
        Self {
            transport,
            from: from.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn greeting(user: &User) -> String {
        user.first_name
            .as_deref()
            .unwrap_or(user.nickname.as_str())
            .to_string()
    }

    pub fn verification_url(&self, user: &User) -> Option<String> {
        user.verification_token
            .as_deref()
            .map(|token| format!("{}/verify-email/{}/{}", self.base_url, user.id, token))
    }

    fn render(&self, template: EmailTemplate, user: &User) -> anyhow::Result<OutgoingEmail> {
        let name = Self::greeting(user);
        let body = match template {
            EmailTemplate::EmailVerification => {
                let url = self
                    .verification_url(user)
                    .context("user has no verification token")?;
                format!(
                    "Hello {name},\n\nPlease confirm your email address by opening the link below:\n\n{url}\n"
                )
            }
            EmailTemplate::ProfessionalUpgrade => format!(
                "Hello {name},\n\nYour account now has professional status. Thank you for being with us.\n"
            ),
        };
        Ok(OutgoingEmail {
            from: self.from.clone(),
            to: user.email.clone(),
            subject: template.subject().to_string(),
            body,
        })
    }

    pub async fn send_user_email(&self, user: &User, template: EmailTemplate) -> anyhow::Result<()> {
        let email = self.render(template, user)?;
        self.transport
            .send(email)
            .await
            .with_context(|| format!("send {:?} email to {}", template, user.email))
    }

    pub async fn send_verification_email(&self, user: &User) -> anyhow::Result<()> {
        self.send_user_email(user, EmailTemplate::EmailVerification).await
    }
}
