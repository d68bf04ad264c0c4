use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::MailConfig;

/// Outbound mail collaborator. Production sends through an HTTP mail API;
/// tests swap in a fake.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

pub struct HttpMailer {
    client: reqwest::Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "from": self.config.from_address,
                "to": to,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await?
            .error_for_status()?;
        debug!(to = %to, status = %resp.status(), "mail dispatched");
        Ok(())
    }
}

pub fn otp_mail_body(code: &str, purpose: &str) -> String {
    format!(
        "Your StockPulse verification code for {purpose} is {code}.\n\
         It expires in 5 minutes. If you did not request this, you can ignore this email."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_mail_body_carries_code_and_purpose() {
        let body = otp_mail_body("482913", "password reset");
        assert!(body.contains("482913"));
        assert!(body.contains("password reset"));
    }
}
