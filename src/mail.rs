use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Outbound transactional email. Callers treat delivery as best-effort.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

/// Mailer backed by the Resend HTTP API.
#[derive(Clone)]
pub struct ResendMailer {
    client: Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: &str, from: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let res = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            error!(%status, body = %body, "email provider returned an error");
            anyhow::bail!("email provider returned {status}");
        }

        debug!(to = %to, "email sent");
        Ok(())
    }
}

/// Body of the verification email sent on registration and OTP re-issuance.
pub fn otp_email(name: &str, code: &str, ttl_minutes: i64) -> String {
    format!(
        "<h2>Email Verification</h2>\
         <p>Hello {name}, your OTP is:</p>\
         <h1>{code}</h1>\
         <p>Valid for {ttl_minutes} minutes.</p>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_email_carries_code_and_window() {
        let body = otp_email("Alice", "123456", 10);
        assert!(body.contains("Hello Alice"));
        assert!(body.contains("<h1>123456</h1>"));
        assert!(body.contains("Valid for 10 minutes"));
    }

    #[test]
    fn otp_email_uses_configured_window() {
        let body = otp_email("Bob", "654321", 5);
        assert!(body.contains("Valid for 5 minutes"));
    }
}
