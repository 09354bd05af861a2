//! Mail API client
//!
//! The ledger does not speak SMTP itself; outbound email goes through an
//! HTTP mail-sending API. The core treats the transport as
//! fire-and-forget-with-logging: a failed send is reported to the caller as
//! an error string and never unwinds anything.

use serde::Serialize;

use crate::config::MailConfig;

/// An email ready for the transport: subject, both bodies, recipients.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEmail {
    pub subject: String,
    pub plaintext: String,
    pub html: String,
    pub recipients: Vec<String>,
}

/// HTTP client for the mail-sending API
#[derive(Clone)]
pub struct MailApiClient {
    endpoint: String,
    api_key: String,
    from_address: String,
    http_client: reqwest::Client,
}

/// Mail API error response body
#[derive(Debug, serde::Deserialize)]
struct MailApiResponse {
    #[serde(default)]
    message: Option<String>,
}

impl MailApiClient {
    /// Create a new mail client
    pub fn new(endpoint: String, api_key: String, from_address: String) -> Self {
        Self {
            endpoint,
            api_key,
            from_address,
            http_client: reqwest::Client::new(),
        }
    }

    /// Create from configuration; `None` when no endpoint is configured.
    pub fn from_config(config: &MailConfig) -> Option<Self> {
        if config.api_endpoint.is_empty() {
            return None;
        }
        Some(Self::new(
            config.api_endpoint.clone(),
            config.api_key.clone(),
            config.from_address.clone(),
        ))
    }

    /// Send one email to every recipient in the list.
    pub async fn send(&self, email: &OutboundEmail) -> Result<(), String> {
        if email.recipients.is_empty() {
            return Err("There are no recipients in the notification email list".to_string());
        }

        let payload = serde_json::json!({
            "from": self.from_address,
            "to": email.recipients,
            "subject": email.subject,
            "text": email.plaintext,
            "html": email.html,
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("Failed to reach mail API: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let error: MailApiResponse = response.json().await.unwrap_or(MailApiResponse {
                message: Some("Unknown error".to_string()),
            });
            Err(format!(
                "Mail API returned {}: {}",
                status,
                error.message.unwrap_or_else(|| "Unknown error".to_string())
            ))
        }
    }
}
