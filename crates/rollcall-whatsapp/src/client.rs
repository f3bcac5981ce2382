//! Cloud API client for outbound sends
//!
//! Two outbound shapes: approved template messages (the only kind the API
//! accepts outside the 24-hour service window) and free-form text (used for
//! acknowledgments inside the window opened by the contact's reply).

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::WhatsAppConfig;
use crate::error::{Result, SendError};

/// Cloud API response envelope for the messages endpoint
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    messages: Option<Vec<MessageInfo>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct MessageInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    code: i64,
}

#[derive(Serialize)]
struct TextBody<'a> {
    preview_url: bool,
    body: &'a str,
}

/// WhatsApp Business Cloud API client
#[derive(Clone)]
pub struct WhatsAppClient {
    config: WhatsAppConfig,
    client: reqwest::Client,
}

impl WhatsAppClient {
    /// Create a client over the given configuration
    pub fn new(config: WhatsAppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| SendError::Network(e.to_string()))?;

        if config.is_configured() {
            info!(phone_number_id = %config.phone_number_id, "whatsapp client initialized");
        }
        Ok(Self { config, client })
    }

    /// Access the configuration
    #[must_use]
    pub fn config(&self) -> &WhatsAppConfig {
        &self.config
    }

    /// Send a free-form text message. Returns the provider message id.
    pub async fn send_text(&self, to: &str, body: &str) -> Result<String> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": TextBody {
                preview_url: false,
                body,
            },
        });
        self.post_message(to, payload).await
    }

    /// Send an approved template message with ordered body text parameters.
    /// Returns the provider message id.
    pub async fn send_template(
        &self,
        to: &str,
        template_name: &str,
        language_code: &str,
        body_params: &[String],
    ) -> Result<String> {
        let mut template = json!({
            "name": template_name,
            "language": { "code": language_code },
        });
        if !body_params.is_empty() {
            let parameters: Vec<_> = body_params
                .iter()
                .map(|p| json!({ "type": "text", "text": p }))
                .collect();
            template["components"] = json!([{
                "type": "body",
                "parameters": parameters,
            }]);
        }

        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "template",
            "template": template,
        });
        self.post_message(to, payload).await
    }

    async fn post_message(&self, to: &str, payload: serde_json::Value) -> Result<String> {
        self.config.validate()?;

        debug!(to = %to, "posting message to cloud api");
        let resp: ApiResponse = self
            .client
            .post(self.config.messages_url())
            .bearer_auth(&self.config.access_token)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = resp.error {
            return Err(SendError::Api {
                code: error.code,
                message: error.message,
            });
        }

        resp.messages
            .and_then(|m| m.into_iter().next())
            .map(|m| m.id)
            .ok_or_else(|| SendError::InvalidResponse("no message id in response".to_string()))
    }

    /// Verify a webhook subscription handshake. Returns the challenge to echo
    /// when the mode and token match.
    #[must_use]
    pub fn verify_webhook(&self, mode: &str, token: &str, challenge: &str) -> Option<String> {
        if mode == "subscribe" && token == self.config.webhook_verify_token {
            info!("webhook verified");
            Some(challenge.to_string())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> WhatsAppClient {
        let config = WhatsAppConfig::new("token", "phone_id", "business_id")
            .with_webhook_verify_token("my_verify_token");
        WhatsAppClient::new(config).unwrap()
    }

    #[test]
    fn test_verify_webhook() {
        let client = client();

        let result = client.verify_webhook("subscribe", "my_verify_token", "challenge_123");
        assert_eq!(result, Some("challenge_123".to_string()));

        assert_eq!(
            client.verify_webhook("subscribe", "wrong_token", "challenge_123"),
            None
        );
        assert_eq!(
            client.verify_webhook("unsubscribe", "my_verify_token", "challenge_123"),
            None
        );
    }

    #[tokio::test]
    async fn test_send_requires_credentials() {
        let config = WhatsAppConfig::new("", "", "");
        let client = WhatsAppClient::new(config).unwrap();
        let result = client.send_text("573001112233", "hola").await;
        assert!(matches!(result, Err(SendError::Credentials(_))));
    }

    #[test]
    fn test_api_response_parsing() {
        let ok: ApiResponse = serde_json::from_str(
            r#"{"messaging_product":"whatsapp","messages":[{"id":"wamid.abc"}]}"#,
        )
        .unwrap();
        assert_eq!(ok.messages.unwrap()[0].id, "wamid.abc");

        let err: ApiResponse = serde_json::from_str(
            r#"{"error":{"message":"(#131030) Recipient not in allowed list","code":131030}}"#,
        )
        .unwrap();
        let error = err.error.unwrap();
        assert_eq!(error.code, 131030);
    }
}
