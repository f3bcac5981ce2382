//! WhatsApp Business Cloud API configuration

use serde::Deserialize;

use crate::error::{Result, SendError};

fn default_api_version() -> String {
    "v22.0".to_string()
}

/// Cloud API credentials and endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    /// Access token (from Meta Business Suite)
    pub access_token: String,
    /// Phone Number ID (the sending number's id)
    pub phone_number_id: String,
    /// Business Account ID
    pub business_account_id: String,
    /// Webhook verify token (echoed during webhook setup)
    pub webhook_verify_token: String,
    /// API version (default: v22.0)
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl WhatsAppConfig {
    /// Create with required fields
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        phone_number_id: impl Into<String>,
        business_account_id: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            phone_number_id: phone_number_id.into(),
            business_account_id: business_account_id.into(),
            webhook_verify_token: "rollcall_webhook_verify".to_string(),
            api_version: default_api_version(),
        }
    }

    /// Read from `WHATSAPP_*` environment variables. Missing variables give
    /// empty fields; call [`validate`](Self::validate) before sending so the
    /// service can still boot and report the gap on its health endpoint.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self {
            access_token: var("WHATSAPP_ACCESS_TOKEN"),
            phone_number_id: var("WHATSAPP_PHONE_NUMBER_ID"),
            business_account_id: var("WHATSAPP_BUSINESS_ACCOUNT_ID"),
            webhook_verify_token: std::env::var("WHATSAPP_WEBHOOK_VERIFY_TOKEN")
                .unwrap_or_else(|_| "rollcall_webhook_verify".to_string()),
            api_version: std::env::var("WHATSAPP_API_VERSION")
                .unwrap_or_else(|_| default_api_version()),
        }
    }

    /// Set webhook verify token
    #[must_use]
    pub fn with_webhook_verify_token(mut self, token: impl Into<String>) -> Self {
        self.webhook_verify_token = token.into();
        self
    }

    /// Set API version
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Check that the fields needed for sending are present
    pub fn validate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            return Err(SendError::Credentials(
                "WHATSAPP_ACCESS_TOKEN not set".to_string(),
            ));
        }
        if self.phone_number_id.is_empty() {
            return Err(SendError::Credentials(
                "WHATSAPP_PHONE_NUMBER_ID not set".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether credentials are configured
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.validate().is_ok()
    }

    /// API URL for the messages endpoint
    pub(crate) fn messages_url(&self) -> String {
        format!(
            "https://graph.facebook.com/{}/{}/messages",
            self.api_version, self.phone_number_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = WhatsAppConfig::new("token", "phone_id", "business_id")
            .with_webhook_verify_token("my_token")
            .with_api_version("v23.0");

        assert_eq!(config.access_token, "token");
        assert_eq!(config.webhook_verify_token, "my_token");
        assert_eq!(
            config.messages_url(),
            "https://graph.facebook.com/v23.0/phone_id/messages"
        );
    }

    #[test]
    fn test_validate_flags_missing_fields() {
        let config = WhatsAppConfig::new("", "phone_id", "business_id");
        assert!(!config.is_configured());

        let config = WhatsAppConfig::new("token", "", "business_id");
        assert!(matches!(
            config.validate(),
            Err(SendError::Credentials(msg)) if msg.contains("PHONE_NUMBER_ID")
        ));

        let config = WhatsAppConfig::new("token", "phone_id", "business_id");
        assert!(config.is_configured());
    }
}
