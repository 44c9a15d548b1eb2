use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};

use crate::config::SmsConfig;
use crate::otp::OtpError;

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, phone: &str, code: &str) -> Result<(), OtpError>;

    /// Whether the issued code may be returned to the caller. Only true for
    /// the development sender, which delivers nothing.
    fn exposes_code(&self) -> bool {
        false
    }
}

/// Development sender: logs the code and hands it back in the response.
pub struct EchoSmsSender;

#[async_trait]
impl SmsSender for EchoSmsSender {
    async fn send(&self, phone: &str, code: &str) -> Result<(), OtpError> {
        info!("SMS gateway not configured; code for {phone} is {code}");
        Ok(())
    }

    fn exposes_code(&self) -> bool {
        true
    }
}

/// Posts a templated message to an SMS gateway.
pub struct HttpSmsSender {
    client: Client,
    config: SmsConfig,
}

impl HttpSmsSender {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SmsSender for HttpSmsSender {
    async fn send(&self, phone: &str, code: &str) -> Result<(), OtpError> {
        let body = json!({
            "phoneNumbers": phone,
            "signName": self.config.sign_name,
            "templateCode": self.config.template_code,
            "templateParam": json!({ "code": code }).to_string(),
        });
        let response = self
            .client
            .post(&self.config.gateway_url)
            .basic_auth(
                &self.config.access_key_id,
                Some(&self.config.access_key_secret),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| OtpError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("SMS gateway rejected message to {phone}: {status} {text}");
            return Err(OtpError::Delivery(format!("gateway returned {status}")));
        }
        info!("Verification code sent to {phone}");
        Ok(())
    }
}
