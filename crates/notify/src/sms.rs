//! SMS delivery of customer login codes through an SMSC-style HTTP gateway.

/// Why an SMS send failed.
#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    /// HTTP-level failure reaching the gateway.
    #[error("SMS gateway request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway answered but reported a delivery error in its body.
    #[error("SMS gateway rejected the message: {0}")]
    Gateway(String),
}

/// Configuration for the SMS gateway.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub login: String,
    pub password: String,
    /// Sender name shown to the recipient.
    pub sender: String,
    /// Gateway send URL; override for alternative providers and tests.
    pub endpoint: String,
}

/// Default gateway send URL.
const DEFAULT_SMS_ENDPOINT: &str = "https://smsc.ru/sys/send.php";

impl SmsConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMSC_LOGIN` is not set, signalling that SMS
    /// delivery is not configured; the caller then logs codes instead of
    /// sending them (local development).
    ///
    /// | Variable        | Required | Default                        |
    /// |-----------------|----------|--------------------------------|
    /// | `SMSC_LOGIN`    | yes      | --                             |
    /// | `SMSC_PASSWORD` | yes      | --                             |
    /// | `SMSC_SENDER`   | no       | `Lawbridge`                    |
    /// | `SMSC_ENDPOINT` | no       | `https://smsc.ru/sys/send.php` |
    pub fn from_env() -> Option<Self> {
        let login = std::env::var("SMSC_LOGIN").ok()?;
        Some(Self {
            login,
            password: std::env::var("SMSC_PASSWORD").expect("SMSC_PASSWORD must be set"),
            sender: std::env::var("SMSC_SENDER").unwrap_or_else(|_| "Lawbridge".to_string()),
            endpoint: std::env::var("SMSC_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_SMS_ENDPOINT.to_string()),
        })
    }
}

/// Sends login codes by SMS. When unconfigured, logs the code instead.
#[derive(Clone)]
pub struct SmsSender {
    http: reqwest::Client,
    config: Option<SmsConfig>,
}

impl SmsSender {
    pub fn new(config: Option<SmsConfig>) -> Self {
        if config.is_none() {
            tracing::warn!("SMS gateway not configured; login codes will be logged, not sent");
        }
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Send the login code to a phone number.
    pub async fn send_code(&self, phone: &str, code: &str) -> Result<(), SmsError> {
        let Some(config) = &self.config else {
            tracing::debug!(phone, code, "SMS gateway not configured; code not sent");
            return Ok(());
        };

        let message = format!("Your login code: {code}");
        let response = self
            .http
            .get(&config.endpoint)
            .query(&[
                ("login", config.login.as_str()),
                ("psw", config.password.as_str()),
                ("phones", phone),
                ("mes", message.as_str()),
                ("sender", config.sender.as_str()),
            ])
            .send()
            .await?;

        // The gateway reports failures as `ERROR ...` in a 200 body.
        let body = response.error_for_status()?.text().await?;
        if body.contains("ERROR") {
            return Err(SmsError::Gateway(body));
        }

        tracing::debug!(phone, "SMS code sent");
        Ok(())
    }
}
