use std::time::Duration;

use log::*;
use shop_common::{parse_boolean_flag, Secret};

pub const DEFAULT_BASE_URL: &str = "https://2282045.pay.lanjingzf.com";
pub const DEFAULT_NOTIFY_URL: &str = "http://localhost:9000/api/payment/notify";
pub const DEFAULT_RETURN_URL: &str = "http://localhost:9000/api/payment/return";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub secret_key: Secret<String>,
    pub notify_url: String,
    pub return_url: String,
    pub timeout: Duration,
    /// Only honoured in debug builds. See [`crate::SignatureMode`].
    pub allow_mock_signature: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            secret_key: Secret::new("development-secret-key".to_string()),
            notify_url: DEFAULT_NOTIFY_URL.to_string(),
            return_url: DEFAULT_RETURN_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            allow_mock_signature: false,
        }
    }
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let defaults = Self::default();
        let base_url = std::env::var("SHOP_PAYMENT_BASE_URL").unwrap_or_else(|_| {
            info!("SHOP_PAYMENT_BASE_URL not set, using {DEFAULT_BASE_URL}");
            defaults.base_url.clone()
        });
        let secret_key = Secret::new(std::env::var("SHOP_PAYMENT_SECRET_KEY").unwrap_or_else(|_| {
            warn!("SHOP_PAYMENT_SECRET_KEY not set, using a development key. Gateway callbacks will not verify.");
            defaults.secret_key.reveal().clone()
        }));
        let notify_url = std::env::var("SHOP_PAYMENT_NOTIFY_URL").unwrap_or_else(|_| {
            info!("SHOP_PAYMENT_NOTIFY_URL not set, using {DEFAULT_NOTIFY_URL}");
            defaults.notify_url.clone()
        });
        let return_url = std::env::var("SHOP_PAYMENT_RETURN_URL").unwrap_or_else(|_| {
            info!("SHOP_PAYMENT_RETURN_URL not set, using {DEFAULT_RETURN_URL}");
            defaults.return_url.clone()
        });
        let timeout = std::env::var("SHOP_PAYMENT_TIMEOUT")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| error!("Invalid SHOP_PAYMENT_TIMEOUT value '{s}'. {e}. Using the default."))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        let allow_mock_signature = parse_boolean_flag(std::env::var("SHOP_ALLOW_MOCK_SIGNATURE").ok(), false);
        Self { base_url, secret_key, notify_url, return_url, timeout, allow_mock_signature }
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_secret<S: Into<String>>(mut self, secret: S) -> Self {
        self.secret_key = Secret::new(secret.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
