use std::{env, path::PathBuf};

use card_shop_engine::BackendSelection;
use chrono::Duration;
use log::*;
use pay_gateway::GatewayConfig;
use shop_common::{parse_boolean_flag, Secret};

const DEFAULT_SHOP_HOST: &str = "127.0.0.1";
const DEFAULT_SHOP_PORT: u16 = 9000;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_ORDER_TTL: Duration = Duration::minutes(30);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Which persistence backend to run on. Decided once, here.
    pub backend: BackendSelection,
    pub gateway: GatewayConfig,
    /// Where customers are sent after the payment page returns.
    pub frontend_url: String,
    /// How long a pending order stays payable.
    pub order_ttl: Duration,
    /// If set, every `/api/admin` request must carry this value in the `X-Admin-Token` header.
    pub admin_token: Option<Secret<String>>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SHOP_HOST.to_string(),
            port: DEFAULT_SHOP_PORT,
            backend: BackendSelection::resolve(None, None),
            gateway: GatewayConfig::default(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            order_ttl: DEFAULT_ORDER_TTL,
            admin_token: None,
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SHOP_HOST").ok().unwrap_or_else(|| DEFAULT_SHOP_HOST.into());
        let port = env::var("SHOP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SHOP_PORT. {e} Using the default, {DEFAULT_SHOP_PORT}, \
                         instead."
                    );
                    DEFAULT_SHOP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SHOP_PORT);
        let database_url = env::var("SHOP_DATABASE_URL").ok().filter(|s| !s.trim().is_empty());
        let data_dir = env::var("SHOP_DATA_DIR").ok().map(PathBuf::from);
        let backend = BackendSelection::resolve(database_url, data_dir);
        let gateway = GatewayConfig::new_from_env_or_default();
        let frontend_url = env::var("SHOP_FRONTEND_URL").ok().unwrap_or_else(|| {
            info!("🪛️ SHOP_FRONTEND_URL is not set. Using {DEFAULT_FRONTEND_URL}.");
            DEFAULT_FRONTEND_URL.to_string()
        });
        let order_ttl = configure_order_ttl();
        let admin_token = env::var("SHOP_ADMIN_TOKEN").ok().filter(|s| !s.is_empty()).map(Secret::new);
        if admin_token.is_none() {
            warn!(
                "🚨️ SHOP_ADMIN_TOKEN is not set. The admin API is open to anyone who can reach this server. Set \
                 SHOP_ADMIN_TOKEN before exposing it."
            );
        }
        let use_x_forwarded_for = parse_boolean_flag(env::var("SHOP_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SHOP_USE_FORWARDED").ok(), false);
        Self {
            host,
            port,
            backend,
            gateway,
            frontend_url,
            order_ttl,
            admin_token,
            use_x_forwarded_for,
            use_forwarded,
        }
    }
}

fn configure_order_ttl() -> Duration {
    env::var("SHOP_ORDER_TTL")
        .map_err(|_| {
            info!(
                "🪛️ SHOP_ORDER_TTL is not set. Using the default value of {} minutes.",
                DEFAULT_ORDER_TTL.num_minutes()
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::minutes)
                .map_err(|e| warn!("🪛️ Invalid configuration value for SHOP_ORDER_TTL. {e}"))
        })
        .ok()
        .filter(|d| *d > Duration::zero())
        .unwrap_or(DEFAULT_ORDER_TTL)
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that request handlers need. Secrets are deliberately left out.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub frontend_url: String,
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            frontend_url: config.frontend_url.trim_end_matches('/').to_string(),
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
        }
    }
}
