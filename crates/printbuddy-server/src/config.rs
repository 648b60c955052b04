use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Args;
use printbuddy_core::Catalog;
use printbuddy_store::stage::{DEFAULT_KEY_PREFIX, DEFAULT_MAX_UPLOAD_BYTES};
use printbuddy_store::UploadPolicy;

use crate::rate_limit::RateLimitConfig;

/// Settings for the HTTP surface. Storage backends and the notifier read
/// their own environment (`DbConfig`, `StoreConfig`, `NotifierConfig`).
#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, env = "PRINTBUDDY_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// The single origin allowed to call the API. Any origin when unset.
    #[arg(long, env = "PRINTBUDDY_ALLOWED_ORIGIN")]
    pub allowed_origin: Option<String>,

    /// Upload ceiling in bytes.
    #[arg(long, env = "PRINTBUDDY_UPLOAD_LIMIT", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub upload_limit: usize,

    /// Rate-limit window in seconds.
    #[arg(
        long,
        env = "PRINTBUDDY_RATE_LIMIT_WINDOW",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub rate_limit_window: u64,

    /// Requests allowed per client address per window; 0 disables limiting.
    #[arg(long, env = "PRINTBUDDY_RATE_LIMIT_QUOTA", default_value_t = 100)]
    pub rate_limit_quota: u32,

    /// Orderable options: `service` (document|poster) or `order-type` (bw|color).
    #[arg(long, env = "PRINTBUDDY_CATALOG", default_value = "service", value_parser = parse_catalog)]
    pub catalog: Catalog,
}

fn parse_catalog(s: &str) -> Result<Catalog, String> {
    Catalog::parse_str(s).ok_or_else(|| format!("unknown catalog {s:?}; expected service or order-type"))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
            allowed_origin: None,
            upload_limit: DEFAULT_MAX_UPLOAD_BYTES,
            rate_limit_window: 3600,
            rate_limit_quota: 100,
            catalog: Catalog::default(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_bytes: self.upload_limit,
            key_prefix: DEFAULT_KEY_PREFIX.into(),
        }
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            window: Duration::from_secs(self.rate_limit_window),
            quota: self.rate_limit_quota,
        }
    }

    /// Hard cap on request bodies: room for a file twice the ceiling plus
    /// the text fields, so an oversized file is still read and rejected by
    /// the stager with a proper message.
    pub fn body_limit(&self) -> usize {
        self.upload_limit.saturating_mul(2).saturating_add(64 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ServerConfig,
    }

    #[test]
    fn flags_override_defaults() {
        let cli = TestCli::try_parse_from([
            "printbuddy-server",
            "--bind",
            "127.0.0.1",
            "--port",
            "8080",
            "--allowed-origin",
            "https://printbuddy.example",
            "--upload-limit",
            "1024",
            "--rate-limit-window",
            "60",
            "--rate-limit-quota",
            "5",
            "--catalog",
            "order-type",
        ])
        .unwrap();
        let config = cli.config;
        assert_eq!(config.addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.allowed_origin.as_deref(), Some("https://printbuddy.example"));
        assert_eq!(config.upload_policy().max_bytes, 1024);
        assert_eq!(config.rate_limit().window, Duration::from_secs(60));
        assert_eq!(config.rate_limit().quota, 5);
        assert_eq!(config.catalog, Catalog::OrderType);
    }

    #[test]
    fn unknown_catalog_is_rejected() {
        let result = TestCli::try_parse_from(["printbuddy-server", "--catalog", "banners"]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_rate_limit_window_is_rejected() {
        let result = TestCli::try_parse_from(["printbuddy-server", "--rate-limit-window", "0"]);
        assert!(result.is_err());

        let cli = TestCli::try_parse_from(["printbuddy-server", "--rate-limit-window", "1"]).unwrap();
        assert_eq!(cli.config.rate_limit().window, Duration::from_secs(1));
    }

    #[test]
    fn body_limit_leaves_room_for_oversized_file() {
        let config = ServerConfig::default();
        assert_eq!(config.upload_limit, 5 * 1024 * 1024);
        assert_eq!(config.body_limit(), 10 * 1024 * 1024 + 64 * 1024);
        assert_eq!(config.upload_policy().key_prefix, "uploads");
    }
}
