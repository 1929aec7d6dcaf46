//! Server configuration

use anyhow::{Context, Result};
use std::{net::SocketAddr, time::Duration};

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub addr: SocketAddr,
    /// How often expired sessions are evicted from the registry
    pub session_sweep_interval: Duration,
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SERVER_ADDR`: Listen address (default: 0.0.0.0:8080)
    /// - `SESSION_SWEEP_INTERVAL_SECS`: Session sweep period (default: 300)
    pub fn from_env() -> Result<Self> {
        let addr = std::env::var("SERVER_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("SERVER_ADDR must be a socket address")?;

        let sweep_secs = std::env::var("SESSION_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .unwrap_or(300)
            .max(1);

        Ok(Self {
            addr,
            session_sweep_interval: Duration::from_secs(sweep_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_server_config_defaults() {
        unsafe {
            std::env::remove_var("SERVER_ADDR");
            std::env::remove_var("SESSION_SWEEP_INTERVAL_SECS");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.session_sweep_interval, Duration::from_secs(300));
    }

    #[test]
    #[serial]
    fn test_server_config_from_env() {
        unsafe {
            std::env::set_var("SERVER_ADDR", "127.0.0.1:9000");
            std::env::set_var("SESSION_SWEEP_INTERVAL_SECS", "15");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.session_sweep_interval, Duration::from_secs(15));

        unsafe {
            std::env::set_var("SERVER_ADDR", "not-an-address");
        }
        assert!(ServerConfig::from_env().is_err());

        unsafe {
            std::env::remove_var("SERVER_ADDR");
            std::env::remove_var("SESSION_SWEEP_INTERVAL_SECS");
        }
    }
}
