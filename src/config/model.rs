//! Configuration data model.
//!
//! All structs derive `Serialize`/`Deserialize` for TOML persistence. Every
//! field except `host` has a default so a one-line config file is enough.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::nickname::generate_nickname;
use crate::error::ConfigError;

/// Connection and pacing settings for one [`Client`](crate::Client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Hostname or IP address of the IRC server.
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Nick used for `NICK` and the three `USER` name fields.
    #[serde(default = "default_nickname")]
    pub nickname: String,
    /// Realname sent as the trailing part of `USER`.
    #[serde(default = "default_description")]
    pub description: String,
    /// Reconnect attempts before the client stops for good.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Socket read timeout; a silent server for this long counts as a dead link.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: f64,
    #[serde(default = "default_send_interval")]
    pub send_interval_ms: u64,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Channels the bundled binary joins once the MOTD has been received.
    #[serde(default)]
    pub channels: Vec<String>,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, nickname: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            nickname: nickname.into(),
            description: default_description(),
            retries: default_retries(),
            read_timeout_secs: default_read_timeout(),
            send_interval_ms: default_send_interval(),
            reconnect_delay_ms: default_reconnect_delay(),
            retry_delay_ms: default_retry_delay(),
            channels: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the retry count, rejecting zero.
    pub fn set_retries(&mut self, retries: u32) -> Result<(), ConfigError> {
        if retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        self.retries = retries;
        Ok(())
    }

    /// Set the read timeout, rejecting zero, negative and NaN values.
    pub fn set_read_timeout(&mut self, secs: f64) -> Result<(), ConfigError> {
        check_timeout(secs)?;
        self.read_timeout_secs = secs;
        Ok(())
    }

    /// Check the whole record. Called by [`Client::new`](crate::Client::new).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.nickname.is_empty() {
            return Err(ConfigError::EmptyNickname);
        }
        if self
            .nickname
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(ConfigError::InvalidNickname(self.nickname.clone()));
        }
        if self.retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        check_timeout(self.read_timeout_secs)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.read_timeout_secs)
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn check_timeout(secs: f64) -> Result<(), ConfigError> {
    // `!(x > 0)` also catches NaN; the upper bound keeps Duration::from_secs_f64 from panicking.
    if !(secs > 0.0) || !secs.is_finite() || secs > u32::MAX as f64 {
        return Err(ConfigError::NonPositiveTimeout(secs));
    }
    Ok(())
}

fn default_port() -> u16 {
    6667
}
fn default_nickname() -> String {
    generate_nickname()
}
fn default_description() -> String {
    "lircbot IRC engine".to_string()
}
fn default_retries() -> u32 {
    5
}
fn default_read_timeout() -> f64 {
    180.0
}
fn default_send_interval() -> u64 {
    1000
}
fn default_reconnect_delay() -> u64 {
    5000
}
fn default_retry_delay() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_gets_defaults() {
        let cfg: ClientConfig = toml::from_str(r#"host = "irc.example.net""#).unwrap();
        assert_eq!(cfg.port, 6667);
        assert_eq!(cfg.retries, 5);
        assert_eq!(cfg.read_timeout(), Duration::from_secs(180));
        assert_eq!(cfg.send_interval(), Duration::from_secs(1));
        assert_eq!(cfg.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(cfg.retry_delay(), Duration::from_secs(2));
        assert!(!cfg.nickname.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_timeout() {
        let mut cfg = ClientConfig::new("irc.example.net", 6667, "bot");
        assert_eq!(
            cfg.set_read_timeout(0.0),
            Err(ConfigError::NonPositiveTimeout(0.0))
        );
        assert!(cfg.set_read_timeout(-3.0).is_err());
        assert!(cfg.set_read_timeout(f64::NAN).is_err());
        assert_eq!(cfg.read_timeout_secs, 180.0);

        cfg.set_read_timeout(0.5).unwrap();
        assert_eq!(cfg.read_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_rejects_zero_retries() {
        let mut cfg = ClientConfig::new("irc.example.net", 6667, "bot");
        assert_eq!(cfg.set_retries(0), Err(ConfigError::ZeroRetries));
        cfg.set_retries(3).unwrap();
        assert_eq!(cfg.retries, 3);

        let cfg: ClientConfig = toml::from_str("host = \"h\"\nretries = 0").unwrap();
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroRetries));
    }

    #[test]
    fn test_validate_checks_identity_fields() {
        let cfg = ClientConfig::new("", 6667, "bot");
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyHost));

        let cfg = ClientConfig::new("irc.example.net", 6667, "");
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyNickname));

        let cfg = ClientConfig::new("irc.example.net", 6667, "two words");
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidNickname(_))
        ));

        let cfg: ClientConfig =
            toml::from_str("host = \"h\"\nread_timeout_secs = -1.0").unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveTimeout(_))
        ));
    }
}
