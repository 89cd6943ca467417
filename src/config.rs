// MIT License - Copyright (c) 2026 Peter Wright
// Client configuration and builder

use std::fmt;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_LOGIN_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_PORT,
    DEFAULT_WRITE_TIMEOUT,
};

/// Login string sent when the controller prints `LOGIN: `.
///
/// Sent verbatim, so it holds whatever the controller expects
/// (typically `<user>,<password>` or a bare password).
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    pub fn new(login: impl Into<String>) -> Self {
        Self(login.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(****)")
    }
}

impl From<&str> for Credentials {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Credentials {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Configuration for connecting to a Homeworks controller.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Controller (NPort adaptor) host name or IP address
    pub host: String,
    /// TCP port (default: 4008)
    pub port: u16,
    /// Login, if the controller asks for one
    pub credentials: Option<Credentials>,
    /// Bound on a single read wait, and the delay between reconnect attempts (default: 1s)
    pub poll_interval: Duration,
    /// TCP connect timeout (default: 10s)
    pub connect_timeout: Duration,
    /// How long to wait for the login prompt, and for the reply to the credentials (default: 2s)
    pub login_timeout: Duration,
    /// Bound on a single command write (default: 1s)
    pub write_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "192.168.0.100".to_string(),
            port: DEFAULT_PORT,
            credentials: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// `host:port`, as used for connecting and in log lines.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for ClientConfig.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn credentials(mut self, credentials: impl Into<Credentials>) -> Self {
        self.config.credentials = Some(credentials.into());
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.config.login_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::builder()
            .host("10.0.0.5")
            .port(23)
            .credentials("lutron,integration")
            .poll_interval(Duration::from_millis(250))
            .build();

        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 23);
        assert_eq!(config.address(), "10.0.0.5:23");
        assert_eq!(
            config.credentials.as_ref().map(Credentials::as_str),
            Some("lutron,integration")
        );
        assert_eq!(config.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::builder().build();
        assert_eq!(config.port, 4008);
        assert!(config.credentials.is_none());
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_credentials_are_redacted() {
        let config = ClientConfig::builder().credentials("secret").build();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("Credentials(****)"));
    }
}
