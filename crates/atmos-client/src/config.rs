//! Client configuration.
//!
//! Provides [`AtmosConfig`] for connecting to an Atmos endpoint. Values can
//! be set through the builder or loaded from environment variables.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use atmos_auth::Credentials;
use atmos_http::EncodingMode;
use atmos_model::{AtmosError, AtmosResult};
use serde::{Deserialize, Serialize};
use tracing::warn;
use typed_builder::TypedBuilder;

/// URL scheme used to reach the hosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP.
    #[default]
    Http,
    /// HTTP over TLS.
    Https,
}

impl Protocol {
    /// The URL scheme.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = AtmosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            _ => Err(AtmosError::InvalidFormat {
                kind: "protocol",
                value: s.to_owned(),
            }),
        }
    }
}

/// Atmos client configuration.
///
/// # Examples
///
/// ```
/// use atmos_client::config::AtmosConfig;
///
/// let config = AtmosConfig::builder()
///     .hosts(vec!["atmos.example.com".into()])
///     .uid("tenant/user".into())
///     .shared_secret("LJLuryj6zs8ste6Y3jTGQp71xq0=".into())
///     .build();
/// assert_eq!(config.endpoint("atmos.example.com"), "http://atmos.example.com:80");
/// assert_eq!(config.context, "/rest");
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct AtmosConfig {
    /// Host names or addresses, used in rotation.
    #[builder(default = vec![String::from("localhost")])]
    pub hosts: Vec<String>,

    /// TCP port of every host.
    #[builder(default = 80)]
    pub port: u16,

    /// URL scheme.
    #[builder(default)]
    pub protocol: Protocol,

    /// Full token ID, `subtenant/uid`.
    pub uid: String,

    /// Base64 shared secret. Never serialized.
    #[serde(skip_serializing, default)]
    pub shared_secret: String,

    /// REST context root.
    #[builder(default = String::from("/rest"))]
    pub context: String,

    /// How metadata is encoded in headers.
    #[builder(default)]
    pub encoding: EncodingMode,

    /// Seconds to add to the local clock so request dates match the server.
    #[builder(default = 0)]
    pub server_offset_secs: i64,

    /// Connection timeout in seconds.
    #[builder(default = 15)]
    pub connect_timeout_secs: u64,

    /// Read timeout in seconds.
    #[builder(default = 60)]
    pub read_timeout_secs: u64,
}

impl fmt::Debug for AtmosConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtmosConfig")
            .field("hosts", &self.hosts)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("uid", &self.uid)
            .field("shared_secret", &"<redacted>")
            .field("context", &self.context)
            .field("encoding", &self.encoding)
            .field("server_offset_secs", &self.server_offset_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .finish()
    }
}

impl Default for AtmosConfig {
    fn default() -> Self {
        Self {
            hosts: vec![String::from("localhost")],
            port: 80,
            protocol: Protocol::Http,
            uid: String::new(),
            shared_secret: String::new(),
            context: String::from("/rest"),
            encoding: EncodingMode::Legacy,
            server_offset_secs: 0,
            connect_timeout_secs: 15,
            read_timeout_secs: 60,
        }
    }
}

impl AtmosConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `ATMOS_HOSTS` | `localhost` (comma-separated) |
    /// | `ATMOS_PORT` | `80` |
    /// | `ATMOS_PROTOCOL` | `http` |
    /// | `ATMOS_UID` | empty |
    /// | `ATMOS_SECRET` | empty |
    /// | `ATMOS_CONTEXT` | `/rest` |
    /// | `ATMOS_UTF8` | `false` |
    /// | `ATMOS_SERVER_OFFSET` | `0` |
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("ATMOS_HOSTS") {
            let hosts: Vec<String> = v
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_owned)
                .collect();
            if !hosts.is_empty() {
                config.hosts = hosts;
            }
        }
        if let Some(v) = lookup("ATMOS_PORT") {
            match v.trim().parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!(value = %v, "Ignoring invalid ATMOS_PORT"),
            }
        }
        if let Some(v) = lookup("ATMOS_PROTOCOL") {
            match v.parse() {
                Ok(protocol) => config.protocol = protocol,
                Err(_) => warn!(value = %v, "Ignoring invalid ATMOS_PROTOCOL"),
            }
        }
        if let Some(v) = lookup("ATMOS_UID") {
            config.uid = v;
        }
        if let Some(v) = lookup("ATMOS_SECRET") {
            config.shared_secret = v;
        }
        if let Some(v) = lookup("ATMOS_CONTEXT") {
            config.context = v;
        }
        if let Some(v) = lookup("ATMOS_UTF8") {
            config.encoding = if parse_bool(&v) {
                EncodingMode::Utf8
            } else {
                EncodingMode::Legacy
            };
        }
        if let Some(v) = lookup("ATMOS_SERVER_OFFSET") {
            match v.trim().parse() {
                Ok(offset) => config.server_offset_secs = offset,
                Err(_) => warn!(value = %v, "Ignoring invalid ATMOS_SERVER_OFFSET"),
            }
        }

        config
    }

    /// Check that the configuration can be used to build a client.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] for missing hosts or UID, or a
    /// context without a leading `/`.
    pub fn validate(&self) -> AtmosResult<()> {
        if self.hosts.iter().all(|h| h.trim().is_empty()) {
            return Err(AtmosError::Validation("at least one host is required".to_owned()));
        }
        if self.uid.trim().is_empty() {
            return Err(AtmosError::Validation("uid is required".to_owned()));
        }
        if !self.context.starts_with('/') {
            return Err(AtmosError::Validation(format!(
                "context must start with '/': {:?}",
                self.context
            )));
        }
        Ok(())
    }

    /// Signing credentials from the UID and shared secret.
    ///
    /// # Errors
    ///
    /// Returns a signing error if the secret is not valid Base64.
    pub fn credentials(&self) -> AtmosResult<Credentials> {
        Ok(Credentials::new(&self.uid, &self.shared_secret)?)
    }

    /// Scheme, host and port of one host, e.g. `https://atmos:443`.
    #[must_use]
    pub fn endpoint(&self, host: &str) -> String {
        format!("{}://{}:{}", self.protocol, host, self.port)
    }

    /// The connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// The read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}
