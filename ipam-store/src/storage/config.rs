//! PostgreSQL connection parameters.

use std::fmt;
use std::str::FromStr;

use crate::constants::{POSTGRES_CONNECTIONS_MAX, POSTGRES_PORT_DEFAULT, POSTGRES_TABLE_DEFAULT};

use super::error::StorageError;

// =============================================================================
// SslMode
// =============================================================================

/// How the connection negotiates TLS with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SslMode {
    /// Plain unless the server insists on TLS
    Allow,
    /// Never use TLS
    #[default]
    Disable,
    /// TLS if the server supports it
    Prefer,
    /// Always TLS, no certificate checks
    Require,
    /// Always TLS, server certificate must chain to a trusted CA
    VerifyCa,
    /// Like `VerifyCa`, and the host name must match the certificate
    VerifyFull,
}

impl SslMode {
    /// Connection-string value, e.g. `verify-full`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Disable => "disable",
            Self::Prefer => "prefer",
            Self::Require => "require",
            Self::VerifyCa => "verify-ca",
            Self::VerifyFull => "verify-full",
        }
    }

    /// All modes in order.
    #[must_use]
    pub fn all() -> &'static [SslMode] {
        &[
            Self::Allow,
            Self::Disable,
            Self::Prefer,
            Self::Require,
            Self::VerifyCa,
            Self::VerifyFull,
        ]
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SslMode {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| StorageError::config(format!("unknown sslmode: {s}")))
    }
}

// =============================================================================
// PostgresConfig
// =============================================================================

/// Everything needed to open a PostgreSQL backend.
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    /// Server host name or address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Role to connect as
    pub user: String,
    /// Role password
    pub password: String,
    /// Database name
    pub dbname: String,
    /// TLS negotiation mode
    pub ssl_mode: SslMode,
    /// Table holding the prefix documents
    pub table: String,
    /// Pool size
    pub max_connections: u32,
}

impl PostgresConfig {
    /// Config for `dbname` on `host` with default port, table and pool size.
    #[must_use]
    pub fn new(host: impl Into<String>, dbname: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: POSTGRES_PORT_DEFAULT,
            user: String::new(),
            password: String::new(),
            dbname: dbname.into(),
            ssl_mode: SslMode::default(),
            table: POSTGRES_TABLE_DEFAULT.to_string(),
            max_connections: POSTGRES_CONNECTIONS_MAX,
        }
    }

    /// Set the port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set user and password.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Set the TLS mode.
    #[must_use]
    pub fn with_ssl_mode(mut self, ssl_mode: SslMode) -> Self {
        self.ssl_mode = ssl_mode;
        self
    }

    /// Set the table name.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .field("ssl_mode", &self.ssl_mode)
            .field("table", &self.table)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_round_trips_through_str() {
        for mode in SslMode::all() {
            assert_eq!(mode.as_str().parse::<SslMode>().unwrap(), *mode);
        }
    }

    #[test]
    fn test_ssl_mode_parse() {
        assert_eq!("VERIFY-FULL".parse::<SslMode>().unwrap(), SslMode::VerifyFull);
        assert!("verify_full".parse::<SslMode>().is_err());
        assert_eq!(SslMode::default(), SslMode::Disable);
    }

    #[test]
    fn test_config_defaults() {
        let config = PostgresConfig::new("localhost", "ipam");

        assert_eq!(config.port, POSTGRES_PORT_DEFAULT);
        assert_eq!(config.table, POSTGRES_TABLE_DEFAULT);
        assert_eq!(config.max_connections, POSTGRES_CONNECTIONS_MAX);
        assert_eq!(config.ssl_mode, SslMode::Disable);
    }

    #[test]
    fn test_config_debug_hides_password() {
        let config = PostgresConfig::new("localhost", "ipam").with_credentials("ipam", "s3cret");
        let rendered = format!("{config:?}");

        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
