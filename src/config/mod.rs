use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    pub database_uri: String,
    pub environment: Environment,
    pub client_origin: String,
    pub identity: IdentitySettings,
    pub reference_offset: FixedOffset,
    pub server: ServerSettings,
}

#[derive(Clone)]
pub struct IdentitySettings {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub authorize_url: String,
    pub token_url: String,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Environment {
    Local,
    Staging,
    Testing,
    Production,
}

impl Environment {
    /// Environments where diagnostic surfaces (verbose logs, advertised
    /// OAuth2 endpoints) are enabled.
    pub fn is_debug(&self) -> bool {
        matches!(self, Environment::Local | Environment::Staging | Environment::Testing)
    }

    pub fn is_deployed(&self) -> bool {
        matches!(self, Environment::Staging | Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "LOCAL",
            Environment::Staging => "STAGING",
            Environment::Testing => "TESTING",
            Environment::Production => "PRODUCTION",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOCAL" => Ok(Environment::Local),
            "STAGING" => Ok(Environment::Staging),
            "TESTING" => Ok(Environment::Testing),
            "PRODUCTION" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Settings {
    /// Load settings from the process environment. Call `dotenvy` first if a
    /// `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let environment = match lookup("ENVIRONMENT") {
            Some(v) => v
                .parse()
                .map_err(|reason| ConfigError::Invalid { key: "ENVIRONMENT", reason })?,
            None => Environment::Production,
        };

        let database_uri = required("DATABASE_URI")?;
        validate_database_uri(&database_uri)?;

        let base_url = required("FIEF_URL")?;
        url::Url::parse(&base_url).map_err(|e| ConfigError::Invalid {
            key: "FIEF_URL",
            reason: e.to_string(),
        })?;

        let client_origin = required("CLIENT_ORIGIN")?;
        url::Url::parse(&client_origin).map_err(|e| ConfigError::Invalid {
            key: "CLIENT_ORIGIN",
            reason: e.to_string(),
        })?;

        let reference_offset = match lookup("REFERENCE_UTC_OFFSET") {
            Some(v) => parse_utc_offset(&v).map_err(|reason| ConfigError::Invalid {
                key: "REFERENCE_UTC_OFFSET",
                reason,
            })?,
            None => utc(),
        };

        let port = match lookup("PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                reason: format!("'{}' is not a port number", v),
            })?,
            None => 8000,
        };

        Ok(Self {
            app_name: required("APP_NAME")?,
            app_version: required("APP_VERSION")?,
            database_uri,
            environment,
            client_origin,
            identity: IdentitySettings {
                client_id: required("CLIENT_ID")?,
                client_secret: required("CLIENT_SECRET")?,
                base_url,
                authorize_url: required("AUTHORIZE_URL")?,
                token_url: required("TOKEN_URL")?,
            },
            reference_offset,
            server: ServerSettings {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
            },
        })
    }

    /// Default `tracing` filter directive for this environment.
    pub fn default_log_filter(&self) -> &'static str {
        if self.environment.is_debug() {
            "cattery_api=debug,tower_http=debug"
        } else {
            "cattery_api=info,tower_http=info"
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("app_name", &self.app_name)
            .field("app_version", &self.app_version)
            .field("database_uri", &redact_uri(&self.database_uri))
            .field("environment", &self.environment)
            .field("client_origin", &self.client_origin)
            .field("identity", &self.identity)
            .field("reference_offset", &self.reference_offset)
            .field("server", &self.server)
            .finish()
    }
}

impl fmt::Debug for IdentitySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}

// Only the scheme is checked here; host lists and options are left to the
// driver, which accepts forms `url` does not (e.g. replica-set host lists).
fn validate_database_uri(uri: &str) -> Result<(), ConfigError> {
    let scheme = uri
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .ok_or_else(|| ConfigError::Invalid {
            key: "DATABASE_URI",
            reason: "missing scheme".to_string(),
        })?;

    match scheme {
        "mongodb" | "mongodb+srv" => Ok(()),
        other => Err(ConfigError::Invalid {
            key: "DATABASE_URI",
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

// Credentials in the connection string must not reach the logs.
fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return "<unparseable>".to_string();
    };

    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => match rest[..at].split_once(':') {
            Some((user, _)) => format!("{}://{}:***@{}", scheme, user, &rest[at + 1..]),
            None => uri.to_string(),
        },
        None => uri.to_string(),
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Parse `Z`, `UTC` or `±HH:MM` into a fixed offset.
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, String> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Ok(utc());
    }

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(format!("'{}' must start with '+' or '-'", value)),
    };

    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| format!("'{}' must look like +HH:MM", value))?;
    let hours: i32 = hours.parse().map_err(|_| format!("bad hours in '{}'", value))?;
    let minutes: i32 = minutes.parse().map_err(|_| format!("bad minutes in '{}'", value))?;
    if hours > 23 || minutes > 59 {
        return Err(format!("'{}' is out of range", value));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("'{}' is out of range", value))
}
