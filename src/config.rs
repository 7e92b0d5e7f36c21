//! Configuration module for the alt text bot.
//!
//! This module contains the Twitter/X API credentials, the runtime settings of
//! the mention poller, and the loader for the optional `secrets` file that can
//! hold credentials instead of the environment.

use log::{debug, error, info, warn};
use reqwest::Client;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default path of the durable state record.
pub const DEFAULT_STATE_FILE: &str = "state";
/// Default path of the credentials file.
pub const DEFAULT_SECRETS_FILE: &str = "secrets";
/// Default idle interval between empty polls, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
/// Default maximum length of a reply chunk, in characters.
pub const DEFAULT_MAX_CHUNK_LEN: usize = 250;

/// Masks a credential for logging, keeping at most eight characters on each end.
pub(crate) fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let len = chars.len();
    let prefix: String = chars.iter().take(8.min(len)).collect();
    if len > 16 {
        let suffix: String = chars[len - 8..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        format!("{}...", prefix)
    }
}

/// Credentials read from a `key = value` file.
///
/// Lines without an `=` are ignored, values may be wrapped in single or double
/// quotes.
#[derive(Debug, Default, Clone)]
pub struct Secrets {
    values: HashMap<String, String>,
}

impl Secrets {
    /// Parses the contents of a secrets file.
    pub fn parse(contents: &str) -> Self {
        let values = contents
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| {
                (
                    key.trim().to_string(),
                    value.trim().trim_matches(|c| c == '"' || c == '\'').to_string(),
                )
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();
        Secrets { values }
    }

    /// Loads the secrets file at `path`.
    ///
    /// A missing file yields an empty set, since every credential can also come
    /// from the environment.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let secrets = Self::parse(&contents);
                info!(
                    "Loaded {} entries from secrets file {}",
                    secrets.values.len(),
                    path.display()
                );
                Ok(secrets)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No secrets file at {}", path.display());
                Ok(Secrets::default())
            }
            Err(e) => Err(format!("Failed to read secrets file {}: {}", path.display(), e).into()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Looks `key` up in the environment first, then in the secrets file.
    /// Empty values count as absent.
    fn lookup(&self, key: &str) -> Option<String> {
        env::var(key)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.get(key).filter(|v| !v.is_empty()).map(String::from))
    }
}

/// Configuration struct for Twitter/X API credentials.
///
/// This struct holds the credentials required to authenticate with the Twitter/X API v2 endpoints.
/// It uses OAuth 2.0 User Context (Access Token) for all operations and optionally the
/// refresh token and client credentials for automatic token renewal.
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    /// The Access Token for OAuth 2.0 User Context authentication (all operations)
    pub access_token: String,
    /// The Refresh Token for automatically refreshing expired access tokens
    pub refresh_token: Option<String>,
    /// The Client ID for OAuth 2.0 operations
    pub client_id: Option<String>,
    /// The Client Secret for OAuth 2.0 operations
    pub client_secret: Option<String>,
}

impl TwitterConfig {
    /// Loads the credentials from the environment, falling back to `secrets`.
    ///
    /// # Required Values
    ///
    /// - `xapi_access_token`: Twitter API Access Token (OAuth 2.0 User Context)
    ///
    /// # Optional Values (for automatic token refresh)
    ///
    /// - `xapi_refresh_token`: Refresh Token for renewing expired access tokens
    /// - `xapi_client_id`: Client ID for OAuth 2.0 operations
    /// - `xapi_client_secret`: Client Secret for OAuth 2.0 operations
    ///
    /// # Returns
    ///
    /// - `Ok(TwitterConfig)`: If the access token is present
    /// - `Err(...)`: If the access token is missing
    pub fn load(secrets: &Secrets) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        info!("Loading Twitter configuration");

        let access_token = match secrets.lookup("xapi_access_token") {
            Some(token) => {
                info!(
                    "Found xapi_access_token with length: {}",
                    token.chars().count()
                );
                debug!("Access token (masked): {}", mask_token(&token));
                if token.chars().count() < 10 {
                    warn!(
                        "Access token seems unusually short ({} characters)",
                        token.chars().count()
                    );
                }
                token
            }
            None => {
                error!("Make sure xapi_access_token is set in the environment or the secrets file");
                return Err("Missing xapi_access_token".into());
            }
        };

        let refresh_token = secrets.lookup("xapi_refresh_token");
        if let Some(token) = &refresh_token {
            debug!("Refresh token (masked): {}", mask_token(token));
        }
        let client_id = secrets.lookup("xapi_client_id");
        let client_secret = secrets.lookup("xapi_client_secret");

        if refresh_token.is_some() && (client_id.is_none() || client_secret.is_none()) {
            warn!(
                "Refresh token is provided but client credentials are missing - \
                 automatic token refresh will be disabled"
            );
        }

        let config = TwitterConfig {
            access_token,
            refresh_token,
            client_id,
            client_secret,
        };

        if config.can_refresh_token() {
            info!("Automatic token refresh is enabled");
        } else {
            info!("Automatic token refresh is disabled - manual token refresh required");
        }

        Ok(config)
    }

    /// Checks if automatic token refresh is available.
    ///
    /// Returns true if all required credentials (client_id, client_secret, refresh_token)
    /// are available for automatic token refresh.
    pub fn can_refresh_token(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.refresh_token.is_some()
    }

    /// Attempts to refresh the access token using the stored refresh token and client credentials.
    ///
    /// On success the new access token (and the rotated refresh token, if Twitter sent one)
    /// replaces the old one in memory. Nothing is written back to the environment or the
    /// secrets file.
    pub async fn refresh_access_token(
        &mut self,
        client: &Client,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let (client_id, client_secret, refresh_token) = match (
            self.client_id.as_ref(),
            self.client_secret.as_ref(),
            self.refresh_token.as_ref(),
        ) {
            (Some(id), Some(secret), Some(token)) => (id, secret, token),
            _ => {
                error!("Cannot refresh token: missing required credentials");
                return Err("Missing required credentials for token refresh".into());
            }
        };

        let (new_access_token, new_refresh_token) =
            crate::oauth::refresh_access_token(client, client_id, client_secret, refresh_token)
                .await?;

        self.access_token = new_access_token;
        debug!(
            "Updated access token (masked): {}",
            mask_token(&self.access_token)
        );
        if let Some(new_refresh) = new_refresh_token {
            self.refresh_token = Some(new_refresh);
            warn!("Refresh token was rotated - update xapi_refresh_token before the next restart");
        }
        warn!("Access token has been refreshed - consider updating your xapi_access_token");

        Ok(())
    }
}

/// Runtime settings of the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    /// Path of the durable state record holding the cursor; `None` keeps the
    /// cursor in memory only.
    pub state_file: Option<PathBuf>,
    /// Path of the optional credentials file.
    pub secrets_file: PathBuf,
    /// Explicit starting cursor; when set, the stored cursor is not loaded.
    pub since_id: Option<u64>,
    /// How long to wait after a poll that returned nothing.
    pub poll_interval: Duration,
    /// Maximum length of a single reply chunk, in characters.
    pub max_chunk_len: usize,
    /// On a fresh installation, jump past existing mentions instead of answering them.
    pub skip_backlog: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            state_file: Some(PathBuf::from(DEFAULT_STATE_FILE)),
            secrets_file: PathBuf::from(DEFAULT_SECRETS_FILE),
            since_id: None,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_chunk_len: DEFAULT_MAX_CHUNK_LEN,
            skip_backlog: false,
        }
    }
}

impl BotConfig {
    /// Reads the bot settings from `ALTBOT_*` environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `ALTBOT_STATE_FILE` | `state` (empty: keep the cursor in memory) |
    /// | `ALTBOT_SECRETS_FILE` | `secrets` |
    /// | `ALTBOT_SINCE_ID` | unset |
    /// | `ALTBOT_POLL_INTERVAL_SECS` | `15` |
    /// | `ALTBOT_MAX_CHUNK_LEN` | `250` |
    /// | `ALTBOT_SKIP_BACKLOG` | `false` |
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that does not parse, or if
    /// `ALTBOT_MAX_CHUNK_LEN` is zero.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let defaults = BotConfig::default();

        let state_file = match env::var("ALTBOT_STATE_FILE") {
            Ok(path) if path.trim().is_empty() => None,
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => defaults.state_file,
        };
        let secrets_file = env::var("ALTBOT_SECRETS_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.secrets_file);
        let since_id = parse_var::<u64>("ALTBOT_SINCE_ID")?;
        let poll_interval = parse_var::<u64>("ALTBOT_POLL_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);
        let max_chunk_len =
            parse_var::<usize>("ALTBOT_MAX_CHUNK_LEN")?.unwrap_or(defaults.max_chunk_len);
        if max_chunk_len == 0 {
            return Err("ALTBOT_MAX_CHUNK_LEN must be at least 1".into());
        }
        let skip_backlog = match env::var("ALTBOT_SKIP_BACKLOG") {
            Ok(value) => parse_flag(&value)
                .ok_or_else(|| format!("ALTBOT_SKIP_BACKLOG is not a boolean: '{}'", value))?,
            Err(_) => defaults.skip_backlog,
        };

        let config = BotConfig {
            state_file,
            secrets_file,
            since_id,
            poll_interval,
            max_chunk_len,
            skip_backlog,
        };
        info!(
            "Bot configuration: state file {:?}, poll interval {:?}, max chunk length {}, \
             since_id override {:?}, skip backlog {}",
            config.state_file,
            config.poll_interval,
            config.max_chunk_len,
            config.since_id,
            config.skip_backlog
        );
        Ok(config)
    }
}

/// Parses an optional environment variable. Unset and empty both mean `None`.
fn parse_var<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error + Send + Sync>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("{} has an invalid value '{}': {}", name, value, e).into()),
        Err(_) => Ok(None),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
