//! Runtime configuration loaded from environment variables

use std::net::SocketAddr;
use std::time::Duration;

/// Timing and limits for the phase engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a lobby may sit in preparation before it is closed
    pub prepare_timeout: Duration,
    /// Time between the start command and the first nightfall
    pub intro: Duration,
    pub night: Duration,
    pub day: Duration,
    pub vote: Duration,
    /// Group sessions older than this are considered stale
    pub session_expiry: Duration,
    /// Nightfall number at which the game is force-ended
    pub max_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prepare_timeout: Duration::from_secs(300),
            intro: Duration::from_secs(30),
            night: Duration::from_secs(120),
            day: Duration::from_secs(120),
            vote: Duration::from_secs(30),
            session_expiry: Duration::from_secs(5 * 60),
            max_days: 10,
        }
    }
}

impl EngineConfig {
    /// Load config from environment variables, falling back to defaults
    ///
    /// - `WEREWOLF_PREPARE_TIMEOUT_SECONDS`
    /// - `WEREWOLF_INTRO_SECONDS`
    /// - `WEREWOLF_NIGHT_SECONDS`
    /// - `WEREWOLF_DAY_SECONDS`
    /// - `WEREWOLF_VOTE_SECONDS`
    /// - `WEREWOLF_SESSION_EXPIRY_SECONDS`
    /// - `WEREWOLF_MAX_DAYS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            prepare_timeout: env_seconds("WEREWOLF_PREPARE_TIMEOUT_SECONDS")
                .unwrap_or(defaults.prepare_timeout),
            intro: env_seconds("WEREWOLF_INTRO_SECONDS").unwrap_or(defaults.intro),
            night: env_seconds("WEREWOLF_NIGHT_SECONDS").unwrap_or(defaults.night),
            day: env_seconds("WEREWOLF_DAY_SECONDS").unwrap_or(defaults.day),
            vote: env_seconds("WEREWOLF_VOTE_SECONDS").unwrap_or(defaults.vote),
            session_expiry: env_seconds("WEREWOLF_SESSION_EXPIRY_SECONDS")
                .unwrap_or(defaults.session_expiry),
            max_days: env_parse::<u32>("WEREWOLF_MAX_DAYS")
                .filter(|d| *d > 0)
                .unwrap_or(defaults.max_days),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl ServerConfig {
    /// Reads `WEREWOLF_LISTEN` (e.g. `127.0.0.1:9000`)
    pub fn from_env() -> Self {
        match env_parse::<SocketAddr>("WEREWOLF_LISTEN") {
            Some(listen) => Self { listen },
            None => Self::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

fn env_seconds(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}
