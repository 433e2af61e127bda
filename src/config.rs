use std::str::FromStr;

use tracing::warn;

use crate::locale::Locale;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 8000;
pub const DEFAULT_PORT: u16 = 8080;

/// What to do with a reply that resolves after its conversation was reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleResponsePolicy {
    Discard,
    #[default]
    Append,
}

impl FromStr for StaleResponsePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discard" => Ok(StaleResponsePolicy::Discard),
            "append" => Ok(StaleResponsePolicy::Append),
            other => Err(format!("Unknown stale response policy: {other}")),
        }
    }
}

/// Per-session knobs, shared by every session the registry creates.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub locale: Locale,
    pub max_message_length: usize,
    pub stale_policy: StaleResponsePolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            stale_policy: StaleResponsePolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub port: u16,
    pub session: SessionSettings,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unparseable values
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .filter(|k| !k.trim().is_empty());

        let model = lookup("GEMINI_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let session = SessionSettings {
            locale: parse_or(&lookup, "CHAT_LOCALE", Locale::default()),
            max_message_length: parse_or(&lookup, "MAX_MESSAGE_LENGTH", DEFAULT_MAX_MESSAGE_LENGTH),
            stale_policy: parse_or(&lookup, "STALE_RESPONSES", StaleResponsePolicy::default()),
        };

        Self {
            api_key,
            model,
            temperature: parse_or(&lookup, "GEMINI_TEMPERATURE", DEFAULT_TEMPERATURE),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            session,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring invalid {key}={raw:?}: {e}");
                default
            }
        },
    }
}
