use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("RALLY_JWT_SECRET is unset or still a placeholder")]
    InsecureSecret,
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Process settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub gateway_url: String,
    pub gateway_token: String,
    pub bot_user_id: String,
    pub super_admin_id: Option<String>,
    pub reminder_interval: Duration,
    pub economy_config: Option<PathBuf>,
    pub reply_ttl: Duration,
    pub reply_capacity: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| var(key).ok_or(SettingsError::Missing(key));

        let jwt_secret = var("RALLY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(SettingsError::InsecureSecret);
        }

        let reminder_hours: u64 = parse_or(&var, "RALLY_REMINDER_HOURS", 12)?;
        if reminder_hours == 0 {
            return Err(SettingsError::Invalid {
                var: "RALLY_REMINDER_HOURS",
                value: "0".into(),
            });
        }
        let reply_ttl_hours: u64 = parse_or(&var, "RALLY_REPLY_TTL_HOURS", 24)?;

        Ok(Self {
            host: var("RALLY_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&var, "RALLY_PORT", 3100)?,
            db_path: var("RALLY_DB_PATH").unwrap_or_else(|| "rally.db".into()).into(),
            jwt_secret,
            gateway_url: required("RALLY_GATEWAY_URL")?,
            gateway_token: required("RALLY_GATEWAY_TOKEN")?,
            bot_user_id: required("RALLY_BOT_USER_ID")?,
            super_admin_id: var("RALLY_SUPER_ADMIN_ID"),
            reminder_interval: Duration::from_secs(reminder_hours * 3600),
            economy_config: var("RALLY_ECONOMY_CONFIG").map(PathBuf::from),
            reply_ttl: Duration::from_secs(reply_ttl_hours * 3600),
            reply_capacity: parse_or(&var, "RALLY_REPLY_CAPACITY", 10_000)?,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &'static str, default: T) -> Result<T, SettingsError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|_| SettingsError::Invalid {
            var: key,
            value: raw,
        }),
        None => Ok(default),
    }
}
