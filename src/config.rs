use std::time::Duration;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("secret {0} was not found")]
    Missing(&'static str),

    #[error("secret {key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub database_name: String,
    pub app_url: String,
    pub stripe: StripeConfig,
    pub clerk: ClerkConfig,
    pub booking: BookingRules,
    pub jobs: JobConfig,
    pub mail_from: String,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct ClerkConfig {
    pub webhook_secret: String,
    /// PEM encoded public key used to verify session tokens.
    pub jwt_key: String,
}

#[derive(Debug, Clone)]
pub struct BookingRules {
    /// How long seats stay held for an unpaid booking.
    pub hold: Duration,
}

#[derive(Debug, Clone)]
pub struct JobConfig {
    pub poll_interval: Duration,
    pub max_attempts: i32,
}

impl Config {
    /// Builds the config from any key lookup, normally the Shuttle secret store.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let hold_minutes = parse_number::<u64>("BOOKING_HOLD_MINUTES", optional("BOOKING_HOLD_MINUTES", "10"))?;
        let poll_seconds = parse_number::<u64>("JOB_POLL_SECONDS", optional("JOB_POLL_SECONDS", "5"))?;
        let max_attempts = parse_number::<i32>("JOB_MAX_ATTEMPTS", optional("JOB_MAX_ATTEMPTS", "5"))?;

        if hold_minutes == 0 {
            return Err(ConfigError::Invalid { key: "BOOKING_HOLD_MINUTES", value: "0".into() });
        }
        if poll_seconds == 0 {
            return Err(ConfigError::Invalid { key: "JOB_POLL_SECONDS", value: "0".into() });
        }
        if max_attempts < 1 {
            return Err(ConfigError::Invalid { key: "JOB_MAX_ATTEMPTS", value: max_attempts.to_string() });
        }

        Ok(Config {
            mongodb_uri: required("MONGODB_URI")?,
            database_name: optional("DATABASE_NAME", "quickshow"),
            app_url: required("APP_URL")?.trim_end_matches('/').to_string(),
            stripe: StripeConfig {
                secret_key: required("STRIPE_SECRET_KEY")?,
                webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
                api_base: optional("STRIPE_API_BASE", "https://api.stripe.com"),
                currency: optional("CURRENCY", "usd").to_lowercase(),
            },
            clerk: ClerkConfig {
                webhook_secret: required("CLERK_WEBHOOK_SECRET")?,
                jwt_key: required("CLERK_JWT_KEY")?,
            },
            booking: BookingRules {
                hold: Duration::from_secs(hold_minutes * 60),
            },
            jobs: JobConfig {
                poll_interval: Duration::from_secs(poll_seconds),
                max_attempts,
            },
            mail_from: optional("MAIL_FROM", "no-reply@quickshow.app"),
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}
