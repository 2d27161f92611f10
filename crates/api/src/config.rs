//! Environment-driven configuration for the API binary.

use chrono::Duration;

/// Runtime configuration, read once at boot.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub access_ttl: Duration,
    pub refresh_prefix: String,
    pub refresh_ttl: Duration,
    pub id_namespace: String,
}

impl Config {
    /// Read configuration from the environment, falling back to dev
    /// defaults. Malformed numeric values fall back with a warning rather
    /// than crashing the boot.
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        Self {
            port: env_parsed("PORT", 8080),
            jwt_secret,
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "clavis".to_string()),
            access_ttl: Duration::minutes(env_parsed("ACCESS_TOKEN_TTL_MINUTES", 15)),
            refresh_prefix: std::env::var("REFRESH_TOKEN_PREFIX")
                .unwrap_or_else(|_| "cv_".to_string()),
            refresh_ttl: Duration::days(env_parsed("REFRESH_TOKEN_TTL_DAYS", 7)),
            id_namespace: std::env::var("ID_NAMESPACE").unwrap_or_else(|_| "clavis".to_string()),
        }
    }
}

fn env_parsed<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "unparseable env var, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_session_policy() {
        let config = Config::from_env();
        assert_eq!(config.jwt_issuer, "clavis");
        assert_eq!(config.access_ttl, Duration::minutes(15));
        assert_eq!(config.refresh_ttl, Duration::days(7));
        assert_eq!(config.refresh_prefix, "cv_");
    }
}
