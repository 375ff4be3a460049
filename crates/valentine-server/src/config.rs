use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

/// Server settings, read from `VALENTINE_*` and `OPENAI_*` variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub media_dir: PathBuf,
    /// Prefix for asset URLs; empty serves them relative to this host.
    pub public_url: String,
    pub jwt_secret: String,
    pub max_upload_bytes: usize,
    pub asset_grace_hours: u64,
    pub cleanup_interval_secs: u64,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("VALENTINE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("VALENTINE_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let port = match var("VALENTINE_PORT") {
            Some(raw) => raw.parse().with_context(|| format!("invalid VALENTINE_PORT '{}'", raw))?,
            None => 3000,
        };
        let max_upload_mb: usize = match var("VALENTINE_MAX_UPLOAD_MB") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid VALENTINE_MAX_UPLOAD_MB '{}'", raw))?,
            None => 50,
        };
        let asset_grace_hours = match var("VALENTINE_ASSET_GRACE_HOURS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid VALENTINE_ASSET_GRACE_HOURS '{}'", raw))?,
            None => 24,
        };

        Ok(Self {
            host: var("VALENTINE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("VALENTINE_DB_PATH").unwrap_or_else(|| "valentine.db".into()).into(),
            media_dir: var("VALENTINE_MEDIA_DIR").unwrap_or_else(|| "./media".into()).into(),
            public_url: var("VALENTINE_PUBLIC_URL").unwrap_or_default(),
            jwt_secret,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            asset_grace_hours,
            cleanup_interval_secs: 3600,
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL"),
            openai_model: var("OPENAI_MODEL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("VALENTINE_JWT_SECRET", "a-real-secret")]).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.db_path, PathBuf::from("valentine.db"));
        assert_eq!(cfg.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(cfg.asset_grace_hours, 24);
        assert!(cfg.openai_api_key.is_none());
    }

    #[test]
    fn placeholder_secrets_are_refused() {
        assert!(config(&[]).is_err());
        assert!(config(&[("VALENTINE_JWT_SECRET", "dev-secret-change-me")]).is_err());
        assert!(config(&[("VALENTINE_JWT_SECRET", "  ")]).is_err());
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = config(&[("VALENTINE_JWT_SECRET", "s"), ("VALENTINE_PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("VALENTINE_PORT"));

        let err = config(&[("VALENTINE_JWT_SECRET", "s"), ("VALENTINE_ASSET_GRACE_HOURS", "a day")])
            .unwrap_err();
        assert!(err.to_string().contains("VALENTINE_ASSET_GRACE_HOURS"));

        let cfg = config(&[("VALENTINE_JWT_SECRET", "s"), ("VALENTINE_ASSET_GRACE_HOURS", "6")]).unwrap();
        assert_eq!(cfg.asset_grace_hours, 6);
    }
}
