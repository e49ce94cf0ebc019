use anyhow::{anyhow, Context, Result};
use std::env;
use std::time::Duration;

use crate::domain::escalation::MissingMetadataPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Escalation
    pub escalation_sweep_interval_seconds: u64,
    pub missing_metadata_policy: MissingMetadataPolicy,

    // Commercial fan-out
    pub team_notification_threshold: f64,

    pub seed_defaults: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Environment::from_str(&var("ENV").unwrap_or_else(|| "dev".to_string()));
        let server_addr = var("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        // CORS
        let cors_allow_origins = var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Escalation
        let escalation_sweep_interval_seconds = var("ESCALATION_SWEEP_INTERVAL_SECONDS")
            .and_then(|s| s.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .unwrap_or(15);
        let missing_metadata_policy = match var("ESCALATION_MISSING_METADATA") {
            Some(raw) => raw
                .parse::<MissingMetadataPolicy>()
                .map_err(|e| anyhow!(e))
                .context("ESCALATION_MISSING_METADATA must be 'permissive' or 'strict'")?,
            None => MissingMetadataPolicy::Permissive,
        };

        // Commercial fan-out
        let team_notification_threshold = var("TEAM_NOTIFICATION_THRESHOLD")
            .and_then(|s| s.parse().ok())
            .filter(|v: &f64| v.is_finite() && *v >= 0.0)
            .unwrap_or(250_000.0);

        let seed_defaults = var("SEED_DEFAULTS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        Ok(Settings {
            env,
            server_addr,
            cors_allow_origins,
            escalation_sweep_interval_seconds,
            missing_metadata_policy,
            team_notification_threshold,
            seed_defaults,
        })
    }

    pub fn escalation_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.escalation_sweep_interval_seconds)
    }
}
