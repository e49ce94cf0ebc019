//! Tracing subscriber setup
//!
//! JSON lines in production, pretty output elsewhere. `RUST_LOG` overrides the
//! per-environment filter.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Environment;

fn default_filter(env: &Environment) -> &'static str {
    match env {
        Environment::Dev => "dealer_portal_backend=debug,tower_http=debug,info",
        Environment::Staging => "dealer_portal_backend=debug,tower_http=info,info",
        Environment::Prod => "dealer_portal_backend=info,tower_http=warn,warn",
    }
}

pub fn init_logging(env: &Environment) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(env)));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(env.is_dev())
        .with_line_number(env.is_dev());

    let registry = tracing_subscriber::registry().with(filter);
    if matches!(env, Environment::Prod) {
        registry
            .with(fmt_layer.json().flatten_event(true))
            .try_init()
            .context("failed to install JSON tracing subscriber")?;
    } else {
        registry
            .with(fmt_layer.pretty())
            .try_init()
            .context("failed to install tracing subscriber")?;
    }

    tracing::info!(env = ?env, "Logging initialized");
    Ok(())
}
