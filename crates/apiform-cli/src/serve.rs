//! # Serve Subcommand
//!
//! Starts the HTTP server on the configured port.

use clap::Args;

use apiform_api::state::DEFAULT_PORT;
use apiform_api::{AppConfig, AppState};

/// Arguments for the serve subcommand.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ServeArgs {
    /// Port to listen on.
    #[arg(short, long, env = "SERVICE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl ServeArgs {
    pub fn config(&self) -> AppConfig {
        AppConfig { port: self.port }
    }
}

/// Build the registry and serve until shutdown.
pub async fn run_serve(args: &ServeArgs) -> anyhow::Result<()> {
    let registry = crate::registry()?;
    let state = AppState::new(registry);
    apiform_api::serve(&args.config(), state).await?;
    Ok(())
}
