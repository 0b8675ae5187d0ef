//! # apiform CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! With no subcommand the server starts, so `apiform --port 9000` and
//! `apiform serve --port 9000` are equivalent.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use apiform_cli::openapi::{run_openapi, OpenApiArgs};
use apiform_cli::serve::{run_serve, ServeArgs};

/// Schema-validated greeting and review API.
#[derive(Parser, Debug)]
#[command(name = "apiform", version, about, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve(ServeArgs),

    /// Print the OpenAPI document.
    #[command(name = "openapi")]
    OpenApi(OpenApiArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `openapi` output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::OpenApi(args)) => run_openapi(&args, &mut std::io::stdout().lock()),
        Some(Commands::Serve(args)) => run_serve(&args).await,
        None => run_serve(&cli.serve).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiform_cli::openapi::Format;

    #[test]
    fn no_subcommand_defaults_to_serve_on_8888() {
        let cli = Cli::try_parse_from(["apiform"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.serve.port, 8888);
    }

    #[test]
    fn top_level_port_flag() {
        let cli = Cli::try_parse_from(["apiform", "-p", "9000"]).unwrap();
        assert_eq!(cli.serve.port, 9000);
    }

    #[test]
    fn serve_subcommand_port() {
        let cli = Cli::try_parse_from(["apiform", "serve", "--port", "7000"]).unwrap();
        match cli.command {
            Some(Commands::Serve(args)) => assert_eq!(args.port, 7000),
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn openapi_subcommand_defaults_to_yaml() {
        let cli = Cli::try_parse_from(["apiform", "openapi"]).unwrap();
        match cli.command {
            Some(Commands::OpenApi(args)) => assert_eq!(args.format, Format::Yaml),
            other => panic!("expected openapi, got {other:?}"),
        }
        let cli = Cli::try_parse_from(["apiform", "openapi", "--format", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::OpenApi(OpenApiArgs { format: Format::Json }))
        ));
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["apiform", "--port", "not-a-port"]).is_err());
    }
}
