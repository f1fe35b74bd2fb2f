//! Command-line interface.

mod bench;
mod intent;
mod probe;
#[cfg(feature = "server")]
mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use evicta::config::Config;

#[derive(Parser, Debug)]
#[command(name = "evicta", version, about = "Intent-aware response cache for LLM backends")]
pub struct Cli {
    /// Path to config.json (default: ~/.evicta/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP front door
    #[cfg(feature = "server")]
    Serve {
        /// Override the bind address
        #[arg(long)]
        bind: Option<String>,
        /// Override the port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run normalization, TTL and LRU probes against an isolated cache
    Probe,
    /// Show how a prompt is normalized and which intent it maps to
    Intent {
        /// Prompt to analyze
        prompt: String,
    },
    /// Time exact hits, intent hits and misses in-process
    Bench {
        /// Iterations per scenario
        #[arg(long, default_value_t = 10_000)]
        runs: u32,
    },
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if cli.log_json {
        config.logging.json = true;
    }
    init_tracing(config.logging.json);

    match cli.command {
        #[cfg(feature = "server")]
        Command::Serve { bind, port } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve::cmd_serve(config).await
        }
        Command::Probe => probe::cmd_probe(),
        Command::Intent { prompt } => intent::cmd_intent(&config, &prompt),
        Command::Bench { runs } => bench::cmd_bench(&config, runs),
    }
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays clean.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("evicta=info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_intent_command() {
        let cli = Cli::try_parse_from(["evicta", "intent", "what is recursion"]).unwrap();
        match cli.command {
            Command::Intent { prompt } => assert_eq!(prompt, "what is recursion"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "evicta",
            "bench",
            "--runs",
            "50",
            "--config",
            "/tmp/evicta.json",
            "--log-json",
        ])
        .unwrap();
        assert!(cli.log_json);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/evicta.json")));
        assert!(matches!(cli.command, Command::Bench { runs: 50 }));
    }

    #[cfg(feature = "server")]
    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["evicta", "serve", "--port", "9000"]).unwrap();
        match cli.command {
            Command::Serve { bind, port } => {
                assert!(bind.is_none());
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
