// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatwire - a command-line client for realtime chat sessions.

mod shutdown;
mod tail;

use std::path::PathBuf;

use chatwire_config::ChatwireConfig;
use clap::{Parser, Subcommand};

/// Chatwire - talk to a realtime chat backend from the terminal.
#[derive(Parser, Debug)]
#[command(name = "chatwire", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Join a session and follow the conversation. Lines typed on stdin are sent.
    Tail(tail::TailArgs),
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Validate configuration and exit.
    Check,
    /// Print the effective configuration as TOML.
    Show,
}

fn load_config(path: Option<&PathBuf>) -> ChatwireConfig {
    let loaded = match path {
        Some(path) => chatwire_config::load_and_validate_path(path),
        None => chatwire_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            chatwire_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    match cli.command {
        Some(Commands::Tail(args)) => {
            if let Err(e) = tail::run_tail(config, args).await {
                eprintln!("chatwire: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config { action: ConfigAction::Check }) => {
            println!("chatwire: config ok (server.url={})", config.server.url);
        }
        Some(Commands::Config { action: ConfigAction::Show }) => match toml::to_string_pretty(&config) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("chatwire: failed to render config: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("chatwire: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_tail_options() {
        let cli = Cli::try_parse_from([
            "chatwire",
            "--config",
            "/tmp/chatwire.toml",
            "tail",
            "--session-id",
            "s-1",
            "--say",
            "hello",
            "--say",
            "again",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/chatwire.toml")));
        let Some(Commands::Tail(args)) = cli.command else {
            panic!("expected tail");
        };
        assert_eq!(args.session_id.as_deref(), Some("s-1"));
        assert_eq!(args.say, vec!["hello", "again"]);
    }

    #[test]
    fn cli_parses_config_show() {
        let cli = Cli::try_parse_from(["chatwire", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config { action: ConfigAction::Show })
        ));
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatwire.toml");
        std::fs::write(&path, "[server]\nurl = \"wss://chat.example.com/ws\"\n").unwrap();
        let config = load_config(Some(&path));
        assert_eq!(config.server.url, "wss://chat.example.com/ws");
    }

    #[test]
    fn default_config_renders_as_toml() {
        let rendered = toml::to_string_pretty(&ChatwireConfig::default()).unwrap();
        assert!(rendered.contains("[server]"));
        assert!(rendered.contains("throttle_ms = 1000"));
    }
}
