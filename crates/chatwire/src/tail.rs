// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatwire tail` command implementation.
//!
//! Joins a session over WebSocket, prints the conversation as it settles,
//! and turns stdin lines into messages, ask answers, or commands.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chatwire_client::{ChatClient, ChatState, ClientOptions, WsConnector, WsOptions};
use chatwire_config::ChatwireConfig;
use chatwire_core::{AskKind, ChatwireError, ConnectParams, ConnectionStatus, Message, SessionId};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::shutdown;

#[derive(Args, Debug)]
pub struct TailArgs {
    /// Session to join. Overrides `session.session_id`; random when neither is set.
    #[arg(long)]
    pub session_id: Option<String>,

    /// Bearer token. Overrides `session.auth_token`.
    #[arg(long)]
    pub token: Option<String>,

    /// Message to send once connected. Repeatable.
    #[arg(long)]
    pub say: Vec<String>,
}

/// Runs the `chatwire tail` command until stdin closes or a shutdown signal arrives.
pub async fn run_tail(config: ChatwireConfig, args: TailArgs) -> Result<(), ChatwireError> {
    init_tracing(&config.client.log_level);

    let connector = Arc::new(WsConnector::new(ws_options(&config)));
    let client = ChatClient::new(connector, client_options(&config));
    let params = connect_params(&config, &args);
    info!(session_id = %params.session_id, url = %config.server.url, "joining session");

    let cancel = shutdown::install_signal_handler();
    let mut state_rx = client.subscribe();
    let mut transcript = Transcript::default();
    let mut pending_says = args.say.into_iter();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    client.ensure_connected(params).await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                for line in transcript.render(&state) {
                    println!("{line}");
                }
                if state.status == ConnectionStatus::Connected {
                    for say in pending_says.by_ref() {
                        if let Err(e) = client.send_message(say).await {
                            warn!(error = %e, "failed to send message");
                        }
                    }
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !handle_input(&client, Input::parse(&line)).await {
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    stdin_open = false;
                }
            },
        }
    }

    client.shutdown().await;
    info!("session closed");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatwire={log_level},warn")));

    // Logs go to stderr so stdout carries only the conversation.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn ws_options(config: &ChatwireConfig) -> WsOptions {
    WsOptions {
        url: config.server.url.clone(),
        connect_timeout: Duration::from_secs(config.server.connect_timeout_secs),
        max_reconnect_attempts: config.server.max_reconnect_attempts,
    }
}

fn client_options(config: &ChatwireConfig) -> ClientOptions {
    ClientOptions {
        throttle: Duration::from_millis(config.session.throttle_ms),
        ack_timeout: Duration::from_secs(config.client.ack_timeout_secs),
        file_base_url: Some(config.server.resolved_file_base_url()),
        author: config.client.author.clone(),
    }
}

fn connect_params(config: &ChatwireConfig, args: &TailArgs) -> ConnectParams {
    let session_id = args
        .session_id
        .clone()
        .or_else(|| config.session.session_id.clone())
        .map(SessionId)
        .unwrap_or_else(SessionId::generate);
    let mut params = ConnectParams::new(session_id).with_env(config.session.env.clone());
    if let Some(token) = args.token.as_ref().or(config.session.auth_token.as_ref()) {
        params = params.with_auth_token(token.clone());
    }
    params
}

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Text(String),
    Files(Vec<PathBuf>),
    Action(String),
    Stop,
    Quit,
    Empty,
}

impl Input {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "/quit" => Self::Quit,
            "/stop" => Self::Stop,
            "/file" => Self::Files(rest.split_whitespace().map(PathBuf::from).collect()),
            "/action" => Self::Action(rest.trim().to_string()),
            _ => Self::Text(line.to_string()),
        }
    }
}

/// Returns `false` when the user asked to quit.
async fn handle_input(client: &ChatClient, input: Input) -> bool {
    let result = match input {
        Input::Quit => return false,
        Input::Empty => Ok(()),
        Input::Stop => client.stop_task().await,
        Input::Files(paths) => client.answer_files(&paths).await,
        Input::Action(name) => {
            let state = client.snapshot();
            match state.actions.iter().find(|a| a.name == name) {
                Some(action) => client.call_action(action).await.map(|ack| {
                    println!("< {name}: {ack}");
                }),
                None => {
                    eprintln!("chatwire: no action named `{name}`");
                    Ok(())
                }
            }
        }
        Input::Text(text) => {
            if client.snapshot().ask.is_some() {
                client.answer_text(text).await.map(|_| ())
            } else {
                client.send_message(text).await.map(|_| ())
            }
        }
    };
    if let Err(e) = result {
        eprintln!("chatwire: {e}");
    }
    true
}

/// Tracks what has been printed so each settled message appears once per change.
#[derive(Debug, Default)]
struct Transcript {
    generation: u64,
    printed: HashMap<String, String>,
    status: Option<ConnectionStatus>,
    asking: bool,
}

impl Transcript {
    fn render(&mut self, state: &ChatState) -> Vec<String> {
        let mut out = Vec::new();
        if self.status != Some(state.status) {
            self.status = Some(state.status);
            out.push(format!("-- {}", state.status));
        }
        if self.generation != state.generation {
            self.generation = state.generation;
            self.printed.clear();
        }
        self.render_messages(&state.messages, 0, state.loading, &mut out);

        let asking = state.ask.is_some();
        if asking && !self.asking {
            let hint = match state.ask.as_ref().map(|spec| spec.kind()) {
                Some(AskKind::File) => "answer with /file <path>...",
                _ => "answer with a line of text",
            };
            out.push(format!("?  {hint}"));
        }
        self.asking = asking;
        out
    }

    fn render_messages(&mut self, messages: &[Message], depth: usize, loading: bool, out: &mut Vec<String>) {
        for message in messages {
            let settled = !(loading && message.streaming);
            let changed = self.printed.get(&message.id) != Some(&message.content);
            if settled && changed {
                self.printed.insert(message.id.clone(), message.content.clone());
                out.push(format!(
                    "{}[{}] {}",
                    "  ".repeat(depth),
                    message.author,
                    message.content
                ));
            }
            self.render_messages(&message.steps, depth + 1, loading, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use chatwire_core::{AskSpec, TextAskSpec};

    use super::*;

    fn args(session_id: Option<&str>, token: Option<&str>) -> TailArgs {
        TailArgs {
            session_id: session_id.map(str::to_string),
            token: token.map(str::to_string),
            say: Vec::new(),
        }
    }

    #[test]
    fn parses_commands_and_text() {
        assert_eq!(Input::parse("  "), Input::Empty);
        assert_eq!(Input::parse("/quit"), Input::Quit);
        assert_eq!(Input::parse("/stop"), Input::Stop);
        assert_eq!(
            Input::parse("/file a.txt b.csv"),
            Input::Files(vec![PathBuf::from("a.txt"), PathBuf::from("b.csv")])
        );
        assert_eq!(Input::parse("/action approve"), Input::Action("approve".into()));
        assert_eq!(Input::parse("hello world"), Input::Text("hello world".into()));
    }

    #[test]
    fn cli_flags_override_config_session() {
        let mut config = ChatwireConfig::default();
        config.session.session_id = Some("from-config".into());
        config.session.auth_token = Some("config-token".into());
        config.session.env.insert("KEY".into(), "v".into());

        let params = connect_params(&config, &args(None, None));
        assert_eq!(params.session_id.0, "from-config");
        assert_eq!(params.auth_token.as_deref(), Some("config-token"));
        assert_eq!(params.env_json(), r#"{"KEY":"v"}"#);

        let params = connect_params(&config, &args(Some("cli"), Some("cli-token")));
        assert_eq!(params.session_id.0, "cli");
        assert_eq!(params.auth_token.as_deref(), Some("cli-token"));
    }

    #[test]
    fn missing_session_id_is_generated() {
        let params = connect_params(&ChatwireConfig::default(), &args(None, None));
        assert!(!params.session_id.0.is_empty());
        assert!(params.auth_token.is_none());
    }

    #[test]
    fn client_options_follow_config() {
        let mut config = ChatwireConfig::default();
        config.session.throttle_ms = 250;
        config.client.author = "ada".into();
        let options = client_options(&config);
        assert_eq!(options.throttle, Duration::from_millis(250));
        assert_eq!(options.ack_timeout, Duration::from_secs(30));
        assert_eq!(options.file_base_url.as_deref(), Some("http://127.0.0.1:8000"));
        assert_eq!(options.author, "ada");
    }

    #[test]
    fn transcript_prints_settled_messages_once() {
        let mut transcript = Transcript::default();
        let mut state = ChatState::default();
        state.status = ConnectionStatus::Connected;
        let mut streaming = Message::new("m1", "Assistant", "Hel");
        streaming.streaming = true;
        state.messages = Arc::new(vec![streaming.clone()]);
        state.loading = true;

        assert_eq!(transcript.render(&state), vec!["-- connected"]);

        streaming.content = "Hello".into();
        state.messages = Arc::new(vec![streaming]);
        state.loading = false;
        assert_eq!(transcript.render(&state), vec!["[Assistant] Hello"]);
        assert!(transcript.render(&state).is_empty());
    }

    #[test]
    fn transcript_announces_ask_and_indents_steps() {
        let mut transcript = Transcript::default();
        let mut state = ChatState::default();
        let mut parent = Message::new("p", "Assistant", "plan");
        parent.steps.push(Message::new("c", "Tool", "ran"));
        state.messages = Arc::new(vec![parent]);
        state.ask = Some(AskSpec::Text(TextAskSpec { timeout: 60 }));

        let lines = transcript.render(&state);
        assert_eq!(
            lines,
            vec![
                "-- closed",
                "[Assistant] plan",
                "  [Tool] ran",
                "?  answer with a line of text",
            ]
        );
        assert!(transcript.render(&state).is_empty());
    }
}
