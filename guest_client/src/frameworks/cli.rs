// Line-oriented guest shell: one gate, driven sequentially from stdin.

use std::io::Result;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::domain::generation::GenerationRequest;
use crate::domain::ports::{Clock, GenerationService, KeyValueStore};
use crate::frameworks::config::ClientConfig;
use crate::interface_adapters::clients::GenerationClient;
use crate::interface_adapters::clock::SystemClock;
use crate::interface_adapters::stores::probe_store;
use crate::use_cases::gate::{GateOutcome, GateStatus, GenerationGate};

const HELP: &str = "commands: opener <profile text> | review <profile text> | status | sync | login <token> | quit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Opener(String),
    Review(String),
    Status,
    Sync,
    Login(String),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let needs_text = |what: &str| {
        if rest.is_empty() {
            Err(format!("{verb} needs {what}"))
        } else {
            Ok(rest.to_string())
        }
    };

    match verb.to_ascii_lowercase().as_str() {
        "opener" => needs_text("profile text").map(Command::Opener),
        "review" => needs_text("profile text").map(Command::Review),
        "login" => needs_text("an access token").map(Command::Login),
        "status" => Ok(Command::Status),
        "sync" => Ok(Command::Sync),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        "" => Err(HELP.to_string()),
        other => Err(format!("unknown command '{other}'; {HELP}")),
    }
}

fn init_runtime() {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // stdout belongs to the shell output.
    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run() -> Result<()> {
    init_runtime();

    let config = ClientConfig::load().map_err(|e| {
        tracing::error!(error = %e, "invalid client configuration");
        std::io::Error::other(e.to_string())
    })?;
    let client = GenerationClient::new(config.service_url.clone(), config.timeout)
        .map_err(|e| std::io::Error::other(format!("failed to initialize http client: {e}")))?;
    let store = probe_store(&config.storage_path);

    tracing::info!(
        service_url = %config.service_url,
        storage_path = %config.storage_path.display(),
        "guest client ready"
    );

    let mut gate = GenerationGate::new(store, SystemClock, client);
    let dispose = gate.dispose_handle();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout.write_all(format!("{HELP}\n").as_bytes()).await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                dispose.dispose();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(usage) => {
                stdout.write_all(format!("{usage}\n").as_bytes()).await?;
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        // Ctrl-C drops the in-flight request; quota is left as it was.
        let output = tokio::select! {
            output = execute(&mut gate, command) => output,
            _ = tokio::signal::ctrl_c() => {
                dispose.dispose();
                break;
            }
        };
        stdout.write_all(format!("{output}\n").as_bytes()).await?;
    }

    tracing::info!("guest client exiting");
    Ok(())
}

pub async fn execute<S, C, G>(gate: &mut GenerationGate<S, C, G>, command: Command) -> String
where
    S: KeyValueStore + Clone,
    C: Clock,
    G: GenerationService,
{
    match command {
        Command::Opener(text) => render_outcome(&gate.attempt(GenerationRequest::opener(text)).await),
        Command::Review(text) => {
            render_outcome(&gate.attempt(GenerationRequest::bio_review(text)).await)
        }
        Command::Status => render_status(&gate.refresh()),
        Command::Sync => match gate.refresh_from_server().await {
            Ok(Some(remaining)) => format!("server reports {remaining} guest run(s) left today"),
            Ok(None) => "signed in; no guest limits apply".to_string(),
            Err(err) => format!("could not reach the server ({err}); try again"),
        },
        Command::Login(token) => {
            gate.exit_guest_mode(token);
            "signed in; guest limits no longer apply".to_string()
        }
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    }
}

pub fn render_outcome(outcome: &GateOutcome) -> String {
    match outcome {
        GateOutcome::Generated { results, remaining } => {
            let mut lines: Vec<String> = results
                .iter()
                .enumerate()
                .map(|(index, item)| format!("{}. {item}", index + 1))
                .collect();
            if let Some(remaining) = remaining {
                lines.push(format!("({remaining} guest run(s) left today)"));
            }
            lines.join("\n")
        }
        GateOutcome::Blocked(prompt) => prompt.call_to_action(),
        GateOutcome::TransientFailure(err) => format!("generation failed ({err}); try again"),
        GateOutcome::Ignored => "request cancelled".to_string(),
    }
}

fn render_status(status: &GateStatus) -> String {
    if !status.guest {
        return "signed in; no guest limits apply".to_string();
    }

    let mut text = format!(
        "{} guest run(s) left today ({:?}, storage {:?})",
        status.remaining.unwrap_or(0),
        status.phase,
        status.storage_mode
    );
    if let Some(reset) = &status.reset_date_utc {
        text.push_str(&format!("; server resets after {reset} UTC"));
    }
    text
}
