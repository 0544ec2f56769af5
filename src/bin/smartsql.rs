use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use smartsql::api::AskClient;
use smartsql::auth::{AuthState, SessionProvider, StaticSessionProvider};
use smartsql::config::Config;
use smartsql::state::{ChatSession, ChatUpdate, Entry, Role, SubmitOutcome, ToolEntry};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const LOG_FILTER_ENV: &str = "SMARTSQL_LOG";

const EXAMPLE_QUERIES: [&str; 4] = [
    "Top 10 customers by total order value",
    "Monthly revenue for the past 12 months",
    "Best selling products this quarter",
    "Users who didn't place an order in the last 30 days",
];

#[derive(Parser)]
#[command(name = "smartsql", about = "Query your data in natural language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question and stream the answer.
    Ask {
        /// The question, in natural language.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Backend base URL.
        #[arg(long, value_name = "URL", env = "SMARTSQL_API_URL")]
        api_url: Option<String>,

        /// Bearer token for the current session.
        #[arg(
            long,
            value_name = "TOKEN",
            env = "SMARTSQL_ACCESS_TOKEN",
            hide_env_values = true
        )]
        token: Option<String>,

        /// Print the final transcript as JSON instead of streaming text.
        #[arg(long)]
        json: bool,
    },
    /// Print example questions.
    Examples,
    /// Show the current authentication state.
    Whoami,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Command::Examples => {
            for example in EXAMPLE_QUERIES {
                println!("{example}");
            }
            Ok(())
        }
        Command::Whoami => {
            let provider = StaticSessionProvider::from_config(&config);
            let state = AuthState::resolve(&provider).await;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
        Command::Ask {
            query,
            api_url,
            token,
            json,
        } => {
            if let Some(api_url) = api_url {
                config.api_url = api_url;
            }
            if let Some(token) = token {
                config.access_token = Some(token);
            }
            config.validate()?;
            ask(&config, query.join(" "), json).await
        }
    }
}

async fn ask(config: &Config, query: String, json: bool) -> Result<()> {
    let provider: Arc<dyn SessionProvider> = Arc::new(StaticSessionProvider::from_config(config));
    if !AuthState::resolve(provider.as_ref()).await.is_authenticated() {
        tracing::warn!("no session; set SMARTSQL_ACCESS_TOKEN or pass --token");
    }

    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let mut session = ChatSession::new(Arc::new(AskClient::new(config)), provider)
        .with_updates(update_tx);
    let renderer = tokio::spawn(render_updates(update_rx, json));

    session.set_input(query);
    let result = session.submit().await;
    let transcript = session.transcript().clone();
    drop(session);
    renderer.await.context("update renderer panicked")?;

    match result? {
        SubmitOutcome::Completed(summary) => {
            tracing::debug!(
                events = summary.events_decoded,
                parse_failures = summary.parse_failures,
                "answer complete"
            );
        }
        SubmitOutcome::Ignored(reason) => {
            tracing::warn!(?reason, "query not sent");
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
    }
    Ok(())
}

async fn render_updates(mut update_rx: mpsc::UnboundedReceiver<ChatUpdate>, quiet: bool) {
    let mut stdout = std::io::stdout();
    while let Some(update) = update_rx.recv().await {
        match update {
            ChatUpdate::Toast(message) => eprintln!("{message}"),
            _ if quiet => {}
            ChatUpdate::EntryAppended {
                entry: Entry::Message(message),
                ..
            } if message.role == Role::Assistant => print!("{}", message.content),
            ChatUpdate::EntryAppended {
                entry: Entry::Tool(tool),
                ..
            } => println!("\n{}", render_tool_start(&tool)),
            ChatUpdate::EntryUpdated {
                entry: Entry::Tool(tool),
                ..
            } => println!("{}", render_tool_output(&tool)),
            ChatUpdate::TokenDelta { delta, .. } => print!("{delta}"),
            ChatUpdate::Loading(true) => eprintln!("…"),
            ChatUpdate::Streaming(false) => println!(),
            _ => {}
        }
        let _ = stdout.flush();
    }
}

fn render_tool_start(tool: &ToolEntry) -> String {
    format!("🛠️ Tool: {}\nInput:\n{}", tool.tool, pretty_json(&tool.input))
}

fn render_tool_output(tool: &ToolEntry) -> String {
    match &tool.output {
        Some(Value::String(text)) => format!("Output ({}):\n{text}", tool.tool),
        Some(output) => format!("Output ({}):\n{}", tool.tool, pretty_json(output)),
        None => format!("Output ({}): <none>", tool.tool),
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
