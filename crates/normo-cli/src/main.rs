//! normo - terminal client for the Austrian building-law assistant

mod commands;
mod config;
mod utils;

use anyhow::Context;
use clap::Parser;
use normo_api::{GatewayConfig, HttpGateway, LegacyExchange};
use normo_session::{
    ConversationState, Delivery, FileSessionStore, MemorySessionStore, SessionEvent,
    SessionManager, SessionStore,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::commands::CommandResult;
use crate::utils::short_id;

/// Number of turns replayed when a conversation is opened
const HISTORY_TURNS: usize = 10;

/// normo - ask questions about Austrian building law
#[derive(Parser, Debug)]
#[command(name = "normo")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gateway URL (default: $NORMO_API_URL, config file, then http://localhost:8000)
    #[arg(long)]
    api_url: Option<String>,

    /// User the conversations belong to
    #[arg(short, long)]
    user_id: Option<String>,

    /// Ask a single question and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Continue the conversation with this id
    #[arg(long, conflicts_with = "new")]
    conversation: Option<String>,

    /// Start a new conversation instead of resuming the last one
    #[arg(long)]
    new: bool,

    /// List conversations and exit
    #[arg(long)]
    list: bool,

    /// Check that the gateway is reachable and exit
    #[arg(long)]
    health: bool,

    /// Send the question (-c) through the legacy endpoint
    #[arg(long, requires = "command")]
    legacy: bool,

    /// Do not remember the active conversation between runs
    #[arg(long)]
    ephemeral: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("normo=debug")
            .with_writer(io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    // Merge config with CLI args (CLI takes precedence)
    let gateway_config = GatewayConfig::new(cfg.api_url(args.api_url.clone()))
        .with_user_id(args.user_id.clone().or(cfg.user_id.clone()))
        .with_timeout(cfg.request_timeout());
    let gateway = Arc::new(HttpGateway::new(gateway_config).context("Invalid gateway settings")?);
    tracing::debug!("Using gateway {}", gateway.base_url());

    if args.health {
        return check_health(&gateway).await;
    }

    if args.legacy {
        if let Some(question) = args.command.as_deref() {
            return run_legacy(&gateway, question).await;
        }
    }

    let store: Arc<dyn SessionStore> = if args.ephemeral {
        Arc::new(MemorySessionStore::new())
    } else {
        let path = cfg.state_file().unwrap_or_else(FileSessionStore::default_path);
        tracing::debug!("Session store at {}", path.display());
        Arc::new(FileSessionStore::new(path))
    };
    let manager = SessionManager::new(gateway.clone(), store);

    if args.list {
        manager.load_conversations().await;
        let mut state = manager.snapshot();
        state.current_conversation_id = manager.persisted_conversation_id();
        println!("{}", commands::ListCommand::render(&state, chrono::Utc::now()));
        return Ok(());
    }

    // Non-interactive mode
    if let Some(question) = args.command.as_deref() {
        return run_command(&manager, &args, question).await;
    }

    run_interactive(&manager, &gateway, &cfg, &args).await
}

async fn check_health(gateway: &HttpGateway) -> anyhow::Result<()> {
    match gateway.check_health().await {
        Ok(health) => {
            println!("{}: {}", gateway.base_url(), health.status);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} is not reachable: {}", gateway.base_url(), e);
            std::process::exit(1);
        }
    }
}

async fn run_legacy(gateway: &HttpGateway, question: &str) -> anyhow::Result<()> {
    let exchange = gateway
        .send_legacy(question)
        .await
        .context("Legacy request failed")?;
    print_legacy(&exchange);
    Ok(())
}

fn print_legacy(exchange: &LegacyExchange) {
    println!("{}", exchange.summary.trim());
    if !exchange.source_citations.is_empty() {
        println!();
        for (i, citation) in exchange.source_citations.iter().enumerate() {
            print!("{}", commands::format_citation(i + 1, citation));
        }
    }
}

/// Pick the conversation a session starts in: a new one, an explicit one, or
/// (when `resume` is set) the one left by the previous run.
async fn open_conversation(
    manager: &SessionManager,
    args: &Args,
    resume: bool,
) -> anyhow::Result<()> {
    if args.new {
        manager.create_new_conversation().await?;
    } else if let Some(id) = args.conversation.as_deref() {
        manager.switch_to_conversation(id).await?;
    } else if resume {
        if let Some(id) = manager.persisted_conversation_id() {
            manager.switch_to_conversation(&id).await?;
        }
    }
    Ok(())
}

async fn run_command(manager: &SessionManager, args: &Args, question: &str) -> anyhow::Result<()> {
    open_conversation(manager, args, true).await?;

    if let Err(e) = manager.send_message(question).await {
        if let Some(hint) = failure_hint(&e) {
            eprintln!("{}", hint);
        }
        anyhow::bail!("{}: {}", e, e.gateway_error());
    }

    let state = manager.snapshot();
    if let Some(answer) = state.last_assistant_message() {
        println!("{}", answer.content.trim());
        if !answer.citations().is_empty() {
            println!();
            for (i, citation) in answer.citations().iter().enumerate() {
                print!("{}", commands::format_citation(i + 1, citation));
            }
        }
    }
    if let Some(id) = &state.current_conversation_id {
        eprintln!("\n[conversation {}]", id);
    }
    Ok(())
}

async fn run_interactive(
    manager: &SessionManager,
    gateway: &HttpGateway,
    cfg: &config::Config,
    args: &Args,
) -> anyhow::Result<()> {
    let mut events = manager.subscribe();

    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("normo ({}) - /help for commands", gateway.base_url());
        eprintln!();
    }

    if args.new || args.conversation.is_some() {
        manager.load_conversations().await;
        if let Err(e) = open_conversation(manager, args, false).await {
            tracing::debug!("Opening conversation failed: {}", e);
        }
    } else {
        manager.start().await;
    }
    drain_events(&mut events);
    print_history(&manager.snapshot());

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Handle slash commands
        if let Some(result) = commands::execute_command(input, &manager.snapshot()) {
            match result {
                CommandResult::NewConversation => {
                    if let Err(e) = manager.create_new_conversation().await {
                        report_failure(&e);
                    }
                }
                CommandResult::ListConversations => {
                    manager.load_conversations().await;
                    println!(
                        "{}",
                        commands::ListCommand::render(&manager.snapshot(), chrono::Utc::now())
                    );
                }
                CommandResult::SwitchConversation(id) => {
                    match manager.switch_to_conversation(&id).await {
                        Ok(Delivery::Applied) => {
                            drain_events(&mut events);
                            print_history(&manager.snapshot());
                        }
                        Ok(_) => {}
                        Err(e) => report_failure(&e),
                    }
                }
                CommandResult::Clear => manager.clear_current_conversation(),
                CommandResult::DownloadPdf(pdf_name) => {
                    match download_pdf(gateway, &pdf_name, &cfg.download_dir()).await {
                        Ok(path) => {
                            println!("Saved {}", path.display());
                            println!("Online: {}", gateway.pdf_url(&pdf_name));
                        }
                        Err(e) => eprintln!("Error: {:#}", e),
                    }
                }
                CommandResult::Health => match gateway.check_health().await {
                    Ok(health) => println!("{}: {}", gateway.base_url(), health.status),
                    Err(e) => eprintln!("Error: {} is not reachable: {}", gateway.base_url(), e),
                },
                CommandResult::Legacy(question) => match gateway.send_legacy(&question).await {
                    Ok(exchange) => print_legacy(&exchange),
                    Err(e) => eprintln!("Error: Legacy request failed: {}", e),
                },
                CommandResult::Message(msg) => println!("{}", msg),
                CommandResult::Exit => break,
                CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}. Type /help for available commands.", cmd);
                }
            }
            drain_events(&mut events);
            println!();
            continue;
        }

        let sent = manager.send_message(input).await;
        drain_events(&mut events);
        if let Err(e) = sent {
            report_failure(&e);
        }
        println!();
    }

    Ok(())
}

/// Follow-up advice for a failed session operation, based on the gateway error
fn failure_hint(err: &normo_session::Error) -> Option<&'static str> {
    let cause = err.gateway_error();
    if cause.is_not_found() {
        Some("The conversation no longer exists. Use /list to see the current ones.")
    } else if cause.is_retryable() {
        Some("The gateway is unreachable or busy. Try again in a moment (/health checks it).")
    } else {
        None
    }
}

/// The event stream already carries the user-facing message; add the cause and a hint
fn report_failure(err: &normo_session::Error) {
    tracing::debug!("{}: {}", err, err.gateway_error());
    if let Some(hint) = failure_hint(err) {
        eprintln!("{}", hint);
    }
}

/// Print every event emitted since the last drain
fn drain_events(events: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => render_event(&event),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!("Skipped {} session events", skipped);
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

fn render_event(event: &SessionEvent) {
    match event {
        SessionEvent::MessageAppended { message } if message.is_assistant() => {
            println!("\n{}", message.content.trim());
            let sources = message.citations().len();
            if sources > 0 {
                println!("\n[{} source(s) - /sources to show, /pdf <n> to download]", sources);
            }
        }
        SessionEvent::ConversationCreated { conversation_id } => {
            println!("Started conversation {}", short_id(conversation_id));
        }
        SessionEvent::ConversationLoaded {
            conversation_id,
            message_count,
        } => {
            println!(
                "Opened conversation {} ({} messages)",
                short_id(conversation_id),
                message_count
            );
        }
        SessionEvent::ConversationAdopted { conversation_id } => {
            println!("[conversation {}]", short_id(conversation_id));
        }
        SessionEvent::ConversationCleared => {
            println!("No active conversation. Your next question starts a new one.");
        }
        SessionEvent::Error { message } => eprintln!("Error: {}", message),
        SessionEvent::CompletionDiscarded { operation } => {
            tracing::debug!("Dropped stale {} result", operation);
        }
        _ => {}
    }
}

/// Replay the tail of the active conversation
fn print_history(state: &ConversationState) {
    if state.messages.is_empty() {
        return;
    }
    let skip = state.messages.len().saturating_sub(HISTORY_TURNS);
    if skip > 0 {
        println!("({} earlier messages)", skip);
    }
    for message in &state.messages[skip..] {
        let who = if message.is_user() { "you" } else { "normo" };
        println!(
            "{:>5}: {}",
            who,
            utils::truncate_chars(&message.content.replace('\n', " "), 200)
        );
    }
    println!();
}

async fn download_pdf(gateway: &HttpGateway, pdf_name: &str, dir: &Path) -> anyhow::Result<PathBuf> {
    let bytes = gateway
        .fetch_pdf(pdf_name)
        .await
        .with_context(|| format!("Failed to download {}", pdf_name))?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(pdf_file_name(pdf_name));
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Local file name for a cited document: its last path component, with a
/// `.pdf` extension
fn pdf_file_name(pdf_name: &str) -> String {
    let base = pdf_name
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty())
        .unwrap_or("document");
    if base.to_ascii_lowercase().ends_with(".pdf") {
        base.to_string()
    } else {
        format!("{}.pdf", base)
    }
}
