use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{info, warn};

use singlish_chat::logging::{self, LogTarget};
use singlish_chat::{ChatBackend, ChatSession, Config, HttpGateway, Persona, Safety, PERSONAS};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "singlish-chat", version)]
#[command(about = "Chat with the multi-persona Singlish chatbot")]
struct Cli {
    /// Backend base URL, e.g. http://localhost:8000/api
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Persona to start with (singlish, xmm, ahbeng, nsf)
    #[arg(short, long, global = true)]
    persona: Option<Persona>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,
    /// Send one message and print the reply
    Ask {
        /// Your message
        message: String,
        /// Seconds to wait for the backend to come up before sending (0 to skip)
        #[arg(long, default_value = "10")]
        wait_ready: u64,
    },
    /// Check backend health and model status
    Status,
    /// List available personas
    Personas,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::new(), Some(e)),
    };
    let command = cli.command.unwrap_or(Commands::Chat);

    let target = match command {
        Commands::Chat => LogTarget::File(logging::default_log_path()?),
        _ => LogTarget::Stderr,
    };
    logging::init(target, config.log_level.as_deref())?;
    if let Some(e) = config_error {
        warn!(error = %e, "could not read config, using defaults");
    }

    let base_url = config.resolve_base_url(cli.api_url.as_deref());
    let persona = cli.persona.unwrap_or_else(|| config.persona());
    info!(%base_url, %persona, "starting");

    match command {
        Commands::Chat => run_chat(base_url, persona).await,
        Commands::Ask { message, wait_ready } => ask(&base_url, persona, &message, wait_ready).await,
        Commands::Status => status(&base_url).await,
        Commands::Personas => {
            list_personas(config.persona());
            Ok(())
        }
    }
}

async fn run_chat(base_url: String, persona: Persona) -> Result<()> {
    let gateway = Arc::new(HttpGateway::new(&base_url)?);
    let session = ChatSession::start(gateway, persona);
    let mut app = App::new(session, base_url);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(Duration::from_millis(300));

    let result = event_loop(&mut terminal, &mut app, &mut events).await;

    app.session.shutdown();
    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(app, event)?,
            Some(event) = app.session.next_event() => app.on_session_event(event),
            else => break,
        }
    }
    Ok(())
}

async fn ask(base_url: &str, persona: Persona, message: &str, wait_ready: u64) -> Result<()> {
    let gateway = Arc::new(HttpGateway::new(base_url)?);
    let mut session = ChatSession::start(gateway, persona);

    if wait_ready > 0 && !session.wait_until_ready(Duration::from_secs(wait_ready)).await {
        eprintln!(
            "{}",
            format!("⚠️  Backend not ready after {}s, sending anyway", wait_ready).yellow()
        );
    }

    if !session.send_message(message) {
        bail!("Nothing to send");
    }
    session.settle().await;

    let Some(reply) = session.messages().last().filter(|m| !m.is_user()).cloned() else {
        bail!("No reply received");
    };
    session.shutdown();

    if reply.is_error {
        bail!("{}", reply.content);
    }

    let label = format!("{} {}:", persona.info().icon, persona.display_name());
    println!("{}", label.bold().yellow());
    println!("{}", reply.content);
    match reply.safety {
        Some(Safety::Safe) => println!("\n{}", "[Safe]".green()),
        Some(Safety::Unsafe) => println!("\n{}", "[Unsafe]".red().bold()),
        Some(Safety::Unknown) | None => {}
    }

    Ok(())
}

async fn status(base_url: &str) -> Result<()> {
    let gateway = HttpGateway::new(base_url)?;

    println!("\n{}", "🤖 Chatbot Backend".bold().blue());
    println!("{}", "=".repeat(30).dimmed());
    println!("URL: {}", base_url.cyan());

    if let Err(e) = gateway.health_check().await {
        println!("Health: {} ({})", "unreachable".red(), e);
        println!("Make sure the backend is running: {}", "uvicorn app.main:app --port 8000".bold());
        return Ok(());
    }
    println!("Health: {}", "healthy".green());

    match gateway.model_status().await {
        Ok(model) => {
            println!("Model status: {}", model.status.green());
            if !model.model.is_null() {
                println!("{}", serde_json::to_string_pretty(&model.model)?);
            }
        }
        Err(e) => println!("Model status: {} ({})", "unavailable".yellow(), e),
    }

    Ok(())
}

fn list_personas(default: Persona) {
    println!("\n{}", "🎭 Available Personas".bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    for info in PERSONAS.iter() {
        let marker = if info.persona == default { "*" } else { " " };
        println!(
            "{} {} {:<10} {}",
            marker.green(),
            info.icon,
            info.id.bold(),
            info.description.dimmed()
        );
    }
}
