#![deny(dead_code)] // DO NOT REMOVE THIS EVER
use anyhow::Result;
use clap::Parser;
use log::{debug, error, info, LevelFilter};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod ui;
mod utils;

use crate::ui::{ChatUI, UiIntent};
use nexuschat::ai::{AiReplyProvider, ReplyProvider};
use nexuschat::chat::EventReceiver;
use nexuschat::config::{self, AppConfig};
use nexuschat::{Conversations, Timing};

/// Command line arguments for NexusChat
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "NexusChat: a terminal chat client with simulated contacts and an AI assistant.",
    long_about = "NexusChat is a terminal chat client. Conversations with people are simulated \
    locally; the Nexus AI contact answers through the Gemini API.\n\n\
    The API key is read from GEMINI_API_KEY or API_KEY, then from the config file.\n\
    Use -h or --help to see all options."
)]
struct Args {
    /// Use this config file instead of the per-user one
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Where log lines are written
    #[arg(long, value_name = "PATH", default_value = "nexuschat.log")]
    log_file: PathBuf,

    /// Length of one simulated timer tick in milliseconds
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Store this Gemini API key in the config file
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

fn load_app_config(args: &Args) -> Result<AppConfig> {
    if let Some(ref path) = args.config {
        config::set_config_path_override(path.clone());
        info!("Config file overridden to: {}", path.display());
    }

    let mut app_config = config::load_config()?;

    if let Some(ref key) = args.api_key {
        app_config.set_api_key(key);
        if let Err(e) = config::save_config(&app_config) {
            eprintln!("Warning: Failed to save API key: {}", e);
            error!("Failed to save API key: {}", e);
        }
    }

    if let Some(tick_ms) = args.tick_ms {
        app_config.tick_ms = tick_ms;
    }

    Ok(app_config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { LevelFilter::Debug } else { LevelFilter::Info };
    utils::setup_logging(&args.log_file.to_string_lossy(), level)?;

    info!("NexusChat starting up");
    info!("System information: {} {}", std::env::consts::OS, std::env::consts::ARCH);
    info!("Logging to file: {}", args.log_file.display());

    let app_config = load_app_config(&args)?;
    let timing: Timing = app_config.timing();
    info!("Simulated tick is {:?}", timing.tick);

    let settings = app_config.gemini_settings();
    if settings.api_key.is_none() {
        info!("No Gemini API key configured, Nexus AI will report itself unavailable");
    }
    let provider: Arc<dyn ReplyProvider> = Arc::new(AiReplyProvider::gemini(settings, app_config.temperature));

    let (mut convo, mut event_rx) = Conversations::from_seed(provider, timing);

    let mut terminal = ui::setup_terminal()?;
    let mut chat_ui = ChatUI::new();

    let outcome = run_main_loop(&mut chat_ui, &mut terminal, &mut convo, &mut event_rx).await;

    ui::restore_terminal(terminal)?;

    if let Err(ref e) = outcome {
        error!("Main loop failed: {}", e);
    }
    info!("NexusChat shutting down");
    outcome
}

/// Park the composer text on the conversation being left.
fn stash_draft(chat_ui: &ChatUI, convo: &mut Conversations) {
    if let Some(id) = convo.active_contact_id().map(str::to_string) {
        convo.set_draft(&id, chat_ui.composer_text());
    }
}

async fn run_main_loop(
    chat_ui: &mut ChatUI,
    terminal: &mut ui::Terminal<ui::CrosstermBackend<io::Stdout>>,
    convo: &mut Conversations,
    event_rx: &mut EventReceiver,
) -> Result<()> {
    loop {
        terminal.draw(|f| chat_ui.draw(f, convo))?;

        match chat_ui.handle_input(convo)? {
            Some(UiIntent::Quit) => break,
            Some(UiIntent::Select(id)) => {
                stash_draft(chat_ui, convo);
                convo.select_contact(&id);
                chat_ui.open_conversation(convo.draft(&id));
            }
            Some(UiIntent::Back) => {
                stash_draft(chat_ui, convo);
                convo.clear_active();
                chat_ui.close_conversation();
            }
            Some(UiIntent::Send(text)) => {
                if let Some(message) = convo.send_outbound(&text) {
                    debug!("Queued outbound message {}", message.id);
                }
                if let Some(id) = convo.active_contact_id().map(str::to_string) {
                    convo.set_draft(&id, "");
                }
            }
            None => {}
        }

        // Apply whatever the timers produced since the last frame
        while let Ok(event) = event_rx.try_recv() {
            debug!("Applying chat event {:?}", event);
            convo.apply(event);
        }

        // Give spawned timers a chance to run between frames
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    Ok(())
}
