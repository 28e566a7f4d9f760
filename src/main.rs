use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use folio_voice::config::Config;
use folio_voice::console::{ConsoleCapture, ConsoleSpeech, PageNavigator, TerminalThemeApplier};
use folio_voice::dispatcher::{Collaborators, VoiceDispatcher};
use folio_voice::intent::Transcript;
use folio_voice::render::{Renderer, Ui, UiEvent, swatch};
use folio_voice::responder::Responder;
use folio_voice::router::IntentRouter;
use folio_voice::speech::SpeechCapture;
use folio_voice::storage::{self, FileStore};
use folio_voice::theme::Theme;
use folio_voice::theme_store::ThemeStore;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "folio", about = "Voice assistant for a personal portfolio")]
struct Cli {
    /// Config file (defaults to ./config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Preference file holding the selected theme
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive assistant; typed lines stand in for speech (default)
    Voice,
    /// Classify one utterance and print the reply, without side effects
    Classify {
        /// Utterance text
        text: Vec<String>,
    },
    /// Inspect or change the theme preference
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Print the current theme
    Get,
    /// Select a theme (purple or yellow)
    Set { theme: Theme },
    /// Follow changes made by other processes
    Watch,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref());

    match cli.command.unwrap_or(Command::Voice) {
        Command::Classify { text } => classify(&config, &text.join(" ")),
        Command::Theme { action } => {
            let (ui, ui_rx) = Ui::new();
            let themes = open_themes(&config, cli.store, ui);
            match action.unwrap_or(ThemeAction::Get) {
                ThemeAction::Get => println!("{}", swatch(themes.get())),
                ThemeAction::Set { theme } => {
                    if !themes.set(theme) {
                        tracing::info!("Theme already {}", theme);
                    }
                    println!("{}", swatch(themes.get()));
                }
                ThemeAction::Watch => {
                    let _external = themes.watch_external();
                    watch_themes(ui_rx, quit_signal()?).await;
                }
            }
        }
        Command::Voice => {
            let (ui, ui_rx) = Ui::new();
            let themes = open_themes(&config, cli.store, ui.clone());
            let _external = themes.watch_external();
            run_voice(config, themes, ui, ui_rx, quit_signal()?).await;
        }
    }

    Ok(())
}

/// Ctrl+C, forwarded to whichever loop is running
fn quit_signal() -> Result<flume::Receiver<()>> {
    let (quit_tx, quit_rx) = flume::bounded(1);
    ctrlc::set_handler(move || {
        let _ = quit_tx.try_send(());
    })
    .context("Failed to install Ctrl+C handler")?;
    Ok(quit_rx)
}

fn open_themes(config: &Config, store: Option<PathBuf>, ui: Ui) -> Arc<ThemeStore> {
    let path = store
        .or_else(|| config.theme.store_path.clone())
        .unwrap_or_else(FileStore::default_path);

    ThemeStore::open(
        storage::open_or_memory(&path),
        config.theme.storage_key.clone(),
        Arc::new(TerminalThemeApplier::new(ui)),
    )
}

fn classify(config: &Config, text: &str) {
    let transcript = Transcript::new(text);
    let router = IntentRouter::new();
    let responder = Responder::new(config.portfolio.clone());

    let rule = router
        .matching_rule(&transcript)
        .map(|r| r.name)
        .unwrap_or("none");
    let intent = router.classify(&transcript);
    println!("{} (rule: {})", intent, rule);
    println!("{}", responder.respond(&intent));
}

async fn watch_themes(ui_rx: flume::Receiver<UiEvent>, quit_rx: flume::Receiver<()>) {
    let mut renderer = Renderer::new();
    println!("Watching theme changes. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            biased;

            _ = quit_rx.recv_async() => break,

            Ok(event) = ui_rx.recv_async() => renderer.handle(event),
        }
    }
}

async fn run_voice(
    config: Config,
    themes: Arc<ThemeStore>,
    ui: Ui,
    ui_rx: flume::Receiver<UiEvent>,
    quit_rx: flume::Receiver<()>,
) {
    let mut renderer = Renderer::new();

    let (capture, input) = ConsoleCapture::new();
    let capture: Option<Box<dyn SpeechCapture>> = if config.voice.enabled {
        Some(Box::new(capture))
    } else {
        None
    };

    let dispatcher = VoiceDispatcher::init(
        capture,
        Collaborators {
            output: Box::new(ConsoleSpeech::new()),
            navigator: Box::new(PageNavigator::new(config.page.sections.clone(), ui.clone())),
            themes,
            ui,
        },
        Responder::new(config.portfolio.clone()),
        config.voice.dispatcher_settings(),
    );

    let Some(dispatcher) = dispatcher else {
        for event in ui_rx.try_iter() {
            renderer.handle(event);
        }
        return;
    };

    let handle = dispatcher.handle();
    input.spawn(handle.clone());
    handle.start();

    let mut run = tokio::spawn(dispatcher.run());

    loop {
        tokio::select! {
            biased;

            _ = quit_rx.recv_async() => handle.shutdown(),

            Ok(event) = ui_rx.recv_async() => renderer.handle(event),

            result = &mut run => {
                if let Err(e) = result {
                    tracing::error!("Dispatcher task failed: {}", e);
                }
                break;
            }
        }
    }

    for event in ui_rx.try_iter() {
        renderer.handle(event);
    }
}
