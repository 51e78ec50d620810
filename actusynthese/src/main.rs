/*
actusynthese - terminal front end
Streams a web-grounded news synthesis for a topic and renders it as it arrives.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::theme::{load_theme, save_theme};
use common::{Config, Theme};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use actusynthese::catalog::{self, CATEGORIES};
use actusynthese::llm::gemini::GeminiProvider;
use actusynthese::render::{Palette, Renderer};
use actusynthese::{SummaryController, SummaryState};

#[derive(Parser, Debug)]
#[command(name = "actusynthese", about = "ActuSynthèse: web-grounded news syntheses in your terminal")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a synthesis for a free-text topic or a catalog entry
    Summarize {
        /// Topic words, e.g. `Élections au Sénégal`
        topic: Vec<String>,

        /// Take the topic from this catalog category instead
        #[arg(long)]
        category: Option<String>,

        /// 1-based topic number within --category
        #[arg(long, default_value_t = 1)]
        pick: usize,
    },
    /// List the suggested categories and topics
    Categories,
    /// Show or change the light/dark preference
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },
}

#[derive(Subcommand, Debug)]
enum ThemeAction {
    Show,
    Toggle,
    Set { theme: Theme },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    // Logs go to stderr so they never interleave with the synthesis on stdout
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = load_config(args.config).await?;

    let theme_path = PathBuf::from(config.ui.theme_file());
    let theme = load_theme(&theme_path, Theme::system_default()).await?;

    match args.command {
        Command::Categories => {
            print_categories();
            Ok(ExitCode::SUCCESS)
        }
        Command::Theme { action } => {
            run_theme(action.unwrap_or(ThemeAction::Show), &theme_path, theme).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Summarize { topic, category, pick } => {
            let topic = resolve_topic(topic, category.as_deref(), pick)?;
            let succeeded = run_summarize(&config, theme, &topic).await?;
            Ok(if succeeded { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

/// Merge `config.default.toml` with `config.toml` (or `--config`, which must exist).
async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = match explicit {
        Some(p) if !p.exists() => {
            error!(path = ?p, "specified config file not found");
            anyhow::bail!("Config file not found: {}", p.display());
        }
        Some(p) => Some(p),
        None => Some(PathBuf::from("config.toml")).filter(|p| p.exists()),
    };

    let config = Config::load_with_defaults(Some(&default_path), override_path.as_deref())
        .await
        .context("failed to load configuration")?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");
    Ok(config)
}

fn resolve_topic(words: Vec<String>, category: Option<&str>, pick: usize) -> Result<String> {
    if let Some(id) = category {
        return catalog::topic(id, pick)
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Unknown category '{}' or topic #{}", id, pick));
    }
    let topic = words.join(" ");
    if topic.trim().is_empty() {
        anyhow::bail!("No topic given: pass one or use --category");
    }
    Ok(topic)
}

/// Run one request to completion. Returns whether it succeeded.
async fn run_summarize(config: &Config, theme: Theme, topic: &str) -> Result<bool> {
    let provider = GeminiProvider::from_config(&config.provider)?;
    info!(model = provider.model(), "provider initialized");

    let mut controller = SummaryController::new(Arc::new(provider)).with_idle_timeout(
        Duration::from_secs(config.provider.stream_idle_timeout_seconds()),
    );
    let mut renderer = Renderer::new(Palette::for_theme(theme));

    controller.submit(topic).context("Invalid topic")?;
    println!("{}\n", renderer.loading_line(controller.topic()));

    let mut stdout = std::io::stdout();
    loop {
        let update = tokio::select! {
            update = controller.next_update() => update,
            _ = tokio::signal::ctrl_c() => {
                controller.reset();
                println!("\nRecherche annulée.");
                return Ok(false);
            }
        };

        match update {
            Some(SummaryState::Streaming(snapshot)) => {
                print!("{}", renderer.text_delta(&snapshot));
                stdout.flush().context("failed to flush stdout")?;
            }
            Some(SummaryState::Success(result)) => {
                println!("{}\n", renderer.text_delta(&result));
                print!("{}", renderer.sources_block(&result.sources));
                return Ok(true);
            }
            Some(SummaryState::Error(message)) => {
                println!();
                eprintln!("{}", renderer.error_block(&message));
                return Ok(false);
            }
            Some(_) => {}
            None => return Ok(controller.state().result().is_some()),
        }
    }
}

async fn run_theme(action: ThemeAction, path: &Path, current: Theme) -> Result<()> {
    let next = match action {
        ThemeAction::Show => {
            println!("{}", current);
            return Ok(());
        }
        ThemeAction::Toggle => current.toggled(),
        ThemeAction::Set { theme } => theme,
    };
    save_theme(path, next).await?;
    info!(theme = %next, path = %path.display(), "theme preference saved");
    println!("{}", next);
    Ok(())
}

fn print_categories() {
    for category in CATEGORIES {
        println!("{} ({})", category.name, category.id);
        for (i, topic) in category.topics.iter().enumerate() {
            println!("  {}. {}", i + 1, topic);
        }
    }
}
