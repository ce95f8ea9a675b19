//! Finboard CLI
//!
//! Command-line interface for the widget dashboard:
//! - Add, edit, remove and reorder widgets
//! - Explore the fields of an API response
//! - Refresh once, or watch widgets update live

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use finboard::config::generate_default_config;
use finboard::json::{preview, search, toggle_field};
use finboard::{
    Config, Dashboard, DisplayMode, LoggingConfig, RefreshEvent, RefreshOutcome, SelectedField,
};
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "finboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Terminal dashboard for JSON APIs")]
#[command(long_about = "Finboard polls JSON endpoints and shows the fields you pick from them.\nEach widget has its own URL, refresh interval and display mode.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: <config dir>/finboard/config.toml or ./finboard.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a widget
    Add {
        /// Widget name
        name: String,
        /// API URL
        url: String,
        /// Field to show, as `path` or `path=Label` (repeatable)
        #[arg(short, long = "field", required = true)]
        fields: Vec<String>,
        /// Refresh interval in seconds (minimum 5)
        #[arg(short, long)]
        interval: Option<u64>,
        /// Display mode (card, table, chart)
        #[arg(short, long, default_value = "card")]
        mode: DisplayMode,
    },

    /// Change a widget's configuration
    Edit {
        /// Widget id
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(short, long)]
        interval: Option<u64>,
        #[arg(short, long)]
        mode: Option<DisplayMode>,
        /// Replace the selected fields (`path` or `path=Label`, repeatable)
        #[arg(short, long = "field")]
        fields: Vec<String>,
        /// Select a path, or deselect it if already selected (repeatable)
        #[arg(short, long = "toggle")]
        toggle: Vec<String>,
    },

    /// Remove a widget
    Remove {
        /// Widget id
        id: String,
    },

    /// Move a widget to a new position
    Move {
        /// Widget id
        id: String,
        /// Target position (0-based)
        index: usize,
    },

    /// List widgets
    List,

    /// Fetch a URL once and list its fields
    Explore {
        /// API URL
        url: String,
        /// Only show paths containing this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Fetch widgets once and show them
    Refresh {
        /// Widget id (default: all widgets)
        id: Option<String>,
    },

    /// Refresh widgets on their intervals until Ctrl+C
    Watch,

    /// Print a default config file
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging)?;

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("Failed to write {:?}", path))?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let dashboard = Dashboard::open(&config).context("Failed to open dashboard")?;

    match cli.command {
        Commands::Add {
            name,
            url,
            fields,
            interval,
            mode,
        } => {
            let mut widget = dashboard.new_widget(name, url).display_mode(mode);
            if let Some(secs) = interval {
                widget = widget.refresh_interval(secs);
            }
            widget.selected_fields = typed_fields(&dashboard, &widget.api_url, &fields).await;

            let id = dashboard.add_widget(widget).await?;
            println!("Added widget {}", id);
        }

        Commands::Edit {
            id,
            name,
            url,
            interval,
            mode,
            fields,
            toggle,
        } => {
            let Some(existing) = dashboard.widget(&id).await else {
                bail!("Widget not found: {}", id);
            };

            let mut widget = existing.config;
            if let Some(name) = name {
                widget.name = name;
            }
            if let Some(url) = url {
                widget.api_url = url;
            }
            if let Some(secs) = interval {
                widget.refresh_interval = secs;
            }
            if let Some(mode) = mode {
                widget.display_mode = mode;
            }
            if !fields.is_empty() {
                widget.selected_fields = typed_fields(&dashboard, &widget.api_url, &fields).await;
            }
            for path in toggle {
                let selected = toggle_field(&mut widget.selected_fields, SelectedField::new(&path));
                println!("{} {}", if selected { "Selected" } else { "Deselected" }, path);
            }

            dashboard.update_widget(&id, widget).await?;
            println!("Updated widget {}", id);
        }

        Commands::Remove { id } => {
            let removed = dashboard.remove_widget(&id).await?;
            println!("Removed widget {} ({})", removed.id, removed.config.name);
        }

        Commands::Move { id, index } => {
            dashboard.move_widget(&id, index).await?;
            println!("Moved widget {} to position {}", id, index);
        }

        Commands::List => {
            let widgets = dashboard.widgets().await;
            if widgets.is_empty() {
                println!("No widgets yet.");
                println!();
                println!("Add your first widget with:");
                println!("  finboard add Bitcoin https://api.coinbase.com/v2/prices/BTC-USD/spot -f data.amount=Price");
                return Ok(());
            }

            println!(
                "{:<3} {:<36} {:<20} {:<6} {:>8}  {}",
                "#", "ID", "Name", "Mode", "Interval", "Fields"
            );
            println!("{}", "-".repeat(100));
            for (i, widget) in widgets.iter().enumerate() {
                let fields: Vec<&str> = widget
                    .config
                    .selected_fields
                    .iter()
                    .map(|f| f.path.as_str())
                    .collect();
                println!(
                    "{:<3} {:<36} {:<20} {:<6} {:>7}s  {}",
                    i,
                    widget.id,
                    widget.config.name,
                    widget.config.display_mode.to_string(),
                    widget.config.refresh_interval,
                    fields.join(", ")
                );
            }
        }

        Commands::Explore { url, search: term } => {
            let fields = dashboard.test_api(&url).await?;
            let shown = search(&fields, term.as_deref().unwrap_or(""));

            if shown.is_empty() {
                println!("No fields found.");
                return Ok(());
            }

            println!("{:<40} {:<10} {}", "Path", "Type", "Value");
            println!("{}", "-".repeat(100));
            for field in &shown {
                println!(
                    "{:<40} {:<10} {}",
                    field.path,
                    field.field_type,
                    preview(&field.value)
                );
            }
            println!();
            println!("{} of {} fields", shown.len(), fields.len());
        }

        Commands::Refresh { id } => {
            let outcomes = match id {
                Some(id) => vec![(id.clone(), dashboard.refresh(&id).await)],
                None => dashboard.refresh_all().await,
            };

            for (id, outcome) in outcomes {
                if outcome == RefreshOutcome::Removed {
                    eprintln!("Widget not found: {}", id);
                    continue;
                }
                if let Some(view) = dashboard.render(&id).await {
                    println!("{}", view);
                }
            }
        }

        Commands::Watch => watch(&dashboard).await,

        // Handled before the dashboard is opened
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Parse `path` / `path=Label` specs, tagging each with its type from a
/// sample fetch when the URL answers
async fn typed_fields(dashboard: &Dashboard, url: &str, specs: &[String]) -> Vec<SelectedField> {
    let sample = match dashboard.test_api(url).await {
        Ok(fields) => fields,
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Could not fetch sample, field types unknown");
            Vec::new()
        }
    };

    specs
        .iter()
        .map(|spec| {
            let mut field = match spec.split_once('=') {
                Some((path, label)) => SelectedField::new(path).label(label),
                None => SelectedField::new(spec.as_str()),
            };
            if let Some(found) = sample.iter().find(|f| f.path == field.path) {
                field.field_type = found.field_type.to_string();
            }
            field
        })
        .collect()
}

async fn watch(dashboard: &Dashboard) {
    let mut events = dashboard.subscribe();
    if dashboard.start().await == 0 {
        println!("No widgets to watch.");
        return;
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Ok(RefreshEvent::Fetching { .. }) => {}
                Ok(event) => {
                    if let Some(view) = dashboard.render(event.widget_id()).await {
                        println!("{}", view);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Display fell behind refresh events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    tracing::info!("Shutting down...");
    dashboard.stop().await;
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Set up tracing from the `[logging]` section; `RUST_LOG` takes precedence
fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("finboard={}", config.level)));

    let writer = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .init();
    }

    Ok(())
}
