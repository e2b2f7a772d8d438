use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use nutrilens::cli::{self, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "nutrilens")]
#[command(about = "Food image classification client with nutrition lookup")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the classes in the nutrition catalog
    Classes,
    /// Show nutrition details for a class
    Info {
        /// Class name as shown in the dropdown (e.g. "Fried Rice")
        class: String,
        /// Output format: text (default), html, json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Upload an image to the prediction backend and show the results
    Predict {
        /// Image file to classify
        #[arg(long)]
        file: Option<PathBuf>,
        /// Class the image is expected to show
        #[arg(long)]
        class: Option<String>,
        /// Model type to request (default: predict.default_model)
        #[arg(long)]
        model: Option<String>,
        /// Output format: text (default), html, json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Start the web dashboard
    Web {
        /// Listen address (default: web.addr)
        #[arg(long)]
        addr: Option<String>,
        /// Do not open a browser window
        #[arg(long)]
        no_open: bool,
    },
    /// Check configuration, backend and event log
    Health,
    /// Show or edit configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default config to ~/.nutrilens/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key (e.g. backend.url) in the global config
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Classes => cli::run_classes(),
        Commands::Info { class, format } => {
            cli::run_info(&class, OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Predict {
            file,
            class,
            model,
            format,
        } => cli::run_predict(
            file.as_deref(),
            class.as_deref(),
            model.as_deref(),
            OutputFormat::from_str_opt(Some(&format)),
        ),
        Commands::Web { addr, no_open } => cli::run_web(addr.as_deref(), no_open),
        Commands::Health => cli::run_health(),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
