use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode};
use raincheck_core::{
    Config, FileSelectionStore, SearchController, SearchState, WeatherApiClient,
};
use std::sync::Arc;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "raincheck", version, about = "Search a city and keep its weather at hand")]
pub struct Cli {
    /// WeatherAPI.com key; overrides the configured one.
    #[arg(long, global = true, env = "RAINCHECK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Print debug logs to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WeatherAPI.com key in the config file.
    Configure,

    /// Look up a city and optionally make it the selected city.
    Search {
        /// City name, at least 3 characters.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Save the result without asking.
        #[arg(short, long)]
        yes: bool,
    },

    /// Refresh and show the selected city.
    Show,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Search { query, yes } => {
                let config = Config::load()?;
                let controller = build_controller(&config, self.api_key)?;
                search(&controller, &query.join(" "), yes).await
            }
            Command::Show => {
                let config = Config::load()?;
                let controller = build_controller(&config, self.api_key)?;
                show(&controller).await
            }
        }
    }
}

fn build_controller(config: &Config, api_key: Option<String>) -> anyhow::Result<SearchController> {
    let client = WeatherApiClient::from_config(config, api_key)?;
    let store = FileSelectionStore::new(config.selection_file_path()?);
    tracing::debug!(path = %store.path().display(), "using selection file");

    Ok(SearchController::new(Arc::new(client), Arc::new(store)))
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("WeatherAPI.com API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(api_key.trim().to_string());
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn search(controller: &SearchController, query: &str, yes: bool) -> anyhow::Result<()> {
    controller.restore().await;

    if !controller.submit_query(query).await {
        bail!("Please enter at least 3 characters to search.");
    }

    let record = match controller.snapshot().state {
        SearchState::ResultsShown { mut records } if !records.is_empty() => records.remove(0),
        SearchState::ErrorShown { message } => bail!("{message}"),
        other => bail!("Search ended in an unexpected state: {other:?}"),
    };

    println!("{}", render::record(&record));

    let save = yes
        || Confirm::new(&format!("Save {} as your selected city?", record.name()))
            .with_default(true)
            .prompt()
            .context("Failed to read confirmation")?;

    if !save {
        controller.clear_query();
        return Ok(());
    }

    if controller.confirm_selection(record).await.is_err() {
        if let SearchState::Selected { notice: Some(message), .. }
        | SearchState::ErrorShown { message } = controller.snapshot().state
        {
            bail!("{message}");
        }
        bail!("Failed to save city");
    }

    println!("Saved.");
    Ok(())
}

async fn show(controller: &SearchController) -> anyhow::Result<()> {
    if let Some(refresh) = controller.start().await {
        refresh.await.context("Refresh task failed")?;
    }

    match controller.snapshot().state {
        SearchState::Selected { record, notice } => {
            if let Some(notice) = notice {
                eprintln!("{notice}\n\nShowing last saved values.\n");
            }
            println!("Selected City:\n\n{}", render::record(&record));
        }
        SearchState::ErrorShown { message } => bail!("{message}"),
        _ => println!("{}", render::placeholder()),
    }

    Ok(())
}
