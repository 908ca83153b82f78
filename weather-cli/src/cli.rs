use std::{num::NonZeroUsize, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use weather_core::{
    Config, HistoryStore, PreferenceStore, QueryOrchestrator, TemperatureUnit,
    config::DEFAULT_BASE_URL,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the OpenWeather API key, endpoint and request timeout.
    Configure,

    /// Show current weather for a city.
    Show {
        /// City name, e.g. "London" or "New York".
        #[arg(required = true, num_args = 1..)]
        city: Vec<String>,
    },

    /// List or edit recent searches.
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },

    /// Show or set the temperature unit; without an argument it toggles.
    Unit { unit: Option<UnitArg> },

    /// Prompt for cities until you quit.
    Interactive,
}

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    /// Print recent searches, newest first.
    List,
    /// Forget one city.
    Remove { city: String },
    /// Forget every search.
    Clear,
    /// Look up the entry with this number again (1 = newest).
    Search { number: NonZeroUsize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitArg {
    #[value(alias = "c")]
    Celsius,
    #[value(alias = "f")]
    Fahrenheit,
}

impl From<UnitArg> for TemperatureUnit {
    fn from(value: UnitArg) -> Self {
        match value {
            UnitArg::Celsius => TemperatureUnit::Celsius,
            UnitArg::Fahrenheit => TemperatureUnit::Fahrenheit,
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        tracing::debug!(data_dir = ?config.data_dir, "configuration loaded");

        match self.command {
            Command::Configure => configure(config, self.config.as_deref())?,
            Command::Show { city } => {
                let orch = QueryOrchestrator::from_config(&config)?;
                let model = orch.search(&city.join(" ")).await?;
                println!("{}", render::display(&model));
            }
            Command::History { action } => {
                history(&config, action.unwrap_or(HistoryAction::List)).await?
            }
            Command::Unit { unit } => {
                let mut prefs = PreferenceStore::load(config.preferences_path()?);
                let unit = unit.map_or_else(|| prefs.unit().toggled(), TemperatureUnit::from);
                prefs.set_use_celsius(unit.is_celsius())?;
                println!("Temperature unit: {unit}");
            }
            Command::Interactive => interactive(&config).await?,
        }

        Ok(())
    }
}

fn configure(mut config: Config, path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    config.set_api_key(api_key.trim().to_string());

    let base_url = Text::new("Weather API endpoint:")
        .with_default(config.base_url())
        .prompt()
        .context("Failed to read endpoint")?;
    config.base_url = base_url_override(&base_url);

    let timeout = Text::new("Request timeout in seconds:")
        .with_default(&config.request_timeout().as_secs().to_string())
        .prompt()
        .context("Failed to read timeout")?;
    config.timeout_secs = Some(
        timeout
            .trim()
            .parse()
            .with_context(|| format!("'{timeout}' is not a whole number of seconds"))?,
    );

    match path {
        Some(path) => config.save_to(path)?,
        None => config.save()?,
    }
    println!("Configuration saved.");
    Ok(())
}

/// `None` keeps the built-in OpenWeather endpoint.
fn base_url_override(input: &str) -> Option<String> {
    let url = input.trim();
    (!url.is_empty() && url != DEFAULT_BASE_URL).then(|| url.to_string())
}

async fn history(config: &Config, action: HistoryAction) -> anyhow::Result<()> {
    match action {
        HistoryAction::List => {
            let store = HistoryStore::load(config.history_path()?);
            println!("{}", render::history(store.entries()));
        }
        HistoryAction::Remove { city } => {
            let mut store = HistoryStore::load(config.history_path()?);
            if store.remove(&city)? {
                println!("Removed {city} from history.");
            } else {
                println!("{city} is not in the history.");
            }
        }
        HistoryAction::Clear => {
            HistoryStore::load(config.history_path()?).clear()?;
            println!("History cleared.");
        }
        HistoryAction::Search { number } => {
            let orch = QueryOrchestrator::from_config(config)?;
            let model = orch.search_from_history(number.get() - 1).await?;
            println!("{}", render::display(&model));
        }
    }
    Ok(())
}

/// One line typed at the interactive prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Search(&'a str),
    FromHistory(usize),
    ToggleUnit,
    ShowHistory,
    Remove(&'a str),
    Clear,
    Quit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    let Some(command) = line.strip_prefix(':') else {
        return Input::Search(line);
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(n, a)| (n, a.trim()));

    match name {
        "q" | "quit" | "exit" => Input::Quit,
        "u" | "unit" => Input::ToggleUnit,
        "h" | "history" => Input::ShowHistory,
        "clear" => Input::Clear,
        "rm" | "remove" if !arg.is_empty() => Input::Remove(arg),
        n => match n.parse::<usize>() {
            Ok(number) if number > 0 => Input::FromHistory(number - 1),
            _ => Input::Unknown(line),
        },
    }
}

const HELP: &str = "city name, :unit, :history, :<number>, :remove <city>, :clear, :quit";

async fn interactive(config: &Config) -> anyhow::Result<()> {
    let orch = QueryOrchestrator::from_config(config)?;
    let mut history_rx = orch.subscribe_history();
    println!("Temperature unit: {}", orch.unit());

    loop {
        let line = match Text::new("City:").with_help_message(HELP).prompt() {
            Ok(line) => line,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };

        let result = match parse_input(&line) {
            Input::Quit => break,
            Input::Search(city) => orch.search(city).await,
            Input::FromHistory(index) => orch.search_from_history(index).await,
            Input::ToggleUnit => {
                match orch.toggle_unit() {
                    Some(model) => println!("{}", render::display(&model)),
                    None => println!("Temperature unit: {}", orch.unit()),
                }
                continue;
            }
            Input::ShowHistory => {
                println!("{}", render::history(&history_rx.borrow_and_update()));
                continue;
            }
            Input::Remove(city) => {
                if !orch.remove_history(city) {
                    println!("{city} is not in the history.");
                }
                println!("{}", render::history(&history_rx.borrow_and_update()));
                continue;
            }
            Input::Clear => {
                orch.clear_history();
                println!("{}", render::history(&history_rx.borrow_and_update()));
                continue;
            }
            Input::Unknown(text) => {
                println!("Unknown command '{text}'. Try: {HELP}");
                continue;
            }
        };

        match result {
            Ok(model) => println!("{}", render::display(&model)),
            Err(err) if err.is_displayable() => println!("{}", render::error(&err.user_message())),
            Err(_) => {}
        }
    }

    Ok(())
}
