use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, Select};
use tokio::task::JoinHandle;
use weather_now_core::{Config, LocationAcquirer, WeatherController, provider::lookup_from_config};

use crate::render::render_state;

const USE_MY_LOCATION: &str = "Use my location";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-now", version, about = "Current weather for a city or your location")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and pick the default city.
    Configure,

    /// List the selectable cities.
    Cities,

    /// Show weather for a city.
    Show {
        /// City name, e.g. "Londres" or "Montevideo".
        city: String,
    },

    /// Show weather for the current location, falling back to the default city.
    Here,

    /// Choose a city (or your location) interactively.
    Pick,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Cities => {
                let config = Config::load()?;
                let registry = config.city_registry()?;
                for city in registry.cities() {
                    let marker = if city == registry.default_city() { " (default)" } else { "" };
                    println!("{city}{marker}");
                }
                Ok(())
            }
            Command::Show { city } => {
                let (_, controller) = session()?;
                drive(&controller, |c| c.select_city(&city)).await
            }
            Command::Here => {
                let (config, controller) = session()?;
                let facts = config.location_facts();
                drive(&controller, |c| c.use_current_location(facts)).await
            }
            Command::Pick => {
                let (config, controller) = session()?;

                let mut options: Vec<String> = controller.cities().to_vec();
                options.push(USE_MY_LOCATION.to_string());
                let choice = Select::new("City:", options).prompt()?;

                if choice == USE_MY_LOCATION {
                    let facts = config.location_facts();
                    drive(&controller, |c| c.use_current_location(facts)).await
                } else {
                    drive(&controller, |c| c.select_city(&choice)).await
                }
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()?;
    config.set_api_key(api_key.trim().to_string());

    let cities = config.cities.clone();
    let start = cities.iter().position(|c| *c == config.default_city).unwrap_or(0);
    config.default_city = Select::new("Default city:", cities)
        .with_starting_cursor(start)
        .prompt()?;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn session() -> anyhow::Result<(Config, WeatherController)> {
    let config = Config::load()?;

    let lookup = lookup_from_config(&config)?;
    let provider = Arc::new(config.location_provider()?);
    let controller = WeatherController::new(
        lookup,
        LocationAcquirer::new(provider),
        config.city_registry()?,
    );

    Ok((config, controller))
}

/// Start one operation and print every state it publishes until it settles.
async fn drive<F>(controller: &WeatherController, start: F) -> anyhow::Result<()>
where
    F: FnOnce(&WeatherController) -> JoinHandle<()>,
{
    let mut sub = controller.state().subscribe();
    let mut handle = start(controller);

    loop {
        tokio::select! {
            Some(state) = sub.next() => println!("{}", render_state(&state)),
            res = &mut handle => {
                res.context("weather task failed")?;
                for state in sub.drain() {
                    println!("{}", render_state(&state));
                }
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                controller.shutdown();
                if let Err(e) = (&mut handle).await {
                    tracing::debug!(error = %e, "weather task ended during shutdown");
                }
                eprintln!("Cancelled.");
                break;
            }
        }
    }

    Ok(())
}
