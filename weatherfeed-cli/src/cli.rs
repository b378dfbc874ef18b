use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::CustomType;
use weatherfeed_core::{Config, Coordinates, WeatherFeed};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherfeed", version, about = "Live weather for a single site")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Site override shared by the fetching subcommands.
#[derive(Debug, Args)]
pub struct SiteArgs {
    /// Latitude in decimal degrees; defaults to the configured site.
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// Longitude in decimal degrees; defaults to the configured site.
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<f64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch current conditions once and print them.
    Show {
        #[command(flatten)]
        site: SiteArgs,
    },

    /// Keep polling and reprint whenever the feed changes. Stop with Ctrl-C.
    Watch {
        #[command(flatten)]
        site: SiteArgs,

        /// Seconds between refreshes; defaults to the configured interval.
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Set the default site. Prompts for any value not given as a flag.
    Configure {
        #[command(flatten)]
        site: SiteArgs,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;

        match self.command {
            Command::Show { site } => {
                site.apply(&mut config);
                show(&config).await
            }
            Command::Watch { site, interval_secs } => {
                site.apply(&mut config);
                if let Some(secs) = interval_secs {
                    config.refresh_interval_secs = secs;
                }
                watch(&config).await
            }
            Command::Configure { site } => configure(config, site),
        }
    }
}

impl SiteArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(latitude) = self.latitude {
            config.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            config.longitude = longitude;
        }
    }
}

async fn show(config: &Config) -> anyhow::Result<()> {
    let feed = WeatherFeed::from_config(config)?;
    let snapshot = feed.fetch_once().await.context("Unable to load weather")?;

    println!("{}", render::snapshot_report(feed.coordinates(), &snapshot));
    Ok(())
}

async fn watch(config: &Config) -> anyhow::Result<()> {
    let feed = WeatherFeed::from_config(config)?;
    let coordinates = feed.coordinates();
    let handle = feed.activate();
    let mut updates = handle.subscribe();

    loop {
        let report = render::state_report(coordinates, &updates.borrow_and_update());
        if let Some(report) = report {
            println!("{report}\n");
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    tracing::warn!("Weather feed stopped unexpectedly");
                    break;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    handle.deactivate().await;
    Ok(())
}

fn configure(mut config: Config, site: SiteArgs) -> anyhow::Result<()> {
    let latitude = match site.latitude {
        Some(value) => value,
        None => prompt_degrees("Latitude:", config.latitude)?,
    };
    let longitude = match site.longitude {
        Some(value) => value,
        None => prompt_degrees("Longitude:", config.longitude)?,
    };

    config.set_coordinates(Coordinates { latitude, longitude });
    config.coordinates()?;
    config.save()?;

    println!(
        "Saved site {latitude}, {longitude} to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

fn prompt_degrees(label: &str, current: f64) -> anyhow::Result<f64> {
    CustomType::<f64>::new(label)
        .with_default(current)
        .with_error_message("Please type a number in decimal degrees")
        .prompt()
        .context("Failed to read coordinate")
}
