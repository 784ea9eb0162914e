//! `weather-cli`: current conditions and forecasts from OpenWeatherMap.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use toolbelt_client::weather::{Location, MAX_FORECAST_DAYS, Units, WeatherClient};
use toolbelt_core::output::Notice;
use toolbelt_core::{CacheDb, ToolConfig, ToolContext};

use super::{GlobalArgs, Output};

pub use toolbelt_client::weather::TOOL;

#[derive(Debug, Parser)]
#[command(name = "weather-cli", version, about = "Current weather and forecasts from OpenWeatherMap")]
pub struct WeatherCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: WeatherCommand,
}

#[derive(Debug, Subcommand)]
pub enum WeatherCommand {
    /// Show current conditions.
    Current(QueryArgs),

    /// Show a daily forecast.
    Forecast {
        #[command(flatten)]
        query: QueryArgs,

        /// Number of days (1-5).
        #[arg(
            short,
            long,
            default_value_t = 3,
            value_parser = clap::value_parser!(u8).range(1..=i64::from(MAX_FORECAST_DAYS))
        )]
        days: u8,
    },

    /// Set the API key or show the configuration.
    Config(ConfigArgs),

    /// Inspect or empty the response cache.
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Temperature units.
    #[arg(short, long, default_value = "metric")]
    pub units: Units,

    /// Skip the cache lookup and always call the API.
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct LocationArgs {
    /// City name, e.g. 'London' or 'London,GB'.
    #[arg(short, long)]
    pub city: Option<String>,

    /// Coordinates as LAT,LON, e.g. '51.5074,-0.1278'.
    #[arg(long, value_name = "LAT,LON", allow_hyphen_values = true)]
    pub coords: Option<String>,
}

impl LocationArgs {
    pub fn to_location(&self) -> Result<Location> {
        let location = match (&self.city, &self.coords) {
            (Some(city), _) => Location::city(city)?,
            (None, Some(coords)) => Location::parse_coords(coords)?,
            (None, None) => anyhow::bail!("provide --city or --coords"),
        };
        Ok(location)
    }
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct ConfigArgs {
    /// Save the OpenWeatherMap API key.
    #[arg(long, value_name = "API_KEY")]
    pub set_key: Option<String>,

    /// Show the effective configuration.
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Count cached entries.
    Stats,
    /// Remove every cached entry.
    Clear,
}

pub async fn run(ctx: &ToolContext, cli: WeatherCli, writer: &mut dyn Write) -> Result<()> {
    let mut out = Output::for_args(writer, &cli.global);
    run_with(ctx, cli.command, &mut out).await
}

/// Dispatch one command against `ctx`.
pub async fn run_with(ctx: &ToolContext, command: WeatherCommand, out: &mut Output<'_>) -> Result<()> {
    match command {
        WeatherCommand::Current(query) => {
            let location = query.location.to_location()?;
            let client = client(ctx).await?;
            let weather = client.current(&location, query.units, !query.no_cache).await?;
            out.emit(&weather)
        }
        WeatherCommand::Forecast { query, days } => {
            let location = query.location.to_location()?;
            let client = client(ctx).await?;
            let forecast = client.forecast(&location, days, query.units, !query.no_cache).await?;
            out.emit(&forecast)
        }
        WeatherCommand::Config(args) => {
            if let Some(key) = args.set_key {
                ToolConfig::save_api_key(ctx, &key)?;
                return out.emit(&Notice::ok(format!("API key saved to {}", ctx.config_path().display())));
            }
            let config = ToolConfig::load(ctx)?;
            out.emit(&config.summary(ctx))
        }
        WeatherCommand::Cache(CacheCommand::Stats) => {
            let cache = open_cache(ctx).await?;
            out.emit(&cache.stats().await?)
        }
        WeatherCommand::Cache(CacheCommand::Clear) => {
            let cache = open_cache(ctx).await?;
            let removed = cache.clear().await?;
            out.emit(&Notice::ok(format!("Cleared {removed} cache entries")))
        }
    }
}

async fn open_cache(ctx: &ToolContext) -> Result<CacheDb> {
    let config = ToolConfig::load(ctx)?;
    ctx.ensure_dir()?;
    Ok(CacheDb::open(ctx.cache_path(), config.cache_ttl()).await?)
}

/// Client with the on-disk cache attached; expired entries are purged first.
async fn client(ctx: &ToolContext) -> Result<WeatherClient> {
    let config = ToolConfig::load(ctx)?;
    let client = WeatherClient::from_config(&config)?;

    ctx.ensure_dir()?;
    let cache = CacheDb::open(ctx.cache_path(), config.cache_ttl()).await?;
    let purged = cache.purge_expired().await?;
    if purged > 0 {
        tracing::debug!(purged, "removed expired cache entries");
    }
    Ok(client.with_cache(Arc::new(cache)))
}
