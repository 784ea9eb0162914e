//! OpenWeatherMap response types and summarisation.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use toolbelt_core::output::{Panel, Render, Style, Table};

use super::request::Units;

const COMPASS: [&str; 16] =
    ["N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW", "NNW"];

/// Raw `/weather` response.
#[derive(Debug, Deserialize)]
pub struct OwmCurrent {
    pub name: String,
    pub coord: OwmCoord,
    #[serde(default)]
    pub weather: Vec<OwmCondition>,
    pub main: OwmMain,
    #[serde(default)]
    pub visibility: Option<u32>,
    #[serde(default)]
    pub wind: OwmWind,
    #[serde(default)]
    pub clouds: OwmClouds,
    pub dt: i64,
    #[serde(default)]
    pub sys: OwmSys,
}

/// Raw `/forecast` response (3-hour slots).
#[derive(Debug, Deserialize)]
pub struct OwmForecast {
    pub list: Vec<OwmSlot>,
    pub city: OwmCity,
}

#[derive(Debug, Deserialize)]
pub struct OwmSlot {
    pub dt: i64,
    pub main: OwmMain,
    #[serde(default)]
    pub weather: Vec<OwmCondition>,
    #[serde(default)]
    pub wind: OwmWind,
}

#[derive(Debug, Deserialize)]
pub struct OwmCity {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    pub coord: OwmCoord,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OwmCoord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct OwmCondition {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct OwmMain {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct OwmWind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OwmClouds {
    #[serde(default)]
    pub all: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct OwmSys {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
}

/// A result plus whether it was served from the local cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fetched<T> {
    #[serde(flatten)]
    pub data: T,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    pub name: String,
    pub country: Option<String>,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitLabels {
    pub temperature: String,
    pub wind: String,
}

impl From<Units> for UnitLabels {
    fn from(units: Units) -> Self {
        Self { temperature: units.temperature_symbol().to_string(), wind: units.wind_symbol().to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wind {
    pub speed: f64,
    pub direction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conditions {
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub condition: String,
    pub humidity: u32,
    pub pressure: u32,
    pub wind: Wind,
    pub clouds: u32,
    pub visibility: Option<u32>,
    pub timestamp: DateTime<Utc>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

/// Summary of the current conditions at one place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentWeather {
    pub location: Place,
    pub current: Conditions,
    pub units: UnitLabels,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Aggregate of one calendar day (UTC) of 3-hour slots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temperature: TemperatureRange,
    pub condition: String,
    pub humidity: u32,
    pub wind: Wind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Forecast {
    pub location: Place,
    pub forecast: Vec<DailyForecast>,
    pub units: UnitLabels,
}

/// 16-point compass direction for a bearing in degrees.
pub fn compass_direction(degrees: f64) -> &'static str {
    let index = (degrees / 22.5).round() as i64;
    COMPASS[index.rem_euclid(16) as usize]
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

fn condition_of(conditions: &[OwmCondition]) -> &str {
    conditions.first().map(|c| c.description.as_str()).unwrap_or("unknown")
}

impl CurrentWeather {
    pub fn from_raw(raw: OwmCurrent, units: Units) -> Self {
        let main = &raw.main;
        Self {
            location: Place {
                name: raw.name.clone(),
                country: raw.sys.country.clone(),
                coordinates: Coordinates { lat: raw.coord.lat, lon: raw.coord.lon },
            },
            current: Conditions {
                temperature: round1(main.temp),
                feels_like: round1(main.feels_like),
                temp_min: round1(main.temp_min),
                temp_max: round1(main.temp_max),
                condition: capitalize(condition_of(&raw.weather)),
                humidity: main.humidity.round() as u32,
                pressure: main.pressure.round() as u32,
                wind: Wind {
                    speed: round1(raw.wind.speed),
                    direction: compass_direction(raw.wind.deg.unwrap_or(0.0)).to_string(),
                },
                clouds: raw.clouds.all,
                visibility: raw.visibility,
                timestamp: timestamp(raw.dt).unwrap_or_default(),
                sunrise: raw.sys.sunrise.and_then(timestamp),
                sunset: raw.sys.sunset.and_then(timestamp),
            },
            units: units.into(),
        }
    }
}

impl Forecast {
    /// Group 3-hour slots by UTC day and keep the first `days` days.
    pub fn from_raw(raw: OwmForecast, units: Units, days: u8) -> Self {
        let mut by_day: BTreeMap<NaiveDate, Vec<&OwmSlot>> = BTreeMap::new();
        for slot in &raw.list {
            if let Some(at) = timestamp(slot.dt) {
                by_day.entry(at.date_naive()).or_default().push(slot);
            }
        }

        let forecast = by_day
            .into_iter()
            .take(usize::from(days))
            .map(|(date, slots)| summarize_day(date, &slots))
            .collect();

        Self {
            location: Place {
                name: raw.city.name,
                country: raw.city.country,
                coordinates: Coordinates { lat: raw.city.coord.lat, lon: raw.city.coord.lon },
            },
            forecast,
            units: units.into(),
        }
    }
}

fn summarize_day(date: NaiveDate, slots: &[&OwmSlot]) -> DailyForecast {
    let count = slots.len().max(1) as f64;
    let temps: Vec<f64> = slots.iter().map(|s| s.main.temp).collect();
    let min = temps.iter().copied().fold(f64::INFINITY, f64::min);
    let max = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = temps.iter().sum::<f64>() / count;

    // Most frequent description; ties go to the one seen first.
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for slot in slots {
        let description = condition_of(&slot.weather);
        match tally.iter_mut().find(|(d, _)| *d == description) {
            Some((_, n)) => *n += 1,
            None => tally.push((description, 1)),
        }
    }
    let condition = tally
        .iter()
        .fold(None::<(&str, usize)>, |best, &(d, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((d, n)),
        })
        .map(|(d, _)| d)
        .unwrap_or("unknown");

    DailyForecast {
        date,
        temperature: TemperatureRange { min: round1(min), max: round1(max), avg: round1(avg) },
        condition: capitalize(condition),
        humidity: (slots.iter().map(|s| s.main.humidity).sum::<f64>() / count).round() as u32,
        wind: Wind {
            speed: round1(slots.iter().map(|s| s.wind.speed).sum::<f64>() / count),
            direction: compass_direction(slots.first().and_then(|s| s.wind.deg).unwrap_or(0.0)).to_string(),
        },
    }
}

fn place_label(place: &Place) -> String {
    match &place.country {
        Some(country) => format!("{}, {}", place.name, country),
        None => place.name.clone(),
    }
}

impl Render for Fetched<CurrentWeather> {
    fn render(&self, style: &Style) -> String {
        let CurrentWeather { location, current: c, units } = &self.data;
        let t = &units.temperature;

        let mut panel = Panel::new(format!("Current Weather for {}", place_label(location)))
            .field("Temperature", format!("{}{t} (feels like {}{t})", c.temperature, c.feels_like))
            .field("Min/Max", format!("{}{t} / {}{t}", c.temp_min, c.temp_max))
            .field("Condition", c.condition.clone())
            .field("Humidity", format!("{}%", c.humidity))
            .field("Wind", format!("{} {} {}", c.wind.speed, units.wind, c.wind.direction))
            .field("Pressure", format!("{} hPa", c.pressure))
            .field("Clouds", format!("{}%", c.clouds));

        if let Some(visibility) = c.visibility {
            panel = panel.field("Visibility", format!("{visibility} m"));
        }
        if let (Some(sunrise), Some(sunset)) = (c.sunrise, c.sunset) {
            panel = panel.field("Sunrise/Sunset", format!("{} / {}", sunrise.format("%H:%M"), sunset.format("%H:%M")));
        }
        panel = panel.blank().text(style.dim(&format!("Updated: {}", c.timestamp.format("%Y-%m-%d %H:%M UTC"))));

        if self.from_cache {
            panel = panel.footer("(from cache)");
        }
        panel.render(style)
    }
}

impl Render for Fetched<Forecast> {
    fn render(&self, style: &Style) -> String {
        let Forecast { location, forecast, units } = &self.data;
        let t = &units.temperature;

        let mut table = Table::new(["Date", "Temperature", "Condition", "Humidity", "Wind"])
            .title(format!("Weather Forecast for {}", place_label(location)));
        if self.from_cache {
            table = table.caption("(from cache)");
        }
        for day in forecast {
            let temp = &day.temperature;
            table.row([
                day.date.format("%a %b %d").to_string(),
                format!("{}-{}{t} (avg: {}{t})", temp.min, temp.max, temp.avg),
                day.condition.clone(),
                format!("{}%", day.humidity),
                format!("{} {} {}", day.wind.speed, units.wind, day.wind.direction),
            ]);
        }
        table.render(style)
    }
}
