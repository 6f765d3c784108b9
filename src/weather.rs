/*
 *  weather.rs
 *
 *  dailyclock - 128x32 daily clock
 *	(c) 2020-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants::{USER_AGENT, WEATHER_CACHE_TTL_SECS};

/// Errors from fetching or parsing weather data.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather fetch failed: {0}")]
    FetchFailed(String),
    #[error("weather payload could not be parsed: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("weather cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::FetchFailed(err.to_string())
    }
}

/// One entry of the provider's `weather` list.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: i64,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeelsLike {
    #[serde(default)]
    pub morn: f64,
    #[serde(default)]
    pub day: f64,
    #[serde(default)]
    pub eve: f64,
    #[serde(default)]
    pub night: f64,
}

/// A single day of the daily forecast.
///
/// Fields the dashboard does not read are kept in `extra` so the persisted
/// cache holds the full payload.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub wind_speed: f64,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub feels_like: FeelsLike,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DayForecast {
    /// Primary condition code, if the provider sent one
    pub fn condition_code(&self) -> Option<i64> {
        self.weather.first().map(|c| c.id)
    }

    /// Primary icon identifier, if the provider sent one
    pub fn icon_id(&self) -> Option<&str> {
        self.weather.first().map(|c| c.icon.as_str()).filter(|s| !s.is_empty())
    }

    /// One line for the log: condition, icon, wind, humidity, feels-like.
    pub fn summary(&self) -> String {
        let (description, code, icon) = match self.weather.first() {
            Some(c) => (c.description.as_str(), c.id, c.icon.as_str()),
            None => ("-", 0, "-"),
        };
        let f = &self.feels_like;
        format!(
            "{} ({}) icon {} wind {:.1} humidity {:.0}% feels {:.1}/{:.1}/{:.1}",
            description, code, icon, self.wind_speed, self.humidity, f.morn, f.day, f.eve
        )
    }
}

/// The last fetched payload plus the time it was fetched.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(default)]
    pub daily: Vec<DayForecast>,
    /// Seconds since the epoch, 0 when nothing has been fetched yet.
    #[serde(default)]
    pub cache_ts: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WeatherSnapshot {
    pub fn today(&self) -> Option<&DayForecast> {
        self.daily.first()
    }

    pub fn tomorrow(&self) -> Option<&DayForecast> {
        self.daily.get(1)
    }
}

/// Location, units and credentials sent with every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherQuery {
    pub lat: f64,
    pub lon: f64,
    pub units: String,
    pub api_key: String,
}

/// Anything that can produce a fresh snapshot.
#[allow(async_fn_in_trait)]
pub trait WeatherSource {
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherSnapshot, WeatherError>;
}

/// OpenWeatherMap one call client.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    base_url: String,
    client: Client,
}

impl OpenWeatherClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(USER_AGENT));
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(2)))
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { base_url: base_url.to_string(), client })
    }
}

impl WeatherSource for OpenWeatherClient {
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherSnapshot, WeatherError> {
        debug!("Fetching weather data from {}", self.base_url);
        let body = self.client
            .get(&self.base_url)
            .query(&[
                ("lat", query.lat.to_string()),
                ("lon", query.lon.to_string()),
                ("units", query.units.clone()),
                ("appid", query.api_key.clone()),
            ])
            .send()
            .await?
            .error_for_status()? // none 2xx raise
            .text()
            .await?;

        // parse errors count as a failed fetch, the caller keeps its old data
        serde_json::from_str::<WeatherSnapshot>(&body)
            .map_err(|e| WeatherError::FetchFailed(format!("bad payload: {}", e)))
    }
}

/// In-memory snapshot backed by a JSON file, refreshed at most every 15 minutes.
pub struct WeatherCache<S: WeatherSource> {
    source: S,
    query: WeatherQuery,
    cache_file: PathBuf,
    snapshot: WeatherSnapshot,
}

impl<S: WeatherSource> WeatherCache<S> {
    /// Empty cache, the first `get` always fetches.
    pub fn new(source: S, query: WeatherQuery, cache_file: impl Into<PathBuf>) -> Self {
        Self {
            source,
            query,
            cache_file: cache_file.into(),
            snapshot: WeatherSnapshot::default(),
        }
    }

    /// Cache primed from `cache_file` when it exists and parses.
    pub fn load(source: S, query: WeatherQuery, cache_file: impl Into<PathBuf>) -> Self {
        let mut cache = Self::new(source, query, cache_file);
        match read_snapshot(&cache.cache_file) {
            Ok(Some(snapshot)) => {
                debug!("Loaded weather cache from {} (cache_ts {})", cache.cache_file.display(), snapshot.cache_ts);
                cache.snapshot = snapshot;
            }
            Ok(None) => debug!("No weather cache at {}", cache.cache_file.display()),
            Err(e) => warn!("Ignoring unreadable weather cache {}: {}", cache.cache_file.display(), e),
        }
        cache
    }

    pub fn snapshot(&self) -> &WeatherSnapshot {
        &self.snapshot
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        epoch_secs(now) - self.snapshot.cache_ts >= WEATHER_CACHE_TTL_SECS
    }

    /// Fetch when stale. Returns whether a fetch happened.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&mut self, now: DateTime<Utc>) -> Result<bool, WeatherError> {
        if !self.is_stale(now) {
            debug!("Using local weather data cache");
            return Ok(false);
        }

        let mut snapshot = self.source.fetch(&self.query).await?;
        snapshot.cache_ts = epoch_secs(now).max(self.snapshot.cache_ts);
        self.snapshot = snapshot;
        info!("Weather data fetched ({} days)", self.snapshot.daily.len());
        if let Some(today) = self.snapshot.daily.first() {
            debug!("Today: {}", today.summary());
        }

        if let Err(e) = self.persist() {
            warn!("Failed to write weather cache {}: {}", self.cache_file.display(), e);
        }
        Ok(true)
    }

    /// Current snapshot, fetching first when stale.
    pub async fn get(&mut self, now: DateTime<Utc>) -> Result<&WeatherSnapshot, WeatherError> {
        self.refresh(now).await?;
        Ok(&self.snapshot)
    }

    /// Overwrite the cache file with the current snapshot
    fn persist(&self) -> Result<(), WeatherError> {
        if let Some(parent) = self.cache_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.cache_file.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&self.snapshot)?)?;
        fs::rename(&tmp, &self.cache_file)?;
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> Result<Option<WeatherSnapshot>, WeatherError> {
    if !path.is_file() {
        return Ok(None);
    }
    let data = fs::read(path)?;
    Ok(Some(serde_json::from_slice(&data)?))
}

fn epoch_secs(now: DateTime<Utc>) -> f64 {
    now.timestamp_millis() as f64 / 1000.0
}
