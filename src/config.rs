use std::{path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use chrono::FixedOffset;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    CandidateUrlBuilder, ColumnStrategy, Delivery, MealRows, WindowBounds,
    candidate_url_builder::{DEFAULT_BASE_URL, DEFAULT_LOOKBACK_WEEKS},
    requests::DEFAULT_FETCH_TIMEOUT,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnStrategyName {
    #[default]
    Header,
    Positional,
}

/// The env vars controlling how the menu is found and read.
#[derive(Debug, Deserialize)]
pub struct MenuEnv {
    #[serde(default = "default_base_url")]
    menu_base_url: String,
    #[serde(default = "default_lookback_weeks")]
    lookback_weeks: u32,
    #[serde(default = "default_true")]
    probe_tuesday: bool,
    #[serde(default = "default_fetch_timeout_secs")]
    fetch_timeout_secs: u64,
    #[serde(default = "default_meal_rows")]
    meal_rows: Vec<usize>,
    #[serde(default)]
    column_strategy: ColumnStrategyName,
    #[serde(default)]
    day_suffix: Option<String>,
    #[serde(default = "default_utc_offset_hours")]
    utc_offset_hours: i32,
    #[serde(default = "default_morning_start")]
    morning_start: u32,
    #[serde(default = "default_midday_start")]
    midday_start: u32,
    #[serde(default = "default_evening_start")]
    evening_start: u32,
    #[serde(default = "default_evening_end")]
    evening_end: u32,
    #[serde(default = "default_cache_path")]
    cache_path: PathBuf,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_lookback_weeks() -> u32 {
    DEFAULT_LOOKBACK_WEEKS
}

fn default_true() -> bool {
    true
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT.as_secs()
}

fn default_meal_rows() -> Vec<usize> {
    let rows = MealRows::default();
    vec![rows.breakfast, rows.lunch, rows.dinner]
}

fn default_utc_offset_hours() -> i32 {
    9
}

fn default_morning_start() -> u32 {
    WindowBounds::default().morning_start
}

fn default_midday_start() -> u32 {
    WindowBounds::default().midday_start
}

fn default_evening_start() -> u32 {
    WindowBounds::default().evening_start
}

fn default_evening_end() -> u32 {
    WindowBounds::default().evening_end
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("menu_url_cache.json")
}

pub struct MenuConfig {
    pub builder: CandidateUrlBuilder,
    pub fetch_timeout: Duration,
    pub meal_rows: MealRows,
    pub strategy: ColumnStrategy,
    pub offset: FixedOffset,
    pub windows: WindowBounds,
    pub cache_path: PathBuf,
}

impl MenuConfig {
    pub fn new() -> anyhow::Result<Self> {
        let menu_env = MenuEnv::load_from_env()?;
        Self::from_env(menu_env)
    }

    pub fn from_env(env: MenuEnv) -> anyhow::Result<Self> {
        let meal_rows = MealRows::try_from(env.meal_rows.as_slice())
            .map_err(anyhow::Error::msg)
            .context("MEAL_ROWS must list breakfast,lunch,dinner rows")?;

        let windows = WindowBounds {
            morning_start: env.morning_start,
            midday_start: env.midday_start,
            evening_start: env.evening_start,
            evening_end: env.evening_end,
        };
        if !windows.is_ordered() {
            bail!("notification window hours must increase and end by 24: {windows:?}");
        }

        let Some(offset) = FixedOffset::east_opt(env.utc_offset_hours * 3600) else {
            bail!("UTC_OFFSET_HOURS out of range: {}", env.utc_offset_hours);
        };

        let strategy = match env.column_strategy {
            ColumnStrategyName::Header => ColumnStrategy::HeaderSearch {
                day_suffix: env.day_suffix.filter(|s| !s.is_empty()),
            },
            ColumnStrategyName::Positional => ColumnStrategy::Positional,
        };

        Ok(Self {
            builder: CandidateUrlBuilder::new(&env.menu_base_url, env.lookback_weeks, env.probe_tuesday),
            fetch_timeout: Duration::from_secs(env.fetch_timeout_secs),
            meal_rows,
            strategy,
            offset,
            windows,
            cache_path: env.cache_path,
        })
    }
}

/// The env vars needed for sending messages through LINE.
#[derive(Debug, Deserialize)]
pub struct LineEnv {
    pub line_channel_access_token: String,
    /// Push target; broadcast to every friend when unset.
    #[serde(default)]
    pub line_to: Option<String>,
}

impl LineEnv {
    pub fn delivery(&self) -> Delivery {
        match self.line_to.as_deref() {
            Some(to) if !to.is_empty() => Delivery::Push { to: to.to_string() },
            _ => Delivery::Broadcast,
        }
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}
