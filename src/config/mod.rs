use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Firefox,
    Chrome,
}

/// WebDriver connection and landing page
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default)]
    pub kind: BrowserKind,

    #[serde(default)]
    pub headless: bool,

    #[serde(default = "default_landing_url")]
    pub landing_url: String,
}

/// Fixed pauses used while the site re-renders, in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    #[serde(default = "default_landing_settle_ms")]
    pub landing_settle_ms: u64,

    #[serde(default = "default_nav_settle_ms")]
    pub nav_settle_ms: u64,

    #[serde(default = "default_scroll_settle_ms")]
    pub scroll_settle_ms: u64,

    #[serde(default = "default_show_more_settle_ms")]
    pub show_more_settle_ms: u64,

    #[serde(default = "default_show_more_poll_ms")]
    pub show_more_poll_ms: u64,

    #[serde(default = "default_page_scroll_settle_ms")]
    pub page_scroll_settle_ms: u64,

    #[serde(default = "default_page_load_settle_ms")]
    pub page_load_settle_ms: u64,

    #[serde(default = "default_detail_settle_ms")]
    pub detail_settle_ms: u64,

    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationConfig {
    /// Clicks allowed on one pagination control before the walk is aborted.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

/// Output locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}
fn default_landing_url() -> String {
    "https://www.filmaffinity.com/us/main.html".to_string()
}
fn default_landing_settle_ms() -> u64 {
    3000
}
fn default_nav_settle_ms() -> u64 {
    3000
}
fn default_scroll_settle_ms() -> u64 {
    1000
}
fn default_show_more_settle_ms() -> u64 {
    500
}
fn default_show_more_poll_ms() -> u64 {
    1000
}
fn default_page_scroll_settle_ms() -> u64 {
    3000
}
fn default_page_load_settle_ms() -> u64 {
    5000
}
fn default_detail_settle_ms() -> u64 {
    500
}
fn default_wait_timeout_secs() -> u64 {
    3
}
fn default_max_iterations() -> usize {
    500
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            kind: BrowserKind::default(),
            headless: false,
            landing_url: default_landing_url(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            landing_settle_ms: default_landing_settle_ms(),
            nav_settle_ms: default_nav_settle_ms(),
            scroll_settle_ms: default_scroll_settle_ms(),
            show_more_settle_ms: default_show_more_settle_ms(),
            show_more_poll_ms: default_show_more_poll_ms(),
            page_scroll_settle_ms: default_page_scroll_settle_ms(),
            page_load_settle_ms: default_page_load_settle_ms(),
            detail_settle_ms: default_detail_settle_ms(),
            wait_timeout_secs: default_wait_timeout_secs(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            reports_dir: default_reports_dir(),
        }
    }
}

impl TimingConfig {
    pub fn landing_settle(&self) -> Duration {
        Duration::from_millis(self.landing_settle_ms)
    }
    pub fn nav_settle(&self) -> Duration {
        Duration::from_millis(self.nav_settle_ms)
    }
    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }
    pub fn show_more_settle(&self) -> Duration {
        Duration::from_millis(self.show_more_settle_ms)
    }
    pub fn show_more_poll(&self) -> Duration {
        Duration::from_millis(self.show_more_poll_ms)
    }
    pub fn page_scroll_settle(&self) -> Duration {
        Duration::from_millis(self.page_scroll_settle_ms)
    }
    pub fn page_load_settle(&self) -> Duration {
        Duration::from_millis(self.page_load_settle_ms)
    }
    pub fn detail_settle(&self) -> Duration {
        Duration::from_millis(self.detail_settle_ms)
    }
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    /// No pauses at all; the scripted test session renders synchronously.
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            landing_settle_ms: 0,
            nav_settle_ms: 0,
            scroll_settle_ms: 0,
            show_more_settle_ms: 0,
            show_more_poll_ms: 0,
            page_scroll_settle_ms: 0,
            page_load_settle_ms: 0,
            detail_settle_ms: 0,
            wait_timeout_secs: 0,
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("FILM_ETL").separator("__"))
            .build()
            .context("Failed to assemble configuration sources")?;

        cfg.try_deserialize().context("Invalid configuration")
    }
}
