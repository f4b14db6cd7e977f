use std::{fs, path::Path, time::Duration};

use shared::protocol::SortBy;
use tracing::warn;

pub const SETTINGS_FILE: &str = "market.toml";
const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub search_debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub default_sort: SortBy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            search_debounce_ms: 300,
            request_timeout_secs: 15,
            default_sort: SortBy::Name,
        }
    }
}

impl Settings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Defaults, then `market.toml` in the working directory, then environment.
pub fn load_settings() -> Settings {
    load_settings_with(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match raw.parse::<toml::Table>() {
            Ok(table) => apply_file(&mut settings, &table),
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable settings file"),
        }
    }

    apply_env(&mut settings, env);
    settings.base_url = normalize_base_url(&settings.base_url);
    settings
}

fn apply_file(settings: &mut Settings, table: &toml::Table) {
    if let Some(v) = table.get("base_url").and_then(|v| v.as_str()) {
        settings.base_url = v.to_string();
    }
    if let Some(v) = table_u64(table, "search_debounce_ms") {
        settings.search_debounce_ms = v;
    }
    if let Some(v) = table_u64(table, "request_timeout_secs") {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = table
        .get("default_sort")
        .and_then(|v| v.as_str())
        .and_then(SortBy::parse)
    {
        settings.default_sort = v;
    }
}

fn table_u64(table: &toml::Table, key: &str) -> Option<u64> {
    match table.get(key)? {
        toml::Value::Integer(v) => u64::try_from(*v).ok(),
        toml::Value::String(v) => v.trim().parse().ok(),
        _ => None,
    }
}

fn apply_env(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("MARKET_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = env("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = env("APP__SEARCH_DEBOUNCE_MS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.search_debounce_ms = parsed;
        }
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(sort) = env("APP__DEFAULT_SORT").as_deref().and_then(SortBy::parse) {
        settings.default_sort = sort;
    }
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }
    trimmed.to_string()
}
