use std::{collections::HashMap, fs, path::PathBuf};

use serde::Deserialize;

pub const SETTINGS_FILE: &str = "gate_server.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub permits_file: Option<PathBuf>,
    pub live_feed_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8443".into(),
            permits_file: None,
            live_feed_capacity: 200,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        tracing::warn!(file = SETTINGS_FILE, "ignoring unparsable settings file");
        return;
    };
    if let Some(v) = file_cfg.get("bind_addr").and_then(toml::Value::as_str) {
        settings.bind_addr = v.to_string();
    }
    if let Some(v) = file_cfg.get("permits_file").and_then(toml::Value::as_str) {
        settings.permits_file = Some(PathBuf::from(v));
    }
    if let Some(v) = file_cfg
        .get("live_feed_capacity")
        .and_then(toml::Value::as_integer)
        .and_then(|v| usize::try_from(v).ok())
    {
        settings.live_feed_capacity = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("GATE_SERVER_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }

    if let Some(v) = var("APP__PERMITS_FILE") {
        settings.permits_file = Some(PathBuf::from(v));
    }

    if let Some(v) = var("APP__LIVE_FEED_CAPACITY") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.live_feed_capacity = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
