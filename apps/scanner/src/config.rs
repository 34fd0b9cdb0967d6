use std::{collections::HashMap, fs, path::Path, time::Duration};

use client_core::{RejectionPolicy, ScanSessionConfig};
use shared::domain::{Gate, GuardId};

pub const SETTINGS_FILE: &str = "scanner.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: Option<String>,
    pub auth_token: Option<String>,
    pub gate: Gate,
    pub guard_id: Option<i64>,
    pub simulate: bool,
    pub simulated_delay_ms: u64,
    pub validation_timeout_secs: u64,
    pub discard_rejected: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: None,
            auth_token: None,
            gate: Gate::Entry,
            guard_id: None,
            simulate: false,
            simulated_delay_ms: 2500,
            validation_timeout_secs: 10,
            discard_rejected: false,
        }
    }
}

impl Settings {
    pub fn session_config(&self) -> ScanSessionConfig {
        ScanSessionConfig {
            initial_gate: self.gate,
            guard_id: self.guard_id.map(GuardId),
            validation_timeout: Duration::from_secs(self.validation_timeout_secs.max(1)),
            rejection_policy: if self.discard_rejected {
                RejectionPolicy::Discard
            } else {
                RejectionPolicy::LogFallback
            },
            ..ScanSessionConfig::default()
        }
    }

    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }
}

/// Defaults, then the TOML file at `path` if readable, then the environment.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        tracing::warn!("ignoring unparsable scanner settings file");
        return;
    };
    if let Some(v) = file_cfg.get("server_url").and_then(toml::Value::as_str) {
        settings.server_url = Some(v.to_string());
    }
    if let Some(v) = file_cfg.get("auth_token").and_then(toml::Value::as_str) {
        settings.auth_token = Some(v.to_string());
    }
    if let Some(v) = file_cfg.get("gate").and_then(toml::Value::as_str) {
        match v.parse() {
            Ok(gate) => settings.gate = gate,
            Err(err) => tracing::warn!(%err, "ignoring gate from settings file"),
        }
    }
    if let Some(v) = file_cfg.get("guard_id").and_then(toml::Value::as_integer) {
        settings.guard_id = Some(v);
    }
    if let Some(v) = file_cfg.get("simulate").and_then(toml::Value::as_bool) {
        settings.simulate = v;
    }
    if let Some(v) = file_cfg
        .get("simulated_delay_ms")
        .and_then(toml::Value::as_integer)
        .and_then(|v| u64::try_from(v).ok())
    {
        settings.simulated_delay_ms = v;
    }
    if let Some(v) = file_cfg
        .get("validation_timeout_secs")
        .and_then(toml::Value::as_integer)
        .and_then(|v| u64::try_from(v).ok())
    {
        settings.validation_timeout_secs = v;
    }
    if let Some(v) = file_cfg.get("discard_rejected").and_then(toml::Value::as_bool) {
        settings.discard_rejected = v;
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SMARTPASS_SERVER_URL") {
        settings.server_url = Some(v);
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = Some(v);
    }

    if let Some(v) = var("SMARTPASS_AUTH_TOKEN") {
        settings.auth_token = Some(v);
    }

    if let Some(v) = var("SMARTPASS_GATE").or_else(|| var("APP__GATE")) {
        if let Ok(gate) = v.parse() {
            settings.gate = gate;
        }
    }

    if let Some(v) = var("APP__GUARD_ID") {
        if let Ok(parsed) = v.parse::<i64>() {
            settings.guard_id = Some(parsed);
        }
    }

    if let Some(v) = var("APP__SIMULATE").as_deref().and_then(parse_flag) {
        settings.simulate = v;
    }
    if let Some(v) = var("APP__VALIDATION_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.validation_timeout_secs = parsed;
        }
    }
    if let Some(v) = var("APP__DISCARD_REJECTED").as_deref().and_then(parse_flag) {
        settings.discard_rejected = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
