use std::{collections::HashMap, fs, path::Path};

use url::Url;

use crate::error::ConfigError;

pub const SETTINGS_FILE: &str = "diagnosis_client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".into(),
            log_filter: "info".into(),
        }
    }
}

/// Defaults, then `diagnosis_client.toml` in the working directory, then environment.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    apply_settings_file(&mut settings, Path::new(SETTINGS_FILE));

    if let Ok(v) = std::env::var("DIAGNOSIS_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Ok(v) = std::env::var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    settings
}

fn apply_settings_file(settings: &mut Settings, path: &Path) {
    if let Ok(raw) = fs::read_to_string(path) {
        apply_settings_toml(settings, &raw);
    }
}

fn apply_settings_toml(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        tracing::warn!("ignoring malformed {SETTINGS_FILE}");
        return;
    };
    if let Some(v) = file_cfg.get("server_url") {
        settings.server_url = v.clone();
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
}

/// Parse a backend base URL. The path always ends with `/` so endpoint joins
/// keep any prefix (`http://host/api` -> `http://host/api/predict`).
pub fn normalize_server_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let invalid = |reason: String| ConfigError::InvalidServerUrl {
        url: raw.to_string(),
        reason,
    };

    if trimmed.is_empty() {
        return Err(invalid("empty".into()));
    }

    let mut url = Url::parse(trimmed).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
