use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "retro-board.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub board_url: String,
    pub title: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            board_url: "http://localhost:5173/".into(),
            title: "Retrospective Target Board".into(),
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn board_url(&self) -> anyhow::Result<Url> {
        let normalized = normalize_board_url(&self.board_url);
        Url::parse(&normalized).with_context(|| format!("invalid board url '{normalized}'"))
    }
}

/// Defaults, then the settings file (if readable), then environment.
///
/// A settings file that exists but does not parse is skipped; the parse
/// error is handed back so the caller can log it once tracing is up.
pub fn load_settings(path: &Path) -> (Settings, Option<toml::de::Error>) {
    let mut settings = Settings::default();

    let file_error = match fs::read_to_string(path) {
        Ok(raw) => apply_file_overrides(&mut settings, &raw).err(),
        Err(_) => None,
    };
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());

    (settings, file_error)
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) -> Result<(), toml::de::Error> {
    let file_cfg = toml::from_str::<HashMap<String, String>>(raw)?;
    if let Some(v) = file_cfg.get("board_url") {
        settings.board_url = v.clone();
    }
    if let Some(v) = file_cfg.get("title") {
        settings.title = v.clone();
    }
    if let Some(v) = file_cfg.get("log") {
        settings.log_filter = v.clone();
    }
    Ok(())
}

// The APP__ spelling wins when both are set.
fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    for key in ["RETRO_BOARD_URL", "APP__BOARD_URL"] {
        if let Some(v) = var(key) {
            settings.board_url = v;
        }
    }
    for key in ["RETRO_TITLE", "APP__TITLE"] {
        if let Some(v) = var(key) {
            settings.title = v;
        }
    }
    for key in ["RETRO_LOG", "APP__LOG"] {
        if let Some(v) = var(key) {
            settings.log_filter = v;
        }
    }
}

fn normalize_board_url(raw: &str) -> String {
    let raw = raw.trim();

    if raw.is_empty() {
        return Settings::default().board_url;
    }
    if raw.contains("://") {
        return raw.to_string();
    }

    format!("http://{raw}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_http_scheme() {
        assert_eq!(
            normalize_board_url("retro.local:8080/board"),
            "http://retro.local:8080/board"
        );
        assert_eq!(
            normalize_board_url("https://retro.example/"),
            "https://retro.example/"
        );
        assert_eq!(normalize_board_url("  "), Settings::default().board_url);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut settings = Settings::default();
        apply_file_overrides(
            &mut settings,
            "board_url = \"https://retro.example/\"\ntitle = \"Sprint 12\"\n",
        )
        .expect("valid settings");
        assert_eq!(settings.board_url, "https://retro.example/");
        assert_eq!(settings.title, "Sprint 12");
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn malformed_file_is_ignored() {
        let mut settings = Settings::default();
        assert!(apply_file_overrides(&mut settings, "title = [1, 2").is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn load_reports_malformed_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(DEFAULT_SETTINGS_FILE);
        fs::write(&path, "log = [\"debug\"").expect("write settings");

        let (_, file_error) = load_settings(&path);
        assert!(file_error.is_some());
    }

    #[test]
    fn load_without_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (_, file_error) = load_settings(&dir.path().join("missing.toml"));
        assert!(file_error.is_none());
    }

    #[test]
    fn app_prefixed_env_wins() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("RETRO_TITLE", "From retro"),
            ("APP__TITLE", "From app"),
            ("RETRO_LOG", "debug"),
        ]);
        let mut settings = Settings::default();
        apply_env_overrides(&mut settings, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.title, "From app");
        assert_eq!(settings.log_filter, "debug");
        assert_eq!(settings.board_url, Settings::default().board_url);
    }

    #[test]
    fn board_url_parses_normalized_value() {
        let settings = Settings {
            board_url: "retro.local/board".into(),
            ..Settings::default()
        };
        assert_eq!(
            settings.board_url().expect("url").as_str(),
            "http://retro.local/board"
        );
    }
}
