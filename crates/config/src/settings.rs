// Application settings
// Loaded from ~/.config/certtrack/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_USER_API: &str = "https://microservice1-production.up.railway.app";
pub const DEFAULT_CERT_API: &str = "https://microservice2-production.up.railway.app";

pub const ENV_USER_API: &str = "CERTTRACK_USER_API";
pub const ENV_CERT_API: &str = "CERTTRACK_CERT_API";

/// Default rendering for list commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Services
    #[serde(rename = "services.userApi")]
    pub user_api: String,

    #[serde(rename = "services.certApi")]
    pub cert_api: String,

    // HTTP
    #[serde(rename = "http.timeoutSecs")]
    pub timeout_secs: u64,

    // Output
    #[serde(rename = "output.format")]
    pub output_format: OutputFormat,

    /// Days ahead that count as "expiring soon"
    #[serde(rename = "output.expiryWarningDays")]
    pub expiry_warning_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_api: DEFAULT_USER_API.to_string(),
            cert_api: DEFAULT_CERT_API.to_string(),
            timeout_secs: 30,
            output_format: OutputFormat::Table,
            expiry_warning_days: 30,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("certtrack");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults, then apply
    /// environment overrides.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            create_default_file(&path);
        }

        let mut settings = Self::load_from(&path);
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Load settings from an explicit file. Missing or invalid files yield
    /// defaults; no environment overrides are applied.
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                if path.exists() {
                    log::warn!("error reading {}: {}", path.display(), e);
                }
                return Self::default();
            }
        };

        match Self::parse(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        let mut settings: Self = serde_json::from_str(&cleaned)?;
        settings.user_api = trim_base(&settings.user_api);
        settings.cert_api = trim_base(&settings.cert_api);
        Ok(settings)
    }

    /// Apply `CERTTRACK_USER_API` / `CERTTRACK_CERT_API` from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_USER_API).filter(|s| !s.trim().is_empty()) {
            self.user_api = trim_base(&url);
        }
        if let Some(url) = lookup(ENV_CERT_API).filter(|s| !s.trim().is_empty()) {
            self.cert_api = trim_base(&url);
        }
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Create default settings file with comments
fn create_default_file(path: &Path) {
    // Ensure directory exists
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            log::warn!("error creating config directory: {}", e);
            return;
        }
    }

    let default_config = format!(
        r#"{{
    // Service endpoints (override with {ENV_USER_API} / {ENV_CERT_API})
    "services.userApi": "{DEFAULT_USER_API}",
    "services.certApi": "{DEFAULT_CERT_API}",

    // HTTP request timeout
    "http.timeoutSecs": 30,

    // Output: "table", "json" or "csv"
    "output.format": "table",
    "output.expiryWarningDays": 30
}}
"#
    );

    if let Err(e) = fs::write(path, default_config) {
        log::warn!("error writing default settings.json: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_production_services() {
        let s = Settings::default();
        assert_eq!(s.user_api, DEFAULT_USER_API);
        assert_eq!(s.cert_api, DEFAULT_CERT_API);
        assert_eq!(s.output_format, OutputFormat::Table);
    }

    #[test]
    fn parse_strips_comments_and_trailing_slashes() {
        let json = r#"{
            // local stack
            "services.userApi": "http://localhost:8080/",
            "output.format": "json"
        }"#;
        let s = Settings::parse(json).unwrap();
        assert_eq!(s.user_api, "http://localhost:8080");
        assert_eq!(s.cert_api, DEFAULT_CERT_API);
        assert_eq!(s.output_format, OutputFormat::Json);
        assert_eq!(s.timeout_secs, 30);
    }

    #[test]
    fn generated_default_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("certtrack/settings.json");
        create_default_file(&path);
        assert!(path.exists());
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
        assert_eq!(Settings::load_from(&dir.path().join("missing.json")), Settings::default());
    }

    #[test]
    fn env_overrides_win() {
        let mut s = Settings::default();
        s.apply_overrides(|key| match key {
            ENV_CERT_API => Some("http://127.0.0.1:5000/".into()),
            ENV_USER_API => Some("  ".into()),
            _ => None,
        });
        assert_eq!(s.cert_api, "http://127.0.0.1:5000");
        assert_eq!(s.user_api, DEFAULT_USER_API);
    }
}
