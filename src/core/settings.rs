use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persisted editor preferences. Not the color palette, which is a
/// compile-time table (see `core::palette`) with no user customization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_tab_size")]
    pub tab_size: usize,

    #[serde(default = "default_font_family")]
    pub font_family: String,

    #[serde(default = "default_font_size")]
    pub font_size: i32,
}

fn default_tab_size() -> usize {
    4
}

fn default_font_family() -> String {
    "Monospace".to_string()
}

fn default_font_size() -> i32 {
    14
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tab_size: default_tab_size(),
            font_family: default_font_family(),
            font_size: default_font_size(),
        }
    }
}

impl Settings {
    /// Load settings from `~/.config/chromaline/settings.json`.
    /// Falls back to defaults if the file doesn't exist or is invalid.
    pub fn load() -> Self {
        match Self::load_with_validation() {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Settings::default()
            }
        }
    }

    /// Load settings with descriptive error messages for UI display.
    pub fn load_with_validation() -> Result<Self, String> {
        let path = Self::settings_path();

        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read settings file at {}: {}", path.display(), e))?;

        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse settings.json: {}. Check JSON syntax.", e))
    }

    /// Save settings to `~/.config/chromaline/settings.json`.
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::settings_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&path, contents)?;

        Ok(())
    }

    fn settings_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("chromaline")
            .join("settings.json")
    }

    /// Create `settings.json` with defaults if it doesn't already exist.
    pub fn ensure_exists() -> Result<(), std::io::Error> {
        let path = Self::settings_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            Self::default().save()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.tab_size, 4);
        assert_eq!(settings.font_family, "Monospace");
        assert_eq!(settings.font_size, 14);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let json = r#"{"font_size":18}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.font_size, 18);
        assert_eq!(settings.tab_size, 4);
        assert_eq!(settings.font_family, "Monospace");
    }

    #[test]
    fn invalid_json_fails_to_parse() {
        let result: Result<Settings, _> = serde_json::from_str("{ not json }");
        assert!(result.is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let mut settings = Settings::default();
        settings.tab_size = 2;
        settings.font_size = 12;
        let json = serde_json::to_string(&settings).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, settings);
    }
}
