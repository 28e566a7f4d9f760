use crate::dispatcher::DispatcherSettings;
use crate::facts::PortfolioFacts;
use crate::speech::UtteranceSettings;
use crate::theme_store::DEFAULT_STORAGE_KEY;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub page: PageConfig,
    #[serde(default)]
    pub portfolio: PortfolioFacts,
}

// ============================================================================
// Voice Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct VoiceConfig {
    /// Offer the voice assistant at all (off behaves like a host without capture)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_rate")]
    pub rate: f32,
    #[serde(default = "default_unit")]
    pub pitch: f32,
    #[serde(default = "default_unit")]
    pub volume: f32,
    /// Preferred voice name fragment
    #[serde(default = "default_voice_hint")]
    pub voice_hint: String,
    /// Delay before closing after "stop"
    #[serde(default = "default_stop_delay_ms")]
    pub stop_delay_ms: u64,
    /// Capture events buffered before the engine blocks
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            lang: default_lang(),
            rate: default_rate(),
            pitch: default_unit(),
            volume: default_unit(),
            voice_hint: default_voice_hint(),
            stop_delay_ms: default_stop_delay_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl VoiceConfig {
    pub fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            utterance: UtteranceSettings {
                lang: self.lang.clone(),
                rate: self.rate,
                pitch: self.pitch,
                volume: self.volume.clamp(0.0, 1.0),
                voice: None,
            },
            voice_hint: self.voice_hint.clone(),
            stop_delay: Duration::from_millis(self.stop_delay_ms),
            queue_capacity: self.queue_capacity,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_lang() -> String {
    "en-US".into()
}

fn default_rate() -> f32 {
    0.9
}

fn default_unit() -> f32 {
    1.0
}

fn default_voice_hint() -> String {
    "Female".into()
}

fn default_stop_delay_ms() -> u64 {
    2000
}

fn default_queue_capacity() -> usize {
    32
}

// ============================================================================
// Theme Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ThemeConfig {
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Preference file; defaults to the user config dir
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            store_path: None,
        }
    }
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.into()
}

// ============================================================================
// Page Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PageConfig {
    /// Section ids present on the page
    #[serde(default = "default_sections")]
    pub sections: Vec<String>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            sections: default_sections(),
        }
    }
}

fn default_sections() -> Vec<String> {
    ["home", "about", "skills", "projects", "achievements", "contact"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    /// Load `path`, or `config.toml` in the working directory.
    /// A missing file gives defaults; an unreadable one is reported and ignored.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.unwrap_or_else(|| Path::new("config.toml"));
        if !path.exists() {
            return Config::default();
        }

        match fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| Self::parse(&s).map_err(|e| e.to_string()))
        {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config {}: {}", path.display(), e);
                Config::default()
            }
        }
    }

    pub fn parse(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.voice.enabled);
        assert_eq!(config.voice.stop_delay_ms, 2000);
        assert_eq!(config.theme.storage_key, "portfolio-theme");
        assert!(config.page.sections.contains(&"projects".to_string()));
        assert_eq!(config.portfolio.name, "VIMALESH S");
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [voice]
            rate = 1.2
            stop_delay_ms = 500

            [page]
            sections = ["home"]

            [portfolio]
            name = "Grace"
            "#,
        )
        .unwrap();

        assert_eq!(config.voice.rate, 1.2);
        assert_eq!(config.voice.lang, "en-US");
        assert_eq!(config.page.sections, vec!["home".to_string()]);
        assert_eq!(config.portfolio.name, "Grace");

        let settings = config.voice.dispatcher_settings();
        assert_eq!(settings.stop_delay, Duration::from_millis(500));
        assert_eq!(settings.utterance.rate, 1.2);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[voice\nrate = ").unwrap();

        let config = Config::load(Some(&path));
        assert_eq!(config.voice.rate, 0.9);
    }

    #[test]
    fn test_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.toml")));
        assert_eq!(config.theme.store_path, None);
    }
}
