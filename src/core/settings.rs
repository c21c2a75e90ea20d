//! User settings blob and its JSON store.
//!
//! Mirrors the handful of toggles a viewer flips from the control surface.
//! The store lives at `<state_dir>/settings.json`; a missing file means
//! defaults, a malformed file is logged and replaced by defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ru,
    En,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub skip_opening: bool,
    pub auto_next_episode: bool,
    pub fullscreen_mode: bool,
    /// Playback rate multiplier.
    pub video_speed: f64,
    /// Seconds to wait before clicking "next episode"; also the global cooldown.
    pub click_delay: i64,
    /// Interface language chosen by the viewer. Nothing here is localized;
    /// the value is carried so existing settings files keep it on save.
    pub language: Language,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            skip_opening: true,
            auto_next_episode: true,
            fullscreen_mode: true,
            video_speed: 1.0,
            click_delay: 3,
            language: Language::Ru,
        }
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_opening: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_next_episode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullscreen_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_delay: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }
}

/// Which effective values changed after applying a patch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettingsChange {
    pub fullscreen_mode: Option<bool>,
    pub speed_changed: bool,
    pub click_delay_changed: bool,
    pub any: bool,
}

impl Settings {
    pub fn apply(&mut self, patch: &SettingsPatch) -> SettingsChange {
        let before = self.clone();

        if let Some(v) = patch.skip_opening {
            self.skip_opening = v;
        }
        if let Some(v) = patch.auto_next_episode {
            self.auto_next_episode = v;
        }
        if let Some(v) = patch.fullscreen_mode {
            self.fullscreen_mode = v;
        }
        if let Some(v) = patch.video_speed {
            self.video_speed = sanitize_speed(v);
        }
        if let Some(v) = patch.click_delay {
            self.click_delay = v.max(0);
        }
        if let Some(v) = patch.language {
            self.language = v;
        }

        SettingsChange {
            fullscreen_mode: (before.fullscreen_mode != self.fullscreen_mode)
                .then_some(self.fullscreen_mode),
            speed_changed: before.video_speed != self.video_speed,
            click_delay_changed: before.click_delay != self.click_delay,
            any: before != *self,
        }
    }
}

/// Playback rates outside what `HTMLMediaElement` accepts fall back to 1x.
pub fn sanitize_speed(speed: f64) -> f64 {
    if speed.is_finite() && speed > 0.0 && speed <= 16.0 {
        speed
    } else {
        1.0
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Settings {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => match serde_json::from_str::<Settings>(&contents) {
                Ok(mut settings) => {
                    settings.video_speed = sanitize_speed(settings.video_speed);
                    settings.click_delay = settings.click_delay.max(0);
                    info!("Settings loaded from {}", self.path.display());
                    settings
                }
                Err(e) => {
                    warn!(
                        "settings.json parse error at {}: {}, using defaults",
                        self.path.display(),
                        e
                    );
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        }
    }

    pub async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(settings)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SettingsError::Write {
                    path: self.path.clone(),
                    source,
                })?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| SettingsError::Write {
                path: self.path.clone(),
                source,
            })?;
        info!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "autowatch-settings-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn defaults_match_first_run_behavior() {
        let s = Settings::default();
        assert!(s.skip_opening && s.auto_next_episode && s.fullscreen_mode);
        assert_eq!(s.video_speed, 1.0);
        assert_eq!(s.click_delay, 3);
        assert_eq!(s.language, Language::Ru);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let s: Settings = serde_json::from_str(r#"{"skip_opening": false}"#).expect("valid json");
        assert!(!s.skip_opening);
        assert!(s.auto_next_episode);
        assert_eq!(s.click_delay, 3);
    }

    #[test]
    fn apply_reports_fullscreen_toggle_and_speed() {
        let mut s = Settings::default();
        let change = s.apply(&SettingsPatch {
            fullscreen_mode: Some(false),
            video_speed: Some(2.0),
            ..Default::default()
        });
        assert_eq!(change.fullscreen_mode, Some(false));
        assert!(change.speed_changed);
        assert!(!change.click_delay_changed);
        assert!(change.any);

        let again = s.apply(&SettingsPatch {
            fullscreen_mode: Some(false),
            ..Default::default()
        });
        assert_eq!(again.fullscreen_mode, None);
        assert!(!again.any);
    }

    #[test]
    fn apply_clamps_bad_values() {
        let mut s = Settings::default();
        s.apply(&SettingsPatch {
            video_speed: Some(-4.0),
            click_delay: Some(-10),
            ..Default::default()
        });
        assert_eq!(s.video_speed, 1.0);
        assert_eq!(s.click_delay, 0);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(SettingsPatch::default().is_empty());
        let patch: SettingsPatch = serde_json::from_str(r#"{"language":"en"}"#).expect("valid");
        assert!(!patch.is_empty());
    }

    #[tokio::test]
    async fn store_round_trips_and_tolerates_garbage() {
        let dir = temp_dir("store");
        let store = SettingsStore::in_dir(&dir);

        assert_eq!(store.load().await, Settings::default());

        let mut s = Settings::default();
        s.video_speed = 5.0;
        s.language = Language::En;
        tokio_test::assert_ok!(store.save(&s).await);
        assert_eq!(store.load().await, s);

        std::fs::write(store.path(), "{not json").expect("write garbage");
        assert_eq!(store.load().await, Settings::default());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
