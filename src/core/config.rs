use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// AutowatchConfig: file-based config loader (autowatch.json) with env-var fallback
// ---------------------------------------------------------------------------

pub const ENV_CONFIG_PATH: &str = "AUTOWATCH_CONFIG";
pub const ENV_START_URL: &str = "AUTOWATCH_URL";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_PROFILE_DIR: &str = "AUTOWATCH_PROFILE_DIR";
pub const ENV_CONTROL_PORT: &str = "AUTOWATCH_CONTROL_PORT";
pub const ENV_POLL_MS: &str = "AUTOWATCH_POLL_MS";
pub const ENV_STATE_DIR: &str = "AUTOWATCH_STATE_DIR";

pub const DEFAULT_SITE_URL: &str = "https://jut.su";
pub const DEFAULT_CONTROL_PORT: u16 = 5010;
pub const DEFAULT_POLL_MS: u64 = 1000;

/// Top-level config loaded from `autowatch.json`. Every field is optional.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct AutowatchConfig {
    /// Site root, used for the ongoing list and episode-list navigation.
    pub site_url: Option<String>,
    /// First page to open. Defaults to `site_url`.
    pub start_url: Option<String>,
    pub chrome_executable: Option<String>,
    /// Persistent browser profile so the site login survives restarts.
    pub profile_dir: Option<String>,
    pub control_port: Option<u16>,
    /// Baseline poll interval in ms; `0` disables the baseline poller.
    pub poll_interval_ms: Option<u64>,
    /// Where `settings.json` lives. Defaults to `~/.autowatch`.
    pub state_dir: Option<String>,
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn field_nonempty(v: &Option<String>) -> Option<String> {
    v.as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl AutowatchConfig {
    /// Site root: JSON field → `https://jut.su`. Trailing slash removed.
    pub fn resolve_site_url(&self) -> String {
        field_nonempty(&self.site_url)
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Start page: JSON field → `AUTOWATCH_URL` env var → site root.
    pub fn resolve_start_url(&self) -> String {
        field_nonempty(&self.start_url)
            .or_else(|| env_nonempty(ENV_START_URL))
            .unwrap_or_else(|| format!("{}/", self.resolve_site_url()))
    }

    /// Browser executable: JSON field → `CHROME_EXECUTABLE` env var → `None`
    /// (auto-discovery, see `browser::browser_manager::find_chrome_executable`).
    /// Paths that do not exist are ignored.
    pub fn resolve_chrome_executable(&self) -> Option<String> {
        field_nonempty(&self.chrome_executable)
            .or_else(|| env_nonempty(ENV_CHROME_EXECUTABLE))
            .filter(|p| Path::new(p).exists())
    }

    /// State directory: JSON field → `AUTOWATCH_STATE_DIR` env var → `~/.autowatch`.
    pub fn resolve_state_dir(&self) -> PathBuf {
        field_nonempty(&self.state_dir)
            .or_else(|| env_nonempty(ENV_STATE_DIR))
            .map(|p| PathBuf::from(expand_tilde(&p)))
            .or_else(|| dirs::home_dir().map(|h| h.join(".autowatch")))
            .unwrap_or_else(|| std::env::temp_dir().join("autowatch"))
    }

    /// Browser profile: JSON field → `AUTOWATCH_PROFILE_DIR` env var → `<state_dir>/profile`.
    pub fn resolve_profile_dir(&self) -> PathBuf {
        field_nonempty(&self.profile_dir)
            .or_else(|| env_nonempty(ENV_PROFILE_DIR))
            .map(|p| PathBuf::from(expand_tilde(&p)))
            .unwrap_or_else(|| self.resolve_state_dir().join("profile"))
    }

    /// Control API port: JSON field → `AUTOWATCH_CONTROL_PORT` env var → 5010.
    pub fn resolve_control_port(&self) -> u16 {
        if let Some(p) = self.control_port {
            return p;
        }
        env_nonempty(ENV_CONTROL_PORT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CONTROL_PORT)
    }

    /// Baseline poll interval: JSON field → `AUTOWATCH_POLL_MS` env var → 1000.
    pub fn resolve_poll_interval_ms(&self) -> u64 {
        if let Some(ms) = self.poll_interval_ms {
            return ms;
        }
        env_nonempty(ENV_POLL_MS)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_POLL_MS)
    }
}

/// Load `autowatch.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `AUTOWATCH_CONFIG` env var path
/// 2. `./autowatch.json`
/// 3. `../autowatch.json`
///
/// Missing file → `AutowatchConfig::default()` (silent, all env-var fallbacks apply).
/// Parse error → log a warning, return `AutowatchConfig::default()`.
pub fn load_config() -> AutowatchConfig {
    let mut candidates = vec![
        PathBuf::from("autowatch.json"),
        PathBuf::from("../autowatch.json"),
    ];
    if let Some(env_path) = env_nonempty(ENV_CONFIG_PATH) {
        candidates.insert(0, PathBuf::from(env_path));
    }
    load_config_from(&candidates)
}

pub fn load_config_from(candidates: &[PathBuf]) -> AutowatchConfig {
    for path in candidates {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        match serde_json::from_str::<AutowatchConfig>(&contents) {
            Ok(cfg) => {
                tracing::info!("autowatch.json loaded from {}", path.display());
                return cfg;
            }
            Err(e) => {
                tracing::warn!(
                    "autowatch.json parse error at {}: {}, using defaults",
                    path.display(),
                    e
                );
                return AutowatchConfig::default();
            }
        }
    }
    AutowatchConfig::default()
}

pub fn expand_tilde(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_fields_win() {
        let cfg = AutowatchConfig {
            site_url: Some("https://example.org/".to_string()),
            start_url: Some("https://example.org/show/episode-1.html".to_string()),
            control_port: Some(7000),
            poll_interval_ms: Some(0),
            state_dir: Some("/tmp/aw-state".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_site_url(), "https://example.org");
        assert_eq!(
            cfg.resolve_start_url(),
            "https://example.org/show/episode-1.html"
        );
        assert_eq!(cfg.resolve_control_port(), 7000);
        assert_eq!(cfg.resolve_poll_interval_ms(), 0);
        assert_eq!(cfg.resolve_state_dir(), PathBuf::from("/tmp/aw-state"));
        assert_eq!(
            cfg.resolve_profile_dir(),
            PathBuf::from("/tmp/aw-state/profile")
        );
    }

    #[test]
    fn blank_fields_are_ignored() {
        let cfg = AutowatchConfig {
            site_url: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_site_url(), DEFAULT_SITE_URL);
    }

    #[test]
    fn missing_executable_path_is_dropped() {
        let cfg = AutowatchConfig {
            chrome_executable: Some("/definitely/not/a/browser".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_chrome_executable(), None);
    }

    #[test]
    fn loader_reads_first_existing_file_and_survives_bad_json() {
        let dir = std::env::temp_dir().join(format!("autowatch-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let good = dir.join("good.json");
        let bad = dir.join("bad.json");
        std::fs::write(&good, r#"{"control_port": 6123}"#).expect("write");
        std::fs::write(&bad, "{oops").expect("write");

        let cfg = load_config_from(&[dir.join("absent.json"), good.clone()]);
        assert_eq!(cfg.control_port, Some(6123));

        let cfg = load_config_from(&[bad, good]);
        assert_eq!(cfg.control_port, None);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
