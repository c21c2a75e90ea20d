use std::sync::Arc;

use tokio::sync::mpsc;

use super::arbiter::Arbiter;
use super::config::AutowatchConfig;
use super::settings::{Settings, SettingsStore};
use super::types::{SessionStatus, StatusReport, Trigger};

/// Bound on queued triggers; pollers drop ticks rather than pile up.
pub const TRIGGER_CHANNEL_CAPACITY: usize = 256;

/// Shared handles for the autopilot, pollers and the control API.
#[derive(Clone)]
pub struct AppState {
    pub arbiter: Arc<Arbiter>,
    pub settings: Arc<tokio::sync::RwLock<Settings>>,
    pub settings_store: SettingsStore,
    /// Published by the autopilot after every trigger.
    pub session: Arc<std::sync::RwLock<SessionStatus>>,
    /// Sender side of the autopilot's trigger channel.
    pub triggers: mpsc::Sender<Trigger>,
    pub config: Arc<AutowatchConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("arbiter", &self.arbiter)
            .field("settings_path", &self.settings_store.path())
            .field("triggers_closed", &self.triggers.is_closed())
            .finish()
    }
}

impl AppState {
    /// Build the state plus the receiver the autopilot consumes.
    pub fn new(
        config: AutowatchConfig,
        settings: Settings,
        settings_store: SettingsStore,
    ) -> (Self, mpsc::Receiver<Trigger>) {
        let (triggers, rx) = mpsc::channel(TRIGGER_CHANNEL_CAPACITY);
        let arbiter = Arbiter::new();
        arbiter.set_global_cooldown(settings.click_delay);

        let state = Self {
            arbiter: Arc::new(arbiter),
            settings: Arc::new(tokio::sync::RwLock::new(settings)),
            settings_store,
            session: Arc::new(std::sync::RwLock::new(SessionStatus::default())),
            triggers,
            config: Arc::new(config),
        };
        (state, rx)
    }

    pub fn site_url(&self) -> String {
        self.config.resolve_site_url()
    }

    pub fn session(&self) -> SessionStatus {
        self.session
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn publish_session(&self, status: SessionStatus) {
        match self.session.write() {
            Ok(mut guard) => *guard = status,
            Err(poisoned) => *poisoned.into_inner() = status,
        }
    }

    pub async fn status_report(&self) -> StatusReport {
        StatusReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            settings: self.settings.read().await.clone(),
            session: self.session(),
            arbiter: self.arbiter.snapshot(),
        }
    }
}
