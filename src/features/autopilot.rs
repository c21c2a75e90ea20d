//! Trigger dispatch: turns page signals, poll ticks and control messages into
//! arbitrated player actions.
//!
//! One task consumes the trigger channel and handles triggers in order.
//! Anything that has to happen "later" (the delayed next-episode click,
//! playback after a transition, fullscreen retries) runs in a detached task
//! that re-checks the tab and page before acting.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser::driver::{selectors, PageDriver};
use crate::core::app_state::AppState;
use crate::core::arbiter::{ActionKind, BlockOptions};
use crate::core::settings::{sanitize_speed, Settings, SettingsChange, SettingsPatch};
use crate::core::types::{ControlMessage, PageSignal, PollSource, SessionStatus, Trigger};
use crate::features::episodes::{self, HIGH_SPEED_THRESHOLD};
use crate::features::fullscreen::{FullscreenRestore, RetryDecision};
use crate::features::visibility::{is_visible, ElementSnapshot};

pub const HIGH_SPEED_POLL: Duration = Duration::from_millis(500);
/// After a click on the next-episode overlay, how long to wait before
/// falling back to the plain "next episode" link.
pub const NAVIGATION_FALLBACK_DELAY: Duration = Duration::from_millis(1000);
pub const TRANSITION_WINDOW: Duration = Duration::from_millis(2000);
pub const TRANSITION_SETTLE: Duration = Duration::from_millis(1000);
pub const URL_CHANGE_SETTLE: Duration = Duration::from_millis(1500);
pub const PLAYBACK_START_DELAY: Duration = Duration::from_millis(3000);
pub const RESTORE_RETRY_INTERVAL: Duration = Duration::from_millis(1500);
pub const INIT_PRESENTATION_DELAY: Duration = Duration::from_millis(2000);
pub const VISIBLE_RESTORE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug)]
struct Session {
    tab_active: bool,
    initialized: bool,
    transitioning: bool,
    restore: FullscreenRestore,
    current_url: Option<String>,
    /// Bumped whenever the document goes away; delayed work from an older
    /// page compares against it and bails out.
    page_epoch: u64,
    high_speed: Option<JoinHandle<()>>,
    /// Speed choice waiting for the adjust-speed cooldown to lapse.
    pending_speed: Option<JoinHandle<()>>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            tab_active: true,
            initialized: false,
            transitioning: false,
            restore: FullscreenRestore::default(),
            current_url: None,
            page_epoch: 0,
            high_speed: None,
            pending_speed: None,
        }
    }
}

impl Session {
    fn status(&self) -> SessionStatus {
        SessionStatus {
            tab_active: self.tab_active,
            initialized: self.initialized,
            remembered_fullscreen: self.restore.remembered,
            transitioning: self.transitioning,
            high_speed_monitor: self
                .high_speed
                .as_ref()
                .is_some_and(|handle| !handle.is_finished()),
            current_url: self.current_url.clone(),
        }
    }

    fn stop_high_speed(&mut self) {
        if let Some(handle) = self.high_speed.take() {
            handle.abort();
        }
    }

    fn cancel_pending_speed(&mut self) {
        if let Some(handle) = self.pending_speed.take() {
            handle.abort();
        }
    }
}

/// Reacts to [`Trigger`]s against one page through a [`PageDriver`].
#[derive(Clone)]
pub struct Autopilot {
    state: AppState,
    driver: Arc<dyn PageDriver>,
    session: Arc<Mutex<Session>>,
}

impl std::fmt::Debug for Autopilot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autopilot")
            .field("session", &self.session_status())
            .finish()
    }
}

impl Autopilot {
    pub fn new(state: AppState, driver: Arc<dyn PageDriver>) -> Self {
        Self {
            state,
            driver,
            session: Arc::new(Mutex::new(Session::default())),
        }
    }

    /// Consume triggers until every sender is gone.
    pub async fn run(self, mut triggers: mpsc::Receiver<Trigger>) {
        info!("Autopilot started");
        while let Some(trigger) = triggers.recv().await {
            self.handle(trigger).await;
        }
        self.with_session(|s| {
            s.stop_high_speed();
            s.cancel_pending_speed();
        });
        info!("Trigger channel closed, autopilot stopping");
    }

    /// Handle one trigger. Errors are logged here and never escape.
    pub async fn handle(&self, trigger: Trigger) {
        debug!("Trigger: {:?}", trigger);
        let result = match trigger {
            Trigger::Page(signal) => self.on_page_signal(signal).await,
            Trigger::Poll(PollSource::Baseline) => self.scan_overlays().await,
            Trigger::Poll(PollSource::HighSpeed) => self.scan_next_episode_only().await,
            Trigger::Message(message) => self.on_message(message).await,
        };
        if let Err(e) = result {
            warn!("Autopilot: trigger handling failed: {:#}", e);
        }
        self.publish();
    }

    pub fn session_status(&self) -> SessionStatus {
        self.with_session(|s| s.status())
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut guard = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    fn publish(&self) {
        self.state.publish_session(self.session_status());
    }

    fn tab_active(&self) -> bool {
        self.with_session(|s| s.tab_active)
    }

    fn page_epoch(&self) -> u64 {
        self.with_session(|s| s.page_epoch)
    }

    /// Still the same document, and still on screen?
    fn still_current(&self, epoch: u64) -> bool {
        self.with_session(|s| s.tab_active && s.page_epoch == epoch)
    }

    async fn settings(&self) -> Settings {
        self.state.settings.read().await.clone()
    }

    // ── Page signals ────────────────────────────────────────────────────────

    async fn on_page_signal(&self, signal: PageSignal) -> Result<()> {
        match signal {
            PageSignal::Visibility { visible } => return self.on_visibility(visible).await,
            PageSignal::BeforeUnload => {
                self.on_before_unload();
                return Ok(());
            }
            _ => {}
        }
        if !self.tab_active() {
            debug!("Tab hidden, ignoring {:?}", signal);
            return Ok(());
        }

        match signal {
            PageSignal::Mutation => self.scan_overlays().await,
            PageSignal::Fullscreen { active } => self.on_fullscreen_change(active).await,
            PageSignal::Load { url } => self.on_load(url).await,
            PageSignal::UrlChange { url } => {
                info!("URL changed to {}", url);
                self.with_session(|s| s.current_url = Some(url));
                let this = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(URL_CHANGE_SETTLE).await;
                    if let Err(e) = this.page_transition("url change").await {
                        warn!("Page transition after URL change failed: {:#}", e);
                    }
                    this.publish();
                });
                Ok(())
            }
            PageSignal::Playing => self.on_playing().await,
            PageSignal::RateChange { rate } => {
                if rate < HIGH_SPEED_THRESHOLD {
                    self.with_session(|s| s.stop_high_speed());
                }
                Ok(())
            }
            PageSignal::Visibility { .. } | PageSignal::BeforeUnload => Ok(()),
        }
    }

    /// The document is going away: forget every execution and any lockout,
    /// and start the next document from scratch.
    fn on_before_unload(&self) {
        self.state.arbiter.reset();
        self.with_session(|s| {
            s.page_epoch += 1;
            s.initialized = false;
            s.transitioning = false;
            s.stop_high_speed();
            s.cancel_pending_speed();
        });
    }

    async fn on_visibility(&self, visible: bool) -> Result<()> {
        let (was_active, initialized) = self.with_session(|s| {
            let was = s.tab_active;
            s.tab_active = visible;
            if !visible {
                s.stop_high_speed();
            }
            (was, s.initialized)
        });

        if was_active && !visible {
            info!("Tab hidden: pausing video and leaving fullscreen");
            self.driver.pause_video().await.context("pause video")?;
            self.driver.exit_fullscreen().await.context("exit fullscreen")?;
            self.driver
                .set_custom_fullscreen(false)
                .await
                .context("remove custom fullscreen")?;
            return Ok(());
        }

        if !was_active && visible {
            if !initialized {
                return self.initialize().await;
            }
            let settings = self.settings().await;
            let remembered = self.with_session(|s| s.restore.remembered);
            if settings.fullscreen_mode && remembered {
                info!("Tab visible again: resuming in fullscreen");
                let this = self.clone();
                let epoch = self.page_epoch();
                tokio::spawn(async move {
                    tokio::time::sleep(VISIBLE_RESTORE_DELAY).await;
                    if !this.still_current(epoch) {
                        return;
                    }
                    if let Err(e) = this.driver.play_video().await {
                        warn!("Error playing video on tab activation: {:#}", e);
                    }
                    if let Err(e) = this.driver.set_custom_fullscreen(true).await {
                        warn!("Error applying custom fullscreen: {:#}", e);
                    }
                });
            }
        }
        Ok(())
    }

    async fn on_fullscreen_change(&self, active: bool) -> Result<()> {
        let settings = self.settings().await;
        let apply_custom = !active && settings.fullscreen_mode;
        debug!(
            "Fullscreen changed (native = {}), custom presentation = {}",
            active, apply_custom
        );
        self.driver.set_custom_fullscreen(apply_custom).await?;
        Ok(())
    }

    async fn on_load(&self, url: String) -> Result<()> {
        info!("Page loaded: {}", url);
        self.state.arbiter.set_navigating(false, None);
        self.with_session(|s| s.current_url = Some(url));
        self.page_transition("page load").await?;
        self.initialize().await
    }

    async fn on_playing(&self) -> Result<()> {
        let settings = self.settings().await;
        if !settings.fullscreen_mode {
            return Ok(());
        }
        if self.driver.fullscreen_state().await?.native {
            return Ok(());
        }
        let driver = self.driver.clone();
        self.state
            .arbiter
            .perform_safe_action_async(&ActionKind::RESTORE_FULLSCREEN, move || async move {
                enter_fullscreen(driver.as_ref()).await
            })
            .await;
        Ok(())
    }

    /// First-time setup for the current document.
    async fn initialize(&self) -> Result<()> {
        let claimed = self.with_session(|s| {
            if s.initialized || !s.tab_active {
                return false;
            }
            s.initialized = true;
            true
        });
        if !claimed {
            return Ok(());
        }

        let settings = self.settings().await;
        info!("Initializing page (speed {}x)", settings.video_speed);
        if settings.video_speed != 1.0 {
            self.apply_speed(settings.video_speed).await?;
        }

        if settings.fullscreen_mode {
            let this = self.clone();
            let epoch = self.page_epoch();
            tokio::spawn(async move {
                tokio::time::sleep(INIT_PRESENTATION_DELAY).await;
                if !this.still_current(epoch) || !this.settings().await.fullscreen_mode {
                    return;
                }
                if let Err(e) = this.driver.set_custom_fullscreen(true).await {
                    warn!("Error applying custom fullscreen on init: {:#}", e);
                }
            });
        }
        Ok(())
    }

    // ── Overlays ────────────────────────────────────────────────────────────

    async fn visible_element(&self, candidates: &[&str]) -> Result<Option<ElementSnapshot>> {
        let snapshot = self.driver.probe(candidates).await?;
        Ok(snapshot.filter(is_visible))
    }

    /// Look for the skip-opening and next-episode overlays and act on them.
    pub async fn scan_overlays(&self) -> Result<()> {
        if !self.tab_active() || self.state.arbiter.is_navigating() {
            return Ok(());
        }
        let settings = self.settings().await;
        if settings.skip_opening {
            self.try_skip_opening().await?;
        }
        if settings.auto_next_episode {
            self.try_advance_episode(&settings).await?;
        }
        Ok(())
    }

    async fn scan_next_episode_only(&self) -> Result<()> {
        if !self.tab_active() || self.state.arbiter.is_navigating() {
            return Ok(());
        }
        let settings = self.settings().await;
        if settings.auto_next_episode {
            self.try_advance_episode(&settings).await?;
        }
        Ok(())
    }

    async fn try_skip_opening(&self) -> Result<()> {
        let kind = ActionKind::SKIP_OPENING;
        if !self.state.arbiter.can_perform(&kind) {
            return Ok(());
        }
        let Some(overlay) = self.visible_element(selectors::SKIP_OPENING).await? else {
            return Ok(());
        };

        if self.driver.fullscreen_state().await?.any() {
            self.driver.raise_overlay(&overlay.selector).await?;
        }

        let driver = self.driver.clone();
        let selector = overlay.selector;
        self.state
            .arbiter
            .perform_safe_action_async(&kind, move || async move {
                info!("Skip opening overlay found, clicking it");
                driver.click(&selector).await
            })
            .await;
        Ok(())
    }

    async fn try_advance_episode(&self, settings: &Settings) -> Result<()> {
        let kind = ActionKind::ADVANCE_EPISODE;
        if !self.state.arbiter.can_perform(&kind) {
            return Ok(());
        }
        let Some(overlay) = self.visible_element(selectors::NEXT_EPISODE).await? else {
            return Ok(());
        };

        if !self.state.arbiter.try_acquire(&kind, BlockOptions::default()) {
            return Ok(());
        }

        let fullscreen = self.driver.fullscreen_state().await?;
        if fullscreen.any() {
            self.driver.raise_overlay(&overlay.selector).await?;
        }
        self.with_session(|s| s.restore.remember(fullscreen.any()));

        let delay = episodes::next_click_delay(settings.click_delay, settings.video_speed);
        let origin_url = self.driver.current_url().await?;
        info!(
            "Next episode overlay found, clicking in {}ms",
            delay.as_millis()
        );

        let this = self.clone();
        let epoch = self.page_epoch();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = this
                .click_next_episode(epoch, &origin_url, &overlay.selector)
                .await
            {
                warn!("Next episode click failed: {:#}", e);
            }
            this.publish();
        });
        Ok(())
    }

    async fn click_next_episode(&self, epoch: u64, origin_url: &str, selector: &str) -> Result<()> {
        if !self.still_current(epoch) {
            info!("Page changed or tab hidden before next episode click, skipping");
            return Ok(());
        }
        if self.driver.current_url().await? != origin_url {
            info!("URL changed before next episode click, skipping");
            return Ok(());
        }

        info!("Auto-clicking next episode overlay");
        self.driver.click(selector).await?;
        self.page_transition("next episode").await?;

        tokio::time::sleep(NAVIGATION_FALLBACK_DELAY).await;
        if self.driver.current_url().await? != origin_url {
            return Ok(());
        }
        if self.driver.probe(selectors::NEXT_EPISODE).await?.is_none() {
            return Ok(());
        }
        match self.driver.link_href(selectors::NEXT_EPISODE_LINK).await? {
            Some(href) => {
                info!("Next episode click did not navigate, going to {}", href);
                self.driver.navigate(&href).await
            }
            None => {
                warn!("Next episode click did not navigate and no fallback link exists");
                Ok(())
            }
        }
    }

    // ── Transitions ─────────────────────────────────────────────────────────

    /// Capture fullscreen before the page changes and schedule playback (and
    /// fullscreen restore) on the page that follows.
    async fn page_transition(&self, reason: &str) -> Result<()> {
        if !self.tab_active() {
            debug!("Tab hidden, skipping page transition ({})", reason);
            return Ok(());
        }
        if !self.settings().await.fullscreen_mode {
            return Ok(());
        }
        let claimed = self.with_session(|s| {
            if s.transitioning {
                return false;
            }
            s.transitioning = true;
            true
        });
        if !claimed {
            return Ok(());
        }

        let in_fullscreen = match self.driver.fullscreen_state().await {
            Ok(state) => state.any(),
            Err(e) => {
                warn!("Could not read fullscreen state: {:#}", e);
                false
            }
        };
        let remembered = self.with_session(|s| {
            s.restore.remember(in_fullscreen);
            s.restore.remembered
        });
        info!(
            "Page transition ({}): fullscreen remembered = {}",
            reason, remembered
        );

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(TRANSITION_WINDOW).await;
            this.with_session(|s| s.transitioning = false);
        });

        let this = self.clone();
        let epoch = self.page_epoch();
        tokio::spawn(async move {
            tokio::time::sleep(TRANSITION_SETTLE).await;
            this.page_load_playback(epoch).await;
            this.publish();
        });
        Ok(())
    }

    async fn page_load_playback(&self, epoch: u64) {
        if !self.still_current(epoch) {
            return;
        }
        self.with_session(|s| s.restore.reset_attempts());

        tokio::time::sleep(PLAYBACK_START_DELAY).await;
        if !self.still_current(epoch) {
            return;
        }

        let restore = self.with_session(|s| s.restore.begin_restore());
        let driver = self.driver.clone();
        self.state
            .arbiter
            .perform_safe_action_async(&ActionKind::AUTO_PLAY, move || async move {
                start_playback(driver.as_ref()).await
            })
            .await;

        if !restore {
            return;
        }

        info!("Restoring fullscreen after playback start");
        if let Err(e) = enter_fullscreen(self.driver.as_ref()).await {
            warn!("Error restoring fullscreen: {:#}", e);
        }

        let mut ticker = tokio::time::interval(RESTORE_RETRY_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if !self.still_current(epoch) {
                debug!("Tab hidden or page changed, stopping fullscreen retries");
                return;
            }
            let in_fullscreen = match self.driver.fullscreen_state().await {
                Ok(state) => state.any(),
                Err(e) => {
                    warn!("Could not read fullscreen state: {:#}", e);
                    false
                }
            };
            match self.with_session(|s| s.restore.on_retry_tick(in_fullscreen)) {
                RetryDecision::Restored => {
                    info!("Fullscreen restored");
                    return;
                }
                RetryDecision::GiveUp => {
                    warn!("Giving up on fullscreen restore");
                    return;
                }
                RetryDecision::Retry { attempt } => {
                    debug!("Fullscreen restore retry #{}", attempt);
                    if let Err(e) = self.driver.request_fullscreen().await {
                        warn!("Fullscreen retry failed: {:#}", e);
                    }
                }
            }
        }
    }

    // ── Speed ───────────────────────────────────────────────────────────────

    async fn apply_speed(&self, speed: f64) -> Result<()> {
        let applied = self.driver.set_playback_rate(speed).await?;
        if !applied {
            debug!("No video element yet, speed {}x applied on next init", speed);
            return Ok(());
        }
        info!("Video speed set to {}x", speed);
        if speed >= HIGH_SPEED_THRESHOLD {
            self.start_high_speed_monitor();
        } else {
            self.with_session(|s| s.stop_high_speed());
        }
        Ok(())
    }

    /// Poll for the next-episode overlay every [`HIGH_SPEED_POLL`] while
    /// playback stays fast and the tab stays visible.
    fn start_high_speed_monitor(&self) {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HIGH_SPEED_POLL);
            loop {
                ticker.tick().await;
                let configured = this.state.settings.read().await.video_speed;
                let rate = match this.driver.playback_rate().await {
                    Ok(Some(rate)) => rate,
                    _ => configured,
                };
                if rate < HIGH_SPEED_THRESHOLD || !this.tab_active() {
                    info!("High speed monitoring stopped");
                    return;
                }
                if this
                    .state
                    .triggers
                    .try_send(Trigger::Poll(PollSource::HighSpeed))
                    .is_err()
                {
                    debug!("Trigger queue full or closed, dropping high speed tick");
                }
            }
        });
        self.with_session(|s| {
            s.stop_high_speed();
            s.high_speed = Some(handle);
        });
    }

    // ── Messages ────────────────────────────────────────────────────────────

    async fn on_message(&self, message: ControlMessage) -> Result<()> {
        match message {
            ControlMessage::UpdateSettings { settings } => {
                let change = self.update_settings(settings).await?;
                if change.speed_changed {
                    let speed = self.settings().await.video_speed;
                    self.change_speed(speed).await?;
                }
                Ok(())
            }
            ControlMessage::ChangeSpeed { speed } => {
                let speed = sanitize_speed(speed);
                self.update_settings(SettingsPatch {
                    video_speed: Some(speed),
                    ..Default::default()
                })
                .await?;
                // Applied even when unchanged so a reloaded video picks it up.
                self.change_speed(speed).await
            }
            ControlMessage::UpdateDelay { delay } => {
                self.update_settings(SettingsPatch {
                    click_delay: Some(delay),
                    ..Default::default()
                })
                .await?;
                self.state.arbiter.set_global_cooldown(delay);
                Ok(())
            }
            ControlMessage::AllEpisodes => {
                let url = self.driver.current_url().await?;
                match episodes::all_episodes_url(&url) {
                    Some(target) => {
                        info!("Navigating to episode list {}", target);
                        self.driver.navigate(&target).await
                    }
                    None => {
                        warn!("Current page is not an episode page: {}", url);
                        Ok(())
                    }
                }
            }
            ControlMessage::Ongoing => {
                let target = episodes::ongoing_url(&self.state.site_url());
                info!("Navigating to ongoing list {}", target);
                self.driver.navigate(&target).await
            }
        }
    }

    /// Apply `speed` now if adjust-speed is allowed, otherwise once its
    /// cooldown lapses, so the last choice always reaches the player.
    async fn change_speed(&self, speed: f64) -> Result<()> {
        if self.try_apply_speed(speed).await? {
            self.with_session(|s| s.cancel_pending_speed());
            return Ok(());
        }

        let applied = self.driver.playback_rate().await?;
        if applied.map_or(true, |rate| rate == speed) {
            self.with_session(|s| s.cancel_pending_speed());
            return Ok(());
        }
        let wait = self
            .state
            .arbiter
            .denial(&ActionKind::ADJUST_SPEED)
            .map_or(0, |reason| reason.remaining_ms());
        debug!("Speed {}x deferred by {}ms", speed, wait);

        let this = self.clone();
        let epoch = self.page_epoch();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(wait)).await;
            if !this.still_current(epoch) {
                return;
            }
            // A newer choice has its own schedule.
            if this.settings().await.video_speed != speed {
                return;
            }
            match this.try_apply_speed(speed).await {
                Ok(true) => {}
                Ok(false) => debug!("Deferred speed {}x still denied", speed),
                Err(e) => warn!("Deferred speed change failed: {:#}", e),
            }
            this.publish();
        });
        self.with_session(|s| {
            s.cancel_pending_speed();
            s.pending_speed = Some(handle);
        });
        Ok(())
    }

    async fn try_apply_speed(&self, speed: f64) -> Result<bool> {
        let this = self.clone();
        let performed = self
            .state
            .arbiter
            .perform_safe_action_async(&ActionKind::ADJUST_SPEED, move || async move {
                this.apply_speed(speed).await
            })
            .await;
        if performed && speed >= HIGH_SPEED_THRESHOLD {
            self.scan_next_episode_only().await?;
        }
        Ok(performed)
    }

    /// Apply, persist and react to a settings patch. Speed changes are left
    /// to the caller.
    async fn update_settings(&self, patch: SettingsPatch) -> Result<SettingsChange> {
        if patch.is_empty() {
            return Ok(SettingsChange::default());
        }
        let (change, snapshot) = {
            let mut settings = self.state.settings.write().await;
            let change = settings.apply(&patch);
            (change, settings.clone())
        };
        if !change.any {
            return Ok(change);
        }

        if let Err(e) = self.state.settings_store.save(&snapshot).await {
            warn!("Could not persist settings: {}", e);
        }

        if change.click_delay_changed {
            self.state.arbiter.set_global_cooldown(snapshot.click_delay);
        }

        if let Some(enabled) = change.fullscreen_mode {
            self.with_session(|s| s.restore.forget());
            if enabled {
                info!("Fullscreen mode enabled");
                self.driver.set_custom_fullscreen(true).await?;
            } else {
                info!("Fullscreen mode disabled");
                self.driver.exit_fullscreen().await?;
                self.driver.set_custom_fullscreen(false).await?;
            }
        }

        Ok(change)
    }
}

/// Native fullscreen, falling back to the custom presentation.
async fn enter_fullscreen(driver: &dyn PageDriver) -> Result<bool> {
    if driver.request_fullscreen().await? {
        return Ok(true);
    }
    driver.set_custom_fullscreen(true).await
}

/// `play()` on the video, falling back to the big play button.
async fn start_playback(driver: &dyn PageDriver) -> Result<bool> {
    if driver.play_video().await? {
        return Ok(true);
    }
    driver.click(selectors::BIG_PLAY_BUTTON).await
}

/// Emit a baseline poll tick every `every` until the channel closes.
pub fn spawn_baseline_poller(triggers: mpsc::Sender<Trigger>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match triggers.try_send(Trigger::Poll(PollSource::Baseline)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!("Trigger queue full, dropping baseline tick");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => return,
            }
        }
    })
}
