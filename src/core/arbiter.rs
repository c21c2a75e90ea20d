//! Overclick protection.
//!
//! The [`Arbiter`] is the single authority on whether a named action may run
//! right now and the single recorder of the fact that it did. Triggers arrive
//! from several independent sources (page mutation bursts, pollers, visibility
//! changes, control messages) and frequently ask for the same action at nearly
//! the same time; the arbiter turns that into at most one execution per
//! cooldown window.
//!
//! Three independent suppression layers exist:
//! * **cooldown**: `now - last_run <= cooldown` denies (strictly more time than
//!   the cooldown must have passed),
//! * **block set**: explicit timed suppression layered on top of the cooldown,
//! * **navigation lockout**: while a page transition is in flight, every kind
//!   with a navigation role is denied.
//!
//! Block and navigation deadlines are stored as timestamps and checked lazily
//! on read, so there are no timers to cancel and `reset()` is always immediate.

use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::clock::{Clock, MonotonicClock};

/// Fallback cooldown for kinds without an explicit entry.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(3000);
/// Block duration used when `block_after_click` is set without a duration.
pub const DEFAULT_BLOCK_DURATION: Duration = Duration::from_millis(5000);
/// How long a recorded navigation hides navigation-class kinds if the page
/// never reports that it finished loading.
pub const DEFAULT_NAVIGATION_LOCKOUT: Duration = Duration::from_millis(5000);

// ─────────────────────────────────────────────────────────────────────────────
// Action kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque, open-ended name of a class of effect.
///
/// Well-known kinds are provided as constants; any other string is a valid
/// kind and falls back to [`DEFAULT_COOLDOWN`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionKind(Cow<'static, str>);

impl ActionKind {
    pub const SKIP_OPENING: ActionKind = ActionKind::from_static("skip-opening");
    pub const ADVANCE_EPISODE: ActionKind = ActionKind::from_static("advance-episode");
    pub const ADJUST_SPEED: ActionKind = ActionKind::from_static("adjust-speed");
    pub const TOGGLE_PANEL: ActionKind = ActionKind::from_static("toggle-panel");
    pub const GENERIC: ActionKind = ActionKind::from_static("generic");
    pub const AUTO_PLAY: ActionKind = ActionKind::from_static("auto-play");
    pub const RESTORE_FULLSCREEN: ActionKind = ActionKind::from_static("restore-fullscreen");

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionKind({})", self.0)
    }
}

impl From<&str> for ActionKind {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ActionKind {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Serialize for ActionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// How a kind relates to the navigation lockout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationRole {
    /// Never affected by the lockout.
    #[default]
    Independent,
    /// Denied while a navigation is in flight.
    Suppressed,
    /// Denied while a navigation is in flight, and starts one when recorded.
    Initiates,
}

impl NavigationRole {
    pub fn is_navigation_class(self) -> bool {
        !matches!(self, NavigationRole::Independent)
    }
}

/// Options for [`Arbiter::record_and_maybe_block`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockOptions {
    /// Suppress the kind for `block_duration` after recording it.
    pub block_after_click: bool,
    /// Defaults to [`DEFAULT_BLOCK_DURATION`].
    pub block_duration: Option<Duration>,
}

impl BlockOptions {
    pub fn block_for(duration: Duration) -> Self {
        Self {
            block_after_click: true,
            block_duration: Some(duration),
        }
    }
}

/// Why an authorization request was refused. Purely diagnostic: denial is a
/// normal outcome, never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    Navigating,
    Blocked { remaining_ms: u64 },
    CoolingDown { remaining_ms: u64 },
}

impl Denial {
    /// How long until this particular reason lapses. A navigation lockout
    /// has no fixed end from the caller's point of view and reports 0.
    pub fn remaining_ms(&self) -> u64 {
        match self {
            Denial::Navigating => 0,
            Denial::Blocked { remaining_ms } | Denial::CoolingDown { remaining_ms } => *remaining_ms,
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::Navigating => f.write_str("navigation in progress"),
            Denial::Blocked { remaining_ms } => write!(f, "blocked for {}ms", remaining_ms),
            Denial::CoolingDown { remaining_ms } => {
                write!(f, "cooling down for {}ms", remaining_ms)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Effect outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// Result of an effect run under [`Arbiter::perform_safe_action`].
///
/// `()` and `true` are success, `false` is an explicit failure, and `Err` is
/// a failure that gets logged.
pub trait EffectOutcome {
    fn succeeded(self, kind: &ActionKind) -> bool;
}

impl EffectOutcome for () {
    fn succeeded(self, _kind: &ActionKind) -> bool {
        true
    }
}

impl EffectOutcome for bool {
    fn succeeded(self, _kind: &ActionKind) -> bool {
        self
    }
}

impl<T, E> EffectOutcome for Result<T, E>
where
    T: EffectOutcome,
    E: fmt::Display,
{
    fn succeeded(self, kind: &ActionKind) -> bool {
        match self {
            Ok(value) => value.succeeded(kind),
            Err(e) => {
                error!("Error performing {}: {}", kind, e);
                false
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default)]
struct NavigationFlag {
    active: bool,
    /// `None` while active means "until cleared".
    expires_at: Option<u64>,
}

impl NavigationFlag {
    fn is_active(&self, now: u64) -> bool {
        self.active && self.expires_at.map_or(true, |until| now < until)
    }
}

#[derive(Debug)]
struct ArbiterState {
    cooldowns: HashMap<ActionKind, u64>,
    default_cooldown: u64,
    roles: HashMap<ActionKind, NavigationRole>,
    /// Last authorized execution per kind.
    ledger: HashMap<ActionKind, u64>,
    /// Block deadlines (exclusive).
    blocked: HashMap<ActionKind, u64>,
    navigation: NavigationFlag,
}

impl ArbiterState {
    fn with_defaults() -> Self {
        let cooldowns = HashMap::from([
            (ActionKind::SKIP_OPENING, 3000),
            (ActionKind::ADVANCE_EPISODE, 3000),
            (ActionKind::ADJUST_SPEED, 1000),
            (ActionKind::TOGGLE_PANEL, 2000),
            (ActionKind::GENERIC, 1000),
        ]);
        let roles = HashMap::from([
            (ActionKind::ADVANCE_EPISODE, NavigationRole::Initiates),
            (ActionKind::SKIP_OPENING, NavigationRole::Suppressed),
        ]);
        Self {
            cooldowns,
            default_cooldown: DEFAULT_COOLDOWN.as_millis() as u64,
            roles,
            ledger: HashMap::new(),
            blocked: HashMap::new(),
            navigation: NavigationFlag::default(),
        }
    }

    fn cooldown_ms(&self, kind: &ActionKind) -> u64 {
        self.cooldowns
            .get(kind)
            .copied()
            .unwrap_or(self.default_cooldown)
    }

    fn role(&self, kind: &ActionKind) -> NavigationRole {
        self.roles.get(kind).copied().unwrap_or_default()
    }

    fn denial(&self, kind: &ActionKind, now: u64) -> Option<Denial> {
        if self.navigation.is_active(now) && self.role(kind).is_navigation_class() {
            return Some(Denial::Navigating);
        }

        if let Some(&until) = self.blocked.get(kind) {
            if now < until {
                return Some(Denial::Blocked {
                    remaining_ms: until - now,
                });
            }
        }

        if let Some(&last) = self.ledger.get(kind) {
            let cooldown = self.cooldown_ms(kind);
            let elapsed = now.saturating_sub(last);
            if elapsed <= cooldown {
                return Some(Denial::CoolingDown {
                    remaining_ms: (cooldown - elapsed).saturating_add(1),
                });
            }
        }

        None
    }

    fn record(&mut self, kind: &ActionKind, now: u64, options: BlockOptions) {
        self.purge_expired(now);
        self.ledger.insert(kind.clone(), now);

        if options.block_after_click {
            let duration = options.block_duration.unwrap_or(DEFAULT_BLOCK_DURATION);
            self.blocked
                .insert(kind.clone(), now.saturating_add(duration_ms(duration)));
        }

        if self.role(kind) == NavigationRole::Initiates {
            self.navigation = NavigationFlag {
                active: true,
                expires_at: Some(now.saturating_add(duration_ms(DEFAULT_NAVIGATION_LOCKOUT))),
            };
        }
    }

    fn purge_expired(&mut self, now: u64) {
        self.blocked.retain(|_, until| now < *until);
        if self.navigation.active && !self.navigation.is_active(now) {
            self.navigation = NavigationFlag::default();
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn clamp_ms(ms: i64) -> u64 {
    ms.max(0) as u64
}

// ─────────────────────────────────────────────────────────────────────────────
// Arbiter
// ─────────────────────────────────────────────────────────────────────────────

/// Cooldown / block / navigation authority for one page session.
///
/// Every method takes the internal lock exactly once and never awaits while
/// holding it, so each call is atomic with respect to every other call, even
/// on a multi-threaded runtime. Use [`Arbiter::try_acquire`] (or the
/// `perform_safe_action*` helpers built on it) whenever the check and the
/// record must not be separated.
pub struct Arbiter {
    clock: Arc<dyn Clock>,
    state: Mutex<ArbiterState>,
}

impl fmt::Debug for Arbiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Arbiter")
            .field("tracked_kinds", &state.ledger.len())
            .field("blocked_kinds", &state.blocked.len())
            .field("navigating", &state.navigation.is_active(self.clock.now_ms()))
            .finish()
    }
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Arbiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(ArbiterState::with_defaults()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ArbiterState> {
        // A panic while holding the lock cannot leave the tables half-updated
        // in a way that matters; keep serving.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Authorization ───────────────────────────────────────────────────────

    /// May `kind` run now? Pure query.
    pub fn can_perform(&self, kind: &ActionKind) -> bool {
        self.denial(kind).is_none()
    }

    /// The reason `kind` would be refused right now, if any.
    pub fn denial(&self, kind: &ActionKind) -> Option<Denial> {
        let now = self.clock.now_ms();
        self.lock().denial(kind, now)
    }

    /// Record that `kind` ran now. Optionally block it, and start the
    /// navigation lockout when `kind` initiates navigation.
    pub fn record_and_maybe_block(&self, kind: &ActionKind, options: BlockOptions) {
        let now = self.clock.now_ms();
        self.lock().record(kind, now, options);
    }

    /// Atomic check-and-record. Returns `true` if the caller now owns this
    /// execution of `kind`.
    pub fn try_acquire(&self, kind: &ActionKind, options: BlockOptions) -> bool {
        let now = self.clock.now_ms();
        let mut state = self.lock();
        match state.denial(kind, now) {
            Some(reason) => {
                debug!("{} denied: {}", kind, reason);
                false
            }
            None => {
                state.record(kind, now, options);
                true
            }
        }
    }

    /// Run `effect` if `kind` is allowed. The cooldown is consumed on attempt,
    /// even when the effect fails.
    pub fn perform_safe_action<F, O>(&self, kind: &ActionKind, effect: F) -> bool
    where
        F: FnOnce() -> O,
        O: EffectOutcome,
    {
        self.perform_safe_action_with(kind, BlockOptions::default(), effect)
    }

    pub fn perform_safe_action_with<F, O>(
        &self,
        kind: &ActionKind,
        options: BlockOptions,
        effect: F,
    ) -> bool
    where
        F: FnOnce() -> O,
        O: EffectOutcome,
    {
        if !self.try_acquire(kind, options) {
            debug!("{} blocked due to cooldown", kind);
            return false;
        }
        let ok = effect().succeeded(kind);
        log_outcome(kind, ok);
        ok
    }

    /// Async form of [`Arbiter::perform_safe_action`]. The lock is released
    /// before the effect is polled.
    pub async fn perform_safe_action_async<F, Fut, O>(&self, kind: &ActionKind, effect: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = O>,
        O: EffectOutcome,
    {
        if !self.try_acquire(kind, BlockOptions::default()) {
            debug!("{} blocked due to cooldown", kind);
            return false;
        }
        let ok = effect().await.succeeded(kind);
        log_outcome(kind, ok);
        ok
    }

    // ── Navigation & blocks ─────────────────────────────────────────────────

    /// Set or clear the navigation lockout.
    ///
    /// `duration`: `None` uses [`DEFAULT_NAVIGATION_LOCKOUT`]; `Some(ZERO)`
    /// keeps the lockout until it is cleared explicitly.
    pub fn set_navigating(&self, active: bool, duration: Option<Duration>) {
        let now = self.clock.now_ms();
        let mut state = self.lock();
        state.navigation = if active {
            let duration = duration.unwrap_or(DEFAULT_NAVIGATION_LOCKOUT);
            NavigationFlag {
                active: true,
                expires_at: (!duration.is_zero())
                    .then(|| now.saturating_add(duration_ms(duration))),
            }
        } else {
            NavigationFlag::default()
        };
    }

    pub fn is_navigating(&self) -> bool {
        let now = self.clock.now_ms();
        self.lock().navigation.is_active(now)
    }

    /// Suppress `kind` for `duration`, independent of its cooldown.
    pub fn block(&self, kind: &ActionKind, duration: Duration) {
        let now = self.clock.now_ms();
        let mut state = self.lock();
        state.purge_expired(now);
        state
            .blocked
            .insert(kind.clone(), now.saturating_add(duration_ms(duration)));
    }

    // ── Configuration ───────────────────────────────────────────────────────

    pub fn set_cooldown(&self, kind: &ActionKind, cooldown: Duration) {
        self.lock().cooldowns.insert(kind.clone(), duration_ms(cooldown));
    }

    /// Settings-facing variant: negative values are clamped to zero.
    pub fn set_cooldown_ms(&self, kind: &ActionKind, ms: i64) {
        self.lock().cooldowns.insert(kind.clone(), clamp_ms(ms));
    }

    /// Set the cooldown of the navigation-affecting kinds and the fallback
    /// default, from a user-facing value in seconds.
    pub fn set_global_cooldown(&self, seconds: i64) {
        let ms = clamp_ms(seconds).saturating_mul(1000);
        let mut state = self.lock();
        state.cooldowns.insert(ActionKind::SKIP_OPENING, ms);
        state.cooldowns.insert(ActionKind::ADVANCE_EPISODE, ms);
        state.default_cooldown = ms;
        info!("Global cooldown set to {}ms", ms);
    }

    pub fn cooldown(&self, kind: &ActionKind) -> Duration {
        Duration::from_millis(self.lock().cooldown_ms(kind))
    }

    pub fn set_navigation_role(&self, kind: &ActionKind, role: NavigationRole) {
        self.lock().roles.insert(kind.clone(), role);
    }

    pub fn navigation_role(&self, kind: &ActionKind) -> NavigationRole {
        self.lock().role(kind)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Forget every execution, block and navigation lockout. Configuration
    /// (cooldowns, roles) is kept.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.ledger.clear();
        state.blocked.clear();
        state.navigation = NavigationFlag::default();
        debug!("Arbiter state reset");
    }

    /// Serializable view for status reporting.
    pub fn snapshot(&self) -> ArbiterSnapshot {
        let now = self.clock.now_ms();
        let state = self.lock();

        let kinds: BTreeSet<&ActionKind> = state
            .cooldowns
            .keys()
            .chain(state.ledger.keys())
            .chain(state.blocked.keys())
            .collect();

        let actions = kinds
            .into_iter()
            .map(|kind| {
                let cooldown_ms = state.cooldown_ms(kind);
                let last = state.ledger.get(kind).copied();
                let since_last_ms = last.map(|t| now.saturating_sub(t));
                let cooling_down_ms = since_last_ms
                    .filter(|elapsed| *elapsed <= cooldown_ms)
                    .map(|elapsed| (cooldown_ms - elapsed).saturating_add(1))
                    .unwrap_or(0);
                let blocked_ms = state
                    .blocked
                    .get(kind)
                    .filter(|until| now < **until)
                    .map(|until| until - now);
                ActionStatus {
                    kind: kind.clone(),
                    role: state.role(kind),
                    cooldown_ms,
                    since_last_ms,
                    cooling_down_ms,
                    blocked_ms,
                }
            })
            .collect();

        let navigating = state.navigation.is_active(now);
        ArbiterSnapshot {
            navigating,
            navigation_remaining_ms: navigating
                .then(|| state.navigation.expires_at.map(|until| until - now))
                .flatten(),
            default_cooldown_ms: state.default_cooldown,
            actions,
        }
    }
}

fn log_outcome(kind: &ActionKind, ok: bool) {
    if ok {
        info!("{} performed successfully", kind);
    } else {
        warn!("{} attempted but reported failure", kind);
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ActionStatus {
    pub kind: ActionKind,
    pub role: NavigationRole,
    pub cooldown_ms: u64,
    pub since_last_ms: Option<u64>,
    /// 0 when the kind is not cooling down.
    pub cooling_down_ms: u64,
    pub blocked_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ArbiterSnapshot {
    pub navigating: bool,
    pub navigation_remaining_ms: Option<u64>,
    pub default_cooldown_ms: u64,
    pub actions: Vec<ActionStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;

    fn arbiter_at(start: u64) -> (Arc<ManualClock>, Arbiter) {
        let clock = Arc::new(ManualClock::new(start));
        let arbiter = Arbiter::with_clock(clock.clone());
        (clock, arbiter)
    }

    #[test]
    fn unknown_kind_uses_default_cooldown() {
        let (_, arbiter) = arbiter_at(0);
        let kind = ActionKind::new("some-never-configured-kind");
        assert_eq!(arbiter.cooldown(&kind), DEFAULT_COOLDOWN);
        assert_eq!(arbiter.navigation_role(&kind), NavigationRole::Independent);
    }

    #[test]
    fn owned_and_static_kinds_are_the_same_key() {
        let (_, arbiter) = arbiter_at(0);
        arbiter.record_and_maybe_block(&ActionKind::new("skip-opening"), BlockOptions::default());
        assert!(!arbiter.can_perform(&ActionKind::SKIP_OPENING));
    }

    #[test]
    fn denial_reports_remaining_cooldown() {
        let (clock, arbiter) = arbiter_at(100);
        arbiter.record_and_maybe_block(&ActionKind::GENERIC, BlockOptions::default());
        clock.advance(400);
        assert_eq!(
            arbiter.denial(&ActionKind::GENERIC),
            Some(Denial::CoolingDown { remaining_ms: 601 })
        );
    }

    #[test]
    fn failed_effect_still_consumes_cooldown() {
        let (_, arbiter) = arbiter_at(0);
        let ok = arbiter.perform_safe_action(&ActionKind::GENERIC, || -> anyhow::Result<()> {
            anyhow::bail!("element detached")
        });
        assert!(!ok);
        assert!(!arbiter.can_perform(&ActionKind::GENERIC));

        let explicit = arbiter.perform_safe_action(&ActionKind::TOGGLE_PANEL, || false);
        assert!(!explicit);
        assert!(!arbiter.can_perform(&ActionKind::TOGGLE_PANEL));
    }

    #[test]
    fn unit_effect_counts_as_success() {
        let (_, arbiter) = arbiter_at(0);
        assert!(arbiter.perform_safe_action(&ActionKind::GENERIC, || ()));
    }

    #[test]
    fn negative_configuration_is_clamped() {
        let (clock, arbiter) = arbiter_at(0);
        arbiter.set_cooldown_ms(&ActionKind::GENERIC, -500);
        assert_eq!(arbiter.cooldown(&ActionKind::GENERIC), Duration::ZERO);

        arbiter.set_global_cooldown(-3);
        assert_eq!(arbiter.cooldown(&ActionKind::ADVANCE_EPISODE), Duration::ZERO);

        // A zero cooldown still needs one clock unit to pass.
        arbiter.record_and_maybe_block(&ActionKind::GENERIC, BlockOptions::default());
        assert!(!arbiter.can_perform(&ActionKind::GENERIC));
        clock.advance(1);
        assert!(arbiter.can_perform(&ActionKind::GENERIC));
    }

    #[test]
    fn global_cooldown_converts_seconds() {
        let (_, arbiter) = arbiter_at(0);
        arbiter.set_global_cooldown(5);
        assert_eq!(
            arbiter.cooldown(&ActionKind::SKIP_OPENING),
            Duration::from_secs(5)
        );
        assert_eq!(
            arbiter.cooldown(&ActionKind::new("whatever")),
            Duration::from_secs(5)
        );
        // Kinds with their own entries keep them.
        assert_eq!(
            arbiter.cooldown(&ActionKind::ADJUST_SPEED),
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn initiating_navigation_suppresses_the_navigation_class_only() {
        let (_, arbiter) = arbiter_at(0);
        assert!(arbiter.try_acquire(&ActionKind::ADVANCE_EPISODE, BlockOptions::default()));
        assert!(arbiter.is_navigating());
        assert_eq!(
            arbiter.denial(&ActionKind::SKIP_OPENING),
            Some(Denial::Navigating)
        );
        assert!(arbiter.can_perform(&ActionKind::ADJUST_SPEED));
    }

    #[test]
    fn indefinite_navigation_lasts_until_cleared() {
        let (clock, arbiter) = arbiter_at(0);
        arbiter.set_navigating(true, Some(Duration::ZERO));
        clock.advance(60_000);
        assert!(arbiter.is_navigating());
        arbiter.set_navigating(false, None);
        assert!(!arbiter.is_navigating());
    }

    #[test]
    fn snapshot_reports_live_state() {
        let (clock, arbiter) = arbiter_at(1_000);
        arbiter.record_and_maybe_block(
            &ActionKind::ADVANCE_EPISODE,
            BlockOptions::block_for(Duration::from_millis(2_000)),
        );
        clock.advance(500);

        let snap = arbiter.snapshot();
        assert!(snap.navigating);
        assert_eq!(snap.navigation_remaining_ms, Some(4_500));
        let advance = snap
            .actions
            .iter()
            .find(|a| a.kind == ActionKind::ADVANCE_EPISODE)
            .expect("advance-episode is tracked");
        assert_eq!(advance.since_last_ms, Some(500));
        assert_eq!(advance.blocked_ms, Some(1_500));
        assert_eq!(advance.cooling_down_ms, 2_501);
        assert_eq!(advance.role, NavigationRole::Initiates);
    }

    #[test]
    fn snapshot_serializes_kinds_as_strings() {
        let (_, arbiter) = arbiter_at(0);
        let json = serde_json::to_value(arbiter.snapshot()).expect("serializable");
        let kinds: Vec<&str> = json["actions"]
            .as_array()
            .expect("actions array")
            .iter()
            .filter_map(|a| a["kind"].as_str())
            .collect();
        assert!(kinds.contains(&"skip-opening"));
        assert!(kinds.contains(&"toggle-panel"));
    }
}
