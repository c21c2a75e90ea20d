use anyhow::Result;
use async_trait::async_trait;

use crate::features::fullscreen::FullscreenState;
use crate::features::visibility::ElementSnapshot;

/// CSS selectors for the jut.su VideoJS player.
pub mod selectors {
    pub const SKIP_OPENING: &[&str] = &[
        ".vjs-skip-opening",
        "div.vjs-overlay.vjs-overlay-bottom-left.vjs-overlay-skip-intro.vjs-overlay-background",
    ];
    pub const NEXT_EPISODE: &[&str] = &[
        ".vjs-next-button",
        "div.vjs-overlay.vjs-overlay-bottom-right.vjs-overlay-skip-intro.vjs-overlay-background",
    ];
    /// Plain link under the player; used when clicking the overlay does not navigate.
    pub const NEXT_EPISODE_LINK: &str = "a.short-btn.green.video-page-next";
    pub const BIG_PLAY_BUTTON: &str = ".vjs-big-play-button";
}

/// Everything the autopilot needs from a page.
///
/// The CDP implementation lives in [`crate::browser::cdp::CdpDriver`]; tests
/// use an in-memory fake.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Snapshot of the first element matching any of `selectors`.
    async fn probe(&self, selectors: &[&str]) -> Result<Option<ElementSnapshot>>;

    /// Click the element matching `selector`. `Ok(false)` when absent.
    async fn click(&self, selector: &str) -> Result<bool>;

    async fn current_url(&self) -> Result<String>;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn link_href(&self, selector: &str) -> Result<Option<String>>;

    async fn fullscreen_state(&self) -> Result<FullscreenState>;

    /// Try every route into native fullscreen. `Ok(false)` without a player.
    async fn request_fullscreen(&self) -> Result<bool>;

    async fn exit_fullscreen(&self) -> Result<()>;

    async fn set_custom_fullscreen(&self, enable: bool) -> Result<bool>;

    async fn raise_overlay(&self, selector: &str) -> Result<bool>;

    /// Start playback. `Ok(false)` when there is no video or the page refused.
    async fn play_video(&self) -> Result<bool>;

    async fn pause_video(&self) -> Result<()>;

    /// `Ok(false)` when the page has no video yet.
    async fn set_playback_rate(&self, rate: f64) -> Result<bool>;

    async fn playback_rate(&self) -> Result<Option<f64>>;
}
