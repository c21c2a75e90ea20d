//! Presentation mode: remembering fullscreen across episode transitions and
//! the page scripts that enter and leave it.
//!
//! Native fullscreen cannot survive a navigation, so the player is stretched
//! over the viewport with a "custom" presentation instead, and native
//! fullscreen is re-requested after playback resumes on the next page.

use serde::Serialize;

/// Restore attempts after the first one before giving up.
pub const MAX_RESTORE_RETRIES: u32 = 5;

pub const CUSTOM_FULLSCREEN_CLASS: &str = "autowatch-custom-fullscreen";
pub const FULLSCREEN_BODY_CLASS: &str = "autowatch-fullscreen-active";
pub const CUSTOM_FULLSCREEN_STYLE_ID: &str = "autowatch-custom-fullscreen-style";

/// What to do on a restore retry tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Fullscreen is back; stop retrying.
    Restored,
    /// Force fullscreen again and keep ticking.
    Retry { attempt: u32 },
    /// Out of retries.
    GiveUp,
}

/// Fullscreen memory for one tab.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FullscreenRestore {
    /// The player was in fullscreen when the last transition started.
    pub remembered: bool,
    /// The one restore attempt tied to playback start has been made.
    pub restore_attempted: bool,
    pub retries: u32,
}

impl FullscreenRestore {
    /// A page transition begins. Being in fullscreen now is remembered; not
    /// being in fullscreen keeps whatever was remembered before, since a
    /// freshly loaded page never starts in fullscreen.
    pub fn remember(&mut self, in_fullscreen: bool) {
        self.remembered |= in_fullscreen;
        self.reset_attempts();
    }

    pub fn forget(&mut self) {
        self.remembered = false;
    }

    pub fn reset_attempts(&mut self) {
        self.restore_attempted = false;
        self.retries = 0;
    }

    /// Claim the single post-playback restore. `false` if not remembered or
    /// already claimed.
    pub fn begin_restore(&mut self) -> bool {
        if !self.remembered || self.restore_attempted {
            return false;
        }
        self.restore_attempted = true;
        true
    }

    pub fn on_retry_tick(&mut self, is_fullscreen: bool) -> RetryDecision {
        self.retries += 1;
        if is_fullscreen {
            self.forget();
            return RetryDecision::Restored;
        }
        if self.retries >= MAX_RESTORE_RETRIES {
            self.forget();
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry {
            attempt: self.retries,
        }
    }
}

/// Native or custom fullscreen, as reported by [`FULLSCREEN_STATE_SCRIPT`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
pub struct FullscreenState {
    pub native: bool,
    pub custom: bool,
}

impl FullscreenState {
    pub fn any(self) -> bool {
        self.native || self.custom
    }
}

pub const PLAYER_SELECTORS: &[&str] = &[".video-js", "#my-player"];
pub const VIDEO_CONTAINER_SELECTOR: &str = ".video_plate";

/// Site chrome hidden while the custom presentation is active.
pub const SITE_CHROME_SELECTORS: &[&str] = &[
    ".header",
    ".menu_line",
    ".content_shadow",
    ".footer",
    ".side_block",
    ".side_block_left",
    ".side_block_right",
    ".side_block_top",
    ".side_block_bottom",
    ".notice_top2",
    ".notice_cont",
    ".notice",
    "[class*=\"notice\"]",
    "[class*=\"popup\"]",
    "[class*=\"modal\"]",
    "[class*=\"overlay\"]:not(.vjs-overlay-skip-intro)",
    ".video_ad_content",
    ".video_ad_text",
    ".video_bottom_related",
    ".video_bottom_title",
    ".video_bottom_related_new",
    ".video_bottom_title_new",
    ".info_panel.clear",
];

/// Inline style properties saved to `data-autowatch-*` before stretching.
const PLAYER_SAVED_PROPS: &[&str] = &["width", "height", "position", "zIndex"];
const CONTAINER_SAVED_PROPS: &[&str] = &[
    "width", "height", "position", "zIndex", "margin", "padding", "top", "left", "maxWidth",
];

pub const FULLSCREEN_STATE_SCRIPT: &str = r#"(() => {
    const player = document.querySelector('.video-js');
    const native = !!(document.fullscreenElement || document.webkitFullscreenElement
        || document.mozFullScreenElement || document.msFullscreenElement);
    const custom = !!(document.querySelector('.autowatch-custom-fullscreen')
        || (player && player.classList.contains('vjs-fullscreen')));
    return { native, custom };
})()"#;

pub const EXIT_FULLSCREEN_SCRIPT: &str = r#"(() => {
    const exit = document.exitFullscreen || document.webkitExitFullscreen
        || document.mozCancelFullScreen || document.msExitFullscreen;
    if ((document.fullscreenElement || document.webkitFullscreenElement) && exit) {
        try { const p = exit.call(document); if (p && p.catch) p.catch(() => {}); } catch (e) {}
    }
    return true;
})()"#;

fn json_list(items: &[&str]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn stylesheet() -> String {
    format!(
        r#"
.{cls} {{
  position: fixed !important; top: 0 !important; left: 0 !important;
  width: 100vw !important; height: 100vh !important;
  max-width: 100vw !important; max-height: 100vh !important;
  z-index: 999999 !important; background: #000 !important;
  margin: 0 !important; padding: 0 !important; border: none !important;
  display: flex !important; align-items: center !important; justify-content: center !important;
}}
.{cls} video {{
  width: 100% !important; height: 100% !important;
  max-width: 100% !important; max-height: 100% !important; object-fit: contain !important;
}}
.{cls} .vjs-control-bar {{ z-index: 1000000 !important; }}
.vjs-overlay-skip-intro {{
  z-index: 1000001 !important; position: fixed !important;
  visibility: visible !important; opacity: 1 !important; pointer-events: auto !important;
}}
.vjs-overlay-bottom-left.vjs-overlay-skip-intro {{ bottom: 70px !important; left: 20px !important; }}
.vjs-overlay-bottom-right.vjs-overlay-skip-intro {{ bottom: 70px !important; right: 20px !important; }}
body.{body} {{ overflow: hidden !important; }}
body.{body} [class*="notice"],
body.{body} [class*="popup"],
body.{body} [class*="modal"],
body.{body} [class*="overlay"]:not(.vjs-overlay-skip-intro) {{
  display: none !important; z-index: -1 !important; opacity: 0 !important; visibility: hidden !important;
}}
"#,
        cls = CUSTOM_FULLSCREEN_CLASS,
        body = FULLSCREEN_BODY_CLASS,
    )
}

/// Script that applies (`enable`) or tears down the custom presentation.
/// Evaluates to `false` when no player is on the page.
pub fn custom_fullscreen_script(enable: bool) -> String {
    let css = serde_json::to_string(&stylesheet()).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(() => {{
    const enable = {enable};
    const players = {players};
    let player = null;
    for (const sel of players) {{ player = document.querySelector(sel); if (player) break; }}
    if (!player) return false;
    const container = document.querySelector({container:?});

    const save = (el, props) => props.forEach(p => {{
        const key = 'autowatch' + p[0].toUpperCase() + p.slice(1);
        if (el.dataset[key] === undefined) el.dataset[key] = el.style[p] || '';
    }});
    const restore = (el, props) => props.forEach(p => {{
        const key = 'autowatch' + p[0].toUpperCase() + p.slice(1);
        el.style[p] = el.dataset[key] || '';
        delete el.dataset[key];
    }});
    const chrome = {chrome};

    if (enable) {{
        save(player, {player_props});
        if (container) {{
            save(container, {container_props});
            container.style.width = '100%';
            container.style.maxWidth = '100%';
            container.style.margin = '0';
            container.style.padding = '0';
        }}
        if (!document.getElementById({style_id:?})) {{
            const style = document.createElement('style');
            style.id = {style_id:?};
            style.textContent = {css};
            document.head.appendChild(style);
        }}
        player.classList.add({cls:?});
        document.body.classList.add({body:?});
        chrome.forEach(sel => document.querySelectorAll(sel).forEach(el => {{
            if (el.dataset.autowatchDisplay === undefined) el.dataset.autowatchDisplay = el.style.display || '';
            el.style.display = 'none';
        }}));
    }} else {{
        const style = document.getElementById({style_id:?});
        if (style) style.remove();
        player.classList.remove({cls:?});
        document.body.classList.remove({body:?});
        restore(player, {player_props});
        if (container) restore(container, {container_props});
        chrome.forEach(sel => document.querySelectorAll(sel).forEach(el => {{
            el.style.display = el.dataset.autowatchDisplay || '';
            delete el.dataset.autowatchDisplay;
        }}));
    }}
    return true;
}})()"#,
        enable = enable,
        players = json_list(PLAYER_SELECTORS),
        container = VIDEO_CONTAINER_SELECTOR,
        chrome = json_list(SITE_CHROME_SELECTORS),
        player_props = json_list(PLAYER_SAVED_PROPS),
        container_props = json_list(CONTAINER_SAVED_PROPS),
        style_id = CUSTOM_FULLSCREEN_STYLE_ID,
        css = css,
        cls = CUSTOM_FULLSCREEN_CLASS,
        body = FULLSCREEN_BODY_CLASS,
    )
}

/// Every way of getting the player into fullscreen, in order: the control
/// bar button, the VideoJS API, the vendor-prefixed native API, and finally
/// the VideoJS fullscreen classes. Evaluates to `false` without a player.
pub const FORCE_FULLSCREEN_SCRIPT: &str = r#"(() => {
    const player = document.querySelector('.video-js');
    if (!player) return false;

    player.classList.add('vjs-user-active');
    player.classList.remove('vjs-user-inactive');
    player.dispatchEvent(new MouseEvent('mousemove', {
        view: window, bubbles: true, cancelable: true,
        clientX: player.offsetWidth / 2, clientY: player.offsetHeight / 2
    }));

    const button = player.querySelector('.vjs-fullscreen-control');
    if (button) {
        ['mouseover', 'mouseenter', 'mousedown', 'mouseup', 'click'].forEach(name => {
            try {
                button.dispatchEvent(new MouseEvent(name, { view: window, bubbles: true, cancelable: true, buttons: 1 }));
            } catch (e) {}
        });
    }

    try {
        if (typeof videojs !== 'undefined' && player.id) {
            const vjs = videojs(player.id);
            if (vjs && vjs.requestFullscreen) vjs.requestFullscreen();
            else if (vjs && vjs.enterFullScreen) vjs.enterFullScreen();
        }
    } catch (e) {}

    try {
        const req = player.requestFullscreen || player.webkitRequestFullscreen
            || player.mozRequestFullScreen || player.msRequestFullscreen;
        if (req) { const p = req.call(player); if (p && p.catch) p.catch(() => {}); }
    } catch (e) {}

    player.classList.add('vjs-fullscreen');
    document.body.classList.add('vjs-full-window');
    return true;
})()"#;

/// Lift an overlay button above the custom presentation layer.
pub fn raise_overlay_script(selector: &str) -> String {
    let sel = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(() => {{
    const el = document.querySelector({sel});
    if (!el) return false;
    el.style.zIndex = '1000001';
    el.style.position = 'fixed';
    el.style.pointerEvents = 'auto';
    return true;
}})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_ticks_give_up_after_five_misses() {
        let mut restore = FullscreenRestore::default();
        restore.remember(true);
        for attempt in 1..MAX_RESTORE_RETRIES {
            assert_eq!(restore.on_retry_tick(false), RetryDecision::Retry { attempt });
            assert!(restore.remembered);
        }
        let last = restore.on_retry_tick(false);
        assert_eq!(last, RetryDecision::GiveUp);
        assert!(!restore.remembered);
    }

    #[test]
    fn success_forgets_remembered_state() {
        let mut restore = FullscreenRestore::default();
        restore.remember(true);
        assert_eq!(restore.on_retry_tick(false), RetryDecision::Retry { attempt: 1 });
        assert_eq!(restore.on_retry_tick(true), RetryDecision::Restored);
        assert!(!restore.remembered);
    }

    #[test]
    fn restore_is_claimed_once_per_transition() {
        let mut restore = FullscreenRestore::default();
        assert!(!restore.begin_restore(), "nothing remembered");

        restore.remember(true);
        assert!(restore.begin_restore());
        assert!(!restore.begin_restore());

        restore.remember(true);
        assert!(restore.begin_restore(), "new transition resets the claim");
    }

    #[test]
    fn remembered_state_survives_a_plain_transition() {
        let mut restore = FullscreenRestore::default();
        restore.remember(true);
        restore.remember(false);
        assert!(restore.remembered);
        restore.forget();
        restore.remember(false);
        assert!(!restore.remembered);
    }

    #[test]
    fn fullscreen_state_any() {
        assert!(!FullscreenState::default().any());
        assert!(FullscreenState { native: false, custom: true }.any());
    }

    #[test]
    fn presentation_scripts_reference_player_and_classes() {
        let on = custom_fullscreen_script(true);
        assert!(on.contains("const enable = true;"));
        assert!(on.contains(CUSTOM_FULLSCREEN_CLASS));
        assert!(on.contains(".video_plate"));
        assert!(on.contains("info_panel"));

        let off = custom_fullscreen_script(false);
        assert!(off.contains("const enable = false;"));

        let raise = raise_overlay_script(".vjs-overlay-skip-intro");
        assert!(raise.contains(r#"document.querySelector(".vjs-overlay-skip-intro")"#));
    }
}
