//! [`PageDriver`] over a live chromiumoxide `Page`, plus the plumbing that
//! turns observer binding calls into [`Trigger`]s.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::js_protocol::runtime::{AddBindingParams, EventBindingCalled};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::browser::driver::PageDriver;
use crate::browser::page_script::{observer_script, SIGNAL_BINDING};
use crate::core::types::{PageSignal, Trigger};
use crate::features::fullscreen::{
    custom_fullscreen_script, raise_overlay_script, FullscreenState, EXIT_FULLSCREEN_SCRIPT,
    FORCE_FULLSCREEN_SCRIPT, FULLSCREEN_STATE_SCRIPT,
};
use crate::features::visibility::{probe_script, ElementSnapshot};

/// Register the signal binding and install the observer on this and every
/// future document of `page`.
pub async fn attach(page: &Page) -> Result<()> {
    page.execute(AddBindingParams::new(SIGNAL_BINDING))
        .await
        .map_err(|e| anyhow!("Failed to add signal binding: {}", e))?;

    let script = observer_script();
    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(script.clone()))
        .await
        .map_err(|e| anyhow!("Failed to inject page observer: {}", e))?;

    // The current document predates the injection.
    if let Err(e) = page.evaluate(script).await {
        debug!("Observer not installed on current document: {}", e);
    }
    info!("Page observer attached");
    Ok(())
}

/// Forward observer signals from `page` into the trigger channel until
/// either side goes away.
pub async fn forward_signals(
    page: &Page,
    triggers: mpsc::Sender<Trigger>,
) -> Result<tokio::task::JoinHandle<()>> {
    let mut events = page
        .event_listener::<EventBindingCalled>()
        .await
        .map_err(|e| anyhow!("Failed to listen for binding calls: {}", e))?;

    Ok(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if event.name != SIGNAL_BINDING {
                continue;
            }
            let signal = match serde_json::from_str::<PageSignal>(&event.payload) {
                Ok(signal) => signal,
                Err(e) => {
                    warn!("Ignoring malformed page signal {:?}: {}", event.payload, e);
                    continue;
                }
            };
            if triggers.send(Trigger::Page(signal)).await.is_err() {
                break;
            }
        }
        debug!("Page signal stream ended");
    }))
}

#[derive(Clone, Debug)]
pub struct CdpDriver {
    page: Page,
}

impl CdpDriver {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// Evaluate `expression` (awaiting it if it is a promise) and decode the
    /// result. The value travels as a JSON string so `null` survives.
    async fn eval<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
        let wrapped = format!(
            "Promise.resolve({}).then(v => JSON.stringify(v === undefined ? null : v))",
            expression.trim().trim_end_matches(';')
        );
        let result = self
            .page
            .evaluate(wrapped)
            .await
            .map_err(|e| anyhow!("evaluate failed: {}", e))?;
        let json: String = result
            .into_value()
            .map_err(|e| anyhow!("evaluate returned no value: {}", e))?;
        serde_json::from_str(&json).with_context(|| format!("unexpected evaluation result {}", json))
    }
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn probe(&self, selectors: &[&str]) -> Result<Option<ElementSnapshot>> {
        self.eval(&probe_script(selectors)).await
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        self.eval(&format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
            js_string(selector)
        ))
        .await
    }

    async fn current_url(&self) -> Result<String> {
        self.eval("location.href").await
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| anyhow!("navigation to {} failed: {}", url, e))?;
        Ok(())
    }

    async fn link_href(&self, selector: &str) -> Result<Option<String>> {
        self.eval(&format!(
            "(() => {{ const a = document.querySelector({}); return a && a.href ? a.href : null; }})()",
            js_string(selector)
        ))
        .await
    }

    async fn fullscreen_state(&self) -> Result<FullscreenState> {
        self.eval(FULLSCREEN_STATE_SCRIPT).await
    }

    async fn request_fullscreen(&self) -> Result<bool> {
        self.eval(FORCE_FULLSCREEN_SCRIPT).await
    }

    async fn exit_fullscreen(&self) -> Result<()> {
        let _: bool = self.eval(EXIT_FULLSCREEN_SCRIPT).await?;
        Ok(())
    }

    async fn set_custom_fullscreen(&self, enable: bool) -> Result<bool> {
        self.eval(&custom_fullscreen_script(enable)).await
    }

    async fn raise_overlay(&self, selector: &str) -> Result<bool> {
        self.eval(&raise_overlay_script(selector)).await
    }

    async fn play_video(&self) -> Result<bool> {
        self.eval(
            r#"(async () => {
    const v = document.querySelector('video');
    if (!v) return false;
    try { await v.play(); return true; } catch (e) { return false; }
})()"#,
        )
        .await
    }

    async fn pause_video(&self) -> Result<()> {
        let _: bool = self
            .eval("(() => { const v = document.querySelector('video'); if (v && !v.paused) v.pause(); return true; })()")
            .await?;
        Ok(())
    }

    async fn set_playback_rate(&self, rate: f64) -> Result<bool> {
        self.eval(&format!(
            "(() => {{ const v = document.querySelector('video'); if (!v) return false; v.playbackRate = {}; return true; }})()",
            rate
        ))
        .await
    }

    async fn playback_rate(&self) -> Result<Option<f64>> {
        self.eval("(() => { const v = document.querySelector('video'); return v ? v.playbackRate : null; })()")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_strings_are_escaped() {
        assert_eq!(js_string(r#"a[title="x"]"#), r#""a[title=\"x\"]""#);
    }
}
