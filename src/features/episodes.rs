//! Episode page URLs and next-episode timing.

use std::time::Duration;
use url::Url;

/// Playback rate from which next-episode clicks are hurried and the
/// high-speed poller runs.
pub const HIGH_SPEED_THRESHOLD: f64 = 5.0;

/// Shortest wait before clicking "next episode" at high speed.
pub const MIN_HIGH_SPEED_DELAY: Duration = Duration::from_millis(500);

/// Series page for an episode page.
///
/// `https://jut.su/naruto/season-1/episode-3.html` → `https://jut.su/naruto/`.
/// Returns `None` when the URL is not an episode page.
pub fn all_episodes_url(episode_url: &str) -> Option<String> {
    let url = Url::parse(episode_url).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?;

    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .collect();
    let last = segments.last()?;
    if segments.len() < 2 || !last.starts_with("episode-") {
        return None;
    }

    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
    Some(format!(
        "{}://{}{}/{}/",
        url.scheme(),
        host,
        port,
        segments[0]
    ))
}

/// The site's list of currently airing series.
pub fn ongoing_url(site_url: &str) -> String {
    format!("{}/anime/ongoing", site_url.trim_end_matches('/'))
}

/// How long to wait before clicking the "next episode" overlay.
///
/// `click_delay_secs` seconds normally; at [`HIGH_SPEED_THRESHOLD`] and above
/// the delay is divided by the speed, but never below [`MIN_HIGH_SPEED_DELAY`].
pub fn next_click_delay(click_delay_secs: i64, speed: f64) -> Duration {
    let base_ms = click_delay_secs.max(0) as f64 * 1000.0;
    if speed.is_finite() && speed >= HIGH_SPEED_THRESHOLD {
        let hurried = (base_ms / speed).round();
        let floor = MIN_HIGH_SPEED_DELAY.as_millis() as f64;
        return Duration::from_millis(hurried.max(floor) as u64);
    }
    Duration::from_millis(base_ms as u64)
}
