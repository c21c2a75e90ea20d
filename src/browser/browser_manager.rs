//! Browser process management using `chromiumoxide`.
//!
//! * Finding a usable browser executable (Chrome → Chromium → Brave, cross-platform).
//! * Launching a visible browser on a persistent profile, or attaching to one
//!   that is already running with `--remote-debugging-port`.
//! * Driving the CDP handler and noticing when the browser goes away.

use anyhow::{anyhow, Context, Result};
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(2000);

// ── Browser executable discovery ─────────────────────────────────────────────

/// Executable names looked up on `PATH`.
const PATH_NAMES: &[&str] = &[
    "google-chrome",
    "chromium",
    "chromium-browser",
    "chrome",
    "brave-browser",
    "brave",
];

/// Well-known install locations for this OS.
#[cfg(target_os = "macos")]
const INSTALL_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
];

#[cfg(target_os = "linux")]
const INSTALL_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/local/bin/chromium",
    "/usr/bin/brave-browser",
];

#[cfg(target_os = "windows")]
const INSTALL_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
const INSTALL_PATHS: &[&str] = &[];

/// Find a Chromium-family browser to watch in.
///
/// The configured `explicit` path wins when it exists, then `PATH`, then
/// [`INSTALL_PATHS`].
pub fn find_chrome_executable(explicit: Option<&str>) -> Option<String> {
    if let Some(p) = explicit {
        if Path::new(p).exists() {
            return Some(p.to_string());
        }
        warn!("Configured browser executable not found: {}", p);
    }

    let on_path = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
        .flat_map(|dir| PATH_NAMES.iter().map(move |name| dir.join(name)));

    on_path
        .chain(INSTALL_PATHS.iter().map(PathBuf::from))
        .find(|candidate| candidate.exists())
        .map(|found| found.to_string_lossy().into_owned())
}

// ── Launch config ────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub executable: Option<String>,
    pub profile_dir: PathBuf,
    pub headless: bool,
}

/// Build a `BrowserConfig` for watching: a normal window on a persistent
/// profile, with autoplay allowed without a user gesture.
pub fn build_watch_config(exe: &str, profile_dir: &Path, headless: bool) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .user_data_dir(profile_dir)
        .viewport(None)
        .arg("--autoplay-policy=no-user-gesture-required")
        .arg("--disable-infobars")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--start-maximized");

    if !headless {
        builder = builder.with_head();
    }

    builder
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {}", e))
}

// ── Session ──────────────────────────────────────────────────────────────────

/// One browser plus the tab being watched.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: tokio::task::JoinHandle<()>,
    closed: watch::Receiver<bool>,
    launched: bool,
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("launched", &self.launched)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl BrowserSession {
    /// Launch a browser and open a blank tab; navigate once the page is wired.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let exe = find_chrome_executable(options.executable.as_deref()).ok_or_else(|| {
            anyhow!("Browser executable not found (tried Chrome, Chromium, Brave); set CHROME_EXECUTABLE")
        })?;

        std::fs::create_dir_all(&options.profile_dir).with_context(|| {
            format!(
                "Failed to create browser profile dir {}",
                options.profile_dir.display()
            )
        })?;

        info!(
            "Launching {} (profile {}, headless = {})",
            exe,
            options.profile_dir.display(),
            options.headless
        );
        let config = build_watch_config(&exe, &options.profile_dir, options.headless)?;
        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        let (closed_tx, closed) = watch::channel(false);
        let handler_task = spawn_handler_task(handler, closed_tx);

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow!("Failed to open tab: {}", e))?;

        Ok(Self {
            browser,
            page,
            handler_task,
            closed,
            launched: true,
        })
    }

    /// Attach to a browser started with `--remote-debugging-port=<port>` and
    /// pick the tab whose URL contains `prefer_host`, or open a new one.
    pub async fn connect(port: u16, prefer_host: &str) -> Result<Self> {
        let (mut browser, handler) = connect_with_retries(port).await?;

        let (closed_tx, closed) = watch::channel(false);
        let handler_task = spawn_handler_task(handler, closed_tx);

        if let Err(e) = browser.fetch_targets().await {
            warn!("Could not list existing tabs: {}", e);
        }
        // Attached targets show up as pages asynchronously.
        tokio::time::sleep(Duration::from_millis(500)).await;

        let mut chosen = None;
        for page in browser.pages().await.unwrap_or_default() {
            let url = page.url().await.ok().flatten().unwrap_or_default();
            if !prefer_host.is_empty() && url.contains(prefer_host) {
                info!("Attaching to existing tab {}", url);
                chosen = Some(page);
                break;
            }
        }

        let page = match chosen {
            Some(p) => p,
            None => browser
                .new_page("about:blank")
                .await
                .map_err(|e| anyhow!("Failed to open tab: {}", e))?,
        };

        Ok(Self {
            browser,
            page,
            handler_task,
            closed,
            launched: false,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the CDP connection is gone (browser quit or crashed).
    pub async fn wait_closed(&self) {
        let mut closed = self.closed.clone();
        let _ = closed.wait_for(|c| *c).await;
    }

    /// Close the browser if we launched it; otherwise just detach.
    pub async fn close(mut self) {
        if self.launched && !self.is_closed() {
            info!("Closing browser");
            if let Err(e) = self.browser.close().await {
                warn!("Browser close failed: {}", e);
            }
            let _ = self.browser.wait().await;
        }
        self.handler_task.abort();
    }
}

async fn connect_with_retries(port: u16) -> Result<(Browser, chromiumoxide::Handler)> {
    let json_url = format!("http://127.0.0.1:{}/json/version", port);
    let mut last_error = None;

    for attempt in 1..=CONNECT_ATTEMPTS {
        let ws_url_result: Result<String> = async {
            let response = reqwest::get(&json_url)
                .await
                .map_err(|e| anyhow!("HTTP request failed: {}", e))?;
            let json: serde_json::Value = response
                .json()
                .await
                .map_err(|e| anyhow!("JSON parse failed: {}", e))?;
            json["webSocketDebuggerUrl"]
                .as_str()
                .ok_or_else(|| anyhow!("No webSocketDebuggerUrl in response"))
                .map(|s| s.to_string())
        }
        .await;

        match ws_url_result {
            Ok(ws_url) => {
                info!("Discovered CDP endpoint: {}", ws_url);
                match Browser::connect(ws_url).await {
                    Ok(pair) => return Ok(pair),
                    Err(e) => last_error = Some(anyhow!("Browser connect failed: {}", e)),
                }
            }
            Err(e) => last_error = Some(e),
        }

        if attempt < CONNECT_ATTEMPTS {
            info!("CDP connection attempt {} failed, retrying...", attempt);
            tokio::time::sleep(CONNECT_RETRY_DELAY).await;
        }
    }

    Err(anyhow!(
        "Failed to connect to the browser on port {} after {} attempts. Last error: {:?}",
        port,
        CONNECT_ATTEMPTS,
        last_error
    ))
}

fn spawn_handler_task(
    mut handler: chromiumoxide::Handler,
    closed: watch::Sender<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                warn!("chromiumoxide handler event error: {}", e);
            }
        }
        let _ = closed.send(true);
    })
}
