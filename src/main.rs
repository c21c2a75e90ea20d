use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use autowatch::browser::browser_manager::{BrowserSession, LaunchOptions};
use autowatch::browser::cdp::{self, CdpDriver};
use autowatch::control;
use autowatch::core::config::{self, AutowatchConfig};
use autowatch::core::settings::SettingsStore;
use autowatch::features::autopilot::{spawn_baseline_poller, Autopilot};
use autowatch::types::{PageSignal, Trigger};
use autowatch::AppState;

#[derive(Debug, Default)]
struct CliArgs {
    url: Option<String>,
    connect: Option<u16>,
    port: Option<u16>,
    headless: bool,
}

fn parse_args() -> CliArgs {
    let mut cli = CliArgs::default();
    let mut args = std::env::args().skip(1);
    while let Some(a) = args.next() {
        let (key, inline) = match a.split_once('=') {
            Some((k, v)) => (k.to_string(), Some(v.to_string())),
            None => (a.clone(), None),
        };
        let mut value = || inline.clone().or_else(|| args.next());
        match key.as_str() {
            "--url" => cli.url = value(),
            "--connect" => cli.connect = value().and_then(|v| v.parse().ok()),
            "--port" => cli.port = value().and_then(|v| v.parse().ok()),
            "--headless" => cli.headless = true,
            other => warn!("Ignoring unknown argument {}", other),
        }
    }
    cli
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = parse_args();
    let mut cfg: AutowatchConfig = config::load_config();
    if cli.url.is_some() {
        cfg.start_url = cli.url.clone();
    }
    if cli.port.is_some() {
        cfg.control_port = cli.port;
    }

    let state_dir = cfg.resolve_state_dir();
    let store = SettingsStore::in_dir(&state_dir);
    let settings = store.load().await;
    info!("Starting autowatch (state dir {})", state_dir.display());

    let start_url = cfg.resolve_start_url();
    let site_host = url::Url::parse(&cfg.resolve_site_url())
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();
    let poll_ms = cfg.resolve_poll_interval_ms();
    let control_port = cfg.resolve_control_port();
    let launch = LaunchOptions {
        executable: cfg.resolve_chrome_executable(),
        profile_dir: cfg.resolve_profile_dir(),
        headless: cli.headless,
    };

    let (state, triggers_rx) = AppState::new(cfg, settings, store);

    let session = match cli.connect {
        Some(port) => BrowserSession::connect(port, &site_host).await?,
        None => BrowserSession::launch(&launch).await?,
    };
    let page = session.page().clone();

    cdp::attach(&page).await?;
    let signal_task = cdp::forward_signals(&page, state.triggers.clone()).await?;

    let driver = Arc::new(CdpDriver::new(page.clone()));
    let autopilot = Autopilot::new(state.clone(), driver);
    let autopilot_task = tokio::spawn(autopilot.run(triggers_rx));

    let poller = (poll_ms > 0).then(|| {
        info!("Baseline poller every {}ms", poll_ms);
        spawn_baseline_poller(state.triggers.clone(), Duration::from_millis(poll_ms))
    });

    let current = page.url().await.ok().flatten().unwrap_or_default();
    if current.is_empty() || current == "about:blank" {
        info!("Opening {}", start_url);
        page.goto(start_url.as_str())
            .await
            .with_context(|| format!("Failed to open {}", start_url))?;
    } else {
        // Attached to a page that already finished loading.
        let _ = state
            .triggers
            .send(Trigger::Page(PageSignal::Load { url: current }))
            .await;
    }

    let state = Arc::new(state);
    let served = control::serve(state.clone(), control_port, async move {
        tokio::select! {
            _ = shutdown_signal() => info!("Shutdown requested"),
            _ = wait_for_browser(&session) => info!("Browser closed"),
        }
        session.close().await;
    })
    .await;

    if let Some(poller) = poller {
        poller.abort();
    }
    signal_task.abort();
    autopilot_task.abort();
    served
}

async fn wait_for_browser(session: &BrowserSession) {
    session.wait_closed().await;
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
