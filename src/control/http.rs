use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::core::settings::{Settings, SettingsPatch};
use crate::core::types::{ControlMessage, StatusReport, Trigger};
use crate::core::AppState;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("invalid speed {0}: expected a finite rate in (0, 16]")]
    InvalidSpeed(f64),

    #[error("settings patch is empty")]
    EmptyPatch,

    #[error("autopilot is not running")]
    AutopilotUnavailable,
}

impl ControlError {
    fn status(&self) -> StatusCode {
        match self {
            ControlError::InvalidSpeed(_) | ControlError::EmptyPatch => StatusCode::BAD_REQUEST,
            ControlError::AutopilotUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("Control request rejected: {}", self);
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpeedRequest {
    pub speed: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DelayRequest {
    /// Seconds; negative values are clamped to zero.
    pub delay: i64,
}

/// Acknowledgement for a message handed to the autopilot.
#[derive(Debug, Serialize, Deserialize)]
pub struct Accepted {
    pub accepted: bool,
    pub message: ControlMessage,
}

type ControlResult<T> = Result<T, ControlError>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
        .route("/settings", get(get_settings).post(update_settings))
        .route("/speed", post(change_speed))
        .route("/delay", post(update_delay))
        .route("/navigate/all-episodes", post(all_episodes))
        .route("/navigate/ongoing", post(ongoing))
        .route("/message", post(raw_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `127.0.0.1:<port>` and serve until `shutdown` resolves.
pub async fn serve(
    state: Arc<AppState>,
    port: u16,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let bind_addr = format!("127.0.0.1:{}", port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {}. Stop the existing process or run with --port {} (or set AUTOWATCH_CONTROL_PORT).",
                bind_addr,
                port.saturating_add(1)
            )
        }
        Err(e) => return Err(e.into()),
    };

    info!("Control API listening on http://{}", bind_addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn dispatch(state: &AppState, message: ControlMessage) -> ControlResult<Json<Accepted>> {
    state
        .triggers
        .send(Trigger::Message(message.clone()))
        .await
        .map_err(|_| ControlError::AutopilotUnavailable)?;
    Ok(Json(Accepted {
        accepted: true,
        message,
    }))
}

fn validate_speed(speed: f64) -> ControlResult<f64> {
    if speed.is_finite() && speed > 0.0 && speed <= 16.0 {
        Ok(speed)
    } else {
        Err(ControlError::InvalidSpeed(speed))
    }
}

fn validate(message: &ControlMessage) -> ControlResult<()> {
    match message {
        ControlMessage::ChangeSpeed { speed } => validate_speed(*speed).map(|_| ()),
        ControlMessage::UpdateSettings { settings } => {
            if settings.is_empty() {
                return Err(ControlError::EmptyPatch);
            }
            if let Some(speed) = settings.video_speed {
                validate_speed(speed)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "autowatch",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusReport> {
    Json(state.status_report().await)
}

async fn get_settings(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.settings.read().await.clone())
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SettingsPatch>,
) -> ControlResult<(StatusCode, Json<Accepted>)> {
    let message = ControlMessage::UpdateSettings { settings: patch };
    validate(&message)?;
    let accepted = dispatch(&state, message).await?;
    Ok((StatusCode::ACCEPTED, accepted))
}

async fn change_speed(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SpeedRequest>,
) -> ControlResult<(StatusCode, Json<Accepted>)> {
    let speed = validate_speed(request.speed)?;
    let accepted = dispatch(&state, ControlMessage::ChangeSpeed { speed }).await?;
    Ok((StatusCode::ACCEPTED, accepted))
}

async fn update_delay(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DelayRequest>,
) -> ControlResult<(StatusCode, Json<Accepted>)> {
    let delay = request.delay.max(0);
    let accepted = dispatch(&state, ControlMessage::UpdateDelay { delay }).await?;
    Ok((StatusCode::ACCEPTED, accepted))
}

async fn all_episodes(
    State(state): State<Arc<AppState>>,
) -> ControlResult<(StatusCode, Json<Accepted>)> {
    let accepted = dispatch(&state, ControlMessage::AllEpisodes).await?;
    Ok((StatusCode::ACCEPTED, accepted))
}

async fn ongoing(State(state): State<Arc<AppState>>) -> ControlResult<(StatusCode, Json<Accepted>)> {
    let accepted = dispatch(&state, ControlMessage::Ongoing).await?;
    Ok((StatusCode::ACCEPTED, accepted))
}

async fn raw_message(
    State(state): State<Arc<AppState>>,
    Json(message): Json<ControlMessage>,
) -> ControlResult<(StatusCode, Json<Accepted>)> {
    validate(&message)?;
    let accepted = dispatch(&state, message).await?;
    Ok((StatusCode::ACCEPTED, accepted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AutowatchConfig;
    use crate::core::settings::SettingsStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn test_state() -> (Arc<AppState>, mpsc::Receiver<Trigger>) {
        let store = SettingsStore::new(std::env::temp_dir().join("autowatch-http-test.json"));
        let (state, rx) = AppState::new(AutowatchConfig::default(), Settings::default(), store);
        (Arc::new(state), rx)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn health_reports_service() {
        let (state, _rx) = test_state();
        let response = router(state)
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["service"], "autowatch");
    }

    #[tokio::test]
    async fn status_includes_settings_and_arbiter() {
        let (state, _rx) = test_state();
        let response = router(state)
            .oneshot(Request::get("/status").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["settings"]["click_delay"], 3);
        assert_eq!(json["arbiter"]["navigating"], false);
        assert!(json["generated_at"].is_string());
    }

    #[tokio::test]
    async fn speed_is_forwarded_to_the_autopilot() {
        let (state, mut rx) = test_state();
        let response = router(state)
            .oneshot(post_json("/speed", r#"{"speed": 2.5}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            rx.try_recv().expect("queued trigger"),
            Trigger::Message(ControlMessage::ChangeSpeed { speed: 2.5 })
        );
    }

    #[tokio::test]
    async fn bad_speed_is_rejected_without_dispatch() {
        let (state, mut rx) = test_state();
        let response = router(state)
            .oneshot(post_json("/speed", r#"{"speed": 0}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap_or_default().contains("invalid speed"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn negative_delay_is_clamped() {
        let (state, mut rx) = test_state();
        let response = router(state)
            .oneshot(post_json("/delay", r#"{"delay": -4}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            rx.try_recv().expect("queued trigger"),
            Trigger::Message(ControlMessage::UpdateDelay { delay: 0 })
        );
    }

    #[tokio::test]
    async fn empty_settings_patch_is_rejected() {
        let (state, _rx) = test_state();
        let response = router(state)
            .oneshot(post_json("/settings", "{}"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn raw_message_and_navigation_routes() {
        let (state, mut rx) = test_state();
        let app = router(state);

        let response = app
            .clone()
            .oneshot(post_json("/message", r#"{"action":"ongoing"}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            rx.try_recv().expect("queued"),
            Trigger::Message(ControlMessage::Ongoing)
        );

        let response = app
            .oneshot(post_json("/navigate/all-episodes", ""))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            rx.try_recv().expect("queued"),
            Trigger::Message(ControlMessage::AllEpisodes)
        );
    }

    #[tokio::test]
    async fn closed_channel_is_service_unavailable() {
        let (state, rx) = test_state();
        drop(rx);
        let response = router(state)
            .oneshot(post_json("/navigate/ongoing", ""))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
