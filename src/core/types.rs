use serde::{Deserialize, Serialize};

use super::arbiter::ArbiterSnapshot;
use super::settings::{Settings, SettingsPatch};

/// Signal posted by the in-page observer through the CDP runtime binding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageSignal {
    /// Child-list mutation somewhere under `<body>` (throttled in-page).
    Mutation,
    Visibility { visible: bool },
    Fullscreen { active: bool },
    Load { url: String },
    UrlChange { url: String },
    BeforeUnload,
    Playing,
    RateChange { rate: f64 },
}

/// Message from the control surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlMessage {
    UpdateSettings { settings: SettingsPatch },
    ChangeSpeed { speed: f64 },
    /// Click delay / global cooldown in seconds.
    UpdateDelay { delay: i64 },
    AllEpisodes,
    Ongoing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollSource {
    Baseline,
    HighSpeed,
}

/// Everything the autopilot reacts to, from every source, on one channel.
#[derive(Clone, Debug, PartialEq)]
pub enum Trigger {
    Page(PageSignal),
    Poll(PollSource),
    Message(ControlMessage),
}

impl From<PageSignal> for Trigger {
    fn from(signal: PageSignal) -> Self {
        Trigger::Page(signal)
    }
}

impl From<ControlMessage> for Trigger {
    fn from(message: ControlMessage) -> Self {
        Trigger::Message(message)
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionStatus {
    pub tab_active: bool,
    pub initialized: bool,
    pub remembered_fullscreen: bool,
    pub transitioning: bool,
    pub high_speed_monitor: bool,
    pub current_url: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusReport {
    pub generated_at: String,
    pub settings: Settings,
    pub session: SessionStatus,
    pub arbiter: ArbiterSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_signals_parse_from_observer_payloads() {
        let s: PageSignal = serde_json::from_str(r#"{"type":"mutation"}"#).expect("mutation");
        assert_eq!(s, PageSignal::Mutation);

        let s: PageSignal =
            serde_json::from_str(r#"{"type":"visibility","visible":false}"#).expect("visibility");
        assert_eq!(s, PageSignal::Visibility { visible: false });

        let s: PageSignal = serde_json::from_str(
            r#"{"type":"url_change","url":"https://jut.su/x/episode-2.html"}"#,
        )
        .expect("url change");
        assert!(matches!(s, PageSignal::UrlChange { .. }));

        assert!(serde_json::from_str::<PageSignal>(r#"{"type":"nope"}"#).is_err());
    }

    #[test]
    fn control_messages_use_action_tag() {
        let m: ControlMessage = serde_json::from_str(
            r#"{"action":"update_settings","settings":{"fullscreen_mode":false}}"#,
        )
        .expect("update settings");
        match m {
            ControlMessage::UpdateSettings { settings } => {
                assert_eq!(settings.fullscreen_mode, Some(false));
                assert_eq!(settings.skip_opening, None);
            }
            other => panic!("unexpected {:?}", other),
        }

        let m: ControlMessage =
            serde_json::from_str(r#"{"action":"update_delay","delay":5}"#).expect("delay");
        assert_eq!(m, ControlMessage::UpdateDelay { delay: 5 });

        let json = serde_json::to_string(&ControlMessage::Ongoing).expect("encode");
        assert_eq!(json, r#"{"action":"ongoing"}"#);
    }
}
