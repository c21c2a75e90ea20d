//! Command-line remote for a running `autowatch`.
//!
//! ```text
//! autowatch-ctl [--port PORT] status
//! autowatch-ctl speed 2
//! autowatch-ctl delay 5
//! autowatch-ctl set fullscreen_mode=false
//! autowatch-ctl all-episodes | ongoing
//! ```

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};

use autowatch::core::config;

const USAGE: &str =
    "usage: autowatch-ctl [--port PORT] <status|settings|speed X|delay S|set KEY=VALUE|all-episodes|ongoing>";

enum Command {
    Get(&'static str),
    Post(&'static str, Value),
}

/// `true`/`false`, then numbers, then a bare string.
fn parse_value(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return json!(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return json!(f);
    }
    Value::String(raw.to_string())
}

fn first_arg<'a>(rest: &'a [String], name: &str) -> Result<&'a String> {
    rest.first()
        .ok_or_else(|| anyhow!("{} needs a value\n{}", name, USAGE))
}

fn parse_command(words: &[String]) -> Result<Command> {
    let (verb, rest) = words.split_first().ok_or_else(|| anyhow!(USAGE))?;

    Ok(match verb.as_str() {
        "status" => Command::Get("/status"),
        "settings" => Command::Get("/settings"),
        "speed" => {
            let speed: f64 = first_arg(rest, "speed")?.parse()?;
            Command::Post("/speed", json!({ "speed": speed }))
        }
        "delay" => {
            let delay: i64 = first_arg(rest, "delay")?.parse()?;
            Command::Post("/delay", json!({ "delay": delay }))
        }
        "set" => {
            if rest.is_empty() {
                bail!("set needs KEY=VALUE\n{}", USAGE);
            }
            let mut patch = serde_json::Map::new();
            for pair in rest {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| anyhow!("expected KEY=VALUE, got {}", pair))?;
                patch.insert(key.trim().to_string(), parse_value(value.trim()));
            }
            Command::Post("/settings", Value::Object(patch))
        }
        "all-episodes" => Command::Post("/navigate/all-episodes", Value::Null),
        "ongoing" => Command::Post("/navigate/ongoing", Value::Null),
        other => bail!("unknown command {}\n{}", other, USAGE),
    })
}

fn split_port(args: Vec<String>) -> Result<(Option<u16>, Vec<String>)> {
    let mut port = None;
    let mut rest = Vec::new();
    let mut iter = args.into_iter();
    while let Some(a) = iter.next() {
        if a == "--port" {
            let v = iter.next().ok_or_else(|| anyhow!("--port needs a value"))?;
            port = Some(v.parse()?);
        } else if let Some(v) = a.strip_prefix("--port=") {
            port = Some(v.parse()?);
        } else {
            rest.push(a);
        }
    }
    Ok((port, rest))
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let (port, words) = split_port(std::env::args().skip(1).collect())?;
    let command = parse_command(&words)?;
    let port = port.unwrap_or_else(|| config::load_config().resolve_control_port());

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;
    let base = format!("http://127.0.0.1:{}", port);

    let response = match command {
        Command::Get(path) => client.get(format!("{}{}", base, path)).send().await,
        Command::Post(path, Value::Null) => client.post(format!("{}{}", base, path)).send().await,
        Command::Post(path, body) => {
            client
                .post(format!("{}{}", base, path))
                .json(&body)
                .send()
                .await
        }
    }
    .map_err(|e| anyhow!("autowatch is not reachable on {}: {}", base, e))?;

    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        bail!("request failed with {}", status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn set_builds_a_typed_patch() {
        match parse_command(&words("set fullscreen_mode=false video_speed=2.5 click_delay=4 language=en"))
            .expect("valid command")
        {
            Command::Post(path, body) => {
                assert_eq!(path, "/settings");
                assert_eq!(
                    body,
                    json!({"fullscreen_mode": false, "video_speed": 2.5, "click_delay": 4, "language": "en"})
                );
            }
            Command::Get(_) => panic!("expected POST"),
        }
    }

    #[test]
    fn port_flag_is_split_off() {
        let (port, rest) = split_port(words("--port 6000 speed 3")).expect("valid args");
        assert_eq!(port, Some(6000));
        assert_eq!(rest, words("speed 3"));
    }

    #[test]
    fn bad_commands_are_rejected() {
        assert!(parse_command(&[]).is_err());
        assert!(parse_command(&words("speed")).is_err());
        assert!(parse_command(&words("speed fast")).is_err());
        assert!(parse_command(&words("set novalue")).is_err());
        assert!(parse_command(&words("launch")).is_err());
    }
}
