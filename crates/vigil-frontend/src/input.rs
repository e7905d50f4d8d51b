//! Line-based commands typed into the terminal.

use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Camera { command: String, parameters: Value },
    Acknowledge(String),
    /// Generic event sent over the channel.
    Send { event: String, payload: Value },
    /// Generic event sent in the next message batch.
    Batch { event: String, payload: Value },
    RequestFrame,
    ServerStatus,
    /// Correlated request for one kind of server data.
    Request(String),
    /// Alert volume in `[0, 1]`.
    Volume(f32),
    Quality(String),
    ToggleSound,
    Close(String),
    CloseAll,
    /// Runs the action attached to a notification.
    Activate(String),
    History,
    ClearHistory,
    ExportHistory(PathBuf),
    Violations,
    ClearViolations,
    ExportViolation(i64),
    ExportLogs,
    Health,
    TestAlarm,
    Reconnect,
    Status,
    Debug,
    Traffic(bool),
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  start | stop                    start or stop monitoring
  camera <command> [json]         send a camera command
  ack <alert id>                  acknowledge an alert
  send <event> [json]             send a raw channel event
  batch <event> [json]            send a raw event in the next batch
  frame | server-status           ask the server to push a frame or its status
  request <type>                  request server data and wait for the answer
  volume <0-100>                  set the alert volume
  quality <preset>                set the recording quality
  sound                           toggle notification sounds
  close <id> | close-all          dismiss notifications
  act <id>                        run a notification's action
  history | clear-history         show or clear the notification history
  export-history <path>           write the history as JSON
  violations | clear-violations   list or clear recorded violations
  export-violation <id>           download a violation's footage
  export-logs                     download the server logs
  health | test-alarm             system checks
  reconnect                       force a reconnect
  status | debug                  show dashboard or channel diagnostics
  traffic <on|off>                toggle the channel traffic log
  quit";

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "stop" => Command::Stop,
        "camera" => {
            let (command, parameters) = word_and_json(rest, "camera <command> [json]")?;
            Command::Camera {
                command,
                parameters,
            }
        }
        "ack" => Command::Acknowledge(required(rest, "ack <alert id>")?),
        "send" => {
            let (event, payload) = word_and_json(rest, "send <event> [json]")?;
            Command::Send { event, payload }
        }
        "batch" => {
            let (event, payload) = word_and_json(rest, "batch <event> [json]")?;
            Command::Batch { event, payload }
        }
        "frame" => Command::RequestFrame,
        "server-status" => Command::ServerStatus,
        "request" => Command::Request(required(rest, "request <type>")?),
        "volume" => Command::Volume(parse_volume(rest)?),
        "quality" => Command::Quality(required(rest, "quality <preset>")?),
        "sound" => Command::ToggleSound,
        "close" => Command::Close(required(rest, "close <id>")?),
        "close-all" => Command::CloseAll,
        "act" => Command::Activate(required(rest, "act <id>")?),
        "history" => Command::History,
        "clear-history" => Command::ClearHistory,
        "export-history" => {
            Command::ExportHistory(PathBuf::from(required(rest, "export-history <path>")?))
        }
        "violations" => Command::Violations,
        "clear-violations" => Command::ClearViolations,
        "export-violation" => {
            let id = required(rest, "export-violation <id>")?;
            Command::ExportViolation(
                id.parse()
                    .with_context(|| format!("invalid violation id `{id}`"))?,
            )
        }
        "export-logs" => Command::ExportLogs,
        "health" => Command::Health,
        "test-alarm" => Command::TestAlarm,
        "reconnect" => Command::Reconnect,
        "status" => Command::Status,
        "debug" => Command::Debug,
        "traffic" => match rest {
            "on" => Command::Traffic(true),
            "off" => Command::Traffic(false),
            _ => bail!("usage: traffic <on|off>"),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command `{other}`, type `help` for the list"),
    };
    Ok(Some(command))
}

fn required(rest: &str, usage: &str) -> anyhow::Result<String> {
    if rest.is_empty() {
        Err(anyhow!("usage: {usage}"))
    } else {
        Ok(rest.to_string())
    }
}

/// A leading word followed by an optional JSON document, `{}` when absent.
fn word_and_json(rest: &str, usage: &str) -> anyhow::Result<(String, Value)> {
    let rest = required(rest, usage)?;
    let (word, json) = match rest.split_once(char::is_whitespace) {
        Some((word, json)) => (word, json.trim()),
        None => (rest.as_str(), ""),
    };
    let value = if json.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(json).with_context(|| format!("invalid JSON `{json}`"))?
    };
    Ok((word.to_string(), value))
}

/// Percent from the terminal to a `[0, 1]` volume.
fn parse_volume(rest: &str) -> anyhow::Result<f32> {
    let percent: u8 = rest
        .parse()
        .map_err(|_| anyhow!("usage: volume <0-100>"))?;
    if percent > 100 {
        bail!("usage: volume <0-100>");
    }
    Ok(f32::from(percent) / 100.0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn camera_command_takes_optional_json() {
        assert_eq!(
            parse("camera zoom {\"level\": 2}").unwrap(),
            Some(Command::Camera {
                command: "zoom".to_string(),
                parameters: json!({"level": 2}),
            })
        );
        assert_eq!(
            parse("camera reset").unwrap(),
            Some(Command::Camera {
                command: "reset".to_string(),
                parameters: json!({}),
            })
        );
        assert!(parse("camera zoom {level").is_err());
        assert!(parse("camera").is_err());
    }

    #[test]
    fn volume_is_a_percentage() {
        assert_eq!(parse("volume 45").unwrap(), Some(Command::Volume(0.45)));
        assert_eq!(parse("volume 0").unwrap(), Some(Command::Volume(0.0)));
        assert!(parse("volume 101").is_err());
        assert!(parse("volume loud").is_err());
    }

    #[test]
    fn simple_commands_are_case_insensitive() {
        assert_eq!(parse("START").unwrap(), Some(Command::Start));
        assert_eq!(parse("close-all").unwrap(), Some(Command::CloseAll));
        assert_eq!(parse("traffic on").unwrap(), Some(Command::Traffic(true)));
        assert_eq!(
            parse("export-violation 42").unwrap(),
            Some(Command::ExportViolation(42))
        );
        assert_eq!(
            parse("ack alert-7").unwrap(),
            Some(Command::Acknowledge("alert-7".to_string()))
        );
        assert_eq!(parse("frame").unwrap(), Some(Command::RequestFrame));
        assert_eq!(
            parse("request stats").unwrap(),
            Some(Command::Request("stats".to_string()))
        );
        assert_eq!(
            parse("batch tick").unwrap(),
            Some(Command::Batch {
                event: "tick".to_string(),
                payload: json!({}),
            })
        );
        assert!(parse("request").is_err());
    }

    #[test]
    fn unknown_commands_are_errors() {
        let error = parse("launch").unwrap_err();
        assert!(error.to_string().contains("unknown command `launch`"));
        assert!(parse("export-violation abc").is_err());
        assert!(parse("traffic maybe").is_err());
    }
}
