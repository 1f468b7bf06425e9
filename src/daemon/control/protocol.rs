use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::accounting::{display::DisplayState, notifier::NotificationEvent};

/// File in the application directory holding the port the daemon listens on.
pub const PORT_FILE_NAME: &str = "daemon.port";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlRequest {
    Status,
    Pause,
    Resume,
    Enable,
    Disable,
    /// Reread the configuration file and apply it.
    Reconfigure,
    GrantOvertime {
        minutes: f64,
    },
    Adjust {
        seconds: i64,
    },
    /// Keep the connection open and stream notifications.
    Watch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlResponse {
    Status { state: DisplayState },
    Ok,
    Error { message: String },
    Notification { event: NotificationEvent },
}

pub fn port_file_path(dir: &Path) -> PathBuf {
    dir.join(PORT_FILE_NAME)
}

/// Serializes `message` as a single line, newline included.
pub fn encode_line<T: Serialize>(message: &T) -> serde_json::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(message)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub async fn read_port(dir: &Path) -> Result<u16> {
    let path = port_file_path(dir);
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Daemon is not running, {path:?} is missing"))?;
    content
        .trim()
        .parse()
        .with_context(|| format!("Invalid port in {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::{encode_line, ControlRequest, ControlResponse};

    #[test]
    fn requests_are_tagged_by_type() {
        let request: ControlRequest =
            serde_json::from_str(r#"{"type": "grant_overtime", "minutes": 12.5}"#).unwrap();
        assert_eq!(request, ControlRequest::GrantOvertime { minutes: 12.5 });

        let request: ControlRequest = serde_json::from_str(r#"{"type": "status"}"#).unwrap();
        assert_eq!(request, ControlRequest::Status);
    }

    #[test]
    fn encoded_message_is_one_line() {
        let bytes = encode_line(&ControlResponse::Error {
            message: "multi\nline".into(),
        })
        .unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.ends_with('\n'));
        assert!(text.starts_with(r#"{"type":"error""#));
    }
}
