//! Print daemon wire protocol
//!
//! The local print daemon speaks JSON text frames over a WebSocket. Every
//! frame is an object with a `type` discriminator.
//!
//! Client → daemon: `print-job`, `ping`
//! Daemon → client: `connected`, `print-success`, `print-error`, `pong`, `error`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of printed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    /// Customer receipt
    #[serde(rename = "BILL")]
    Receipt,
    /// Kitchen order ticket
    #[serde(rename = "KOT")]
    KitchenTicket,
}

impl JobKind {
    /// Wire code, also used as the job id prefix
    pub fn code(&self) -> &'static str {
        match self {
            JobKind::Receipt => "BILL",
            JobKind::KitchenTicket => "KOT",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Rendered document carried by a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintData {
    /// Base64 encoded PDF
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Job body of a `print-job` frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJobPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: JobKind,
    #[serde(rename = "orderId")]
    pub order_id: String,
    pub data: PrintData,
    /// Target printer; absent means the daemon default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copies: Option<u32>,
}

/// Frames sent to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DaemonCommand {
    PrintJob { job: PrintJobPayload },
    Ping,
}

impl DaemonCommand {
    /// Encode as a single text frame
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Frames received from the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DaemonEvent {
    /// Daemon is ready to accept jobs (handshake)
    Connected {
        #[serde(default)]
        message: Option<String>,
    },
    PrintSuccess {
        #[serde(rename = "jobId")]
        job_id: String,
    },
    PrintError {
        #[serde(rename = "jobId", default)]
        job_id: Option<String>,
        #[serde(default)]
        error: String,
    },
    Pong,
    Error {
        #[serde(default)]
        error: String,
    },
}

impl DaemonEvent {
    /// Decode a single text frame
    pub fn parse(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_print_job_frame_shape() {
        let cmd = DaemonCommand::PrintJob {
            job: PrintJobPayload {
                id: "KOT-42-1700000000000".into(),
                kind: JobKind::KitchenTicket,
                order_id: "42".into(),
                data: PrintData {
                    pdf: Some("JVBERi0=".into()),
                    html: None,
                },
                printer: None,
                copies: Some(1),
            },
        };

        let value: serde_json::Value = serde_json::from_str(&cmd.to_frame().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "print-job",
                "job": {
                    "id": "KOT-42-1700000000000",
                    "type": "KOT",
                    "orderId": "42",
                    "data": { "pdf": "JVBERi0=" },
                    "copies": 1
                }
            })
        );
    }

    #[test]
    fn test_ping_frame() {
        assert_eq!(DaemonCommand::Ping.to_frame().unwrap(), r#"{"type":"ping"}"#);
    }

    #[test]
    fn test_parse_inbound_frames() {
        assert_eq!(
            DaemonEvent::parse(r#"{"type":"connected","message":"ready"}"#).unwrap(),
            DaemonEvent::Connected {
                message: Some("ready".into())
            }
        );
        assert_eq!(
            DaemonEvent::parse(r#"{"type":"print-success","jobId":"BILL-1-1"}"#).unwrap(),
            DaemonEvent::PrintSuccess {
                job_id: "BILL-1-1".into()
            }
        );
        assert_eq!(
            DaemonEvent::parse(r#"{"type":"print-error","error":"paper out"}"#).unwrap(),
            DaemonEvent::PrintError {
                job_id: None,
                error: "paper out".into()
            }
        );
        assert_eq!(DaemonEvent::parse(r#"{"type":"pong"}"#).unwrap(), DaemonEvent::Pong);
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(DaemonEvent::parse(r#"{"type":"reboot"}"#).is_err());
        assert!(DaemonEvent::parse("not json").is_err());
    }
}
