use serde::{Deserialize, Serialize};

use crate::bus::error::{invalid_message, BusResult};

/// Marker carried in every worker-originated envelope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeOrigin {
    #[default]
    Worker,
}

/// Status event posted by the background worker to every controlled page.
///
/// Serialized as `{"from":"worker","type":"SERVER_ERROR","status":503,...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEnvelope {
    pub from: EnvelopeOrigin,
    #[serde(flatten)]
    pub message: WorkerMessage,
}

impl WorkerEnvelope {
    pub fn new(message: WorkerMessage) -> Self {
        Self {
            from: EnvelopeOrigin::Worker,
            message,
        }
    }

    pub fn to_json(&self) -> BusResult<String> {
        serde_json::to_string(self)
            .map_err(|err| invalid_message(format!("Failed to encode envelope: {err}")))
    }

    pub fn from_json(raw: &str) -> BusResult<Self> {
        serde_json::from_str(raw)
            .map_err(|err| invalid_message(format!("Unrecognized worker envelope: {err}")))
    }
}

impl From<WorkerMessage> for WorkerEnvelope {
    fn from(message: WorkerMessage) -> Self {
        Self::new(message)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    Offline {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    ServerError {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },
    ServingCached,
    SyncComplete,
    PeriodicSyncComplete,
    Pong,
    Navigate {
        url: String,
    },
}

impl WorkerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerMessage::Offline { .. } => "OFFLINE",
            WorkerMessage::ServerError { .. } => "SERVER_ERROR",
            WorkerMessage::ServingCached => "SERVING_CACHED",
            WorkerMessage::SyncComplete => "SYNC_COMPLETE",
            WorkerMessage::PeriodicSyncComplete => "PERIODIC_SYNC_COMPLETE",
            WorkerMessage::Pong => "PONG",
            WorkerMessage::Navigate { .. } => "NAVIGATE",
        }
    }
}

/// Message posted by a page to its controlling worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageMessage {
    Ping,
}

impl PageMessage {
    pub fn to_json(&self) -> BusResult<String> {
        serde_json::to_string(self)
            .map_err(|err| invalid_message(format!("Failed to encode page message: {err}")))
    }

    pub fn from_json(raw: &str) -> BusResult<Self> {
        serde_json::from_str(raw)
            .map_err(|err| invalid_message(format!("Unrecognized page message: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn server_error_wire_shape() {
        let envelope = WorkerEnvelope::new(WorkerMessage::ServerError {
            message: Some("Bad gateway".into()),
            status: Some(502),
        });
        let value: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"from": "worker", "type": "SERVER_ERROR", "message": "Bad gateway", "status": 502})
        );
    }

    #[test]
    fn parses_every_worker_message_kind() {
        let cases = [
            (r#"{"from":"worker","type":"OFFLINE"}"#, "OFFLINE"),
            (r#"{"from":"worker","type":"SERVING_CACHED"}"#, "SERVING_CACHED"),
            (r#"{"from":"worker","type":"SYNC_COMPLETE"}"#, "SYNC_COMPLETE"),
            (
                r#"{"from":"worker","type":"PERIODIC_SYNC_COMPLETE"}"#,
                "PERIODIC_SYNC_COMPLETE",
            ),
            (r#"{"from":"worker","type":"PONG"}"#, "PONG"),
            (r#"{"from":"worker","type":"NAVIGATE","url":"/inbox"}"#, "NAVIGATE"),
        ];
        for (raw, kind) in cases {
            let envelope = WorkerEnvelope::from_json(raw).unwrap();
            assert_eq!(envelope.message.kind(), kind);
        }
    }

    #[test]
    fn rejects_unknown_types_and_foreign_origins() {
        let err = WorkerEnvelope::from_json(r#"{"from":"worker","type":"REBOOT"}"#).unwrap_err();
        assert_eq!(err.code_str(), "bus/invalid-message");
        assert!(WorkerEnvelope::from_json(r#"{"from":"page","type":"PONG"}"#).is_err());
        assert!(WorkerEnvelope::from_json(r#"{"from":"worker","type":"NAVIGATE"}"#).is_err());
    }

    #[test]
    fn ping_round_trips() {
        assert_eq!(PageMessage::Ping.to_json().unwrap(), r#"{"type":"PING"}"#);
        assert_eq!(PageMessage::from_json(r#"{"type":"PING"}"#).unwrap(), PageMessage::Ping);
    }
}
