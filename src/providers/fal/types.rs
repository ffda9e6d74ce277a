//! fal.ai queue wire types

use serde::Deserialize;

use crate::providers::QueueUpdate;

/// Response to a queue submission.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct SubmitResponse {
    pub request_id: String,
    #[serde(default)]
    pub status_url: Option<String>,
    #[serde(default)]
    pub response_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum QueueStatus {
    InQueue,
    InProgress,
    Completed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct LogEntry {
    pub message: String,
}

/// Response of the status endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct StatusResponse {
    pub status: QueueStatus,
    #[serde(default)]
    pub queue_position: Option<u32>,
    #[serde(default)]
    pub logs: Option<Vec<LogEntry>>,
    #[serde(default)]
    pub response_url: Option<String>,
}

impl StatusResponse {
    pub fn is_completed(&self) -> bool {
        self.status == QueueStatus::Completed
    }

    pub fn to_update(&self) -> QueueUpdate {
        let logs = || {
            self.logs
                .iter()
                .flatten()
                .map(|entry| entry.message.clone())
                .collect::<Vec<_>>()
        };
        match self.status {
            QueueStatus::InQueue => QueueUpdate::InQueue {
                position: self.queue_position,
            },
            QueueStatus::Completed => QueueUpdate::Completed { logs: logs() },
            QueueStatus::InProgress | QueueStatus::Unknown => QueueUpdate::InProgress { logs: logs() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_maps_to_queue_updates() {
        let queued: StatusResponse =
            serde_json::from_value(json!({"status": "IN_QUEUE", "queue_position": 3})).unwrap();
        assert_eq!(queued.to_update(), QueueUpdate::InQueue { position: Some(3) });

        let running: StatusResponse = serde_json::from_value(json!({
            "status": "IN_PROGRESS",
            "logs": [{"message": "step 1/28", "timestamp": "2024-01-01T00:00:00Z"}]
        }))
        .unwrap();
        assert_eq!(
            running.to_update(),
            QueueUpdate::InProgress {
                logs: vec!["step 1/28".into()]
            }
        );

        let odd: StatusResponse = serde_json::from_value(json!({"status": "CANCELLATION_REQUESTED"})).unwrap();
        assert!(!odd.is_completed());
    }
}
