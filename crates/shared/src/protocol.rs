use serde::{Deserialize, Serialize};

use crate::domain::SessionId;

/// Body of a `POST /convert` response under the session contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertAccepted {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    InProgress,
    Completed,
    Error,
}

impl ProgressStatus {
    /// Terminal statuses end the progress stream; nothing follows them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// One point-in-time status report for a running conversion. Consumers keep
/// only the latest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub progress: u64,
    pub total: u64,
    #[serde(default)]
    pub current_step: String,
    pub status: ProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressUpdate {
    /// Completion percentage, rounded to the nearest whole percent.
    /// A zero total reads as no progress rather than a division error.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.progress as f64 / self.total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }

    /// Human-readable failure text for a terminal error snapshot: the
    /// attached error detail when present, otherwise the step label.
    pub fn failure_message(&self) -> String {
        match &self.error {
            Some(detail) if !detail.is_empty() => detail.clone(),
            _ if !self.current_step.is_empty() => self.current_step.clone(),
            _ => "conversion failed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_to_whole_numbers() {
        let update = ProgressUpdate {
            progress: 50,
            total: 200,
            current_step: "Transcribing".to_string(),
            status: ProgressStatus::InProgress,
            error: None,
        };
        assert_eq!(update.percent(), 25);
    }

    #[test]
    fn percent_handles_degenerate_totals() {
        let mut update = ProgressUpdate {
            progress: 10,
            total: 0,
            current_step: String::new(),
            status: ProgressStatus::InProgress,
            error: None,
        };
        assert_eq!(update.percent(), 0);

        // Progress past the advertised total clamps at 100.
        update.total = 5;
        assert_eq!(update.percent(), 100);
    }

    #[test]
    fn snapshot_parses_wire_format() {
        let update: ProgressUpdate = serde_json::from_str(
            r#"{"progress": 3, "total": 7, "current_step": "Loading model", "status": "in_progress"}"#,
        )
        .expect("parse snapshot");
        assert_eq!(update.progress, 3);
        assert_eq!(update.total, 7);
        assert_eq!(update.current_step, "Loading model");
        assert_eq!(update.status, ProgressStatus::InProgress);
        assert!(update.error.is_none());
    }

    #[test]
    fn snapshot_tolerates_unknown_fields_but_not_missing_status() {
        let tolerated: Result<ProgressUpdate, _> = serde_json::from_str(
            r#"{"progress": 1, "total": 2, "status": "completed", "last_updated": 1700000000.5}"#,
        );
        assert!(tolerated.is_ok());

        let rejected: Result<ProgressUpdate, _> =
            serde_json::from_str(r#"{"progress": 1, "total": 2}"#);
        assert!(rejected.is_err());
    }

    #[test]
    fn failure_message_prefers_the_error_detail() {
        let update = ProgressUpdate {
            progress: 4,
            total: 10,
            current_step: "Error: decoding input".to_string(),
            status: ProgressStatus::Error,
            error: Some("unsupported sample rate".to_string()),
        };
        assert_eq!(update.failure_message(), "unsupported sample rate");

        let without_detail = ProgressUpdate {
            error: None,
            ..update
        };
        assert_eq!(without_detail.failure_message(), "Error: decoding input");
    }

    #[test]
    fn terminal_statuses_are_exactly_completed_and_error() {
        assert!(!ProgressStatus::InProgress.is_terminal());
        assert!(ProgressStatus::Completed.is_terminal());
        assert!(ProgressStatus::Error.is_terminal());
    }
}
