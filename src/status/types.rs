//! Status snapshot types broadcast to observers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on retained error messages; later ones are only counted
pub const MAX_ERROR_MESSAGES: usize = 1000;

/// Lifecycle state of the index operation currently (or last) running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessingState {
    #[default]
    Idle,
    Processing,
    /// Last operation failed; the next operation moves back to `Processing`
    Error,
}

/// Mutable status snapshot describing index activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    pub state: ProcessingState,
    pub is_processing: bool,
    pub current_operation: String,
    pub current_media_id: Option<String>,
    pub current_file_name: Option<String>,
    /// 0.0 to 100.0
    pub progress_percentage: f64,
    pub files_processed: usize,
    pub total_files_to_process: usize,
    /// Append-only, capped at `MAX_ERROR_MESSAGES`
    pub error_messages: Vec<String>,
    pub dropped_error_messages: usize,
    /// Increases by one with every broadcast transition
    ///
    /// Observers that merge snapshots from several receivers can drop any
    /// snapshot older than one they already applied.
    pub sequence: u64,
    pub updated_at: DateTime<Utc>,
}

impl Default for ProcessingStatus {
    fn default() -> Self {
        Self {
            state: ProcessingState::Idle,
            is_processing: false,
            current_operation: String::from("Idle"),
            current_media_id: None,
            current_file_name: None,
            progress_percentage: 0.0,
            files_processed: 0,
            total_files_to_process: 0,
            error_messages: Vec::new(),
            dropped_error_messages: 0,
            sequence: 0,
            updated_at: Utc::now(),
        }
    }
}

impl ProcessingStatus {
    pub(crate) fn push_error(&mut self, message: String) {
        if self.error_messages.len() >= MAX_ERROR_MESSAGES {
            self.dropped_error_messages += 1;
        } else {
            self.error_messages.push(message);
        }
    }

    /// Most recent error message, if any
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.error_messages.last().map(String::as_str)
    }
}
