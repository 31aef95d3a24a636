//! Status state machine guarded by its own lock
//!
//! The status mutex only ever protects the `ProcessingStatus` struct. A
//! snapshot is cloned while that lock is held and broadcast after it has
//! been dropped, so an observer that reads the status while handling a
//! notification never deadlocks. A second lock spans apply-and-send so
//! concurrent transitions reach subscribers in sequence order.

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::types::{ProcessingState, ProcessingStatus};

/// Owner of the shared processing status and its subscribers
#[derive(Debug)]
pub struct StatusTracker {
    status: Mutex<ProcessingStatus>,
    /// Held across a whole transition; never taken while `status` is held
    broadcast_order: Mutex<()>,
    sender: broadcast::Sender<ProcessingStatus>,
}

impl StatusTracker {
    /// Create an idle tracker whose broadcast channel buffers `capacity` snapshots
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            status: Mutex::new(ProcessingStatus::default()),
            broadcast_order: Mutex::new(()),
            sender,
        }
    }

    /// Copy of the current status; mutating it never affects the tracker
    #[must_use]
    pub fn snapshot(&self) -> ProcessingStatus {
        self.status.lock().clone()
    }

    /// Subscribe to status-changed notifications
    ///
    /// Only transitions that happen after this call are delivered.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessingStatus> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Enter `Processing` for a single-target operation
    pub fn begin(&self, operation: &str, media_id: Option<&str>, file_name: Option<&str>) {
        self.transition(|status| {
            status.state = ProcessingState::Processing;
            status.is_processing = true;
            status.current_operation = operation.to_string();
            status.current_media_id = media_id.map(str::to_string);
            status.current_file_name = file_name.map(str::to_string);
            status.progress_percentage = 0.0;
            status.files_processed = 0;
            status.total_files_to_process = usize::from(media_id.is_some());
        });
    }

    /// Enter `Processing` for a multi-item operation such as a rebuild
    pub fn begin_batch(&self, operation: &str, total: usize) {
        self.transition(|status| {
            status.state = ProcessingState::Processing;
            status.is_processing = true;
            status.current_operation = operation.to_string();
            status.current_media_id = None;
            status.current_file_name = None;
            status.progress_percentage = 0.0;
            status.files_processed = 0;
            status.total_files_to_process = total;
        });
    }

    /// Progress update within `Processing`
    pub fn report_progress(&self, processed: usize, total: usize, media_id: Option<&str>) {
        self.transition(|status| {
            status.files_processed = processed;
            status.total_files_to_process = total;
            status.progress_percentage = percentage(processed, total);
            if let Some(id) = media_id {
                status.current_media_id = Some(id.to_string());
            }
        });
    }

    /// Append an error without leaving the current state
    ///
    /// Used for per-item failures that do not abort a batch operation. The
    /// message rides along with the next broadcast snapshot.
    pub fn record_error(&self, message: impl Into<String>) {
        let mut status = self.status.lock();
        status.push_error(message.into());
        status.updated_at = Utc::now();
    }

    /// Successful end of the current operation
    pub fn complete(&self) {
        self.transition(|status| {
            status.state = ProcessingState::Idle;
            status.is_processing = false;
            status.current_operation = String::from("Idle");
            status.current_media_id = None;
            status.current_file_name = None;
            status.progress_percentage = 100.0;
        });
    }

    /// Failed end of the current operation
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.transition(|status| {
            status.state = ProcessingState::Error;
            status.is_processing = false;
            status.push_error(message);
        });
    }

    fn transition<F>(&self, apply: F)
    where
        F: FnOnce(&mut ProcessingStatus),
    {
        let _order = self.broadcast_order.lock();
        let snapshot = {
            let mut status = self.status.lock();
            apply(&mut status);
            status.sequence += 1;
            status.updated_at = Utc::now();
            status.clone()
        };

        // Sending never waits on receivers, so holding the order lock here is brief
        if self.sender.send(snapshot).is_err() {
            tracing::trace!("Status changed with no active subscribers");
        }
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new(crate::config::types::DEFAULT_STATUS_CHANNEL_CAPACITY)
    }
}

fn percentage(processed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    ((processed as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}
