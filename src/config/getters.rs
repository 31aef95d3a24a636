//! Getter methods for `IndexConfig`

use std::path::PathBuf;

use super::types::IndexConfig;

impl IndexConfig {
    #[must_use]
    pub fn index_dir(&self) -> &PathBuf {
        &self.index_dir
    }

    #[must_use]
    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    #[must_use]
    pub fn rebuild_batch_size(&self) -> usize {
        self.rebuild_batch_size
    }

    #[must_use]
    pub fn build_on_startup(&self) -> bool {
        self.build_on_startup
    }

    #[must_use]
    pub fn incremental_rebuild(&self) -> bool {
        self.incremental_rebuild
    }

    #[must_use]
    pub fn writer_memory_bytes(&self) -> usize {
        self.writer_memory_bytes
    }

    #[must_use]
    pub fn status_channel_capacity(&self) -> usize {
        self.status_channel_capacity
    }

    /// Number of indexing threads the writer memory budget can sustain
    #[must_use]
    pub fn writer_threads(&self) -> usize {
        let by_memory = (self.writer_memory_bytes / super::types::MIN_WRITER_MEMORY_BYTES).max(1);
        num_cpus::get().clamp(1, 8).min(by_memory)
    }
}
