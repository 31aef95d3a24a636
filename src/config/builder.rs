//! Type-safe builder for `IndexConfig` using the typestate pattern
//!
//! `build()` only exists once the index directory has been provided.

use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::{
    ConfigError, DEFAULT_PAGE_SIZE, DEFAULT_REBUILD_BATCH_SIZE, DEFAULT_STATUS_CHANNEL_CAPACITY,
    DEFAULT_WRITER_MEMORY_BYTES, IndexConfig, MIN_WRITER_MEMORY_BYTES,
};

// Type states for the builder
pub struct WithIndexDir;

pub struct IndexConfigBuilder<State = ()> {
    pub(crate) index_dir: Option<PathBuf>,
    pub(crate) default_page_size: usize,
    pub(crate) rebuild_batch_size: usize,
    pub(crate) build_on_startup: bool,
    pub(crate) incremental_rebuild: bool,
    pub(crate) writer_memory_bytes: usize,
    pub(crate) status_channel_capacity: usize,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for IndexConfigBuilder<()> {
    fn default() -> Self {
        Self {
            index_dir: None,
            default_page_size: DEFAULT_PAGE_SIZE,
            rebuild_batch_size: DEFAULT_REBUILD_BATCH_SIZE,
            build_on_startup: false,
            incremental_rebuild: true,
            writer_memory_bytes: DEFAULT_WRITER_MEMORY_BYTES,
            status_channel_capacity: DEFAULT_STATUS_CHANNEL_CAPACITY,
            _phantom: PhantomData,
        }
    }
}

impl IndexConfig {
    /// Create a builder for configuring an `IndexConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> IndexConfigBuilder<()> {
        IndexConfigBuilder::default()
    }
}

impl IndexConfigBuilder<()> {
    pub fn index_dir(self, dir: impl Into<PathBuf>) -> IndexConfigBuilder<WithIndexDir> {
        IndexConfigBuilder {
            index_dir: Some(dir.into()),
            default_page_size: self.default_page_size,
            rebuild_batch_size: self.rebuild_batch_size,
            build_on_startup: self.build_on_startup,
            incremental_rebuild: self.incremental_rebuild,
            writer_memory_bytes: self.writer_memory_bytes,
            status_channel_capacity: self.status_channel_capacity,
            _phantom: PhantomData,
        }
    }
}

// Build method only available when the index directory is set
impl IndexConfigBuilder<WithIndexDir> {
    pub fn build(self) -> Result<IndexConfig, ConfigError> {
        let index_dir = self.index_dir.ok_or(ConfigError::MissingIndexDir)?;
        let index_dir = if index_dir.is_absolute() {
            index_dir
        } else {
            std::env::current_dir()?.join(index_dir)
        };

        if self.default_page_size == 0 {
            return Err(ConfigError::ZeroValue {
                field: "default_page_size",
            });
        }
        if self.rebuild_batch_size == 0 {
            return Err(ConfigError::ZeroValue {
                field: "rebuild_batch_size",
            });
        }
        if self.status_channel_capacity == 0 {
            return Err(ConfigError::ZeroValue {
                field: "status_channel_capacity",
            });
        }
        if self.writer_memory_bytes < MIN_WRITER_MEMORY_BYTES {
            return Err(ConfigError::WriterMemoryTooSmall {
                given: self.writer_memory_bytes,
                minimum: MIN_WRITER_MEMORY_BYTES,
            });
        }

        Ok(IndexConfig {
            index_dir,
            default_page_size: self.default_page_size,
            rebuild_batch_size: self.rebuild_batch_size,
            build_on_startup: self.build_on_startup,
            incremental_rebuild: self.incremental_rebuild,
            writer_memory_bytes: self.writer_memory_bytes,
            status_channel_capacity: self.status_channel_capacity,
        })
    }
}

// Optional settings can be applied in any state
impl<State> IndexConfigBuilder<State> {
    /// Number of results returned when a search does not specify a limit
    #[must_use]
    pub fn default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    /// Number of items indexed and committed together during a rebuild
    #[must_use]
    pub fn rebuild_batch_size(mut self, size: usize) -> Self {
        self.rebuild_batch_size = size;
        self
    }

    /// Rebuild from the content source while the service opens
    #[must_use]
    pub fn build_on_startup(mut self, enabled: bool) -> Self {
        self.build_on_startup = enabled;
        self
    }

    /// Choose upsert-only (`true`) or clear-then-reindex (`false`) rebuilds
    #[must_use]
    pub fn incremental_rebuild(mut self, enabled: bool) -> Self {
        self.incremental_rebuild = enabled;
        self
    }

    /// Overall memory budget for the index writer, in bytes
    ///
    /// # Example
    /// ```rust
    /// # use media_index::config::IndexConfig;
    /// # fn main() -> anyhow::Result<()> {
    /// let config = IndexConfig::builder()
    ///     .index_dir("/tmp/media-index")
    ///     .writer_memory_bytes(100_000_000)
    ///     .build()?;
    /// assert_eq!(config.writer_memory_bytes(), 100_000_000);
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn writer_memory_bytes(mut self, bytes: usize) -> Self {
        self.writer_memory_bytes = bytes;
        self
    }

    /// Buffer size of the status broadcast channel
    #[must_use]
    pub fn status_channel_capacity(mut self, capacity: usize) -> Self {
        self.status_channel_capacity = capacity;
        self
    }
}
