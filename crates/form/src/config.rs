//! Decoder configuration.

use std::path::{Path, PathBuf};

/// Default size in bytes above which an uploaded file is moved from memory to disk (1MB).
pub const DEFAULT_SPOOL_THRESHOLD: usize = 1024 * 1024;

/// Default maximum size of the header block of a single multipart part (8KB).
pub const DEFAULT_MAX_PART_HEADER_BYTES: usize = 8 * 1024;

/// Configuration shared by the form decoders.
///
/// ```
/// use micro_form::FormConfig;
///
/// let config = FormConfig::new().spool_threshold(64 * 1024).temp_dir("/var/tmp/uploads");
/// assert_eq!(config.get_spool_threshold(), 64 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct FormConfig {
    spool_threshold: usize,
    temp_dir: Option<PathBuf>,
    max_part_header_bytes: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self { spool_threshold: DEFAULT_SPOOL_THRESHOLD, temp_dir: None, max_part_header_bytes: DEFAULT_MAX_PART_HEADER_BYTES }
    }
}

impl FormConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size above which uploaded files are spooled to a temporary file.
    #[must_use]
    pub fn spool_threshold(mut self, size: usize) -> Self {
        self.spool_threshold = size;
        self
    }

    /// Set the directory temporary files are created in, instead of the system default.
    #[must_use]
    pub fn temp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Set the maximum size of the header block of a single part.
    #[must_use]
    pub fn max_part_header_bytes(mut self, size: usize) -> Self {
        self.max_part_header_bytes = size;
        self
    }

    #[must_use]
    pub fn get_spool_threshold(&self) -> usize {
        self.spool_threshold
    }

    #[must_use]
    pub fn get_temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    #[must_use]
    pub fn get_max_part_header_bytes(&self) -> usize {
        self.max_part_header_bytes
    }
}
