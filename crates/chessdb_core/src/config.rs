//! Index configuration.

/// Default number of nodes fetched per batch by identity-order scans.
pub const DEFAULT_SCAN_BATCH_SIZE: usize = 1000;

/// Configuration for opening or creating an entity index.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether `open` creates the index file if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether `create` fails if the index file already exists.
    pub error_if_exists: bool,

    /// Nodes read per batch by identity-order scans and bulk copies.
    pub scan_batch_size: usize,

    /// Maximum number of entities kept in the identity cache (`None` = unbounded).
    pub cache_capacity: Option<usize>,

    /// Whether to sync the file after every committed metadata write.
    pub sync_on_commit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            scan_batch_size: DEFAULT_SCAN_BATCH_SIZE,
            cache_capacity: None,
            sync_on_commit: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the index file if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to error if the index file exists.
    #[must_use]
    pub const fn error_if_exists(mut self, value: bool) -> Self {
        self.error_if_exists = value;
        self
    }

    /// Sets the identity-scan batch size (clamped to at least 1).
    #[must_use]
    pub const fn scan_batch_size(mut self, size: usize) -> Self {
        self.scan_batch_size = if size == 0 { 1 } else { size };
        self
    }

    /// Caps the identity cache.
    #[must_use]
    pub const fn cache_capacity(mut self, capacity: Option<usize>) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Sets whether to sync the file on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(!config.error_if_exists);
        assert!(config.sync_on_commit);
        assert_eq!(config.scan_batch_size, 1000);
        assert_eq!(config.cache_capacity, None);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .create_if_missing(false)
            .sync_on_commit(false)
            .scan_batch_size(0)
            .cache_capacity(Some(64));

        assert!(!config.create_if_missing);
        assert!(!config.sync_on_commit);
        assert_eq!(config.scan_batch_size, 1);
        assert_eq!(config.cache_capacity, Some(64));
    }
}
