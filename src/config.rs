//! Codec configuration.

/// Options shared by both engines.
///
/// ```rust
/// use compact_serde::Config;
///
/// let config = Config::default()
///     .with_version("2.0.0")
///     .with_max_length(1 << 20);
/// assert_eq!(config.version.as_deref(), Some("2.0.0"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Overrides the record's declared version as the codec's default version.
    pub version: Option<String>,

    /// Largest string byte count or element count accepted on read.
    ///
    /// Bounds allocation when decoding untrusted input. Prefixes above the
    /// bound fail with [`Error::LengthExceeded`](crate::Error::LengthExceeded).
    pub max_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: None,
            max_length: i32::MAX as usize,
        }
    }
}

impl Config {
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }
}
