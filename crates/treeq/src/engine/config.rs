use chrono::{DateTime, FixedOffset};
use std::num::NonZeroUsize;

/// Layout marker for RFC 3339 timestamps (`2006-01-02T15:04:05Z07:00` style).
/// Parsing accepts fractional seconds and `Z`; rendering drops the fraction.
pub const RFC3339_LAYOUT: &str = "rfc3339";

const DEFAULT_KEY_PATTERN_CACHE: usize = 64;

/// How string map keys are compared against the wanted key of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMatchMode {
    /// Plain equality.
    Exact,
    /// `*` in the wanted key matches any run of characters.
    #[default]
    Wildcard,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub key_match: KeyMatchMode,
    /// Policy of root contexts: traversal may create missing entries.
    pub auto_create: bool,
    pub datetime_layout: String,
    /// Fixed clock for `now`; the wall clock when unset.
    pub clock: Option<DateTime<FixedOffset>>,
    pub key_pattern_cache: NonZeroUsize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            key_match: KeyMatchMode::default(),
            auto_create: true,
            datetime_layout: RFC3339_LAYOUT.to_string(),
            clock: None,
            key_pattern_cache: NonZeroUsize::new(DEFAULT_KEY_PATTERN_CACHE)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_key_match(mut self, mode: KeyMatchMode) -> Self {
        self.config.key_match = mode;
        self
    }

    #[must_use]
    pub fn with_auto_create(mut self, enabled: bool) -> Self {
        self.config.auto_create = enabled;
        self
    }

    #[must_use]
    pub fn with_datetime_layout(mut self, layout: impl Into<String>) -> Self {
        self.config.datetime_layout = layout.into();
        self
    }

    #[must_use]
    pub fn with_clock(mut self, now: DateTime<FixedOffset>) -> Self {
        self.config.clock = Some(now);
        self
    }

    #[must_use]
    pub fn with_key_pattern_cache(mut self, capacity: NonZeroUsize) -> Self {
        self.config.key_pattern_cache = capacity;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}
