//! Session configuration.
//!
//! [`SessionConfig`] controls the optional behaviour of a
//! [`Session`](crate::session::Session): whether safety scans are traced, how
//! many journal entries are kept, and the fallback log filter. Every field has
//! a default, so an empty JSON object is a valid configuration.
//!
//! ```
//! use banker_engine::config::SessionConfig;
//!
//! let config = SessionConfig::from_json_str(r#"{ "trace_safety": true }"#).unwrap();
//! assert!(config.trace_safety);
//! assert_eq!(config.journal_capacity, None);
//! assert_eq!(config.log_filter, "warn");
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Options for a [`Session`](crate::session::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Run traced safety scans and emit one `debug` event per comparison.
    pub trace_safety: bool,
    /// Keep at most this many journal entries. `None` keeps everything.
    pub journal_capacity: Option<usize>,
    /// Tracing filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for SessionConfig {
    /// Untraced scans, unbounded journal, `warn` logging.
    fn default() -> Self {
        Self {
            trace_safety: false,
            journal_capacity: None,
            log_filter: "warn".to_owned(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON, unknown fields, or a
    /// `journal_capacity` of zero.
    pub fn from_json_str(json: &str) -> Result<Self, anyhow::Error> {
        let config: Self =
            serde_json::from_str(json).context("failed to parse session configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read session configuration {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("invalid session configuration in {}", path.display()))
    }

    /// Check field values that the type system cannot.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.journal_capacity == Some(0) {
            return Err(anyhow::anyhow!(
                "journal_capacity must be at least 1 (omit it for an unbounded journal)"
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
