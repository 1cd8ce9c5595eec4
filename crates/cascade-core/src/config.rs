//! Operation configuration types.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default copy buffer size (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration shared by every file operation.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct OperationConfig {
    /// Size of the buffer used to stream file contents.
    #[builder(default = "DEFAULT_BUFFER_SIZE")]
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Copy mode bits and access/modification times onto the destination.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub preserve_attributes: bool,

    /// Copy owner and group onto the destination.
    #[builder(default = "false")]
    #[serde(default)]
    pub preserve_owner: bool,

    /// Copy the targets of symbolic links instead of the links themselves.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Build a listing up front to size progress displays.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub prescan: bool,

    /// Minimum time between speed/ETA recomputations.
    #[builder(default = "default_progress_interval()")]
    #[serde(default = "default_progress_interval", with = "millis")]
    pub progress_interval: Duration,

    /// Ask whether to keep a partially written file after skip/abort.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub confirm_incomplete: bool,
}

fn default_true() -> bool {
    true
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_progress_interval() -> Duration {
    Duration::from_millis(500)
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

impl OperationConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(size) = self.buffer_size {
            if size == 0 {
                return Err("Buffer size cannot be zero".to_string());
            }
        }
        Ok(())
    }
}

impl OperationConfig {
    /// Create a new config builder.
    pub fn builder() -> OperationConfigBuilder {
        OperationConfigBuilder::default()
    }
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            preserve_attributes: true,
            preserve_owner: false,
            follow_symlinks: false,
            prescan: true,
            progress_interval: default_progress_interval(),
            confirm_incomplete: true,
        }
    }
}
