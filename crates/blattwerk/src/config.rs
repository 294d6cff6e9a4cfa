//! Service configuration.

use crate::{BlattwerkError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Worker-pool configuration for the extraction service.
///
/// Can be loaded from a TOML file or created programmatically; every field
/// has a default so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Number of worker tasks draining the job queue
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the bounded submission queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_workers() -> usize {
    num_cpus::get().max(1)
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            BlattwerkError::validation(format!("Failed to read config file {}: {}", path.as_ref().display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| BlattwerkError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }
}
