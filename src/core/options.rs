// Codec configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::core::address::AddressMagic;
use crate::core::constants::{DEFAULT_MAX_CHUNK, DEFAULT_MAX_RUN};
use crate::core::error::{IbaError, Result};

/// Tunables of the writer. Every field falls back to the value the analyzer
/// expects when omitted from a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Longest run stored in one run record.
    pub max_run: u8,
    /// Most runs stored in one chunk.
    pub max_chunk: u16,
    pub address_magic: AddressMagic,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_run: DEFAULT_MAX_RUN,
            max_chunk: DEFAULT_MAX_CHUNK,
            address_magic: AddressMagic::default(),
        }
    }
}

impl CodecOptions {
    pub fn from_json(data: &str) -> Result<Self> {
        let options: CodecOptions = serde_json::from_str(data)
            .map_err(|e| IbaError::InvalidOptions(format!("JSON parse error: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let options = Self::from_json(&data)?;

        info!("Codec options loaded from {}", path.display());
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_run == 0 {
            return Err(IbaError::InvalidOptions("max_run must be at least 1".into()));
        }
        if self.max_chunk == 0 {
            return Err(IbaError::InvalidOptions("max_chunk must be at least 1".into()));
        }
        Ok(())
    }
}
