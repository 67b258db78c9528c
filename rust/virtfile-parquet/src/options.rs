use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tunables of a virtual Parquet file.
///
/// None of these affect the byte layout of column chunks; they only shape the
/// footer and the advertised storage profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualFileOptions {
    /// Footer `created_by`, defaults to `virtfile version <crate version>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    /// Emit chunk zone maps as footer min/max statistics.
    pub zone_map_statistics: bool,

    /// Additional footer key/value metadata.
    pub key_value_metadata: BTreeMap<String, String>,

    /// Largest read size advertised to [`virtfile_io::ReadAt`] consumers.
    pub max_io_size: usize,
}

impl VirtualFileOptions {
    pub const DEFAULT_MAX_IO_SIZE: usize = 4 * 1024 * 1024;

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    pub fn with_zone_map_statistics(mut self, enabled: bool) -> Self {
        self.zone_map_statistics = enabled;
        self
    }

    pub fn with_key_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.key_value_metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_max_io_size(mut self, max_io_size: usize) -> Self {
        self.max_io_size = max_io_size;
        self
    }

    pub fn created_by(&self) -> String {
        self.created_by
            .clone()
            .unwrap_or_else(|| format!("virtfile version {}", env!("CARGO_PKG_VERSION")))
    }
}

impl Default for VirtualFileOptions {
    fn default() -> Self {
        VirtualFileOptions {
            created_by: None,
            zone_map_statistics: true,
            key_value_metadata: BTreeMap::new(),
            max_io_size: Self::DEFAULT_MAX_IO_SIZE,
        }
    }
}
