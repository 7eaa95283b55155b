use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the durable token store keeps its file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    pub token_path: String,
}

impl fmt::Display for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", s)
    }
}
