use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::config::{self, Config};
use crate::error::{Result, ToolError};

/// Reads the YAML configuration file into its raw key mapping. An empty
/// document yields an empty mapping.
pub fn read_config_document(path: &Path) -> Result<Mapping> {
    let source = fs::read_to_string(path).map_err(|error| match error.kind() {
        ErrorKind::NotFound => ToolError::ConfigNotFound(path.to_path_buf()),
        _ => ToolError::Io(error),
    })?;

    let document: Value =
        serde_yaml::from_str(&source).map_err(|source| ToolError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

    match document {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(ToolError::ConfigNotMapping(path.to_path_buf())),
    }
}

/// Reads, validates and expands the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    let raw = read_config_document(path)?;
    debug!(key_count = raw.len(), path = %path.display(), "read configuration document");
    config::validate_and_expand_from_env(&raw)
}
