use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// The fixed set of remote feeds to mirror.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<String>,
}

/// Load and validate the source list from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sources_file: SourcesFile = serde_yaml::from_str(&content)?;

    validate_sources(&sources_file)?;

    Ok(sources_file)
}

fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    if sources_file.sources.is_empty() {
        return Err(ConfigError::Validation(
            "at least one source must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for source in &sources_file.sources {
        if source.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source id must be non-empty".to_string(),
            ));
        }
        if source.contains('/') {
            return Err(ConfigError::Validation(format!(
                "source id '{source}' must not contain '/'"
            )));
        }
        if !seen.insert(source.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source id: '{source}'"
            )));
        }
    }

    Ok(())
}
