//! Substitution rule loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::validation::ValidationError;
use crate::rewrite::rules::{RuleError, Substitutions};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Rules(#[from] RuleError),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and compile the substitution rules at `path`.
///
/// Either every group and pattern compiles, or the whole load fails.
pub fn load_substitutions(path: &Path) -> Result<Substitutions, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let substitutions = Substitutions::from_json(&content)?;

    tracing::info!(
        path = %path.display(),
        groups = substitutions.len(),
        items = substitutions.item_count(),
        "Substitutions loaded"
    );

    Ok(substitutions)
}
