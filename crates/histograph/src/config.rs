//! Walk configuration.
//!
//! A `WalkConfig` can be written by hand, loaded from YAML, or assembled from
//! CLI flags on top of a loaded file.
//!
//! ```yaml
//! ignore-names: [".git", "target"]
//! ignore-pattern: "(^|/)generated(/|$)"
//! threads: 4
//! max-commits: 100
//! ```

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::builder::GraphBuilder;
use crate::error::{Error, Result};

/// Directory name skipped by default while discovering sources.
pub const DEFAULT_IGNORED_NAME: &str = ".git";

/// Settings for walking a repository's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WalkConfig {
    /// File and directory names skipped during discovery
    pub ignore_names: Vec<String>,
    /// Regex over root-relative paths; matches are skipped during discovery
    pub ignore_pattern: Option<String>,
    /// Worker threads per graph build (defaults to available parallelism)
    pub threads: Option<usize>,
    /// Visit only the oldest `n` commits
    pub max_commits: Option<usize>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            ignore_names: vec![DEFAULT_IGNORED_NAME.to_string()],
            ignore_pattern: None,
            threads: None,
            max_commits: None,
        }
    }
}

impl WalkConfig {
    /// Parse a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the YAML is malformed or the values are invalid.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file can't be read, `Error::Config` if its
    /// content is invalid.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Serialize the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for a zero thread count, a zero commit limit or
    /// an invalid ignore pattern.
    pub fn validate(&self) -> Result<()> {
        if self.threads == Some(0) {
            return Err(Error::Config("threads must be at least 1".to_string()));
        }
        if self.max_commits == Some(0) {
            return Err(Error::Config("max-commits must be at least 1".to_string()));
        }
        self.ignore_regex()?;
        Ok(())
    }

    /// The compiled ignore pattern, if one is set.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the pattern isn't a valid regex.
    pub fn ignore_regex(&self) -> Result<Option<Regex>> {
        self.ignore_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern)
                    .map_err(|e| Error::Config(format!("invalid ignore pattern: {e}")))
            })
            .transpose()
    }

    /// Graph builder honouring the thread setting.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the thread count is zero.
    pub fn graph_builder(&self) -> Result<GraphBuilder> {
        match self.threads {
            Some(threads) => GraphBuilder::with_threads(threads),
            None => Ok(GraphBuilder::new()),
        }
    }
}
