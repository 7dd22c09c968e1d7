//! CLI command implementations.

mod display;

pub mod commits;
pub mod snapshot;
pub mod walk;

use std::path::Path;

use histograph::WalkConfig;
use tracing::debug;

use crate::WalkArgs;

/// Configuration file picked up from the repository root when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "histograph.yaml";

/// Build the effective configuration: file first, then flags on top.
pub fn load_config(repo: &Path, args: &WalkArgs) -> histograph::Result<WalkConfig> {
    let mut config = match &args.config {
        Some(path) => WalkConfig::from_yaml_file(path)?,
        None => {
            let candidate = repo.join(DEFAULT_CONFIG_FILE);
            if candidate.is_file() {
                debug!(path = %candidate.display(), "Using repository configuration");
                WalkConfig::from_yaml_file(&candidate)?
            } else {
                WalkConfig::default()
            }
        }
    };

    for name in &args.ignore {
        if !config.ignore_names.contains(name) {
            config.ignore_names.push(name.clone());
        }
    }
    if args.ignore_pattern.is_some() {
        config.ignore_pattern.clone_from(&args.ignore_pattern);
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }

    config.validate()?;
    Ok(config)
}

/// Print `value` as a single line of JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> histograph::Result<()> {
    let line =
        serde_json::to_string(value).map_err(|e| histograph::Error::Internal(e.to_string()))?;
    println!("{line}");
    Ok(())
}
