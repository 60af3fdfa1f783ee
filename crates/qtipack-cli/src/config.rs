//! qtipack configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use qtipack_core::model::PackageFormat;

/// Local config file name, searched in the working directory.
pub const CONFIG_FILE: &str = "qtipack.toml";

/// Top-level qtipack configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QtipackConfig {
    /// Schema version used when `--format` is not given.
    #[serde(default)]
    pub default_format: PackageFormat,
    /// Directory packages are written under when `--output` is not given.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Fail on colliding identifier hints instead of suffixing them.
    #[serde(default)]
    pub strict_identifiers: bool,
    /// Directory embedded assets are loaded from when `--assets` is not given.
    #[serde(default)]
    pub assets_dir: Option<PathBuf>,
    /// Let delivery engines shuffle choice order.
    #[serde(default)]
    pub shuffle_choices: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./qtipack-out")
}

impl Default for QtipackConfig {
    fn default() -> Self {
        Self {
            default_format: PackageFormat::default(),
            output_dir: default_output_dir(),
            strict_identifiers: false,
            assets_dir: None,
            shuffle_choices: false,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `qtipack.toml` in the current directory
/// 2. `~/.config/qtipack/config.toml`
///
/// Environment variable overrides: `QTIPACK_FORMAT`, `QTIPACK_OUTPUT_DIR`.
pub fn load_config_from(path: Option<&Path>) -> Result<QtipackConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QtipackConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QtipackConfig::default(),
    };
    if let Some(path) = &config_path {
        tracing::debug!(path = %path.display(), "loaded config");
    }

    let mut config = apply_env_overrides(config, |name| std::env::var(name).ok())?;
    config.output_dir = resolve_path(&config.output_dir);
    config.assets_dir = config.assets_dir.as_deref().map(resolve_path);
    Ok(config)
}

fn apply_env_overrides(
    mut config: QtipackConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<QtipackConfig> {
    if let Some(format) = lookup("QTIPACK_FORMAT") {
        config.default_format = format
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("invalid QTIPACK_FORMAT")?;
    }
    if let Some(dir) = lookup("QTIPACK_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(dir);
    }
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("qtipack"))
}
