use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};

/// Config file names, first match wins
pub const CONFIG_FILES: [&str; 4] = ["pgate.toml", "pgate.yaml", "pgate.json", ".pgate.toml"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Grant every permission request without asking
    pub automode: bool,

    /// Largest accepted cumulative fuzz
    pub fuzz_threshold: usize,

    /// Directory for per-path write locks (disabled when unset)
    pub lock_dir: Option<PathBuf>,

    /// Logging settings
    pub log: LogConfig,

    /// Preview settings
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig
{
    /// tracing filter directive, e.g. "warn" or "patchgate=debug"
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig
{
    /// Context lines around changes in `check --diff`
    pub context_lines: usize,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            automode: false,
            fuzz_threshold: crate::core::tool::DEFAULT_FUZZ_THRESHOLD,
            lock_dir: Some(std::env::temp_dir().join("patchgate-locks")),
            log: LogConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

impl Default for LogConfig
{
    fn default() -> Self
    {
        Self { level: "warn".to_string() }
    }
}

impl Default for PreviewConfig
{
    fn default() -> Self
    {
        Self { context_lines: 3 }
    }
}

/// Load config from the current directory plus `PGATE_*` env vars.
pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    if let Some(path) = find_config_file(dir)
    {
        builder = builder.add_source(config::File::from(path));
    }

    // PGATE_LOG is a tracing filter, not the `log` table
    let env: config::Map<String, String> = std::env::vars()
        .filter(|(key, _)| key != crate::infra::logging::LOG_ENV)
        .collect();

    // Add environment variables with PGATE_ prefix
    builder = builder.add_source(
        config::Environment::with_prefix("PGATE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(Some(env)),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

fn find_config_file(dir: &Path) -> Option<PathBuf>
{
    CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join("pgate.toml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    write_config(&config_path, &Config::default())?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

/// Persist the automode flag into `dir`'s config file, creating
/// `pgate.toml` when none exists. Only TOML files are rewritten.
pub fn set_automode(
    dir: &Path,
    enabled: bool,
) -> Result<PathBuf>
{
    let path = find_config_file(dir).unwrap_or_else(|| dir.join("pgate.toml"));
    if path
        .extension()
        .is_some_and(|ext| ext != "toml")
    {
        anyhow::bail!("Refusing to rewrite non-TOML config {}", path.display());
    }

    let mut config = if path.exists()
    {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str::<Config>(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    }
    else
    {
        Config::default()
    };

    config.automode = enabled;
    write_config(&path, &config)?;
    Ok(path)
}

fn write_config(
    path: &Path,
    config: &Config,
) -> Result<()>
{
    let toml_string =
        toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, toml_string)
        .with_context(|| format!("Failed to write config file {}", path.display()))
}
