//! Bot settings loaded from `config.toml` and the environment.
//!
//! Every field has a default matching the bot's historical layout (reference lists and
//! the command log in the working directory, Blender on `PATH`), so a missing
//! `config.toml` is not an error. A handful of toggles can be overridden from the
//! environment after the file is parsed.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the settings file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Complete bot configuration, built once at startup and shared through an `Arc`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Files and directories the commands read from and write to
    pub paths: PathsConfig,
    /// Whitelist and owner settings
    pub access: AccessConfig,
    /// External 3D tool settings
    pub blender: BlenderConfig,
    /// Badge resize parameters
    pub resize: ResizeConfig,
}

/// Filesystem layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Newline-delimited list of hull types `engrep` accepts
    pub hulls_file: PathBuf,
    /// Newline-delimited list of component names `engrep` places
    pub components_file: PathBuf,
    /// Newline-delimited list of permitted user and server IDs
    pub whitelist_file: PathBuf,
    /// Append-only command log
    pub command_log: PathBuf,
    /// Directory holding `<hull>.blend` scenes and `<component>.blend` assets
    pub assets_dir: PathBuf,
    /// Root under which per-invocation scratch directories are created
    pub scratch_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            hulls_file: PathBuf::from("./hulls.txt"),
            components_file: PathBuf::from("./components.txt"),
            whitelist_file: PathBuf::from("./whitelist.txt"),
            command_log: PathBuf::from("./command_log.txt"),
            assets_dir: PathBuf::from("./"),
            scratch_dir: PathBuf::from("./scratch"),
        }
    }
}

/// Who may use the bot
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// When false every user and server is permitted
    pub use_whitelist: bool,
    /// Discord user ID of the bot owner, receiver of `/log`
    pub owner_id: u64,
    /// Who may run `/log`
    pub log_access: LogAccess,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            use_whitelist: true,
            owner_id: 418_309_233_193_517_056,
            log_access: LogAccess::Owner,
        }
    }
}

/// Access policy for the log export command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogAccess {
    /// Only the owner
    #[default]
    Owner,
    /// The owner and anyone on the whitelist
    Whitelist,
}

/// External 3D tool
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlenderConfig {
    /// Executable name or path
    pub binary: PathBuf,
}

impl Default for BlenderConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("blender"),
        }
    }
}

/// Badge resize parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Encoded size the loop tries to get under
    pub max_bytes: usize,
    /// Palette size at full quality
    pub palette_colors: usize,
    /// Quality of the first attempt
    pub start_quality: u32,
    /// Quality decrement per attempt
    pub quality_step: u32,
    /// Lowest quality tried before giving up on the size budget
    pub min_quality: u32,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            max_bytes: 37_000,
            palette_colors: 128,
            start_quality: 95,
            quality_step: 5,
            min_quality: 10,
        }
    }
}

/// Parses configuration from a TOML string and validates the resize settings.
///
/// # Errors
/// Returns `Error::Config` when the TOML is invalid or a value is out of range.
pub fn parse_config(contents: &str) -> Result<BotConfig> {
    let config: BotConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    validate(config)
}

/// Loads configuration from a TOML file; a missing file yields the defaults.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BotConfig> {
    let path = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path);

    if !path.exists() {
        tracing::info!("No configuration file at {:?}, using defaults", path);
        return validate(BotConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    parse_config(&contents)
}

/// Loads the configuration the bot runs with: `JONAS_CONFIG` (or `./config.toml`)
/// followed by environment overrides.
///
/// # Errors
/// Returns an error if the file or an override is invalid.
pub fn load_app_configuration() -> Result<BotConfig> {
    let path = std::env::var("JONAS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = load_config(&path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    tracing::info!(
        whitelist = config.access.use_whitelist,
        blender = %config.blender.binary.display(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Applies `USE_WHITELIST`, `OWNER_USER_ID` and `BLENDER_BIN` on top of the file values.
///
/// `lookup` abstracts the environment so tests don't mutate process state.
///
/// # Errors
/// Returns `Error::Config` when an override cannot be parsed.
pub fn apply_env_overrides<F>(config: &mut BotConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup("USE_WHITELIST") {
        config.access.use_whitelist = parse_bool(&raw).ok_or_else(|| Error::Config {
            message: format!("USE_WHITELIST must be true or false, got {raw:?}"),
        })?;
    }
    if let Some(raw) = lookup("OWNER_USER_ID") {
        config.access.owner_id = raw
            .trim()
            .parse::<std::num::NonZeroU64>()
            .map_err(|e| Error::Config {
                message: format!("OWNER_USER_ID is not a Discord ID: {e}"),
            })?
            .get();
    }
    if let Some(raw) = lookup("BLENDER_BIN") {
        config.blender.binary = PathBuf::from(raw);
    }
    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn validate(config: BotConfig) -> Result<BotConfig> {
    if config.access.owner_id == 0 {
        return Err(Error::Config {
            message: "access.owner_id must be a Discord user ID".to_string(),
        });
    }
    let resize = &config.resize;
    if resize.width == 0 || resize.height == 0 {
        return Err(Error::Config {
            message: "resize.width and resize.height must be non-zero".to_string(),
        });
    }
    if resize.quality_step == 0 || resize.min_quality > resize.start_quality {
        return Err(Error::Config {
            message: "resize quality settings must step down from start_quality to min_quality"
                .to_string(),
        });
    }
    if !(2..=256).contains(&resize.palette_colors) {
        return Err(Error::Config {
            message: "resize.palette_colors must be between 2 and 256".to_string(),
        });
    }

    Ok(config)
}
