use crate::settings::config::Settings;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SETTINGS_DIR: &str = ".filedeck";
const SETTINGS_FILE: &str = "settings.toml";

/// Read-only view of the settings file a filedeck host starts with.
///
/// The file is created with defaults on first use. A file that no longer
/// parses is kept next to the original as `settings.toml.backup` and replaced
/// with defaults, so a bad edit never stops the service from starting.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    path: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Loads `~/.filedeck/settings.toml`.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Self::from_path(home.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    pub fn from_path(path: PathBuf) -> Result<Self> {
        let settings = match fs::read_to_string(&path) {
            Ok(contents) => parse_or_reset(&path, &contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings at {}, writing defaults", path.display());
                write_defaults(&path)?
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read settings from {path:?}"))
            }
        };

        Ok(Self { path, settings })
    }

    pub fn settings(&self) -> Settings {
        self.settings.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_or_reset(path: &Path, contents: &str) -> Result<Settings> {
    let error = match toml::from_str(contents) {
        Ok(settings) => return Ok(settings),
        Err(e) => e,
    };
    warn!("Settings at {path:?} do not parse, resetting: {error}");

    let backup = path.with_extension("toml.backup");
    fs::rename(path, &backup)
        .with_context(|| format!("Failed to back up corrupted settings to {backup:?}"))?;
    write_defaults(path)
}

fn write_defaults(path: &Path) -> Result<Settings> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {parent:?}"))?;
    }

    let settings = Settings::default();
    let contents =
        toml::to_string_pretty(&settings).context("Failed to serialize default settings")?;
    fs::write(path, contents)
        .with_context(|| format!("Failed to write default settings to {path:?}"))?;
    Ok(settings)
}
