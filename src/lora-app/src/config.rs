// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Shared `lora-at.toml` loading.
//!
//! One file may hold sections for several programs; each program reads
//! only its own `[<section_key>]` table.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Base name of the shared configuration file.
pub const CONFIG_FILE_NAME: &str = "lora-at.toml";
const CONFIG_DIR_NAME: &str = "lora-at";

/// Where a configuration document came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Memory,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => write!(f, "<memory>"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {origin}: {message}")]
    Parse { origin: ConfigOrigin, message: String },

    #[error("Config {origin} has no [{section}] section")]
    MissingSection {
        origin: ConfigOrigin,
        section: &'static str,
    },
}

/// Candidate locations, in the order they are tried: current directory,
/// then the user config directory, then `/etc`.
pub fn config_search_paths() -> Vec<PathBuf> {
    let user = dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    std::iter::once(PathBuf::from(CONFIG_FILE_NAME))
        .chain(user)
        .chain(std::iter::once(
            Path::new("/etc").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
        ))
        .collect()
}

/// Deserialize `section` out of a whole document. `Ok(None)` when the
/// document has no such table.
fn extract_section<T: DeserializeOwned>(
    content: &str,
    section: &str,
    origin: &ConfigOrigin,
) -> Result<Option<T>, ConfigError> {
    let parse_error = |message: String| ConfigError::Parse {
        origin: origin.clone(),
        message,
    };

    let mut document: toml::Table = toml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
    match document.remove(section) {
        Some(value) => value
            .try_into::<T>()
            .map(Some)
            .map_err(|e| parse_error(format!("[{}]: {}", section, e))),
        None => Ok(None),
    }
}

fn read_section<T: DeserializeOwned>(path: &Path, section: &str) -> Result<Option<T>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    extract_section(&content, section, &ConfigOrigin::File(path.to_path_buf()))
}

/// A program's view of `lora-at.toml`.
pub trait ConfigFile: Sized + Default + DeserializeOwned {
    /// Table name in `lora-at.toml`, e.g. `"lora-node"`.
    fn section_key() -> &'static str;

    /// Load from an explicit path. The section must be present.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        read_section(path, Self::section_key())?.ok_or_else(|| ConfigError::MissingSection {
            origin: ConfigOrigin::File(path.to_path_buf()),
            section: Self::section_key(),
        })
    }

    /// Load from a document already in memory. The section must be present.
    fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        extract_section(content, Self::section_key(), &ConfigOrigin::Memory)?.ok_or(
            ConfigError::MissingSection {
                origin: ConfigOrigin::Memory,
                section: Self::section_key(),
            },
        )
    }

    /// First file from [`config_search_paths`] that carries the section.
    /// Falls back to `Default` with no path when none does.
    fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in config_search_paths().into_iter().filter(|p| p.is_file()) {
            if let Some(cfg) = read_section(&path, Self::section_key())? {
                return Ok((cfg, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }
}
