use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::archive::ArchiveLimits;

/// Import comic archives (CBZ/ZIP, CBR/RAR) into a personal library.
#[derive(Parser, Debug, Clone)]
#[command(name = "comic-import")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "COMIC_IMPORT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Import comic files or directories of comic files.
    Import {
        /// Files or directories to import.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Print every progress event as a JSON line.
        #[arg(long)]
        json: bool,
    },

    /// List library entries.
    List,

    /// Initialize database and create default config.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Import limits and behaviour.
    #[serde(default)]
    pub import: ImportConfig,

    /// Cover artifact settings.
    #[serde(default)]
    pub cover: CoverConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Import configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Largest archive file accepted at validation, in bytes.
    #[serde(default = "default_max_archive_size")]
    pub max_archive_size: u64,

    /// Largest total uncompressed size streamed from one archive, in bytes.
    #[serde(default = "default_max_total_uncompressed")]
    pub max_total_uncompressed: u64,

    /// Largest number of entries streamed from one archive.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Skip files already present in the library during directory imports.
    #[serde(default = "default_skip_existing")]
    pub skip_existing: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_archive_size: default_max_archive_size(),
            max_total_uncompressed: default_max_total_uncompressed(),
            max_entries: default_max_entries(),
            skip_existing: default_skip_existing(),
        }
    }
}

impl ImportConfig {
    /// Streaming ceilings for the archive readers.
    pub fn limits(&self) -> ArchiveLimits {
        ArchiveLimits {
            max_entries: self.max_entries,
            max_total_uncompressed: self.max_total_uncompressed,
        }
    }
}

const GIB: u64 = 1024 * 1024 * 1024;

fn default_max_archive_size() -> u64 {
    2 * GIB
}

fn default_max_total_uncompressed() -> u64 {
    2 * GIB
}

fn default_max_entries() -> usize {
    10_000
}

fn default_skip_existing() -> bool {
    true
}

/// Cover configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverConfig {
    /// Directory for cover artifacts.
    #[serde(default = "default_covers_dir")]
    pub covers_dir: PathBuf,

    /// Longest edge of a stored cover, in pixels.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    /// JPEG quality (1-100).
    #[serde(default = "default_quality")]
    pub quality: u8,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            covers_dir: default_covers_dir(),
            max_dimension: default_max_dimension(),
            quality: default_quality(),
        }
    }
}

fn default_covers_dir() -> PathBuf {
    PathBuf::from("data/covers")
}

fn default_max_dimension() -> u32 {
    1024
}

fn default_quality() -> u8 {
    85
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/library.db")
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::ImportError::Config(format!("Failed to read config file: {}", e))
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> crate::error::Result<Self> {
        toml::from_str(content).map_err(|e| {
            crate::error::ImportError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("comic-import.toml"),
            dirs::config_dir()
                .map(|p| p.join("comic-import").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/comic-import/config.toml"),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# comic-import configuration

[import]
# Largest archive accepted, in bytes (2 GiB)
max_archive_size = 2147483648
# Largest total uncompressed size streamed from one archive, in bytes
max_total_uncompressed = 2147483648
# Largest number of entries streamed from one archive
max_entries = 10000
# Skip files already in the library when importing directories
skip_existing = true

[cover]
# covers_dir = "/var/lib/comic-import/covers"
max_dimension = 1024
quality = 85

[database]
# path = "/var/lib/comic-import/library.db"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let config = Config::default();
        assert_eq!(config.import.max_archive_size, 2 * GIB);
        assert_eq!(config.import.max_entries, 10_000);
        assert_eq!(config.cover.max_dimension, 1024);
        assert_eq!(config.cover.quality, 85);
    }

    #[test]
    fn generated_default_parses() {
        let config = Config::parse(&Config::generate_default()).unwrap();
        assert_eq!(config.import.max_total_uncompressed, 2 * GIB);
        assert!(config.import.skip_existing);
        assert_eq!(config.database.path, PathBuf::from("data/library.db"));
    }

    #[test]
    fn partial_sections_fall_back_to_defaults() {
        let config = Config::parse("[cover]\nquality = 70\n").unwrap();
        assert_eq!(config.cover.quality, 70);
        assert_eq!(config.cover.max_dimension, 1024);
        assert_eq!(config.import.max_entries, 10_000);
    }
}
