//! # Emoji Art CLI
//!
//! Command-line host for emoji art documents.
//!
//! ## Usage
//!
//! ```bash
//! emoji-art new Beach
//! emoji-art add Beach 🏖 --x 20 --y -40 --size 60
//! emoji-art background Beach https://example.com/sand.jpg --wait
//! emoji-art show Beach
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `CliConfig` - Resolved data directory, store name and command
//! - [`run`] - Executes one command against a `DocumentStore`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod commands;

pub use commands::run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

/// Store used when none is given.
pub const DEFAULT_STORE: &str = "Main";

/// File inside the data directory holding all persisted keys.
pub const DEFAULTS_FILE: &str = "defaults.json";

/// Command-line arguments for emoji-art.
#[derive(Debug, Clone, Parser)]
#[command(name = "emoji-art")]
#[command(about = "Create and edit emoji art documents")]
#[command(version)]
pub struct CliArgs {
    /// Directory holding persisted documents and palettes
    #[arg(long, env = "EMOJI_ART_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Name of the document store to use
    #[arg(long, env = "EMOJI_ART_STORE", default_value = DEFAULT_STORE)]
    pub store: String,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Commands. Documents are addressed by name or ID.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List documents
    List,
    /// Create a document
    New {
        /// Display name (default: Untitled)
        name: Option<String>,
    },
    /// Print a document's background and emoji
    Show {
        /// Document name or ID
        doc: String,
    },
    /// Rename a document
    Rename {
        /// Document name or ID
        doc: String,
        /// New display name
        name: String,
    },
    /// Delete a document
    Delete {
        /// Document name or ID
        doc: String,
    },
    /// Place an emoji
    Add {
        /// Document name or ID
        doc: String,
        /// Emoji text
        emoji: String,
        /// Horizontal offset from the center
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        x: f64,
        /// Vertical offset from the center
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        y: f64,
        /// Point size
        #[arg(long, default_value_t = 40.0)]
        size: f64,
    },
    /// Move an emoji
    Move {
        /// Document name or ID
        doc: String,
        /// Emoji ID
        emoji_id: String,
        /// Horizontal distance
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        dx: f64,
        /// Vertical distance
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        dy: f64,
    },
    /// Scale an emoji
    Scale {
        /// Document name or ID
        doc: String,
        /// Emoji ID
        emoji_id: String,
        /// Scale factor
        factor: f64,
    },
    /// Remove an emoji
    Remove {
        /// Document name or ID
        doc: String,
        /// Emoji ID
        emoji_id: String,
    },
    /// Set the background image, or clear it when no URL is given
    Background {
        /// Document name or ID
        doc: String,
        /// Image URL (http, https, file or data)
        url: Option<Url>,
        /// Wait for the image and report its size
        #[arg(long)]
        wait: bool,
    },
    /// List emoji palettes
    Palettes,
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Directory holding the defaults file.
    pub data_dir: PathBuf,
    /// Document store name.
    pub store: String,
    /// Command to run.
    pub command: Command,
}

impl CliConfig {
    /// Path of the defaults file.
    #[must_use]
    pub fn defaults_path(&self) -> PathBuf {
        self.data_dir.join(DEFAULTS_FILE)
    }
}

/// The platform data directory for emoji-art, e.g.
/// `$XDG_DATA_HOME/emoji-art` on Linux.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from(".emoji-art"), |dir| dir.join("emoji-art"))
}

impl From<CliArgs> for CliConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            data_dir: args.data_dir.unwrap_or_else(default_data_dir),
            store: args.store,
            command: args.command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("emoji-art").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn test_add_defaults() {
        let args = parse(&["--data-dir", "/tmp/art", "add", "Beach", "🏖"]);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/art")));
        match args.command {
            Command::Add {
                doc,
                emoji,
                x,
                y,
                size,
            } => {
                assert_eq!(doc, "Beach");
                assert_eq!(emoji, "🏖");
                assert!(x.abs() < f64::EPSILON && y.abs() < f64::EPSILON);
                assert!((size - 40.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_negative_offsets() {
        let args = parse(&["move", "Beach", "some-id", "--dx", "-12.5", "--dy", "-3"]);
        match args.command {
            Command::Move { dx, dy, .. } => {
                assert!((dx + 12.5).abs() < f64::EPSILON);
                assert!((dy + 3.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_background_url_is_validated() {
        let result = CliArgs::try_parse_from(["emoji-art", "background", "Beach", "not a url"]);
        assert!(result.is_err());

        let args = parse(&["background", "Beach", "https://example.com/a.png", "--wait"]);
        match args.command {
            Command::Background { url, wait, .. } => {
                assert_eq!(
                    url.map(String::from).as_deref(),
                    Some("https://example.com/a.png")
                );
                assert!(wait);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_config_from_args() {
        let config = CliConfig::from(parse(&[
            "--data-dir",
            "/tmp/art",
            "--store",
            "Work",
            "list",
        ]));
        assert_eq!(config.store, "Work");
        assert_eq!(config.defaults_path(), PathBuf::from("/tmp/art/defaults.json"));
        assert!(matches!(config.command, Command::List));
    }

    #[test]
    fn test_default_data_dir_name() {
        let dir = default_data_dir();
        assert!(dir.ends_with("emoji-art") || dir.ends_with(".emoji-art"));
    }
}
