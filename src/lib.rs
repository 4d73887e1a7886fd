//! # garden
//!
//! Turns a directory of markdown notes into a static "digital garden" site.
//!
//! ```text
//! notes/  ──collect──► Vec<Note> ──build_note_tree──► Vec<TreeNode> ──folder_stats──► Stats
//!                          │                               │
//!                          └────────── render ◄────────────┘
//!                                        │
//!                        index.html, notes/<slug>.html, garden.json
//! ```
//!
//! | Module | Role |
//! |--------|------|
//! | [`content`] | walks the notes directory, reads front matter, drops unpublished notes |
//! | [`tree`] | flat slugs → sorted folder/file hierarchy, plus folder/file counts |
//! | [`view`] | flattens the hierarchy for display given the set of open folders |
//! | [`markdown`] | note bodies → HTML, including `[[wiki links]]` |
//! | [`template`] | embedded Tera templates for the home, note and 404 pages |
//! | [`site`] | one full build into the output directory |
//! | [`serve`] | HTTP server that regenerates its note index when stale |
//! | [`watch`] | rebuild on file changes |

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

pub mod config;
pub mod content;
pub mod domain;
pub mod error;
pub mod fs;
pub mod markdown;
pub mod serve;
pub mod site;
pub mod template;
pub mod tree;
pub mod view;
pub mod watch;

pub use config::GardenConfig;
pub use domain::{Note, Stats, TreeNode};
pub use error::GardenError;
pub use site::{BuildReport, Garden, build_site};
pub use tree::{build_note_tree, folder_stats};
pub use view::{ExpandedSet, FlatEntry, flatten_tree};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the garden config file
    #[arg(short, long, default_value = "garden.toml", global = true)]
    pub config: PathBuf,

    /// Path to the markdown notes directory (overrides the config file)
    #[arg(short, long, global = true)]
    pub source: Option<PathBuf>,

    /// Path to the output directory (overrides the config file)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Build the static site (default)
    Build,
    /// Serve the garden over HTTP, regenerating the note index when it goes stale
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
        /// Regenerate as soon as a note changes
        #[arg(long)]
        watch: bool,
    },
    /// Build, then rebuild whenever a note changes
    Watch,
}

impl Cli {
    /// Config file values with command-line overrides applied.
    pub fn garden_config(&self) -> Result<GardenConfig, config::ConfigError> {
        let mut config = config::load_config(&self.config)?;
        if let Some(source) = &self.source {
            config.source = source.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_is_the_default_command() {
        let cli = Cli::parse_from(["garden"]);
        assert_eq!(cli.command, None);
        assert_eq!(cli.config, PathBuf::from("garden.toml"));
    }

    #[test]
    fn serve_takes_an_address() {
        let cli = Cli::parse_from(["garden", "serve", "--addr", "0.0.0.0:8080", "--watch"]);
        assert_eq!(
            cli.command,
            Some(Command::Serve {
                addr: "0.0.0.0:8080".parse().unwrap(),
                watch: true,
            })
        );
    }

    #[test]
    fn flags_override_config_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("garden.toml");
        std::fs::write(&path, "source = \"from-file\"\noutput = \"public\"\n").unwrap();
        let cli = Cli::parse_from([
            "garden",
            "--config",
            path.to_str().unwrap(),
            "--source",
            "from-flag",
            "build",
        ]);
        let config = cli.garden_config().unwrap();
        assert_eq!(config.source, PathBuf::from("from-flag"));
        assert_eq!(config.output, PathBuf::from("public"));
    }
}
