//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use crate::core::retention::KeepPolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sort downloads into category folders and clean up duplicate files
#[derive(Parser, Debug)]
#[command(name = "file-organizer")]
#[command(author = "Vihaan Reddy M")]
#[command(version = "1.0.0")]
#[command(about = "Sort files into category folders and find duplicate files by content", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Move the files of a directory into category folders
    ///
    /// Only the top level of SOURCE is organized; subdirectories are left
    /// alone. Existing files are never overwritten: a clash becomes
    /// `name(1).ext`, `name(2).ext`, and so on.
    Organize {
        /// Directory to organize (defaults to config, then Downloads)
        source: Option<PathBuf>,

        /// File to leave in place (can be specified multiple times)
        #[arg(long, value_name = "PATH")]
        skip: Vec<PathBuf>,

        /// Put every category under DIR/<Category> instead of the usual folders
        #[arg(long, value_name = "DIR")]
        into: Option<PathBuf>,

        /// Show what would be moved without moving anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show how the files of a directory would be categorised
    Classify {
        /// Directory to classify (defaults to config, then Downloads)
        source: Option<PathBuf>,

        /// File to leave out (can be specified multiple times)
        #[arg(long, value_name = "PATH")]
        skip: Vec<PathBuf>,
    },

    /// Find files with identical content
    Duplicates {
        /// Folders to scan recursively (defaults to config, then Downloads, Pictures and DCIM)
        roots: Vec<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find duplicates and delete all but one copy of each
    Clean {
        /// Folders to scan recursively (defaults to config, then Downloads, Pictures and DCIM)
        roots: Vec<PathBuf>,

        /// Which copy to keep, by creation time (overrides config)
        #[arg(long, value_enum)]
        keep: Option<KeepPolicy>,

        /// Show what would be deleted without deleting anything
        #[arg(long)]
        dry_run: bool,

        /// Delete without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Open the configuration file in your default editor
    ///
    /// If no config file exists, a default one will be created.
    Config {
        /// Show the config file path without opening it
        #[arg(long)]
        path: bool,

        /// Reset config to defaults (creates a fresh config file)
        #[arg(long)]
        reset: bool,
    },

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration
    ShowConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_clean() {
        let args = Args::parse_from([
            "file-organizer",
            "clean",
            "/a",
            "/b",
            "--keep",
            "oldest",
            "--yes",
        ]);

        match args.command {
            Some(Commands::Clean {
                roots,
                keep,
                dry_run,
                yes,
            }) => {
                assert_eq!(roots, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
                assert_eq!(keep, Some(KeepPolicy::Oldest));
                assert!(!dry_run);
                assert!(yes);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_organize_with_global_flags() {
        let args = Args::parse_from([
            "file-organizer",
            "organize",
            "--skip",
            "keep.pdf",
            "--dry-run",
            "--log-level",
            "debug",
        ]);

        assert_eq!(args.log_level.as_deref(), Some("debug"));
        match args.command {
            Some(Commands::Organize {
                source,
                skip,
                into,
                dry_run,
            }) => {
                assert!(source.is_none());
                assert_eq!(skip, vec![PathBuf::from("keep.pdf")]);
                assert!(into.is_none());
                assert!(dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
