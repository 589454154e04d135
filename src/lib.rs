//! File Organizer Library
//!
//! Sorts the files of a directory into categories by extension and moves them
//! into per-category folders without ever overwriting anything. Also finds
//! byte-identical files across several directory trees with SHA256 and removes
//! the redundant copies under a keep-newest or keep-oldest policy.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`core`] - Categories, classification, relocation, retention,
//!   configuration and error handling
//! - [`duplicate`] - Duplicate detection using SHA256 hashing
//! - [`cli`] - Command-line interface (only used by the binary)
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use file_organizer::core::classifier::{FileClassifier, SkipList};
//! use file_organizer::core::organizer::Organizer;
//! use file_organizer::core::progress::NoProgress;
//! use file_organizer::core::relocation::{BaseDirDestinations, Relocator};
//! use std::path::Path;
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let organizer = Organizer::new(
//!         FileClassifier::default(),
//!         Relocator::new(BaseDirDestinations::new("/home/me/Sorted")),
//!         Arc::new(AtomicBool::new(false)),
//!     );
//!
//!     let report = organizer.organize(Path::new("/home/me/Downloads"), &SkipList::new(), &NoProgress)?;
//!     println!("Organized {} of {} files", report.moved_count(), report.attempted);
//!     Ok(())
//! }
//! ```
//!
//! Finding and cleaning duplicates:
//!
//! ```rust,no_run
//! use file_organizer::core::progress::NoProgress;
//! use file_organizer::core::retention::{select_for_deletion, KeepPolicy};
//! use file_organizer::duplicate::detector::{DuplicateConfig, FingerprintIndex};
//! use std::path::PathBuf;
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut index = FingerprintIndex::new(DuplicateConfig::new(), Arc::new(AtomicBool::new(false)));
//!     index.find_duplicates(&[PathBuf::from("/home/me/Pictures")], &NoProgress)?;
//!
//!     let doomed = select_for_deletion(index.groups(), KeepPolicy::Oldest);
//!     let deleted = index.delete_files(&doomed, &NoProgress);
//!     println!("Deleted {} of {} files", deleted, doomed.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod duplicate;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
