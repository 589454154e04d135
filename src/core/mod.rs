//! Core functionality module
//!
//! This module contains the business logic of the organizer: sorting files
//! into categories, moving them without overwriting anything, and deciding
//! which duplicate copies to keep.
//!
//! # Submodules
//!
//! - `category` - Extension to category mapping
//! - `classifier` - Single-directory classification and skip lists
//! - `config` - Configuration loading, saving, and management
//! - `error` - Error types and result aliases
//! - `organizer` - Classify-then-move workflow
//! - `progress` - Progress sink trait
//! - `relocation` - Collision-safe moves and category destinations
//! - `retention` - Keep-newest / keep-oldest selection for duplicate groups
//! - `roots` - Well-known folder resolution

pub mod category;
pub mod classifier;
pub mod config;
pub mod error;
pub mod organizer;
pub mod progress;
pub mod relocation;
pub mod retention;
pub mod roots;
