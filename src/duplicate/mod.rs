//! Duplicate detection module
//!
//! Finds files with byte-identical content across several directory trees
//! and removes the redundant copies.
//!
//! # Submodules
//!
//! - `detector` - Content fingerprint index, wasted-space accounting and deletion

pub mod detector;
