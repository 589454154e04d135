//! Well-known folder resolution
//!
//! The core never hard-codes platform folders. Anything that needs "the
//! Downloads folder" asks a [`FolderResolver`] for candidates instead, which
//! keeps the scanning and moving logic testable against temporary
//! directories.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// A semantic folder role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderRole {
    Downloads,
    Pictures,
    Documents,
    Music,
    Videos,
    /// Camera roll (DCIM)
    Camera,
}

impl fmt::Display for FolderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FolderRole::Downloads => "Downloads",
            FolderRole::Pictures => "Pictures",
            FolderRole::Documents => "Documents",
            FolderRole::Music => "Music",
            FolderRole::Videos => "Videos",
            FolderRole::Camera => "DCIM",
        };
        f.write_str(name)
    }
}

/// Resolves a folder role to zero or more candidate directories
pub trait FolderResolver: Send + Sync {
    /// Candidate directories for `role`, most preferred first.
    ///
    /// Candidates are not required to exist.
    fn candidates(&self, role: FolderRole) -> Vec<PathBuf>;

    /// Preferred candidate, whether or not it exists yet
    fn preferred(&self, role: FolderRole) -> Option<PathBuf> {
        self.candidates(role).into_iter().next()
    }

    /// First candidate that exists and is a directory
    fn first_existing(&self, role: FolderRole) -> Option<PathBuf> {
        self.candidates(role).into_iter().find(|p| p.is_dir())
    }
}

/// Folder resolver backed by the user's platform folders
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFolders;

impl FolderResolver for SystemFolders {
    fn candidates(&self, role: FolderRole) -> Vec<PathBuf> {
        let home = dirs::home_dir();
        let (known, fallback_name) = match role {
            FolderRole::Downloads => (dirs::download_dir(), "Downloads"),
            FolderRole::Pictures => (dirs::picture_dir(), "Pictures"),
            FolderRole::Documents => (dirs::document_dir(), "Documents"),
            FolderRole::Music => (dirs::audio_dir(), "Music"),
            FolderRole::Videos => (dirs::video_dir(), "Videos"),
            FolderRole::Camera => {
                let mut dcim = Vec::new();
                if let Some(pictures) = dirs::picture_dir() {
                    dcim.push(pictures.join("DCIM"));
                }
                if let Some(home) = home {
                    dcim.push(home.join("DCIM"));
                }
                return dcim;
            }
        };

        let mut candidates: Vec<PathBuf> = known.into_iter().collect();
        if let Some(home) = home {
            let fallback = home.join(fallback_name);
            if !candidates.contains(&fallback) {
                candidates.push(fallback);
            }
        }
        candidates
    }
}

/// Folders scanned for duplicates when none are configured: Downloads,
/// Pictures and the camera roll, whichever exist.
///
/// A folder lying inside one already chosen is left out.
pub fn default_scan_roots(folders: &dyn FolderResolver) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    for role in [FolderRole::Downloads, FolderRole::Pictures, FolderRole::Camera] {
        if let Some(dir) = folders.first_existing(role) {
            if !roots.iter().any(|root| dir.starts_with(root)) {
                roots.push(dir);
            }
        }
    }
    roots
}

/// Fixed, in-memory folder resolver
#[derive(Debug, Clone, Default)]
pub struct StaticFolders {
    folders: HashMap<FolderRole, Vec<PathBuf>>,
}

impl StaticFolders {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a candidate for a role
    pub fn with(mut self, role: FolderRole, path: impl Into<PathBuf>) -> Self {
        self.folders.entry(role).or_default().push(path.into());
        self
    }
}

impl FolderResolver for StaticFolders {
    fn candidates(&self, role: FolderRole) -> Vec<PathBuf> {
        self.folders.get(&role).cloned().unwrap_or_default()
    }
}
