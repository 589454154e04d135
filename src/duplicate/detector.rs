//! Duplicate Detection Module
//!
//! Finds files with identical content across one or more directory trees
//! using SHA256 hashing. Two files are duplicates exactly when their digests
//! match; names, sizes and locations play no part in the decision.
//!
//! # Architecture
//!
//! A scan runs in three steps:
//! 1. **Enumerate**: every root is walked recursively, entries sorted by name
//! 2. **Hash**: files are streamed through SHA256, in parallel with rayon
//! 3. **Group**: digests are inserted into an ordered hash-to-files map in
//!    enumeration order, and only buckets with more than one file are kept
//!
//! Because insertion happens after hashing, in enumeration order, the first
//! member of a group (the one counted as the original for wasted-space
//! accounting) is the first-enumerated file that hashed successfully, no
//! matter which worker finished first.
//!
//! # Example
//!
//! ```rust,no_run
//! use file_organizer::core::progress::NoProgress;
//! use file_organizer::duplicate::detector::{DuplicateConfig, FingerprintIndex};
//! use std::path::PathBuf;
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! let shutdown = Arc::new(AtomicBool::new(false));
//! let mut index = FingerprintIndex::new(DuplicateConfig::new(), shutdown);
//!
//! let roots = vec![PathBuf::from("/data/photos"), PathBuf::from("/backup/photos")];
//! let groups = index.find_duplicates(&roots, &NoProgress).unwrap();
//! println!("{} duplicate groups", groups.len());
//! println!("{} bytes wasted", index.total_wasted_space());
//! ```

use crate::core::error::{OrganizerError, Result};
use crate::core::progress::ProgressSink;
use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

/// Buffer size for streaming hash computation (64KB)
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// SHA256 hash represented as a fixed-size array
pub type Sha256Hash = [u8; 32];

/// Configuration for duplicate detection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateConfig {
    /// Whether to follow symbolic links while walking
    pub follow_symlinks: bool,

    /// Minimum file size to consider (0 = no minimum)
    pub min_file_size: u64,

    /// Hashing threads (0 = rayon default, 1 = hash on the calling thread)
    pub threads: usize,
}

impl DuplicateConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to follow symbolic links
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set minimum file size
    pub fn with_min_size(mut self, size: u64) -> Self {
        self.min_file_size = size;
        self
    }

    /// Set the number of hashing threads
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

/// A file seen during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// File path
    pub path: PathBuf,
    /// Bytes streamed into the digest
    pub size: u64,
    /// Creation time (modification time where creation time is unsupported)
    pub created: Option<DateTime<Utc>>,
    /// SHA256 of the content, once computed
    #[serde(serialize_with = "hex_hash::serialize_opt")]
    pub hash: Option<Sha256Hash>,
}

impl FileRecord {
    /// File name for display
    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }
}

/// Creation timestamp from metadata, falling back to modification time
pub fn file_timestamp(metadata: &fs::Metadata) -> Option<DateTime<Utc>> {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Serde helpers for hex encoding hashes
mod hex_hash {
    use super::{hash_to_hex, Sha256Hash};
    use serde::Serializer;

    pub fn serialize<S>(hash: &Sha256Hash, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hash_to_hex(hash))
    }

    pub fn serialize_opt<S>(hash: &Option<Sha256Hash>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match hash {
            Some(hash) => serialize(hash, serializer),
            None => serializer.serialize_none(),
        }
    }
}

/// Statistics about the last scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    /// Files discovered under all roots
    pub files_found: usize,
    /// Files successfully hashed
    pub files_hashed: usize,
    /// Files left out by the size filter
    pub files_filtered: usize,
    /// Per-file failures (enumeration or hashing)
    pub errors: usize,
    /// Total bytes read while hashing
    pub bytes_hashed: u64,
    /// Number of distinct digests
    pub unique_hashes: usize,
    /// Number of duplicate groups kept
    pub duplicate_groups: usize,
    /// Files beyond the first in each group
    pub duplicate_files: usize,
    /// Time taken by the scan (in milliseconds)
    pub build_time_ms: u64,
}

/// Files sharing one content hash
///
/// This is a snapshot of the filesystem at scan time; members may have been
/// moved or deleted since.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    /// The shared hash
    #[serde(serialize_with = "hex_hash::serialize")]
    pub hash: Sha256Hash,
    /// Members in insertion order; the first one is the representative
    pub members: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// The member used for naming and counted as the original
    pub fn representative(&self) -> Option<&FileRecord> {
        self.members.first()
    }

    /// Paths of all members
    pub fn paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|m| m.path.clone()).collect()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the group has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Size of one copy
    pub fn size(&self) -> u64 {
        self.representative().map(|m| m.size).unwrap_or(0)
    }

    /// Bytes held by every member except the representative
    pub fn wasted_bytes(&self) -> u64 {
        self.members.iter().skip(1).map(|m| m.size).sum()
    }

    /// Display key, e.g. `Group_3_holiday.jpg` (`position` is 1-based)
    pub fn display_name(&self, position: usize) -> String {
        let name = self
            .representative()
            .map(|m| m.file_name())
            .unwrap_or_default();
        format!("Group_{}_{}", position, name)
    }

    /// Hex form of the shared hash
    pub fn hash_hex(&self) -> String {
        hash_to_hex(&self.hash)
    }
}

/// Hash to files map that remembers the order hashes were first seen
#[derive(Debug, Default)]
struct HashBuckets {
    positions: HashMap<Sha256Hash, usize>,
    buckets: Vec<(Sha256Hash, Vec<FileRecord>)>,
}

impl HashBuckets {
    /// Append a record to the bucket for `hash`, creating it on first use
    fn insert(&mut self, hash: Sha256Hash, record: FileRecord) {
        match self.positions.get(&hash) {
            Some(&pos) => self.buckets[pos].1.push(record),
            None => {
                self.positions.insert(hash, self.buckets.len());
                self.buckets.push((hash, vec![record]));
            }
        }
    }

    fn unique_hashes(&self) -> usize {
        self.buckets.len()
    }

    /// Keep buckets with more than one member, in first-seen order
    fn into_groups(self) -> Vec<DuplicateGroup> {
        self.buckets
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(hash, members)| DuplicateGroup { hash, members })
            .collect()
    }
}

/// Content fingerprint index over one or more directory trees
#[derive(Debug)]
pub struct FingerprintIndex {
    /// Duplicate groups from the last scan
    groups: Vec<DuplicateGroup>,

    /// Statistics
    stats: ScanStats,

    /// Configuration used
    config: DuplicateConfig,

    /// Raised to stop before the next file
    shutdown_flag: Arc<AtomicBool>,
}

impl FingerprintIndex {
    /// Create a new empty index
    pub fn new(config: DuplicateConfig, shutdown_flag: Arc<AtomicBool>) -> Self {
        Self {
            groups: Vec::new(),
            stats: ScanStats::default(),
            config,
            shutdown_flag,
        }
    }

    /// Scan `roots` recursively and group files by content.
    ///
    /// Every root must exist before anything is hashed; a missing root fails
    /// the whole scan with `NotFound`. Files that cannot be read are reported
    /// to `progress` and left out. Cancellation stops before the next file
    /// and returns `Cancelled`.
    pub fn find_duplicates(
        &mut self,
        roots: &[PathBuf],
        progress: &dyn ProgressSink,
    ) -> Result<&[DuplicateGroup]> {
        let start_time = std::time::Instant::now();
        self.groups.clear();
        self.stats = ScanStats::default();

        for root in roots {
            check_root(root)?;
        }

        info!("Scanning {} folder(s) for files...", roots.len());

        let files = self.collect_files(roots, progress);
        let total_files = files.len();
        self.stats.files_found = total_files;

        progress.report(&format!("Found {} files to analyze", total_files));
        info!("Found {} files to analyze", total_files);

        let processed = AtomicUsize::new(0);
        let errors = AtomicUsize::new(0);
        let filtered = AtomicUsize::new(0);
        let config = &self.config;
        let shutdown_flag = &self.shutdown_flag;

        let hash_one = |path: &PathBuf| -> Option<FileRecord> {
            if shutdown_flag.load(Ordering::Relaxed) {
                return None;
            }

            let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
            progress.report(&format!(
                "Processing {}/{}: {}",
                current,
                total_files,
                display_name(path)
            ));

            match hash_record(path, config) {
                Ok(Some(record)) => Some(record),
                Ok(None) => {
                    trace!("Below size threshold: {}", path.display());
                    filtered.fetch_add(1, Ordering::Relaxed);
                    None
                }
                Err(e) => {
                    warn!("Failed to hash {}: {}", path.display(), e);
                    progress.report(&format!("Error processing {}: {}", path.display(), e));
                    errors.fetch_add(1, Ordering::Relaxed);
                    None
                }
            }
        };

        let records: Vec<Option<FileRecord>> = match self.config.threads {
            1 => files.iter().map(hash_one).collect(),
            0 => files.par_iter().map(hash_one).collect(),
            n => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| {
                        OrganizerError::IoError(format!("Failed to start hashing threads: {}", e))
                    })?;
                pool.install(|| files.par_iter().map(hash_one).collect())
            }
        };

        if self.shutdown_flag.load(Ordering::SeqCst) {
            info!("Duplicate scan interrupted");
            progress.report("Duplicate scan cancelled");
            return Err(OrganizerError::Cancelled);
        }

        let mut buckets = HashBuckets::default();
        for record in records.into_iter().flatten() {
            self.stats.files_hashed += 1;
            self.stats.bytes_hashed += record.size;
            if let Some(hash) = record.hash {
                buckets.insert(hash, record);
            }
        }

        self.stats.errors += errors.load(Ordering::Relaxed);
        self.stats.files_filtered = filtered.load(Ordering::Relaxed);
        self.stats.unique_hashes = buckets.unique_hashes();
        self.groups = buckets.into_groups();
        self.compute_stats();
        self.stats.build_time_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Index built: {} files, {} unique hashes, {} duplicate groups, {} errors in {}ms",
            self.stats.files_hashed,
            self.stats.unique_hashes,
            self.stats.duplicate_groups,
            self.stats.errors,
            self.stats.build_time_ms
        );
        progress.report(&format!(
            "Analysis complete. Found {} duplicate groups",
            self.groups.len()
        ));

        Ok(&self.groups)
    }

    /// Collect all files under the given roots.
    ///
    /// A file reachable from several roots (nested or repeated roots, `.`
    /// components, symlinked directories) is kept once, under the path it
    /// was first enumerated with.
    fn collect_files(&mut self, roots: &[PathBuf], progress: &dyn ProgressSink) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut seen = HashSet::new();

        for root in roots {
            let walker = WalkDir::new(root)
                .follow_links(self.config.follow_symlinks)
                .sort_by_file_name();

            for entry in walker {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file() {
                            let path = entry.into_path();
                            let key = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
                            if seen.insert(key) {
                                files.push(path);
                            } else {
                                trace!("Already enumerated: {}", path.display());
                            }
                        }
                    }
                    Err(e) => {
                        let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                        warn!("Failed to read {}: {}", path.display(), e);
                        progress.report(&format!("Error processing {}: {}", path.display(), e));
                        self.stats.errors += 1;
                    }
                }
            }
        }

        files
    }

    /// Recompute group-derived statistics
    fn compute_stats(&mut self) {
        self.stats.duplicate_groups = self.groups.len();
        self.stats.duplicate_files = self.groups.iter().map(|g| g.len() - 1).sum();
    }

    /// Bytes held by redundant copies across all groups.
    ///
    /// Each group counts every member but its first. Reflects the index as
    /// it stands, so call it after [`find_duplicates`](Self::find_duplicates).
    pub fn total_wasted_space(&self) -> u64 {
        self.groups.iter().map(DuplicateGroup::wasted_bytes).sum()
    }

    /// Delete the given files, returning how many were actually removed.
    ///
    /// Each path is checked again right before deletion. Missing, locked or
    /// protected files are reported and skipped.
    pub fn delete_files(&self, paths: &[PathBuf], progress: &dyn ProgressSink) -> usize {
        let mut deleted = 0;

        for path in paths {
            if self.shutdown_flag.load(Ordering::SeqCst) {
                info!("Deletion interrupted after {} file(s)", deleted);
                progress.report("Deletion cancelled");
                break;
            }

            let name = display_name(path);
            if fs::symlink_metadata(path).is_err() {
                warn!("Not deleting {}: file no longer exists", path.display());
                progress.report(&format!("Failed to delete {}: file no longer exists", name));
                continue;
            }

            match fs::remove_file(path) {
                Ok(()) => {
                    deleted += 1;
                    debug!("Deleted {}", path.display());
                    progress.report(&format!("Deleted: {}", name));
                }
                Err(e) => {
                    warn!("Failed to delete {}: {}", path.display(), e);
                    progress.report(&format!("Failed to delete {}: {}", name, e));
                }
            }
        }

        info!("Deleted {} of {} file(s)", deleted, paths.len());
        progress.report(&format!("Deleted {} duplicate files", deleted));
        deleted
    }

    /// Drop members that no longer exist on disk.
    ///
    /// Groups left with one member or fewer are discarded. Returns the number
    /// of members removed.
    pub fn prune_missing(&mut self) -> usize {
        let before: usize = self.groups.iter().map(DuplicateGroup::len).sum();

        for group in &mut self.groups {
            group.members.retain(|m| m.path.exists());
        }
        self.groups.retain(|g| g.len() > 1);

        let after: usize = self.groups.iter().map(DuplicateGroup::len).sum();
        self.compute_stats();
        before - after
    }

    /// Duplicate groups from the last scan
    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// Get statistics about the last scan
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Get the number of duplicate groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if no duplicates are known
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// A root must exist, be a directory and be listable
fn check_root(root: &Path) -> Result<()> {
    if !root.is_dir() {
        return Err(OrganizerError::NotFound(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|e| OrganizerError::for_directory(root, &e))?;
    Ok(())
}

/// Stat and hash one file. `Ok(None)` means the size filter excluded it.
fn hash_record(path: &Path, config: &DuplicateConfig) -> Result<Option<FileRecord>> {
    let metadata = fs::metadata(path).map_err(|e| OrganizerError::for_file(path, e))?;

    if config.min_file_size > 0 && metadata.len() < config.min_file_size {
        return Ok(None);
    }

    let file = File::open(path).map_err(|e| OrganizerError::for_file(path, e))?;
    let (hash, size) = hash_reader(file).map_err(|e| OrganizerError::for_file(path, e))?;

    Ok(Some(FileRecord {
        path: path.to_path_buf(),
        size,
        created: file_timestamp(&metadata),
        hash: Some(hash),
    }))
}

/// Stream a reader through SHA256, returning the digest and the byte count
pub fn hash_reader<R: Read>(reader: R) -> io::Result<(Sha256Hash, u64)> {
    let mut reader = BufReader::with_capacity(HASH_BUFFER_SIZE, reader);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        hasher.update(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }

    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);

    Ok((hash, total))
}

/// Convert a hash to a hexadecimal string
pub fn hash_to_hex(hash: &Sha256Hash) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
