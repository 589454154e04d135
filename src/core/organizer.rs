//! Organize workflow
//!
//! Classifies one directory and moves every file into its category
//! destination. Per-file failures are counted and reported, never fatal; only
//! a source directory that cannot be read at all fails the whole run.

use crate::core::category::Category;
use crate::core::classifier::{FileClassifier, SkipList};
use crate::core::error::Result;
use crate::core::progress::ProgressSink;
use crate::core::relocation::{CategoryPathResolver, Relocator};
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A file that was moved (or would be, in a dry run)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovedFile {
    pub from: PathBuf,
    pub to: PathBuf,
    pub category: Category,
}

/// A file that could not be moved
#[derive(Debug, Clone, Serialize)]
pub struct OrganizeFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Result of an organize run
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganizeReport {
    /// Files found by classification
    pub attempted: usize,
    pub moved: Vec<MovedFile>,
    pub failures: Vec<OrganizeFailure>,
    /// The run stopped early on a shutdown request
    pub interrupted: bool,
    /// Nothing was actually moved
    pub dry_run: bool,
}

impl OrganizeReport {
    /// Number of files moved
    pub fn moved_count(&self) -> usize {
        self.moved.len()
    }

    /// Every attempted file was moved
    pub fn is_complete(&self) -> bool {
        !self.interrupted && self.failures.is_empty() && self.moved.len() == self.attempted
    }
}

/// Classifies a directory and relocates its files
pub struct Organizer<R> {
    classifier: FileClassifier,
    relocator: Relocator<R>,
    dry_run: bool,
    shutdown_flag: Arc<AtomicBool>,
}

impl<R: CategoryPathResolver> Organizer<R> {
    /// Create an organizer
    pub fn new(
        classifier: FileClassifier,
        relocator: Relocator<R>,
        shutdown_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            classifier,
            relocator,
            dry_run: false,
            shutdown_flag,
        }
    }

    /// Only plan destinations, don't move anything
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Organize the immediate files of `source`.
    ///
    /// Stops before the next file when the shutdown flag is raised and
    /// returns what was done so far.
    pub fn organize(
        &self,
        source: &Path,
        skip: &SkipList,
        progress: &dyn ProgressSink,
    ) -> Result<OrganizeReport> {
        let classification = self.classifier.classify(source, skip)?;

        let mut report = OrganizeReport {
            attempted: classification.total_files(),
            dry_run: self.dry_run,
            ..Default::default()
        };

        progress.report(&format!("Found {} files to organize", report.attempted));

        for (path, message) in classification.failures() {
            progress.report(&format!("Error processing {}: {}", path.display(), message));
            report.failures.push(OrganizeFailure {
                path: path.clone(),
                message: message.clone(),
            });
        }

        'categories: for (category, files) in classification.iter() {
            for path in files {
                if self.shutdown_flag.load(Ordering::SeqCst) {
                    warn!("Shutdown requested, stopping organize...");
                    progress.report("Organize interrupted");
                    report.interrupted = true;
                    break 'categories;
                }

                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                progress.report(&format!("Moving {} to {}", name, category));

                let outcome = if self.dry_run {
                    self.relocator.plan(path, category)
                } else {
                    self.relocator.relocate(path, category)
                };

                match outcome {
                    Ok(to) => report.moved.push(MovedFile {
                        from: path.clone(),
                        to,
                        category,
                    }),
                    Err(e) => {
                        warn!("{}", e);
                        progress.report(&format!("Failed to move {}: {}", name, e));
                        report.failures.push(OrganizeFailure {
                            path: path.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            "Organized {} of {} files ({} failed){}",
            report.moved_count(),
            report.attempted,
            report.failures.len(),
            if self.dry_run { " [dry run]" } else { "" }
        );
        progress.report(&format!(
            "Organized {} of {} files",
            report.moved_count(),
            report.attempted
        ));

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::OrganizerError;
    use crate::core::progress::NoProgress;
    use crate::core::relocation::BaseDirDestinations;
    use std::fs;
    use tempfile::TempDir;

    fn organizer(dest: &Path, shutdown: bool) -> Organizer<BaseDirDestinations> {
        Organizer::new(
            FileClassifier::default(),
            Relocator::new(BaseDirDestinations::new(dest)),
            Arc::new(AtomicBool::new(shutdown)),
        )
    }

    fn touch(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_organize_moves_into_categories() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        touch(source.path(), "a.jpg", "img");
        touch(source.path(), "b.mp3", "song");
        touch(source.path(), "c.xyz", "other");

        let report = organizer(dest.path(), false)
            .organize(source.path(), &SkipList::new(), &NoProgress)
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.moved_count(), 3);
        assert!(dest.path().join("Images").join("a.jpg").is_file());
        assert!(dest.path().join("Music").join("b.mp3").is_file());
        assert!(dest.path().join("Miscellaneous").join("c.xyz").is_file());
        assert_eq!(fs::read_dir(source.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_organize_never_overwrites() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let images = dest.path().join("Images");
        fs::create_dir_all(&images).unwrap();
        touch(&images, "photo.png", "existing");
        touch(source.path(), "photo.png", "incoming");

        let report = organizer(dest.path(), false)
            .organize(source.path(), &SkipList::new(), &NoProgress)
            .unwrap();

        assert_eq!(report.moved[0].to, images.join("photo(1).png"));
        assert_eq!(fs::read_to_string(images.join("photo.png")).unwrap(), "existing");
        assert_eq!(fs::read_to_string(images.join("photo(1).png")).unwrap(), "incoming");
    }

    #[test]
    fn test_failed_move_does_not_stop_batch() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        // A plain file where the Documents directory should go.
        touch(dest.path(), "Documents", "in the way");
        let doc = touch(source.path(), "notes.pdf", "doc");
        touch(source.path(), "song.mp3", "song");

        let messages = std::sync::Mutex::new(Vec::new());
        let sink = |m: &str| messages.lock().unwrap().push(m.to_string());

        let report = organizer(dest.path(), false)
            .organize(source.path(), &SkipList::new(), &sink)
            .unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.moved_count(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, doc);
        assert!(doc.is_file());
        assert!(dest.path().join("Music").join("song.mp3").is_file());

        let messages = messages.lock().unwrap();
        assert!(messages.iter().any(|m| m.starts_with("Failed to move notes.pdf")));
        assert_eq!(messages.last().unwrap(), "Organized 1 of 2 files");
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_entry_is_reported_and_skipped() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        touch(source.path(), "a.jpg", "img");
        let broken = source.path().join("broken.mp3");
        std::os::unix::fs::symlink(source.path().join("gone.mp3"), &broken).unwrap();

        let messages = std::sync::Mutex::new(Vec::new());
        let sink = |m: &str| messages.lock().unwrap().push(m.to_string());

        let report = organizer(dest.path(), false)
            .organize(source.path(), &SkipList::new(), &sink)
            .unwrap();

        assert_eq!(report.attempted, 1);
        assert_eq!(report.moved_count(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, broken);
        assert!(!report.is_complete());
        assert!(dest.path().join("Images").join("a.jpg").is_file());

        let messages = messages.lock().unwrap();
        let errors: Vec<_> = messages
            .iter()
            .filter(|m| m.starts_with("Error processing"))
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("broken.mp3"));
    }

    #[test]
    fn test_dry_run_leaves_files_in_place() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let file = touch(source.path(), "clip.mp4", "frames");

        let report = organizer(dest.path(), false)
            .with_dry_run(true)
            .organize(source.path(), &SkipList::new(), &NoProgress)
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.moved[0].to, dest.path().join("Videos").join("clip.mp4"));
        assert!(file.is_file());
        assert!(!dest.path().join("Videos").exists());
    }

    #[test]
    fn test_shutdown_stops_before_first_file() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let file = touch(source.path(), "a.zip", "archive");

        let report = organizer(dest.path(), true)
            .organize(source.path(), &SkipList::new(), &NoProgress)
            .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.attempted, 1);
        assert!(report.moved.is_empty());
        assert!(file.is_file());
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let dest = TempDir::new().unwrap();
        let missing = dest.path().join("nowhere");

        let err = organizer(dest.path(), false)
            .organize(&missing, &SkipList::new(), &NoProgress)
            .unwrap_err();

        assert!(matches!(err, OrganizerError::NotFound(_)));
    }
}
