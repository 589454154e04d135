//! Single-directory file classification
//!
//! Looks at the immediate contents of one directory (no recursion) and groups
//! the files it finds by [`Category`]. A failure on one entry is logged and
//! the entry is left out; it never aborts the scan.

use crate::core::category::{Category, CategoryMap};
use crate::core::error::{OrganizerError, Result};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Paths a scan must ignore
///
/// Paths are compared in a normalized form: absolute, with `.` and `..`
/// resolved lexically, and lower-cased, so `./Downloads/../Downloads/A.JPG`
/// and `/home/me/downloads/a.jpg` match.
#[derive(Debug, Clone, Default)]
pub struct SkipList {
    normalized: HashSet<String>,
}

impl SkipList {
    /// Create an empty skip list
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a skip list from any collection of paths
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let normalized = paths
            .into_iter()
            .map(|p| normalize_path(p.as_ref()))
            .collect();
        Self { normalized }
    }

    /// Add a path
    pub fn insert(&mut self, path: &Path) {
        self.normalized.insert(normalize_path(path));
    }

    /// Check whether `path` is on the list
    pub fn contains(&self, path: &Path) -> bool {
        !self.normalized.is_empty() && self.normalized.contains(&normalize_path(path))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.normalized.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

/// Make a path absolute, fold `.`/`..` lexically and lower-case it
pub fn normalize_path(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }

    cleaned.to_string_lossy().to_lowercase()
}

/// Files of one directory grouped by category
///
/// Within a category, paths keep discovery order. Categories iterate in the
/// order they were first seen.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    order: Vec<Category>,
    groups: HashMap<Category, Vec<PathBuf>>,
    failures: Vec<(PathBuf, String)>,
}

impl Classification {
    /// Create an empty classification
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a path to a category, creating the category on first use
    pub fn push(&mut self, category: Category, path: PathBuf) {
        let group = self.groups.entry(category).or_insert_with(|| {
            self.order.push(category);
            Vec::new()
        });
        group.push(path);
    }

    /// Paths for one category
    pub fn get(&self, category: Category) -> Option<&[PathBuf]> {
        self.groups.get(&category).map(|v| v.as_slice())
    }

    /// Iterate `(category, paths)` in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[PathBuf])> + '_ {
        self.order
            .iter()
            .map(move |c| (*c, self.groups[c].as_slice()))
    }

    /// Categories present, in first-seen order
    pub fn categories(&self) -> &[Category] {
        &self.order
    }

    /// Entries that could not be inspected, with the reason
    pub fn failures(&self) -> &[(PathBuf, String)] {
        &self.failures
    }

    /// Total number of classified files
    pub fn total_files(&self) -> usize {
        self.groups.values().map(|v| v.len()).sum()
    }

    /// Check if nothing was classified
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Sorts the files of a directory into categories
#[derive(Debug, Clone, Default)]
pub struct FileClassifier {
    categories: CategoryMap,
}

impl FileClassifier {
    /// Create a classifier over the given category map
    pub fn new(categories: CategoryMap) -> Self {
        Self { categories }
    }

    /// The category map in use
    pub fn category_map(&self) -> &CategoryMap {
        &self.categories
    }

    /// Classify the immediate files of `source`.
    ///
    /// Fails with `NotFound` if `source` is missing or not a directory, and
    /// with `AccessDenied` if it cannot be listed at all.
    pub fn classify(&self, source: &Path, skip: &SkipList) -> Result<Classification> {
        if !source.is_dir() {
            return Err(OrganizerError::NotFound(source.to_path_buf()));
        }
        // Surface root-level failures before walking so they are not mistaken
        // for per-entry errors.
        std::fs::read_dir(source).map_err(|e| OrganizerError::for_directory(source, &e))?;

        let mut result = Classification::new();
        let mut skipped = 0usize;

        // Links are followed so a link to a file is classified like the file.
        let walker = WalkDir::new(source)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!("Error processing file {}: {}", path.display(), e);
                    result.failures.push((path, e.to_string()));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            if skip.contains(&path) {
                debug!("Skipping {}", path.display());
                skipped += 1;
                continue;
            }

            let category = self.categories.category_for(&path);
            result.push(category, path);
        }

        info!(
            "Classified {} file(s) in {} into {} categories ({} skipped, {} errors)",
            result.total_files(),
            source.display(),
            result.order.len(),
            skipped,
            result.failures.len()
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, name.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_classify_basic_scenario() {
        let temp = TempDir::new().unwrap();
        let a = touch(temp.path(), "a.jpg");
        let b = touch(temp.path(), "b.mp3");
        let c = touch(temp.path(), "c.xyz");

        let result = FileClassifier::default()
            .classify(temp.path(), &SkipList::new())
            .unwrap();

        assert_eq!(result.total_files(), 3);
        assert_eq!(result.get(Category::Images).unwrap(), &[a]);
        assert_eq!(result.get(Category::Music).unwrap(), &[b]);
        assert_eq!(result.get(Category::Miscellaneous).unwrap(), &[c]);
        assert!(result.get(Category::Videos).is_none());
    }

    #[test]
    fn test_classify_is_not_recursive() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "top.png");
        let nested = temp.path().join("nested");
        fs::create_dir(&nested).unwrap();
        touch(&nested, "deep.png");

        let result = FileClassifier::default()
            .classify(temp.path(), &SkipList::new())
            .unwrap();

        assert_eq!(result.total_files(), 1);
        assert_eq!(
            result.get(Category::Images).unwrap(),
            &[temp.path().join("top.png")]
        );
    }

    #[test]
    fn test_classify_missing_directory() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");

        let err = FileClassifier::default()
            .classify(&missing, &SkipList::new())
            .unwrap_err();

        assert!(matches!(err, OrganizerError::NotFound(p) if p == missing));
    }

    #[test]
    fn test_classify_honours_skip_list() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "keep.pdf");
        touch(temp.path(), "Skip.PDF");

        // Same file written differently: different case and a `..` detour.
        let alias = temp.path().join("sub").join("..").join("SKIP.pdf");
        let skip = SkipList::from_paths([alias]);

        let result = FileClassifier::default()
            .classify(temp.path(), &skip)
            .unwrap();

        assert_eq!(
            result.get(Category::Documents).unwrap(),
            &[temp.path().join("keep.pdf")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_classify_skips_unreadable_entry() {
        let temp = TempDir::new().unwrap();
        let a = touch(temp.path(), "a.jpg");
        let z = touch(temp.path(), "z.txt");
        let broken = temp.path().join("broken.png");
        std::os::unix::fs::symlink(temp.path().join("missing.png"), &broken).unwrap();

        let result = FileClassifier::default()
            .classify(temp.path(), &SkipList::new())
            .unwrap();

        assert_eq!(result.total_files(), 2);
        assert_eq!(result.get(Category::Images).unwrap(), &[a]);
        assert_eq!(result.get(Category::Documents).unwrap(), &[z]);
        assert_eq!(result.failures().len(), 1);
        assert_eq!(result.failures()[0].0, broken);
    }

    #[cfg(unix)]
    #[test]
    fn test_classify_unlistable_source_is_access_denied() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let locked = temp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        touch(&locked, "a.jpg");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can list it anyway.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = FileClassifier::default().classify(&locked, &SkipList::new());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        match result {
            Err(OrganizerError::AccessDenied { path, .. }) => assert_eq!(path, locked),
            other => panic!("expected AccessDenied, got {:?}", other),
        }
    }

    #[test]
    fn test_classification_preserves_first_seen_order() {
        let mut result = Classification::new();
        result.push(Category::Videos, PathBuf::from("/x/1.mp4"));
        result.push(Category::Images, PathBuf::from("/x/2.png"));
        result.push(Category::Videos, PathBuf::from("/x/3.mkv"));

        assert_eq!(result.categories(), &[Category::Videos, Category::Images]);
        let collected: Vec<_> = result.iter().map(|(c, p)| (c, p.len())).collect();
        assert_eq!(collected, vec![(Category::Videos, 2), (Category::Images, 1)]);
    }

    #[test]
    fn test_normalize_path_folds_case_and_dots() {
        assert_eq!(
            normalize_path(Path::new("/Data/./Photos/../Photos/IMG.JPG")),
            "/data/photos/img.jpg"
        );
    }
}
