//! Collision-safe file relocation
//!
//! A [`Relocator`] moves a file into the directory its category maps to.
//! Where that directory is comes from a [`CategoryPathResolver`]; the
//! relocator only creates the directory and picks a free file name. An
//! existing file is never overwritten: `name.ext` becomes `name(1).ext`,
//! then `name(2).ext`, and so on.

use crate::core::category::Category;
use crate::core::error::{OrganizerError, Result};
use crate::core::roots::{FolderResolver, FolderRole, SystemFolders};
use log::{debug, info};
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Maps a category to the directory its files are moved into
pub trait CategoryPathResolver: Send + Sync {
    /// Destination directory for `category`. It does not need to exist yet.
    fn destination_for(&self, category: Category) -> io::Result<PathBuf>;
}

impl<T: CategoryPathResolver + ?Sized> CategoryPathResolver for Box<T> {
    fn destination_for(&self, category: Category) -> io::Result<PathBuf> {
        (**self).destination_for(category)
    }
}

/// Category destinations based on the user's well-known folders
///
/// Images, Videos, Music and Documents go to the matching platform folder.
/// Archives and everything else go to `Archives` and `Miscellaneous`
/// subfolders of Downloads. Explicit overrides always win.
#[derive(Debug, Clone)]
pub struct CategoryDestinations<F = SystemFolders> {
    folders: F,
    overrides: HashMap<Category, PathBuf>,
}

impl Default for CategoryDestinations<SystemFolders> {
    fn default() -> Self {
        Self::new(SystemFolders)
    }
}

impl<F: FolderResolver> CategoryDestinations<F> {
    /// Create destinations backed by a folder resolver
    pub fn new(folders: F) -> Self {
        Self {
            folders,
            overrides: HashMap::new(),
        }
    }

    /// Send a category somewhere specific
    pub fn with_override(mut self, category: Category, dir: impl Into<PathBuf>) -> Self {
        self.overrides.insert(category, dir.into());
        self
    }

    /// Apply several overrides at once
    pub fn with_overrides<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (Category, PathBuf)>,
    {
        self.overrides.extend(overrides);
        self
    }

    fn folder(&self, role: FolderRole) -> io::Result<PathBuf> {
        self.folders.preferred(role).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no {} folder available", role),
            )
        })
    }
}

impl<F: FolderResolver> CategoryPathResolver for CategoryDestinations<F> {
    fn destination_for(&self, category: Category) -> io::Result<PathBuf> {
        if let Some(dir) = self.overrides.get(&category) {
            return Ok(dir.clone());
        }

        match category {
            Category::Images => self.folder(FolderRole::Pictures),
            Category::Videos => self.folder(FolderRole::Videos),
            Category::Music => self.folder(FolderRole::Music),
            Category::Documents => self.folder(FolderRole::Documents),
            Category::Archives => Ok(self.folder(FolderRole::Downloads)?.join("Archives")),
            Category::Miscellaneous => {
                Ok(self.folder(FolderRole::Downloads)?.join("Miscellaneous"))
            }
        }
    }
}

/// Every category becomes a subfolder of one base directory
#[derive(Debug, Clone)]
pub struct BaseDirDestinations {
    base: PathBuf,
}

impl BaseDirDestinations {
    /// Create destinations under `base`
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl CategoryPathResolver for BaseDirDestinations {
    fn destination_for(&self, category: Category) -> io::Result<PathBuf> {
        Ok(self.base.join(category.as_str()))
    }
}

/// How often a move is retried when its destination appears concurrently
const MAX_MOVE_ATTEMPTS: usize = 16;

/// Moves files into their category directory without overwriting anything
pub struct Relocator<R> {
    resolver: R,
}

impl<R: CategoryPathResolver> Relocator<R> {
    /// Create a relocator over a category path resolver
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// The resolver in use
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Where `source` would land if it were moved now, without moving it.
    pub fn plan(&self, source: &Path, category: Category) -> Result<PathBuf> {
        let fail = |message: String| relocation_failed(source, category, message);

        let file_name = source
            .file_name()
            .ok_or_else(|| fail("source has no file name".to_string()))?;
        let dir = self
            .resolver
            .destination_for(category)
            .map_err(|e| fail(format!("cannot resolve destination: {}", e)))?;

        Ok(unique_destination(&dir, file_name))
    }

    /// Move `source` into the directory for `category`.
    ///
    /// Returns the final path of the file.
    pub fn relocate(&self, source: &Path, category: Category) -> Result<PathBuf> {
        let fail = |message: String| relocation_failed(source, category, message);

        if !source.is_file() {
            return Err(fail("source file does not exist".to_string()));
        }
        let file_name = source
            .file_name()
            .ok_or_else(|| fail("source has no file name".to_string()))?;

        let dir = self
            .resolver
            .destination_for(category)
            .map_err(|e| fail(format!("cannot resolve destination: {}", e)))?;

        if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(|e| {
                fail(format!("cannot create directory {}: {}", dir.display(), e))
            })?;
            debug!("Created directory {}", dir.display());
        }

        // The move never replaces an existing file. If the free name was
        // taken in the meantime, pick the next one.
        let mut attempts = 0;
        let destination = loop {
            let candidate = unique_destination(&dir, file_name);
            match move_file(source, &candidate) {
                Ok(()) => break candidate,
                Err(e)
                    if e.kind() == io::ErrorKind::AlreadyExists
                        && attempts < MAX_MOVE_ATTEMPTS =>
                {
                    debug!("{} was taken during the move, retrying", candidate.display());
                    attempts += 1;
                }
                Err(e) => return Err(fail(e.to_string())),
            }
        };

        info!("Moved {} -> {}", source.display(), destination.display());
        Ok(destination)
    }
}

fn relocation_failed(source: &Path, category: Category, message: String) -> OrganizerError {
    OrganizerError::RelocationFailed {
        path: source.to_path_buf(),
        category: category.to_string(),
        message,
    }
}

/// First free path for `file_name` inside `dir`.
///
/// Tries `dir/file_name`, then `stem(1).ext`, `stem(2).ext`, ... until a name
/// is unused.
pub fn unique_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    let initial = dir.join(file_name);
    if !path_taken(&initial) {
        return initial;
    }

    let name = Path::new(file_name);
    let stem = name.file_stem().unwrap_or(file_name);
    let ext = name.extension();

    let mut counter: u64 = 1;
    loop {
        let mut candidate = OsString::from(stem);
        candidate.push(format!("({})", counter));
        if let Some(ext) = ext {
            candidate.push(".");
            candidate.push(ext);
        }
        let path = dir.join(candidate);
        if !path_taken(&path) {
            return path;
        }
        counter += 1;
    }
}

/// Exists, or is a dangling symlink
fn path_taken(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Move `src` to `dest`, failing with `AlreadyExists` instead of replacing
/// an existing `dest`.
///
/// Links the file under its new name and then unlinks the old one. Where a
/// hard link is impossible (another filesystem, or no link support) the
/// content is copied into a freshly created `dest` and `src` is removed.
fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::hard_link(src, dest) {
        Ok(()) => fs::remove_file(src),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Err(err),
        Err(err) => {
            if is_cross_device_error(&err) {
                debug!(
                    "Cross-device move of {}, falling back to copy",
                    src.display()
                );
            } else {
                debug!("Cannot link {} ({}), falling back to copy", src.display(), err);
            }
            copy_then_remove(src, dest)
        }
    }
}

/// Copy into a newly created `dest`, then delete `src`
fn copy_then_remove(src: &Path, dest: &Path) -> io::Result<()> {
    let mut reader = fs::File::open(src)?;
    let permissions = reader.metadata()?.permissions();
    let mut writer = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)?;

    let copied = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all());
    if let Err(err) = copied {
        drop(writer);
        let _ = fs::remove_file(dest);
        return Err(err);
    }
    drop(writer);

    if let Err(err) = fs::set_permissions(dest, permissions) {
        debug!("Could not copy permissions to {}: {}", dest.display(), err);
    }
    fs::remove_file(src)
}

fn is_cross_device_error(err: &io::Error) -> bool {
    match err.raw_os_error() {
        Some(18) => true, // POSIX EXDEV
        Some(17) => cfg!(windows), // ERROR_NOT_SAME_DEVICE
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::roots::StaticFolders;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_unique_destination_no_collision() {
        let temp = TempDir::new().unwrap();
        let dest = unique_destination(temp.path(), OsStr::new("photo.png"));
        assert_eq!(dest, temp.path().join("photo.png"));
    }

    #[test]
    fn test_unique_destination_counts_up() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("photo.png"), "0");
        write(&temp.path().join("photo(1).png"), "1");

        let dest = unique_destination(temp.path(), OsStr::new("photo.png"));
        assert_eq!(dest, temp.path().join("photo(2).png"));
    }

    #[test]
    fn test_unique_destination_without_extension() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("README"), "x");

        let dest = unique_destination(temp.path(), OsStr::new("README"));
        assert_eq!(dest, temp.path().join("README(1)"));
    }

    #[test]
    fn test_relocate_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let inbox = temp.path().join("inbox");
        let sorted = temp.path().join("sorted");
        let relocator = Relocator::new(BaseDirDestinations::new(&sorted));

        let mut landed = Vec::new();
        for (i, content) in ["first", "second", "third"].iter().enumerate() {
            let dir = inbox.join(format!("batch{}", i));
            fs::create_dir_all(&dir).unwrap();
            let src = dir.join("name.ext");
            write(&src, content);
            landed.push(relocator.relocate(&src, Category::Documents).unwrap());
            assert!(!src.exists());
        }

        let target = sorted.join("Documents");
        assert_eq!(
            landed,
            vec![
                target.join("name.ext"),
                target.join("name(1).ext"),
                target.join("name(2).ext"),
            ]
        );
        assert_eq!(fs::read_to_string(&landed[0]).unwrap(), "first");
        assert_eq!(fs::read_to_string(&landed[1]).unwrap(), "second");
        assert_eq!(fs::read_to_string(&landed[2]).unwrap(), "third");
    }

    #[test]
    fn test_relocate_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let relocator = Relocator::new(BaseDirDestinations::new(temp.path()));
        let missing = temp.path().join("ghost.jpg");

        let err = relocator.relocate(&missing, Category::Images).unwrap_err();
        match err {
            OrganizerError::RelocationFailed { path, category, .. } => {
                assert_eq!(path, missing);
                assert_eq!(category, "Images");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_relocate_uncreatable_destination_fails() {
        let temp = TempDir::new().unwrap();
        // A regular file where the destination directory should be.
        let blocker = temp.path().join("sorted");
        write(&blocker, "not a directory");
        let src = temp.path().join("song.mp3");
        write(&src, "la");

        let relocator = Relocator::new(BaseDirDestinations::new(&blocker));
        let err = relocator.relocate(&src, Category::Music).unwrap_err();

        assert!(matches!(err, OrganizerError::RelocationFailed { .. }));
        assert!(src.exists());
    }

    #[test]
    fn test_category_destinations_follow_folder_roles() {
        let destinations = CategoryDestinations::new(
            StaticFolders::new()
                .with(FolderRole::Pictures, "/home/me/Pictures")
                .with(FolderRole::Downloads, "/home/me/Downloads"),
        )
        .with_override(Category::Music, "/srv/music");

        assert_eq!(
            destinations.destination_for(Category::Images).unwrap(),
            PathBuf::from("/home/me/Pictures")
        );
        assert_eq!(
            destinations.destination_for(Category::Archives).unwrap(),
            PathBuf::from("/home/me/Downloads/Archives")
        );
        assert_eq!(
            destinations.destination_for(Category::Miscellaneous).unwrap(),
            PathBuf::from("/home/me/Downloads/Miscellaneous")
        );
        assert_eq!(
            destinations.destination_for(Category::Music).unwrap(),
            PathBuf::from("/srv/music")
        );
        assert!(destinations.destination_for(Category::Videos).is_err());
    }

    #[test]
    fn test_plan_does_not_move() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("clip.mp4");
        write(&src, "frames");

        let relocator = Relocator::new(BaseDirDestinations::new(temp.path().join("out")));
        let planned = relocator.plan(&src, Category::Videos).unwrap();

        assert_eq!(planned, temp.path().join("out").join("Videos").join("clip.mp4"));
        assert!(src.exists());
        assert!(!planned.exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unique_destination_keeps_non_utf8_name() {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let temp = TempDir::new().unwrap();
        let name = OsStr::from_bytes(b"cl\xffip.m\xffv");
        write(&temp.path().join(name), "taken");

        let dest = unique_destination(temp.path(), name);
        assert_eq!(
            dest.file_name().unwrap().to_os_string().into_vec(),
            b"cl\xffip(1).m\xffv".to_vec()
        );
        assert!(!dest.exists());
    }

    #[test]
    fn test_move_file_refuses_existing_destination() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("incoming.txt");
        let dest = temp.path().join("resident.txt");
        write(&src, "incoming");
        write(&dest, "resident");

        let err = move_file(&src, &dest).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "resident");
        assert_eq!(fs::read_to_string(&src).unwrap(), "incoming");
    }

    #[test]
    fn test_copy_fallback_refuses_existing_destination() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("incoming.txt");
        let dest = temp.path().join("resident.txt");
        write(&src, "incoming");
        write(&dest, "resident");

        let err = copy_then_remove(&src, &dest).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "resident");
        assert!(src.exists());

        let fresh = temp.path().join("fresh.txt");
        copy_then_remove(&src, &fresh).unwrap();
        assert_eq!(fs::read_to_string(&fresh).unwrap(), "incoming");
        assert!(!src.exists());
    }
}
