//! Extension to category mapping
//!
//! Files are sorted into a fixed set of categories based on their extension.
//! Lookup is case-insensitive; anything unrecognised lands in
//! [`Category::Miscellaneous`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// A label assigned to a file based on its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Images,
    Music,
    Videos,
    Documents,
    Archives,
    Miscellaneous,
}

impl Category {
    /// All categories, in display order
    pub const ALL: [Category; 6] = [
        Category::Images,
        Category::Music,
        Category::Videos,
        Category::Documents,
        Category::Archives,
        Category::Miscellaneous,
    ];

    /// The category name used for folder names and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Images => "Images",
            Category::Music => "Music",
            Category::Videos => "Videos",
            Category::Documents => "Documents",
            Category::Archives => "Archives",
            Category::Miscellaneous => "Miscellaneous",
        }
    }

    /// Parse a category name, ignoring case.
    ///
    /// Unknown names map to `Miscellaneous`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "images" => Category::Images,
            "music" => Category::Music,
            "videos" => Category::Videos,
            "documents" => Category::Documents,
            "archives" => Category::Archives,
            _ => Category::Miscellaneous,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in extension table
const DEFAULT_EXTENSIONS: &[(&str, Category)] = &[
    // Images
    (".jpg", Category::Images),
    (".jpeg", Category::Images),
    (".png", Category::Images),
    (".gif", Category::Images),
    (".webp", Category::Images),
    (".bmp", Category::Images),
    (".tiff", Category::Images),
    (".tif", Category::Images),
    (".svg", Category::Images),
    (".ico", Category::Images),
    (".raw", Category::Images),
    (".heic", Category::Images),
    (".heif", Category::Images),
    (".cr2", Category::Images),
    (".nef", Category::Images),
    (".arw", Category::Images),
    (".dng", Category::Images),
    // Audio
    (".mp3", Category::Music),
    (".wav", Category::Music),
    (".flac", Category::Music),
    (".aac", Category::Music),
    (".ogg", Category::Music),
    (".m4a", Category::Music),
    (".opus", Category::Music),
    (".wma", Category::Music),
    (".aiff", Category::Music),
    (".mid", Category::Music),
    // Videos
    (".mp4", Category::Videos),
    (".mov", Category::Videos),
    (".avi", Category::Videos),
    (".mkv", Category::Videos),
    (".webm", Category::Videos),
    (".m4v", Category::Videos),
    (".3gp", Category::Videos),
    (".3g2", Category::Videos),
    (".wmv", Category::Videos),
    (".flv", Category::Videos),
    (".mpeg", Category::Videos),
    (".mpg", Category::Videos),
    // Documents
    (".pdf", Category::Documents),
    (".txt", Category::Documents),
    (".md", Category::Documents),
    (".doc", Category::Documents),
    (".docx", Category::Documents),
    (".xls", Category::Documents),
    (".xlsx", Category::Documents),
    (".ppt", Category::Documents),
    (".pptx", Category::Documents),
    (".csv", Category::Documents),
    (".rtf", Category::Documents),
    (".odt", Category::Documents),
    (".ods", Category::Documents),
    (".odp", Category::Documents),
    (".json", Category::Documents),
    (".xml", Category::Documents),
    (".html", Category::Documents),
    (".htm", Category::Documents),
    (".epub", Category::Documents),
    (".mobi", Category::Documents),
    // Archives
    (".zip", Category::Archives),
    (".rar", Category::Archives),
    (".7z", Category::Archives),
    (".tar", Category::Archives),
    (".gz", Category::Archives),
    (".tgz", Category::Archives),
    (".bz2", Category::Archives),
    (".xz", Category::Archives),
    (".apk", Category::Archives),
];

/// Immutable lookup table from extension to category
///
/// Keys are stored lower-cased with a leading dot (`".jpg"`).
#[derive(Debug, Clone)]
pub struct CategoryMap {
    extensions: HashMap<String, Category>,
}

impl Default for CategoryMap {
    fn default() -> Self {
        let extensions = DEFAULT_EXTENSIONS
            .iter()
            .map(|(ext, category)| (ext.to_string(), *category))
            .collect();
        Self { extensions }
    }
}

impl CategoryMap {
    /// Create the built-in map
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the built-in map with extra entries layered on top.
    ///
    /// Extensions may be given with or without the leading dot.
    pub fn with_overrides<I, S>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, Category)>,
        S: AsRef<str>,
    {
        let mut map = Self::default();
        for (ext, category) in overrides {
            map.extensions.insert(normalize_extension(ext.as_ref()), category);
        }
        map
    }

    /// Look up an extension such as `".JPG"` or `"jpg"`.
    pub fn lookup(&self, extension: &str) -> Category {
        self.extensions
            .get(&normalize_extension(extension))
            .copied()
            .unwrap_or(Category::Miscellaneous)
    }

    /// Categorise a path by its extension
    pub fn category_for(&self, path: &Path) -> Category {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.lookup(ext),
            None => Category::Miscellaneous,
        }
    }

    /// Number of known extensions
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Check if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// Lower-case an extension and ensure it has a leading dot
fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}
