//! File-type tagging and the static content-type/extension tables.
//!
//! Every payload entering the pipeline is tagged with a [`FileType`] resolved
//! from either its declared content type (submission boundary) or its file
//! extension (archive members). Unknown tags never panic or error; lookups
//! return `None` and the caller decides whether that means "skip" or
//! "reject".

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Canonical output format for every converted page/frame/image.
pub const OUTPUT_EXTENSION: &str = "png";

/// MIME type of the canonical output format.
pub const OUTPUT_MIME_TYPE: &str = "image/png";

/// MIME type of an aggregated multi-entry result.
pub const ZIP_MIME_TYPE: &str = "application/zip";

/// Maximum nesting depth for containers inside containers (bomb guard).
pub const MAX_ARCHIVE_RECURSION_DEPTH: u32 = 3;

/// Fixed render resolution for PDF pages.
pub const RENDER_DPI: u32 = 200;

/// Normalized tag for every format the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Png,
    Jpg,
    Pdf,
    Tiff,
    Zip,
    Tar,
    SevenZ,
    Bzip2,
    Gzip,
}

/// Declared content types accepted at the submission boundary.
static CONTENT_TYPE_TABLE: Lazy<HashMap<&'static str, FileType>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("image/png", FileType::Png);
    m.insert("image/jpg", FileType::Jpg);
    m.insert("image/jpeg", FileType::Jpg);
    m.insert("image/tiff", FileType::Tiff);
    m.insert("image/x-tiff", FileType::Tiff);
    m.insert("application/pdf", FileType::Pdf);
    m.insert("application/zip", FileType::Zip);
    m.insert("application/tar", FileType::Tar);
    m.insert("application/x-tar", FileType::Tar);
    m.insert("application/x-7z-compressed", FileType::SevenZ);
    m.insert("application/x-bzip2", FileType::Bzip2);
    m.insert("application/gzip", FileType::Gzip);
    m
});

/// File extensions recognized inside archives.
static EXTENSION_TABLE: Lazy<HashMap<&'static str, FileType>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("png", FileType::Png);
    m.insert("jpg", FileType::Jpg);
    m.insert("jpeg", FileType::Jpg);
    m.insert("pdf", FileType::Pdf);
    m.insert("tiff", FileType::Tiff);
    m.insert("tif", FileType::Tiff);
    m.insert("zip", FileType::Zip);
    m.insert("tar", FileType::Tar);
    m.insert("7z", FileType::SevenZ);
    m.insert("bzip2", FileType::Bzip2);
    m.insert("bz2", FileType::Bzip2);
    m.insert("gz", FileType::Gzip);
    m.insert("tgz", FileType::Gzip);
    m
});

impl FileType {
    /// Resolve a declared content type against the allow-list.
    pub fn from_content_type(content_type: &str) -> Option<FileType> {
        // Parameters like "; charset=..." are not part of the allow-list.
        let essence = content_type.split(';').next().unwrap_or("").trim();
        CONTENT_TYPE_TABLE.get(essence.to_ascii_lowercase().as_str()).copied()
    }

    /// Resolve a bare file extension (without the dot).
    pub fn from_extension(extension: &str) -> Option<FileType> {
        EXTENSION_TABLE.get(extension.to_ascii_lowercase().as_str()).copied()
    }

    /// Resolve the extension of an archive entry path.
    pub fn for_path(path: &str) -> Option<FileType> {
        file_extension(path).and_then(|ext| FileType::from_extension(&ext))
    }

    /// Archive formats that hold other files.
    pub fn is_container(self) -> bool {
        matches!(self, FileType::Zip | FileType::Tar | FileType::SevenZ)
    }

    /// Single-stream compression formats (presumed to wrap a tar).
    pub fn is_compressed(self) -> bool {
        matches!(self, FileType::Bzip2 | FileType::Gzip)
    }

    /// Directly convertible leaf document formats.
    pub fn is_document(self) -> bool {
        matches!(self, FileType::Png | FileType::Jpg | FileType::Pdf | FileType::Tiff)
    }

    /// Normalized tag name, used in logs and failure-reason keys.
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Png => "png",
            FileType::Jpg => "jpg",
            FileType::Pdf => "pdf",
            FileType::Tiff => "tiff",
            FileType::Zip => "zip",
            FileType::Tar => "tar",
            FileType::SevenZ => "7z",
            FileType::Bzip2 => "bzip2",
            FileType::Gzip => "gz",
        }
    }
}

/// Lowercased extension of a path, or `None` when the final component has no
/// dot (or only a leading one).
pub fn file_extension(path: &str) -> Option<String> {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_allow_list() {
        assert_eq!(FileType::from_content_type("image/jpeg"), Some(FileType::Jpg));
        assert_eq!(FileType::from_content_type("application/x-tar"), Some(FileType::Tar));
        assert_eq!(FileType::from_content_type("application/gzip"), Some(FileType::Gzip));
        assert_eq!(FileType::from_content_type("text/plain"), None);
        assert_eq!(FileType::from_content_type(""), None);
    }

    #[test]
    fn test_content_type_ignores_parameters_and_case() {
        assert_eq!(
            FileType::from_content_type("Application/PDF; charset=binary"),
            Some(FileType::Pdf)
        );
    }

    #[test]
    fn test_extension_aliases() {
        assert_eq!(FileType::from_extension("jpeg"), Some(FileType::Jpg));
        assert_eq!(FileType::from_extension("TIF"), Some(FileType::Tiff));
        assert_eq!(FileType::from_extension("tgz"), Some(FileType::Gzip));
        assert_eq!(FileType::from_extension("xyz"), None);
    }

    #[test]
    fn test_for_path() {
        assert_eq!(FileType::for_path("scans/page-1.PNG"), Some(FileType::Png));
        assert_eq!(FileType::for_path("nested/bundle.tar"), Some(FileType::Tar));
        assert_eq!(FileType::for_path("no_extension"), None);
        assert_eq!(FileType::for_path(".hidden"), None);
    }

    #[test]
    fn test_predicates_partition_the_enum() {
        for ft in [
            FileType::Png,
            FileType::Jpg,
            FileType::Pdf,
            FileType::Tiff,
            FileType::Zip,
            FileType::Tar,
            FileType::SevenZ,
            FileType::Bzip2,
            FileType::Gzip,
        ] {
            let classes =
                usize::from(ft.is_container()) + usize::from(ft.is_compressed()) + usize::from(ft.is_document());
            assert_eq!(classes, 1, "{:?} must fall in exactly one class", ft);
        }
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("a/b/c.pdf"), Some("pdf".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension("dir.d/file"), None);
    }
}
