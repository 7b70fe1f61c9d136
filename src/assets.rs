//! The asset directory: classification of path segments and file serving.
//!
//! [`AssetIndex`] owns a snapshot of the directory's top-level entries. The
//! snapshot is taken once, either by an explicit [`AssetIndex::warm`] at
//! startup or lazily on first use, and never refreshed afterwards.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::Error;
use crate::mime;
use crate::response::Response;
use crate::slug;

/// Top-level entries of the asset directory.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    /// Normalised entry names.
    filenames: HashSet<String>,
    /// Raw entry name → is a regular file.
    file_flags: HashMap<String, bool>,
}

impl Snapshot {
    /// Reads the directory listing. Symlinks are classified by what they
    /// point at.
    pub fn scan(dir: &Path) -> Result<Self, Error> {
        let scan_err = |source| Error::AssetScan { path: dir.to_owned(), source };
        let mut snapshot = Self::default();
        for entry in fs::read_dir(dir).map_err(scan_err)? {
            let entry = entry.map_err(scan_err)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_file = fs::metadata(entry.path()).map(|m| m.is_file()).unwrap_or(false);
            snapshot.insert(name, is_file);
        }
        Ok(snapshot)
    }

    /// Builds a snapshot from `(name, is_regular_file)` pairs.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let mut snapshot = Self::default();
        for (name, is_file) in entries {
            snapshot.insert(name.into(), is_file);
        }
        snapshot
    }

    fn insert(&mut self, name: String, is_file: bool) {
        self.filenames.insert(slug::normalize_str(&name));
        self.file_flags.insert(name, is_file);
    }

    pub fn len(&self) -> usize {
        self.file_flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_flags.is_empty()
    }

    /// Classifies a first path segment.
    ///
    /// Membership is checked on normalised names, the regular-file flag on
    /// the raw name looked up with the normalised segment. An entry whose raw
    /// name is not already lower-case is therefore a static entry that is not
    /// served directly; it goes to the static fallback instead.
    pub fn classify(&self, segment: &str) -> Classification {
        let segment = slug::normalize_str(segment);
        Classification {
            is_static_entry: self.filenames.contains(&segment),
            is_regular_file: self.file_flags.get(&segment).copied().unwrap_or(false),
        }
    }
}

/// Outcome of [`Snapshot::classify`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Classification {
    pub is_static_entry: bool,
    pub is_regular_file: bool,
}

/// Asset directory plus its lazily built [`Snapshot`].
#[derive(Debug)]
pub struct AssetIndex {
    dir: PathBuf,
    snapshot: OnceCell<Snapshot>,
}

impl AssetIndex {
    /// An index whose snapshot is taken on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), snapshot: OnceCell::new() }
    }

    /// An index with a fixed snapshot. Nothing is read from `dir` until a
    /// file is actually served.
    pub fn with_snapshot(dir: impl Into<PathBuf>, snapshot: Snapshot) -> Self {
        Self { dir: dir.into(), snapshot: OnceCell::from(snapshot) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Takes the snapshot if it has not been taken yet. Concurrent callers
    /// wait on a single scan.
    pub async fn warm(&self) -> Result<&Snapshot, Error> {
        self.snapshot
            .get_or_try_init(|| async {
                let snapshot = Snapshot::scan(&self.dir)?;
                info!(dir = %self.dir.display(), entries = snapshot.len(), "asset snapshot taken");
                Ok::<_, Error>(snapshot)
            })
            .await
    }

    pub fn is_warm(&self) -> bool {
        self.snapshot.initialized()
    }

    pub async fn classify(&self, segment: &str) -> Result<Classification, Error> {
        Ok(self.warm().await?.classify(segment))
    }

    /// Path of a top-level entry.
    pub fn entry_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Resolves a request path to a file under the directory: the file
    /// itself, or `index.html` for a directory. `None` for anything missing
    /// or escaping the directory.
    pub fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        let decoded = percent_decode_str(url_path).decode_utf8().ok()?;
        let clean = decoded.trim_matches('/');
        if clean.split('/').any(|segment| segment == "..") {
            return None;
        }

        let canonical = self.dir.join(clean).canonicalize().ok()?;
        let root = self.dir.canonicalize().ok()?;
        if !canonical.starts_with(&root) {
            return None;
        }

        if canonical.is_file() {
            return Some(canonical);
        }
        let index = canonical.join("index.html");
        index.is_file().then_some(index)
    }
}

/// Reads and serves a file, or `None` if it cannot be read.
pub async fn serve_file(path: &Path) -> Option<Response> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(Response::file(mime::from_path(path), bytes)),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "static file unreadable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("favicon.ico"), b"ico").unwrap();
        fs::write(dir.path().join("index.html"), b"<html></html>").unwrap();
        fs::write(dir.path().join("README.md"), b"readme").unwrap();
        fs::create_dir_all(dir.path().join("static/js")).unwrap();
        fs::write(dir.path().join("static/js/main.js"), b"js").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/index.html"), b"docs").unwrap();
        dir
    }

    #[test]
    fn test_classify_from_entries() {
        let snapshot = Snapshot::from_entries([("favicon.ico", true), ("static", false)]);
        assert_eq!(
            snapshot.classify("Favicon.ico"),
            Classification { is_static_entry: true, is_regular_file: true },
        );
        assert_eq!(
            snapshot.classify("static"),
            Classification { is_static_entry: true, is_regular_file: false },
        );
        assert_eq!(snapshot.classify("about"), Classification::default());
    }

    #[test]
    fn test_mixed_case_entry_is_not_a_direct_file() {
        let snapshot = Snapshot::from_entries([("README.md", true)]);
        assert_eq!(
            snapshot.classify("README.md"),
            Classification { is_static_entry: true, is_regular_file: false },
        );
    }

    #[tokio::test]
    async fn test_warm_scans_once() {
        let dir = site();
        let index = AssetIndex::new(dir.path());
        assert!(!index.is_warm());
        assert!(index.classify("favicon.ico").await.unwrap().is_regular_file);
        assert!(index.is_warm());

        // Later changes to the directory are not picked up.
        fs::write(dir.path().join("robots.txt"), b"").unwrap();
        assert!(!index.classify("robots.txt").await.unwrap().is_static_entry);
    }

    #[tokio::test]
    async fn test_unreadable_directory_fails() {
        let index = AssetIndex::new("/definitely/not/here");
        assert!(matches!(index.warm().await, Err(Error::AssetScan { .. })));
    }

    #[test]
    fn test_resolve() {
        let dir = site();
        let index = AssetIndex::new(dir.path());
        assert!(index.resolve("/static/js/main.js").unwrap().ends_with("static/js/main.js"));
        assert!(index.resolve("/docs").unwrap().ends_with("docs/index.html"));
        assert!(index.resolve("/docs/").unwrap().ends_with("docs/index.html"));
        assert!(index.resolve("/static").is_none());
        assert!(index.resolve("/missing.css").is_none());
        assert!(index.resolve("/../etc/passwd").is_none());
        assert!(index.resolve("/static/%2e%2e/%2e%2e/etc/passwd").is_none());
    }

    #[tokio::test]
    async fn test_serve_file_sets_content_type() {
        let dir = site();
        let res = serve_file(&dir.path().join("favicon.ico")).await.unwrap();
        assert_eq!(res.header("content-type"), Some(mime::types::ICO));
        assert_eq!(res.body(), b"ico");
        assert!(serve_file(&dir.path().join("nope")).await.is_none());
    }
}
