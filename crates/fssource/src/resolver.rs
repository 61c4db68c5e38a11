//! File resolver over one built index.
//!
//! An [`FsResolver`] owns the search state for a single walk of its
//! filesystem handle. It is immutable once built, so every query runs without
//! locking and the resolver can be shared freely behind an `Arc`.

mod stream;

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::diagnostics::DiagnosticSink;
use crate::error::{FsSourceError, Result};
use crate::exclude::ExclusionMatcher;
use crate::handle::FilesystemHandle;
use crate::index::IndexEntry;
use crate::location::Location;
use crate::search::SearchContext;
use crate::walk::{build_index, WalkStats};

pub use stream::{LocationStream, STREAM_CAPACITY};

/// Resolves paths, globs, and content types to [`Location`]s and reads
/// their content.
pub struct FsResolver {
    fs: Arc<dyn FilesystemHandle>,
    base: String,
    stats: WalkStats,
    search: SearchContext,
}

impl FsResolver {
    /// Walks `fs` once and builds the resolver.
    pub fn new(
        fs: Arc<dyn FilesystemHandle>,
        base: impl Into<String>,
        exclusions: &ExclusionMatcher,
        diagnostics: &dyn DiagnosticSink,
    ) -> Result<Self> {
        let built = build_index(fs.as_ref(), exclusions, diagnostics)?;
        Ok(Self {
            fs,
            base: base.into(),
            stats: built.stats,
            search: SearchContext::new(built.tree, built.index),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    pub fn search(&self) -> &SearchContext {
        &self.search
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.search.has_path(path)
    }

    pub fn find_by_path<S: AsRef<str>>(&self, paths: &[S]) -> Vec<Location> {
        self.search.find_by_path(paths)
    }

    pub fn find_by_glob<S: AsRef<str>>(&self, patterns: &[S]) -> Result<Vec<Location>> {
        self.search.find_by_glob(patterns)
    }

    pub fn find_by_content_type<S: AsRef<str>>(&self, types: &[S]) -> Vec<Location> {
        self.search.find_by_content_type(types)
    }

    /// Looks up `path` as seen from another location. Paths are always
    /// resolved from the root, so `_from` only documents intent.
    pub fn relative_file_by_path(&self, _from: &Location, path: &str) -> Option<Location> {
        self.find_by_path(&[path]).into_iter().next()
    }

    /// Opens the content behind a location for reading.
    ///
    /// The indexed path is opened, never the caller's string. Symlinks are
    /// followed through the tree only, so a link that dangles or leaves the
    /// filesystem is `NotFound` and a link to a directory is `InvalidTarget`.
    pub fn open_content(&self, location: &Location) -> Result<Box<dyn Read + Send>> {
        if location.real_path().is_empty() {
            return Err(FsSourceError::NotFound("empty path given".to_string()));
        }

        let entry = self.entry(location)?;
        let tree = self.search.tree();
        let target = self
            .search
            .follow_links(location.reference().node())
            .and_then(|node| tree.get(node))
            .ok_or_else(|| {
                FsSourceError::NotFound(format!(
                    "link {:?} does not resolve inside the filesystem",
                    entry.path
                ))
            })?;
        if target.is_dir() {
            return Err(FsSourceError::InvalidTarget(format!(
                "cannot read contents of directory {:?}",
                target.path()
            )));
        }

        let real_path = target.path().to_string();
        self.fs.open(&real_path).map_err(|error| match error.kind() {
            io::ErrorKind::NotFound => FsSourceError::NotFound(real_path),
            _ => FsSourceError::Io(error),
        })
    }

    /// Returns the indexed metadata for a location.
    pub fn metadata(&self, location: &Location) -> Result<IndexEntry> {
        self.entry(location).cloned()
    }

    fn entry(&self, location: &Location) -> Result<&IndexEntry> {
        self.search.index().get(location.reference()).ok_or_else(|| {
            FsSourceError::NotFound(format!(
                "no indexed entry for location {:?}",
                location.real_path()
            ))
        })
    }

    /// Streams every non-directory entry in traversal order.
    ///
    /// Production runs on a spawned task that stops once `cancel` fires or
    /// the returned stream is dropped.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn all_locations(self: &Arc<Self>, cancel: CancellationToken) -> LocationStream {
        LocationStream::spawn(Arc::clone(self), cancel)
    }
}

impl fmt::Display for FsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fs:fs-source")
    }
}

impl fmt::Debug for FsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsResolver")
            .field("base", &self.base)
            .field("entries", &self.search.index().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio_stream::StreamExt;

    use crate::diagnostics::RecordingSink;
    use crate::handle::{DirFs, MemoryFs};
    use crate::location::Location;

    fn resolver(fs: MemoryFs, exclusions: &[&str]) -> Arc<FsResolver> {
        let sink = RecordingSink::new();
        let matcher = ExclusionMatcher::new(exclusions, &sink);
        Arc::new(FsResolver::new(Arc::new(fs), "/", &matcher, &sink).unwrap())
    }

    fn sample() -> MemoryFs {
        MemoryFs::new()
            .with_file("a.txt", "alpha")
            .with_file("dir/b.txt", "bravo")
            .with_file("dir/sub/c.txt", "charlie")
    }

    fn read_all(mut reader: Box<dyn Read + Send>) -> Vec<u8> {
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).unwrap();
        contents
    }

    #[test]
    fn open_content_returns_stored_bytes() {
        let resolver = resolver(sample(), &[]);
        let location = resolver.find_by_path(&["dir/b.txt"]).remove(0);
        assert_eq!(read_all(resolver.open_content(&location).unwrap()), b"bravo");
    }

    #[test]
    fn open_content_rejects_directories() {
        let resolver = resolver(sample(), &[]);
        let dir = resolver.search().tree().lookup("dir").unwrap();
        let location = Location::direct("dir", resolver.search().tree().reference(dir));

        assert!(matches!(
            resolver.open_content(&location),
            Err(FsSourceError::InvalidTarget(_))
        ));
    }

    #[test]
    fn open_content_requires_a_path() {
        let resolver = resolver(sample(), &[]);
        let mut location = resolver.find_by_path(&["a.txt"]).remove(0);
        location = Location::new("", location.access_path(), location.reference());

        assert!(matches!(
            resolver.open_content(&location),
            Err(FsSourceError::NotFound(_))
        ));
    }

    #[test]
    fn stale_locations_are_not_found() {
        let first = resolver(sample(), &[]);
        let second = resolver(sample(), &[]);
        let stale = first.find_by_path(&["a.txt"]).remove(0);

        assert!(first.metadata(&stale).is_ok());
        assert!(second.metadata(&stale).unwrap_err().is_not_found());
        assert!(matches!(second.open_content(&stale), Err(error) if error.is_not_found()));
    }

    #[test]
    fn metadata_carries_kind_size_and_content_type() {
        let resolver = resolver(sample(), &[]);
        let location = resolver.find_by_path(&["dir/sub/c.txt"]).remove(0);
        let entry = resolver.metadata(&location).unwrap();

        assert_eq!(entry.path, "dir/sub/c.txt");
        assert_eq!(entry.size, 7);
        assert_eq!(entry.content_type.as_deref(), Some("text/plain"));
        assert!(!entry.is_dir());
    }

    #[test]
    fn symlinked_location_opens_the_target() {
        let resolver = resolver(sample().with_symlink("alias", "dir/b.txt"), &[]);
        let location = resolver.find_by_path(&["alias"]).remove(0);

        assert_eq!(location.real_path(), "dir/b.txt");
        assert_eq!(location.access_path(), "alias");
        assert_eq!(read_all(resolver.open_content(&location).unwrap()), b"bravo");
    }

    #[test]
    fn enumerated_symlinks_open_through_the_tree() {
        let resolver = resolver(
            sample()
                .with_symlink("alias", "dir/b.txt")
                .with_symlink("dir-link", "dir")
                .with_symlink("dangling", "nowhere.txt"),
            &[],
        );
        let all = resolver.search().all_locations().collect::<Vec<_>>();
        let by_path = |path: &str| {
            all.iter()
                .find(|location| location.real_path() == path)
                .cloned()
                .unwrap()
        };

        assert_eq!(read_all(resolver.open_content(&by_path("alias")).unwrap()), b"bravo");
        assert!(matches!(
            resolver.open_content(&by_path("dir-link")),
            Err(FsSourceError::InvalidTarget(_))
        ));
        assert!(matches!(
            resolver.open_content(&by_path("dangling")),
            Err(error) if error.is_not_found()
        ));
    }

    #[test]
    fn location_path_cannot_redirect_the_open() {
        let resolver = resolver(sample(), &[]);
        let a = resolver.find_by_path(&["a.txt"]).remove(0);
        let forged = Location::new("dir/b.txt", "dir/b.txt", a.reference());

        assert_eq!(read_all(resolver.open_content(&forged).unwrap()), b"alpha");
    }

    #[cfg(unix)]
    #[test]
    fn links_leaving_a_real_directory_are_not_readable() {
        let outside = tempfile::TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret"), "outside").unwrap();
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), "alpha").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret"), temp.path().join("out-link"))
            .unwrap();

        let sink = RecordingSink::new();
        let resolver = FsResolver::new(
            Arc::new(DirFs::new(temp.path())),
            "/",
            &ExclusionMatcher::none(),
            &sink,
        )
        .unwrap();

        let all: Vec<_> = resolver.search().all_locations().collect();
        let paths: Vec<_> = all.iter().map(Location::real_path).collect();
        assert_eq!(paths, ["a.txt", "out-link"]);
        assert!(resolver.find_by_path(&["out-link"]).is_empty());
        assert!(matches!(
            resolver.open_content(&all[1]),
            Err(error) if error.is_not_found()
        ));
    }

    #[test]
    fn relative_file_by_path_returns_first_hit() {
        let resolver = resolver(sample(), &[]);
        let from = resolver.find_by_path(&["a.txt"]).remove(0);

        let found = resolver.relative_file_by_path(&from, "dir/b.txt").unwrap();
        assert_eq!(found.real_path(), "dir/b.txt");
        assert!(resolver.relative_file_by_path(&from, "missing").is_none());
    }

    #[test]
    fn displays_as_fs_source() {
        let resolver = resolver(sample(), &[]);
        assert_eq!(resolver.to_string(), "fs:fs-source");
    }

    #[tokio::test]
    async fn all_locations_streams_files_in_order() {
        let resolver = resolver(sample().with_dir("empty"), &["dir/sub"]);
        let locations = resolver.all_locations(CancellationToken::new()).collect().await;

        let paths: Vec<_> = locations.iter().map(Location::real_path).collect();
        assert_eq!(paths, ["a.txt", "dir/b.txt"]);
    }

    #[tokio::test]
    async fn all_locations_implements_stream() {
        let resolver = resolver(sample(), &[]);
        let stream = resolver.all_locations(CancellationToken::new());
        let paths: Vec<String> = stream
            .map(|location| location.real_path().to_string())
            .collect()
            .await;
        assert_eq!(paths, ["a.txt", "dir/b.txt", "dir/sub/c.txt"]);
    }

    #[tokio::test]
    async fn cancelled_stream_stops_producing() {
        let mut fs = MemoryFs::new();
        for i in 0..100 {
            fs = fs.with_file(&format!("file-{i:03}.txt"), "x");
        }
        let resolver = resolver(fs, &[]);
        let cancel = CancellationToken::new();
        let mut stream = resolver.all_locations(cancel.clone());

        assert!(stream.next().await.is_some());
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), async {
            while !stream.is_producer_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("producer should exit after cancellation");

        // Only what was already buffered can still arrive.
        let mut remaining = 0;
        while stream.next().await.is_some() {
            remaining += 1;
        }
        assert!(remaining <= STREAM_CAPACITY + 1);
    }

    #[tokio::test]
    async fn dropped_stream_releases_the_producer() {
        let mut fs = MemoryFs::new();
        for i in 0..50 {
            fs = fs.with_file(&format!("file-{i:02}.txt"), "x");
        }
        let resolver = resolver(fs, &[]);
        let mut stream = resolver.all_locations(CancellationToken::new());
        assert!(stream.next().await.is_some());
        drop(stream);

        tokio::time::timeout(Duration::from_secs(5), async {
            while Arc::strong_count(&resolver) > 1 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("producer should release the resolver once the consumer is gone");
    }

    #[tokio::test]
    async fn pre_cancelled_stream_is_empty() {
        let resolver = resolver(sample(), &[]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let locations = resolver.all_locations(cancel).collect().await;
        assert!(locations.is_empty());
    }

    #[test]
    fn indexes_a_real_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("dir/sub")).unwrap();
        std::fs::write(temp.path().join("a.txt"), "alpha").unwrap();
        std::fs::write(temp.path().join("dir/b.txt"), "bravo").unwrap();
        std::fs::write(temp.path().join("dir/sub/c.txt"), "charlie").unwrap();

        let sink = RecordingSink::new();
        let matcher = ExclusionMatcher::new(&["dir/sub"], &sink);
        let resolver =
            FsResolver::new(Arc::new(DirFs::new(temp.path())), "/", &matcher, &sink).unwrap();

        let found = resolver.find_by_glob(&["**/*.txt"]).unwrap();
        let paths: Vec<_> = found.iter().map(Location::real_path).collect();
        assert_eq!(paths, ["a.txt", "dir/b.txt"]);
        assert!(!resolver.has_path("dir/sub/c.txt"));
        assert_eq!(read_all(resolver.open_content(&found[0]).unwrap()), b"alpha");
    }
}
