//! Entry resolution: turning declared inputs into a canonical mapping from
//! entry name to source location.
//!
//! The mapping is keyed by canonical name in a `BTreeMap`, so the final
//! emission order is always lexicographic regardless of registration order
//! or filesystem traversal order. Collisions follow a last-write-wins rule:
//! a later registration for the same canonical name silently replaces the
//! earlier one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Where an entry's bytes come from at serialization time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    /// A regular file, read verbatim when the entry is written
    File(PathBuf),
    /// A directory marker with a zero-length payload
    Directory(PathBuf),
    /// A pre-built capsule embedded as one opaque blob, never decoded
    Archive(PathBuf),
}

/// One declared input to a build. Each descriptor expands into zero or more
/// entries when registered.
#[derive(Debug, Clone)]
pub enum InputDescriptor {
    /// A single file stored under an explicit entry name
    SingleFile { name: String, path: PathBuf },
    /// A directory whose descendants are added under their path relative to
    /// the root, joined with `/`
    DirectoryTree { root: PathBuf },
    /// A file stored under its base name only, directory components dropped
    RootFlattenedFile { path: PathBuf },
    /// An existing capsule embedded opaquely, not merged
    NestedArchive { path: PathBuf },
}

/// Normalize a requested entry name to its canonical form.
///
/// Drops exactly one leading `/`, or else exactly one leading `./`. No other
/// transformation is applied: no case folding, no Unicode normalization.
///
/// ```
/// use capsule::resolver::normalize;
/// assert_eq!(normalize("/a/b"), "a/b");
/// assert_eq!(normalize("./a/b"), "a/b");
/// assert_eq!(normalize("a/b"), "a/b");
/// ```
pub fn normalize(name: &str) -> &str {
    if let Some(stripped) = name.strip_prefix('/') {
        stripped
    } else if let Some(stripped) = name.strip_prefix("./") {
        stripped
    } else {
        name
    }
}

/// Accumulates the canonical entry mapping for one build.
///
/// Registration never fails: unreadable sources are only discovered (and
/// reported) when the serializer reads them.
#[derive(Debug, Default)]
pub struct EntryResolver {
    entries: BTreeMap<String, EntrySource>,
}

impl EntryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand one input descriptor into the entry mapping
    pub fn register(&mut self, descriptor: InputDescriptor) {
        match descriptor {
            InputDescriptor::SingleFile { name, path } => {
                self.add_entry(&name, path);
            }
            InputDescriptor::DirectoryTree { root } => self.add_directory(&root),
            InputDescriptor::RootFlattenedFile { path } => self.add_root_entry(path),
            InputDescriptor::NestedArchive { path } => self.add_archive(path),
        }
    }

    /// Add a single file under a normalized entry name.
    ///
    /// Returns true iff the name was not previously registered; an existing
    /// entry with the same canonical name is silently replaced.
    pub fn add_entry(&mut self, name: &str, path: PathBuf) -> bool {
        self.entries
            .insert(normalize(name).to_string(), EntrySource::File(path))
            .is_none()
    }

    /// Add every descendant of `root`, named by the path segments from the
    /// root down, joined with `/` regardless of the host separator.
    ///
    /// Directories are registered as their own zero-length entries as well
    /// as recursed into, so empty directories survive the round trip. A root
    /// that cannot be listed contributes zero entries; that is not an error.
    pub fn add_directory(&mut self, root: &Path) {
        for entry in WalkDir::new(root).min_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(root = %root.display(), error = %err, "skipping unreadable directory entry");
                    continue;
                }
            };
            let Some(name) = tree_entry_name(root, entry.path()) else {
                debug!(path = %entry.path().display(), "skipping non-UTF-8 entry name");
                continue;
            };
            let source = if entry.file_type().is_dir() {
                EntrySource::Directory(entry.path().to_path_buf())
            } else {
                EntrySource::File(entry.path().to_path_buf())
            };
            self.entries.insert(name, source);
        }
    }

    /// Add a batch of files collapsed into the root of the namespace: each
    /// entry is keyed by its base name only.
    pub fn add_root_entries<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        for path in paths {
            self.add_root_entry(path);
        }
    }

    /// Add one file under its base name only
    pub fn add_root_entry(&mut self, path: PathBuf) {
        match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => {
                self.entries.insert(name.to_string(), EntrySource::File(path));
            }
            None => debug!(path = %path.display(), "skipping path without a base name"),
        }
    }

    /// Add an existing capsule as one opaque blob entry keyed by its base
    /// name. The sub-archive's internal entries are not merged.
    pub fn add_archive(&mut self, path: PathBuf) {
        match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => {
                self.entries
                    .insert(name.to_string(), EntrySource::Archive(path));
            }
            None => debug!(path = %path.display(), "skipping archive without a base name"),
        }
    }

    /// The canonical mapping, lexicographically ordered by entry name
    pub fn entries(&self) -> &BTreeMap<String, EntrySource> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the canonical name for a directory-tree descendant: the segments
/// from root to descendant joined with `/`. Returns None for names that are
/// not valid UTF-8.
fn tree_entry_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Option<Vec<&str>> = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect();
    let segments = segments?;
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}
