//! Capsule: deterministic packaging of compiled outputs into a single
//! reproducible archive.
//!
//! This crate is the final step of a compile pipeline: it collects
//! heterogeneous inputs (loose files, directory trees, pre-built
//! sub-archives), resolves them into a canonical deduplicated entry set,
//! attaches a synthesized metadata block, and serializes everything into
//! one binary container whose bytes are identical across rebuilds on
//! different machines and at different times.
//!
//! # Example
//!
//! ```no_run
//! use capsule::{ArchiveBuilder, InputDescriptor};
//! use std::path::PathBuf;
//!
//! let mut builder = ArchiveBuilder::new();
//! builder.register(InputDescriptor::DirectoryTree {
//!     root: PathBuf::from("target/staging"),
//! });
//! builder.main_entry(Some("App"));
//! builder.build("app.cap".as_ref())?;
//! # Ok::<(), capsule::CapsuleError>(())
//! ```

// Core modules
pub mod archive;
pub mod builder;
pub mod error;
pub mod metadata;
pub mod resolver;
pub mod staging;

// Re-export commonly used types
pub use archive::{
    decompress, is_trust_metadata, CompressionMethod, ContainerWriter, EndRecord, EntryInfo,
    FileHeader, LocalEntryHeader, CANONICAL_MTIME, CD_ENTRY_SIZE, END_RECORD_SIZE, ENTRY_FLAG_DIRECTORY,
    ENTRY_FLAG_NESTED, FORMAT_VERSION_MAJOR, FORMAT_VERSION_MINOR, HEADER_SIZE, MAGIC_NUMBER,
    MAX_NAME_LENGTH,
};
pub use builder::{build, is_capsule, ArchiveBuilder};
pub use error::{CapsuleError, Result};
pub use metadata::{
    Metadata, MetadataBuilder, CREATED_BY_KEY, DEFAULT_CREATED_BY, FORMAT_VERSION_KEY,
    FORMAT_VERSION_VALUE, MAIN_ENTRY_KEY, METADATA_ENTRY_NAME,
};
pub use resolver::{normalize, EntryResolver, EntrySource, InputDescriptor};
pub use staging::StagingDir;
