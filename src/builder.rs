//! One-shot capsule assembly: the driver that wires resolution, metadata
//! synthesis, and serialization into a single call.

use crate::archive::{ContainerWriter, CompressionMethod, MAGIC_NUMBER};
use crate::error::Result;
use crate::metadata::MetadataBuilder;
use crate::resolver::{EntryResolver, InputDescriptor};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Accumulates inputs and policy for one build, then produces the output
/// container in a single shot.
///
/// ```no_run
/// use capsule::{ArchiveBuilder, InputDescriptor};
/// use std::path::PathBuf;
///
/// let mut builder = ArchiveBuilder::new();
/// builder.register(InputDescriptor::DirectoryTree {
///     root: PathBuf::from("target/staging"),
/// });
/// builder.main_entry(Some("App"));
/// builder.build("app.cap".as_ref())?;
/// # Ok::<(), capsule::CapsuleError>(())
/// ```
#[derive(Debug)]
pub struct ArchiveBuilder {
    resolver: EntryResolver,
    manifest_file: Option<PathBuf>,
    main_entry: Option<String>,
    compress: bool,
    normalize_timestamps: bool,
}

impl ArchiveBuilder {
    /// New builder with the packaging defaults: compression and timestamp
    /// normalization both on.
    pub fn new() -> Self {
        Self {
            resolver: EntryResolver::new(),
            manifest_file: None,
            main_entry: None,
            compress: true,
            normalize_timestamps: true,
        }
    }

    /// Expand one input descriptor into the entry mapping
    pub fn register(&mut self, descriptor: InputDescriptor) -> &mut Self {
        self.resolver.register(descriptor);
        self
    }

    /// Use a caller-supplied manifest file as the base metadata record
    pub fn manifest_file(&mut self, path: Option<PathBuf>) -> &mut Self {
        self.manifest_file = path;
        self
    }

    /// Declare the capsule's main entry point
    pub fn main_entry(&mut self, main_entry: Option<&str>) -> &mut Self {
        self.main_entry = main_entry.map(str::to_string);
        self
    }

    /// Compress data entries (Zstd) or store them verbatim
    pub fn compress(&mut self, compress: bool) -> &mut Self {
        self.compress = compress;
        self
    }

    /// Stamp entries with the fixed canonical timestamp instead of source
    /// mtimes, making rebuilds byte-identical
    pub fn normalize_timestamps(&mut self, normalize: bool) -> &mut Self {
        self.normalize_timestamps = normalize;
        self
    }

    /// Resolved entries registered so far
    pub fn entry_count(&self) -> usize {
        self.resolver.len()
    }

    /// Execute the build.
    ///
    /// The metadata block is synthesized before the output is opened, so a
    /// manifest failure aborts with no output byte written. Entries are
    /// serialized in lexicographic canonical-name order; a read failure
    /// mid-write is fatal and leaves a truncated output behind.
    pub fn build(&self, output: &Path) -> Result<()> {
        info!(
            output = %output.display(),
            entries = self.resolver.len(),
            "building capsule"
        );

        let metadata_builder = match &self.manifest_file {
            Some(path) => MetadataBuilder::from_manifest_file(path)?,
            None => MetadataBuilder::new(),
        };
        let metadata = metadata_builder
            .main_entry(self.main_entry.as_deref())
            .build();

        let compression = if self.compress {
            CompressionMethod::Zstd
        } else {
            CompressionMethod::None
        };

        let mut writer = ContainerWriter::create(output, compression, self.normalize_timestamps)?;
        writer.write_metadata(&metadata.to_json()?)?;

        for (name, source) in self.resolver.entries() {
            writer.copy_entry(name, source)?;
        }

        let written = writer.entry_count();
        writer.finalize()?;

        info!(output = %output.display(), entries = written, "capsule built");
        Ok(())
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot build of a capsule from a set of input descriptors
pub fn build(
    output: &Path,
    manifest_file: Option<&Path>,
    main_entry: Option<&str>,
    compress: bool,
    normalize_timestamps: bool,
    inputs: Vec<InputDescriptor>,
) -> Result<()> {
    let mut builder = ArchiveBuilder::new();
    builder
        .manifest_file(manifest_file.map(Path::to_path_buf))
        .main_entry(main_entry)
        .compress(compress)
        .normalize_timestamps(normalize_timestamps);
    for input in inputs {
        builder.register(input);
    }
    builder.build(output)
}

/// Check whether a path is an existing capsule, by magic number. Used by
/// the driver to classify each input root as "embed opaquely" versus
/// "recurse as a directory tree".
pub fn is_capsule(path: &Path) -> bool {
    let mut magic = [0u8; 8];
    match File::open(path).and_then(|mut file| file.read_exact(&mut magic)) {
        Ok(()) => magic == MAGIC_NUMBER,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "not a capsule");
            false
        }
    }
}
