use crate::archive::end_record::EndRecord;
use crate::archive::format::{
    CompressionMethod, EntryInfo, FileHeader, CANONICAL_MTIME, CD_ENTRY_SIZE,
    ENTRY_FLAG_DIRECTORY, ENTRY_FLAG_NESTED, FORMAT_VERSION_MAJOR, FORMAT_VERSION_MINOR,
    HEADER_SIZE,
};
use crate::archive::local_entry::LocalEntryHeader;
use crate::error::{CapsuleError, Result};
use crate::metadata::METADATA_ENTRY_NAME;
use crate::resolver::EntrySource;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Trust-metadata exclusion: a signature computed over some other container
/// cannot verify the repackaged one, so signature entries are never copied
/// through.
pub fn is_trust_metadata(name: &str) -> bool {
    name.ends_with(".RSA") || name.ends_with(".DSA")
}

/// Serializer for capsule containers.
///
/// The caller writes the metadata block first, then appends data entries in
/// lexicographic canonical-name order (the resolver's `BTreeMap` iteration
/// order). Entry timestamps come from the source files, or from the fixed
/// canonical epoch when timestamp normalization is on, which is what makes
/// the output byte-identical across rebuilds.
///
/// A failure after creation leaves the output truncated; there is no
/// rollback, and the caller must discard the file.
pub struct ContainerWriter {
    writer: BufWriter<File>,
    entries: Vec<EntryInfo>,
    current_offset: u64,
    compression: CompressionMethod,
    normalize_timestamps: bool,
}

impl ContainerWriter {
    /// Create (or truncate) the output container
    pub fn create<P: AsRef<Path>>(
        path: P,
        compression: CompressionMethod,
        normalize_timestamps: bool,
    ) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);

        // Placeholder header, patched at finalization
        let header = FileHeader::new();
        header.write_to(&mut writer)?;

        Ok(Self {
            writer,
            entries: Vec::new(),
            current_offset: HEADER_SIZE as u64,
            compression,
            normalize_timestamps,
        })
    }

    /// Write the metadata block under its reserved name. Must be called
    /// before any data entry; the block is always the first entry and is
    /// stored uncompressed for instant access.
    pub fn write_metadata(&mut self, data: &[u8]) -> Result<()> {
        let mtime = self.entry_mtime(None)?;
        self.append_entry(METADATA_ENTRY_NAME, data, CompressionMethod::None, 0, mtime)
    }

    /// Copy one resolved entry into the container, reading its content from
    /// the source location.
    ///
    /// Trust-metadata names, and names colliding with the reserved metadata
    /// entry, are dropped silently. Any read failure is fatal.
    pub fn copy_entry(&mut self, name: &str, source: &EntrySource) -> Result<()> {
        if is_trust_metadata(name) {
            debug!(name, "dropping trust-metadata entry");
            return Ok(());
        }
        if name == METADATA_ENTRY_NAME {
            debug!(name, "dropping entry shadowing the reserved metadata name");
            return Ok(());
        }

        match source {
            EntrySource::File(path) => {
                let data = std::fs::read(path)?;
                let mtime = self.entry_mtime(Some(path))?;
                self.append_entry(name, &data, self.compression, 0, mtime)
            }
            EntrySource::Directory(path) => {
                let mtime = self.entry_mtime(Some(path))?;
                self.append_entry(name, &[], CompressionMethod::None, ENTRY_FLAG_DIRECTORY, mtime)
            }
            EntrySource::Archive(path) => {
                // Opaque pass-through: raw bytes, never decoded, and never
                // recompressed (the blob is a compressed container already)
                let data = std::fs::read(path)?;
                let mtime = self.entry_mtime(Some(path))?;
                self.append_entry(name, &data, CompressionMethod::None, ENTRY_FLAG_NESTED, mtime)
            }
        }
    }

    /// Number of entries written so far, metadata block included
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Write the central directory, patch the header, and append the end
    /// record.
    pub fn finalize(mut self) -> Result<()> {
        let cd_offset = self.current_offset;

        for entry in &self.entries {
            entry.write_to(&mut self.writer)?;
        }
        let cd_size = (self.entries.len() * CD_ENTRY_SIZE) as u64;
        let entry_count = self.entries.len() as u32;

        self.writer.flush()?;
        let mut file = self.writer.into_inner().map_err(|err| err.into_error())?;

        file.seek(SeekFrom::Start(0))?;
        let mut header = FileHeader::new();
        header.central_directory_offset = cd_offset;
        header.central_directory_size = cd_size;
        header.entry_count = entry_count;
        header.write_to(&mut file)?;

        file.seek(SeekFrom::End(0))?;
        let end_record = EndRecord::new(
            FORMAT_VERSION_MAJOR,
            FORMAT_VERSION_MINOR,
            cd_offset,
            cd_size,
            entry_count,
            0,
        );
        end_record.write_to(&mut file)?;

        file.flush()?;

        Ok(())
    }

    fn append_entry(
        &mut self,
        name: &str,
        data: &[u8],
        compression: CompressionMethod,
        flags: u8,
        mtime: u64,
    ) -> Result<()> {
        let (payload, actual_compression) = compress_payload(data, compression)?;
        let crc32 = crc32fast::hash(data);

        let entry_start_offset = self.current_offset;

        let local_header = LocalEntryHeader::new(
            data.len() as u64,
            payload.len() as u64,
            crc32,
            mtime,
            actual_compression,
            flags,
            name.to_string(),
        );

        let header_bytes_written = local_header.write_to(&mut self.writer)?;
        self.current_offset += header_bytes_written as u64;

        self.writer.write_all(&payload)?;
        self.current_offset += payload.len() as u64;

        self.entries.push(EntryInfo {
            name: name.to_string(),
            data_offset: entry_start_offset,
            uncompressed_size: data.len() as u64,
            compressed_size: payload.len() as u64,
            crc32,
            modified_time: mtime,
            compression: actual_compression,
            flags,
        });

        Ok(())
    }

    /// Timestamp policy: the fixed canonical epoch when normalizing, else
    /// the source file's mtime (or the current time for synthesized
    /// entries, which have no source).
    fn entry_mtime(&self, source: Option<&Path>) -> Result<u64> {
        if self.normalize_timestamps {
            return Ok(CANONICAL_MTIME);
        }
        let time = match source {
            Some(path) => std::fs::metadata(path)?.modified()?,
            None => SystemTime::now(),
        };
        Ok(time
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or(0))
    }
}

/// Compress one payload with the configured method, keeping the stored form
/// when compression does not shrink it. The choice depends only on the
/// content, so it is stable across rebuilds.
fn compress_payload(
    data: &[u8],
    compression: CompressionMethod,
) -> Result<(Vec<u8>, CompressionMethod)> {
    let compressed = match compression {
        CompressionMethod::None => return Ok((data.to_vec(), CompressionMethod::None)),
        CompressionMethod::Lz4 => lz4_flex::compress_prepend_size(data),
        CompressionMethod::Zstd => zstd::encode_all(data, 6)
            .map_err(|err| CapsuleError::CompressionFailed(format!("Zstd: {}", err)))?,
    };

    if compressed.len() < data.len() {
        Ok((compressed, compression))
    } else {
        Ok((data.to_vec(), CompressionMethod::None))
    }
}
