//! Shared read-back helpers for integration tests.
//!
//! The crate ships no extraction API, so tests verify output containers by
//! parsing the wire structures directly.

use capsule::{
    decompress, EndRecord, EntryInfo, FileHeader, LocalEntryHeader, CD_ENTRY_SIZE,
    END_RECORD_SIZE,
};
use std::fs;
use std::path::Path;

pub struct ReadEntry {
    pub info: EntryInfo,
    pub data: Vec<u8>,
}

/// Parse a capsule back into its entries, in central directory order,
/// validating header, end record, and per-entry CRCs along the way.
pub fn read_capsule(path: &Path) -> Vec<ReadEntry> {
    let bytes = fs::read(path).unwrap();

    let header = FileHeader::read_from(&bytes[..]).unwrap();
    header.validate_version().unwrap();

    let end_record = EndRecord::read_from(&bytes[bytes.len() - END_RECORD_SIZE..]).unwrap();
    end_record
        .validate_against_header(
            header.version_major,
            header.version_minor,
            header.central_directory_offset,
            header.central_directory_size,
            header.entry_count,
        )
        .unwrap();

    let cd_start = header.central_directory_offset as usize;
    let mut entries = Vec::new();
    for index in 0..header.entry_count as usize {
        let offset = cd_start + index * CD_ENTRY_SIZE;
        let info = EntryInfo::read_from(&bytes[offset..offset + CD_ENTRY_SIZE]).unwrap();

        let local = LocalEntryHeader::read_from(&bytes[info.data_offset as usize..]).unwrap();
        assert_eq!(local.name, info.name);

        let payload_start = info.data_offset as usize + local.header_size();
        let payload = &bytes[payload_start..payload_start + info.compressed_size as usize];
        let data = decompress(payload, info.compression).unwrap();

        assert_eq!(data.len() as u64, info.uncompressed_size);
        assert_eq!(crc32fast::hash(&data), info.crc32);

        entries.push(ReadEntry { info, data });
    }

    entries
}

/// Entry names in container order
pub fn entry_names(entries: &[ReadEntry]) -> Vec<&str> {
    entries.iter().map(|entry| entry.info.name.as_str()).collect()
}

/// Find one entry by name
pub fn find<'a>(entries: &'a [ReadEntry], name: &str) -> &'a ReadEntry {
    entries
        .iter()
        .find(|entry| entry.info.name == name)
        .unwrap_or_else(|| panic!("entry {} not found", name))
}
