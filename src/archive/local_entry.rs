use crate::archive::format::CompressionMethod;
use crate::error::{CapsuleError, Result};
use std::io::{Read, Write};

/// LOCA signature for local entry headers
pub const LOCAL_ENTRY_SIGNATURE: [u8; 4] = [0x4C, 0x4F, 0x43, 0x41]; // "LOCA"

/// Local Entry Header
///
/// Precedes each entry's payload in the capsule, enabling sequential
/// streaming reads without consulting the central directory.
///
/// Structure (variable length):
/// - Signature: "LOCA" (4 bytes)
/// - Uncompressed Size: uint64 (8 bytes)
/// - Compressed Size: uint64 (8 bytes)
/// - CRC32: uint32 (4 bytes)
/// - Modified Timestamp: uint64 (8 bytes)
/// - Compression Method: uint8 (1 byte)
/// - Flags: uint8 (1 byte)
/// - Name Length: uint16 (2 bytes)
/// - Reserved: 4 bytes
/// - Entry Name: variable (null-terminated UTF-8)
#[derive(Debug, Clone)]
pub struct LocalEntryHeader {
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub crc32: u32,
    pub modified_time: u64,
    pub compression: CompressionMethod,
    pub flags: u8,
    pub name: String,
}

impl LocalEntryHeader {
    /// Create a new local entry header
    pub fn new(
        uncompressed_size: u64,
        compressed_size: u64,
        crc32: u32,
        modified_time: u64,
        compression: CompressionMethod,
        flags: u8,
        name: String,
    ) -> Self {
        Self {
            uncompressed_size,
            compressed_size,
            crc32,
            modified_time,
            compression,
            flags,
            name,
        }
    }

    /// Write local entry header to a writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut bytes_written = 0;

        writer.write_all(&LOCAL_ENTRY_SIGNATURE)?;
        bytes_written += 4;

        writer.write_all(&self.uncompressed_size.to_le_bytes())?;
        bytes_written += 8;

        writer.write_all(&self.compressed_size.to_le_bytes())?;
        bytes_written += 8;

        writer.write_all(&self.crc32.to_le_bytes())?;
        bytes_written += 4;

        writer.write_all(&self.modified_time.to_le_bytes())?;
        bytes_written += 8;

        writer.write_all(&[self.compression as u8])?;
        bytes_written += 1;

        writer.write_all(&[self.flags])?;
        bytes_written += 1;

        let name_bytes = self.name.as_bytes();
        if name_bytes.len() > u16::MAX as usize {
            return Err(CapsuleError::PathError(format!(
                "Entry name too long: {} bytes (max {})",
                name_bytes.len(),
                u16::MAX
            )));
        }
        let name_len = name_bytes.len() as u16;
        writer.write_all(&name_len.to_le_bytes())?;
        bytes_written += 2;

        // Reserved (4 bytes)
        writer.write_all(&[0u8; 4])?;
        bytes_written += 4;

        // Name (null-terminated)
        writer.write_all(name_bytes)?;
        writer.write_all(&[0u8])?;
        bytes_written += name_bytes.len() + 1;

        Ok(bytes_written)
    }

    /// Read local entry header from a reader
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut sig = [0u8; 4];
        reader.read_exact(&mut sig)?;
        if sig != LOCAL_ENTRY_SIGNATURE {
            return Err(CapsuleError::InvalidFormat(
                "Invalid local entry signature (expected LOCA)".to_string(),
            ));
        }

        let uncompressed_size = read_u64(&mut reader)?;
        let compressed_size = read_u64(&mut reader)?;
        let crc32 = read_u32(&mut reader)?;
        let modified_time = read_u64(&mut reader)?;

        let mut compression_byte = [0u8; 1];
        reader.read_exact(&mut compression_byte)?;
        let compression = CompressionMethod::from_u8(compression_byte[0])?;

        let mut flags = [0u8; 1];
        reader.read_exact(&mut flags)?;

        let name_len = read_u16(&mut reader)?;

        let mut reserved = [0u8; 4];
        reader.read_exact(&mut reserved)?;

        let mut name_buf = vec![0u8; name_len as usize];
        reader.read_exact(&mut name_buf)?;

        let name = String::from_utf8(name_buf)
            .map_err(|e| CapsuleError::PathError(format!("Invalid UTF-8 in name: {}", e)))?;

        let mut null_term = [0u8; 1];
        reader.read_exact(&mut null_term)?;
        if null_term[0] != 0 {
            return Err(CapsuleError::InvalidFormat(
                "Missing null terminator in local entry name".to_string(),
            ));
        }

        Ok(Self {
            uncompressed_size,
            compressed_size,
            crc32,
            modified_time,
            compression,
            flags: flags[0],
            name,
        })
    }

    /// Calculate the total size of this header when written
    pub fn header_size(&self) -> usize {
        4 + // Signature
        8 + // Uncompressed size
        8 + // Compressed size
        4 + // CRC32
        8 + // Modified timestamp
        1 + // Compression method
        1 + // Flags
        2 + // Name length
        4 + // Reserved
        self.name.len() + 1 // Name + null terminator
    }
}

// Helper functions for reading primitive types
fn read_u16<R: Read>(mut reader: R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(mut reader: R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(mut reader: R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
