use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for capsule operations
pub type Result<T> = std::result::Result<T, CapsuleError>;

/// Unified error type for all capsule operations
#[derive(Debug, Error)]
pub enum CapsuleError {
    // Container errors
    #[error("Invalid container format: {0}")]
    InvalidFormat(String),

    #[error("Invalid magic number in container header")]
    InvalidMagic,

    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u16),

    #[error("Invalid compression method: {0}")]
    InvalidCompression(u8),

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("CRC mismatch: expected {expected:08x}, got {actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    // Metadata errors
    #[error("Manifest file not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("Failed to parse manifest: {0}")]
    ManifestParseFailed(String),

    // Staging errors
    #[error("Failed to remove staging directory {}: {source}", .path.display())]
    StagingCleanupFailed { path: PathBuf, source: io::Error },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Path error: {0}")]
    PathError(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
