mod end_record;
mod format;
mod local_entry;
mod writer;

pub use end_record::{EndRecord, END_RECORD_SIGNATURE, END_RECORD_SIZE};
pub use format::{
    decompress, CompressionMethod, EntryInfo, FileHeader, CANONICAL_MTIME, CD_ENTRY_SIZE,
    ENTRY_FLAG_DIRECTORY, ENTRY_FLAG_NESTED, FORMAT_VERSION_MAJOR, FORMAT_VERSION_MINOR,
    HEADER_SIZE, MAGIC_NUMBER, MAX_NAME_LENGTH,
};
pub use local_entry::{LocalEntryHeader, LOCAL_ENTRY_SIGNATURE};
pub use writer::{is_trust_metadata, ContainerWriter};
