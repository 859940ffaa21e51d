//! View over module lifecycle records (process/thread attach and detach).

use super::cursor::RecordCursor;
use super::expected_len;
use crate::domain::ParseError;
use crate::modules::ModuleInfo;
use calltrace_common as wire;

/// Module data carried by attach/detach records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleRecord<'a> {
    /// Base virtual address the module is mapped at. Zero marks an
    /// incompletely written record (the producer was torn down mid-write);
    /// the dispatcher skips such records entirely.
    pub base_address: u64,
    /// Size of the mapped range in bytes.
    pub size: u64,
    /// Image checksum, used to tell rebuilt modules apart.
    pub checksum: u32,
    /// Image link timestamp.
    pub timestamp: u32,
    /// Filesystem path the module was loaded from. Producers disagree on
    /// normalization (device paths vs. drive letters); the tracker
    /// compensates when matching duplicates.
    pub path: &'a str,
}

impl<'a> ModuleRecord<'a> {
    /// Decode a module-data payload.
    ///
    /// # Errors
    /// `ShortRecord` if the fixed prefix or the path bytes are absent,
    /// `BadString` if the path is not valid UTF-8.
    pub fn parse(payload: &'a [u8]) -> Result<Self, ParseError> {
        let mut cursor = RecordCursor::new(payload);
        let base_address = cursor.read_u64()?;
        let size = cursor.read_u64()?;
        let checksum = cursor.read_u32()?;
        let timestamp = cursor.read_u32()?;
        let path_len = cursor.read_u32()? as usize;

        let expected = expected_len(wire::MODULE_DATA_PREFIX, path_len, 1);
        if payload.len() < expected {
            return Err(ParseError::TruncatedPayload { expected, actual: payload.len() });
        }
        let path = cursor.read_str(path_len)?;

        Ok(Self { base_address, size, checksum, timestamp, path })
    }

    /// Whether the record was torn before the producer wrote the base
    /// address.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.base_address == wire::NULL_MODULE_BASE
    }

    /// Materialize tracker-owned module information from this view.
    #[must_use]
    pub fn to_module_info(&self) -> ModuleInfo {
        ModuleInfo {
            base_address: self.base_address,
            size: self.size,
            path: self.path.to_string(),
            checksum: self.checksum,
            timestamp: self.timestamp,
        }
    }
}
