//! Open file handle returned by the store

use std::fs::{File, Metadata};
use std::io::{self, Read, Seek, SeekFrom, Write};
use tagstore_core::{FileId, Result};

/// Read/write handle to a file's content, tied to its filename and identifier
///
/// Content I/O goes straight to the physical slot; the index is not involved
/// after `open` or `create` returns.
#[derive(Debug)]
pub struct TagFile {
    file: File,
    name: String,
    id: FileId,
}

impl TagFile {
    pub(crate) fn new(file: File, name: impl Into<String>, id: FileId) -> Self {
        Self {
            file,
            name: name.into(),
            id,
        }
    }

    /// Filename the handle was resolved from
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Immutable identifier of the underlying slot
    pub fn id(&self) -> FileId {
        self.id
    }

    /// Metadata of the physical slot
    pub fn metadata(&self) -> Result<Metadata> {
        Ok(self.file.metadata()?)
    }

    /// Flush content and metadata to disk
    pub fn sync_all(&self) -> Result<()> {
        Ok(self.file.sync_all()?)
    }

    /// Truncate or extend the content
    pub fn set_len(&self, len: u64) -> Result<()> {
        Ok(self.file.set_len(len)?)
    }

    /// Give up the wrapper and keep the raw handle
    pub fn into_file(self) -> File {
        self.file
    }
}

impl Read for TagFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for TagFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for TagFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
