//! WDF archive reader.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use binrw::BinReaderExt;
use gge_assets::TcpSprite;
use tracing::debug;

use super::structs::{WdfEntry, WdfHeader, WDF_MAGIC};
use super::WdfError;

/// Reader over one WDF archive.
///
/// The whole index is loaded at open time; blob reads seek on demand.
pub struct WdfArchive<R: Read + Seek> {
    inner: R,
    header: WdfHeader,
    entries: Vec<WdfEntry>,
}

impl WdfArchive<File> {
    /// Open an archive file from disk.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, WdfError> {
        Self::open(File::open(path)?)
    }
}

impl<R: Read + Seek> WdfArchive<R> {
    /// Open an archive: validate the magic and load the index.
    ///
    /// # Errors
    ///
    /// [`WdfError::UnrecognizedFormat`] on a magic mismatch,
    /// [`WdfError::Corrupt`] when the declared index does not fit the file.
    pub fn open(mut inner: R) -> Result<Self, WdfError> {
        inner.seek(SeekFrom::Start(0))?;
        let header: WdfHeader = inner
            .read_le()
            .map_err(|e| WdfError::Corrupt(format!("cannot read WDF header: {e}")))?;
        if header.magic != WDF_MAGIC {
            return Err(WdfError::UnrecognizedFormat);
        }

        let file_len = inner.seek(SeekFrom::End(0))?;
        let index_end =
            u64::from(header.index_offset) + u64::from(header.file_count) * 16;
        if index_end > file_len {
            return Err(WdfError::Corrupt(format!(
                "index of {} entries at {:#X} runs past the file end",
                header.file_count, header.index_offset
            )));
        }

        inner.seek(SeekFrom::Start(u64::from(header.index_offset)))?;
        let mut entries = Vec::with_capacity(header.file_count as usize);
        for i in 0..header.file_count {
            let entry: WdfEntry = inner
                .read_le()
                .map_err(|e| WdfError::Corrupt(format!("cannot read index entry {i}: {e}")))?;
            entries.push(entry);
        }

        debug!(files = entries.len(), "opened WDF archive");
        Ok(Self {
            inner,
            header,
            entries,
        })
    }

    /// The parsed archive header.
    pub const fn header(&self) -> &WdfHeader {
        &self.header
    }

    /// Number of blobs in the archive.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// The whole index.
    pub fn entries(&self) -> &[WdfEntry] {
        &self.entries
    }

    /// One index record.
    pub fn entry(&self, index: usize) -> Result<&WdfEntry, WdfError> {
        self.entries.get(index).ok_or(WdfError::EntryIndex(index))
    }

    /// Linear scan for a path hash; the index is not sorted.
    pub fn find_by_hash(&self, hash: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.hash == hash)
    }

    /// Read the blob at `index`.
    pub fn read_by_index(&mut self, index: usize) -> Result<Vec<u8>, WdfError> {
        let entry = *self.entry(index)?;
        self.read_blob(entry.offset, entry.size)
    }

    /// Read the blob whose path hash is `hash`, if present.
    pub fn read_by_hash(&mut self, hash: u32) -> Result<Option<Vec<u8>>, WdfError> {
        match self.find_by_hash(hash) {
            Some(index) => Ok(Some(self.read_by_index(index)?)),
            None => Ok(None),
        }
    }

    /// Peek at the first `max_len` bytes of a blob, for format sniffing.
    pub fn read_header(&mut self, index: usize, max_len: u32) -> Result<Vec<u8>, WdfError> {
        let entry = *self.entry(index)?;
        self.read_blob(entry.offset, entry.size.min(max_len))
    }

    /// Load the blob at `index` as a sprite container.
    pub fn tcp_by_index(&mut self, index: usize) -> Result<TcpSprite, WdfError> {
        let data = self.read_by_index(index)?;
        Ok(TcpSprite::load(data)?)
    }

    /// Load the blob with path hash `hash` as a sprite container, if
    /// present.
    pub fn tcp_by_hash(&mut self, hash: u32) -> Result<Option<TcpSprite>, WdfError> {
        match self.find_by_hash(hash) {
            Some(index) => Ok(Some(self.tcp_by_index(index)?)),
            None => Ok(None),
        }
    }

    /// Release the underlying handle.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_blob(&mut self, offset: u32, size: u32) -> Result<Vec<u8>, WdfError> {
        self.inner.seek(SeekFrom::Start(u64::from(offset)))?;
        let mut data = vec![0u8; size as usize];
        self.inner
            .read_exact(&mut data)
            .map_err(|_| WdfError::Corrupt(format!("blob at {offset:#X} is truncated")))?;
        Ok(data)
    }
}
