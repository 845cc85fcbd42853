//! WDF on-disk structures.

use binrw::BinRead;
use gge_secure::WdfHash;

/// 'WDFP' archive magic.
pub const WDF_MAGIC: u32 = 0x5046_4457;

/// Archive header (12 bytes, little-endian).
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
pub struct WdfHeader {
    pub magic: u32,
    pub file_count: u32,
    pub index_offset: u32,
}

/// One index record (16 bytes): path hash, blob position, blob length, and
/// a slack field old packers used for free space tracking.
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
#[br(little)]
pub struct WdfEntry {
    pub hash: u32,
    pub offset: u32,
    pub size: u32,
    pub unused: u32,
}

impl WdfEntry {
    /// The entry's hash as a display-friendly wrapper.
    #[must_use]
    pub const fn wdf_hash(&self) -> WdfHash {
        WdfHash(self.hash)
    }
}
