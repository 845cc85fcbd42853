//! Map container structures and block tags.

use core::fmt;
use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::AssetError;

/// 'M1.0' header flag.
pub const MAP_FLAG_M1: u32 = 0x302E_314D;
/// 'MAPX' header flag.
pub const MAP_FLAG_MAPX: u32 = 0x5850_414D;

/// Tile surface dimensions in pixels.
pub const TILE_WIDTH: u32 = 320;
pub const TILE_HEIGHT: u32 = 240;

/// Obstacle cells per tile.
pub const CELLS_PER_TILE_X: u32 = 16;
pub const CELLS_PER_TILE_Y: u32 = 12;

// Tile sub-block tags; a zero tag terminates the block list.
pub const TAG_JPG2: u32 = 0x4A50_4732;
pub const TAG_PNG1: u32 = 0x3147_4E50;
pub const TAG_WEBP: u32 = 0x5042_4557;
pub const TAG_JPEG: u32 = 0x4745_4A50;
pub const TAG_CELL: u32 = 0x4345_4C4C;
pub const TAG_BRIG: u32 = 0x4252_4947;
pub const TAG_MASK: u32 = 0x4B53_414D;

/// The two supported map container variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFormat {
    M1,
    MapX,
}

impl MapFormat {
    /// The on-wire name of the variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MapFormat::M1 => "M1.0",
            MapFormat::MapX => "MAPX",
        }
    }
}

impl fmt::Display for MapFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map header (12 bytes, little-endian): flag, then the surface size in
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    pub flag: u32,
    pub width: u32,
    pub height: u32,
}

impl MapHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 12;

    /// Parse the header from a reader.
    pub fn parse<R: Read>(mut r: R) -> Result<Self, AssetError> {
        Ok(Self {
            flag: r.read_u32::<LittleEndian>()?,
            width: r.read_u32::<LittleEndian>()?,
            height: r.read_u32::<LittleEndian>()?,
        })
    }
}

/// A typed sub-block prefix: tag then payload size, both u32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub tag: u32,
    pub size: u32,
}

impl BlockInfo {
    /// Parse the 8-byte prefix from a reader.
    pub fn parse<R: Read>(mut r: R) -> Result<Self, AssetError> {
        Ok(Self {
            tag: r.read_u32::<LittleEndian>()?,
            size: r.read_u32::<LittleEndian>()?,
        })
    }
}

/// One mask rectangle, in surface coordinates.
///
/// `offset` is the legacy bookkeeping value downstream tooling stores: for
/// M1.0 it is the mask-table offset of the entry, for MAPX it is the stream
/// position minus four after the rectangle has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskInfo {
    pub id: u32,
    pub offset: u32,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Compressed payload length in bytes.
    pub size: u32,
}
