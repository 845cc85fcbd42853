//! Sprite container structures.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::AssetError;

/// 'PS' — the palette-sprite variant this crate decodes.
pub const TCP_FLAG_PS: u16 = 0x5053;
/// 'PR' — a legacy variant that is recognised but never decoded.
pub const TCP_FLAG_PR: u16 = 0x5052;

/// Container header (16 bytes, all little-endian).
///
/// ```text
/// 0x00  u16  flag         'PS' (0x5053) or 'PR' (0x5052)
/// 0x02  u16  header_len   header + DTS metadata length; DTS = header_len - 12
/// 0x04  u16  group_count
/// 0x06  u16  frame_count  frames per group
/// 0x08  u16  width        nominal sprite width
/// 0x0A  u16  height       nominal sprite height
/// 0x0C  i16  key_x        anchor point X
/// 0x0E  i16  key_y        anchor point Y
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub flag: u16,
    pub header_len: u16,
    pub group_count: u16,
    pub frame_count: u16,
    pub width: u16,
    pub height: u16,
    pub key_x: i16,
    pub key_y: i16,
}

impl TcpHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 16;

    /// Parse the header from a reader.
    pub fn parse<R: Read>(mut r: R) -> Result<Self, AssetError> {
        Ok(Self {
            flag: r.read_u16::<LittleEndian>()?,
            header_len: r.read_u16::<LittleEndian>()?,
            group_count: r.read_u16::<LittleEndian>()?,
            frame_count: r.read_u16::<LittleEndian>()?,
            width: r.read_u16::<LittleEndian>()?,
            height: r.read_u16::<LittleEndian>()?,
            key_x: r.read_i16::<LittleEndian>()?,
            key_y: r.read_i16::<LittleEndian>()?,
        })
    }
}

/// Per-frame prefix (16 bytes), immediately followed by `height` u32 line
/// offsets relative to the frame base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpFrameInfo {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl TcpFrameInfo {
    /// Size of the prefix in bytes.
    pub const SIZE: usize = 16;

    /// Parse the prefix from a reader.
    pub fn parse<R: Read>(mut r: R) -> Result<Self, AssetError> {
        Ok(Self {
            x: r.read_i32::<LittleEndian>()?,
            y: r.read_i32::<LittleEndian>()?,
            width: r.read_u32::<LittleEndian>()?,
            height: r.read_u32::<LittleEndian>()?,
        })
    }
}
