//! Map container reader.
//!
//! A map surface is split into 320×240 tiles, each stored as a list of
//! typed sub-blocks: one image block (JPEG/PNG/WebP in several flavors), an
//! optional obstacle grid, optional brightness data, and — for MAPX —
//! inline alpha-mask blocks. M1.0 keeps its masks in a separate table
//! referenced per tile.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, trace, warn};

use crate::error::AssetError;
use crate::image::{Image, ImageDecoder, PixelFormat};
use crate::jpeg;
use crate::map::structs::{
    BlockInfo, MapFormat, MapHeader, MaskInfo, CELLS_PER_TILE_X, CELLS_PER_TILE_Y, MAP_FLAG_M1,
    MAP_FLAG_MAPX, TAG_BRIG, TAG_CELL, TAG_JPEG, TAG_JPG2, TAG_MASK, TAG_PNG1, TAG_WEBP,
    TILE_HEIGHT, TILE_WIDTH,
};

/// Upper bound on the tile and mask tables; anything larger is a corrupt
/// header rather than a real map.
const MAX_TABLE_LEN: u64 = 1 << 20;

/// Reader over one map container.
pub struct MapReader<R> {
    inner: R,
    header: MapHeader,
    format: MapFormat,
    rows: u32,
    cols: u32,
    tile_offsets: Vec<u32>,
    /// M1.0 only: offsets of the shared mask table entries.
    mask_offsets: Vec<u32>,
    /// MAPX only: the JPEG header shared by every raw-JPEG tile body.
    jpeg_header: Vec<u8>,
}

impl MapReader<File> {
    /// Open a map file from disk.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        Self::open(File::open(path)?)
    }
}

impl<R: Read + Seek> MapReader<R> {
    /// Parse the header and load the tile (and mask) offset tables.
    ///
    /// A header flag matching neither variant is byte-swapped once before
    /// rejection; some exporters wrote the flag with the opposite byte
    /// order.
    ///
    /// # Errors
    ///
    /// [`AssetError::UnrecognizedFormat`] for an unknown flag,
    /// [`AssetError::Corrupt`] for an implausible tile grid.
    pub fn open(mut inner: R) -> Result<Self, AssetError> {
        inner.seek(SeekFrom::Start(0))?;
        let mut header = MapHeader::parse(&mut inner)?;

        let format = match header.flag {
            MAP_FLAG_M1 => MapFormat::M1,
            MAP_FLAG_MAPX => MapFormat::MapX,
            other => {
                let swapped = other.swap_bytes();
                match swapped {
                    MAP_FLAG_M1 => {
                        debug!("map flag is byte-swapped, accepting as M1.0");
                        header.flag = swapped;
                        MapFormat::M1
                    }
                    MAP_FLAG_MAPX => {
                        debug!("map flag is byte-swapped, accepting as MAPX");
                        header.flag = swapped;
                        MapFormat::MapX
                    }
                    _ => {
                        return Err(AssetError::UnrecognizedFormat(format!(
                            "map flag {other:#010X}"
                        )));
                    }
                }
            }
        };

        let rows = header.height.div_ceil(TILE_HEIGHT);
        let cols = header.width.div_ceil(TILE_WIDTH);
        let tile_count = u64::from(rows) * u64::from(cols);
        if tile_count == 0 || tile_count > MAX_TABLE_LEN {
            return Err(AssetError::Corrupt(format!(
                "implausible tile grid {cols}x{rows}"
            )));
        }

        let mut tile_offsets = Vec::with_capacity(tile_count as usize);
        for _ in 0..tile_count {
            tile_offsets.push(inner.read_u32::<LittleEndian>()?);
        }

        let mut mask_offsets = Vec::new();
        let mut jpeg_header = Vec::new();
        match format {
            MapFormat::M1 => {
                let mask_table_offset = inner.read_u32::<LittleEndian>()?;
                if mask_table_offset > 0 {
                    inner.seek(SeekFrom::Start(u64::from(mask_table_offset)))?;
                    let mask_count = u64::from(inner.read_u32::<LittleEndian>()?);
                    if mask_count > MAX_TABLE_LEN {
                        return Err(AssetError::Corrupt(format!(
                            "implausible mask count {mask_count}"
                        )));
                    }
                    mask_offsets.reserve(mask_count as usize);
                    for _ in 0..mask_count {
                        mask_offsets.push(inner.read_u32::<LittleEndian>()?);
                    }
                }
            }
            MapFormat::MapX => {
                let _file_size = inner.read_u32::<LittleEndian>()?;
                let block = BlockInfo::parse(&mut inner)?;
                jpeg_header = vec![0u8; block.size as usize];
                inner.read_exact(&mut jpeg_header)?;
            }
        }

        debug!(
            format = %format,
            width = header.width,
            height = header.height,
            tiles = tile_count,
            masks = mask_offsets.len(),
            "opened map"
        );

        Ok(Self {
            inner,
            header,
            format,
            rows,
            cols,
            tile_offsets,
            mask_offsets,
            jpeg_header,
        })
    }

    /// The parsed header (with the flag already un-swapped if needed).
    pub const fn header(&self) -> &MapHeader {
        &self.header
    }

    /// The container variant.
    pub const fn format(&self) -> MapFormat {
        self.format
    }

    /// Tile rows in the grid.
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Tile columns in the grid.
    pub const fn cols(&self) -> u32 {
        self.cols
    }

    /// Total number of tiles.
    pub fn tile_count(&self) -> u32 {
        self.tile_offsets.len() as u32
    }

    /// Number of entries in the M1.0 mask table (0 for MAPX).
    pub fn mask_count(&self) -> u32 {
        self.mask_offsets.len() as u32
    }

    /// The map surface size in pixels.
    pub const fn map_size(&self) -> (u32, u32) {
        (self.header.width, self.header.height)
    }

    /// Release the underlying handle.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Decode tile `id`'s surface image through the supplied decoder.
    ///
    /// Walks the tile's sub-blocks until an image block turns up: JPG2,
    /// PNG1, and WEBP bodies go to the decoder as-is; raw JPEG bodies are
    /// repaired first when they carry the proprietary marker (M1.0) or
    /// prefixed with the shared JPEG header (MAPX).
    ///
    /// # Errors
    ///
    /// [`AssetError::Corrupt`] when the tile holds no image block;
    /// decoder refusals propagate as [`AssetError::DecodeFailure`].
    pub fn tile(&mut self, id: u32, decoder: &dyn ImageDecoder) -> Result<Image, AssetError> {
        self.seek_past_mask_bookkeeping(id)?;

        loop {
            let Ok(block) = BlockInfo::parse(&mut self.inner) else {
                return Err(AssetError::Corrupt(format!(
                    "tile {id} block list ends without an image block"
                )));
            };
            match block.tag {
                TAG_JPG2 => {
                    let data = self.read_payload(block.size)?;
                    return decoder.decode_jpeg(&data);
                }
                TAG_PNG1 => {
                    let data = self.read_payload(block.size)?;
                    return decoder.decode_png(&data);
                }
                TAG_WEBP => {
                    let data = self.read_payload(block.size)?;
                    return decoder.decode_webp(&data);
                }
                TAG_JPEG => {
                    let data = self.read_payload(block.size)?;
                    return match self.format {
                        MapFormat::M1 => {
                            if jpeg::needs_repair(&data) {
                                trace!(tile = id, "repairing proprietary JPEG body");
                                decoder.decode_jpeg(&jpeg::repair(&data))
                            } else {
                                decoder.decode_jpeg(&data)
                            }
                        }
                        MapFormat::MapX => {
                            let mut full =
                                Vec::with_capacity(self.jpeg_header.len() + data.len());
                            full.extend_from_slice(&self.jpeg_header);
                            full.extend_from_slice(&data);
                            decoder.decode_jpeg(&full)
                        }
                    };
                }
                0 => {
                    self.skip(block.size)?;
                    return Err(AssetError::Corrupt(format!(
                        "tile {id} has no image block"
                    )));
                }
                TAG_CELL | TAG_BRIG | TAG_MASK => {
                    self.skip(block.size)?;
                }
                other => {
                    trace!(tile = id, "skipping unknown block {other:#010X}");
                    self.skip(block.size)?;
                }
            }
        }
    }

    /// List the mask rectangles attached to tile `id`.
    ///
    /// M1.0 follows the tile's mask-id list into the shared table (where
    /// the rectangle precedes the size). MAPX scans the tile's inline MASK
    /// blocks (where the size precedes the rectangle) and rebases the
    /// coordinates from tile-local to surface space. The reported `offset`
    /// keeps the legacy bookkeeping value in both cases.
    pub fn mask_infos(&mut self, id: u32) -> Result<Vec<MaskInfo>, AssetError> {
        let start = self.tile_start(id)?;
        self.inner.seek(SeekFrom::Start(start))?;
        let mask_num = self.inner.read_u32::<LittleEndian>()?;

        let mut out = Vec::new();
        if mask_num == 0 {
            return Ok(out);
        }

        match self.format {
            MapFormat::M1 => {
                for _ in 0..mask_num {
                    let mask_id = self.inner.read_u32::<LittleEndian>()?;
                    let Some(&table_offset) = self.mask_offsets.get(mask_id as usize) else {
                        warn!(tile = id, mask_id, "mask id outside the mask table");
                        continue;
                    };
                    let here = self.inner.stream_position()?;

                    self.inner.seek(SeekFrom::Start(u64::from(table_offset)))?;
                    let x = self.inner.read_i32::<LittleEndian>()?;
                    let y = self.inner.read_i32::<LittleEndian>()?;
                    let width = self.inner.read_u32::<LittleEndian>()?;
                    let height = self.inner.read_u32::<LittleEndian>()?;
                    let size = self.inner.read_u32::<LittleEndian>()?;
                    out.push(MaskInfo {
                        id: mask_id,
                        offset: table_offset,
                        x,
                        y,
                        width,
                        height,
                        size,
                    });

                    self.inner.seek(SeekFrom::Start(here))?;
                }
            }
            MapFormat::MapX => loop {
                let Ok(block) = BlockInfo::parse(&mut self.inner) else {
                    break;
                };
                match block.tag {
                    TAG_MASK => {
                        let size = self.inner.read_u32::<LittleEndian>()?;
                        let x = self.inner.read_i32::<LittleEndian>()?;
                        let y = self.inner.read_i32::<LittleEndian>()?;
                        let width = self.inner.read_u32::<LittleEndian>()?;
                        let height = self.inner.read_u32::<LittleEndian>()?;
                        let payload = size.checked_sub(16).ok_or_else(|| {
                            AssetError::Corrupt(format!(
                                "mask block size {size} below the rectangle prefix"
                            ))
                        })?;
                        // Tile-local coordinates, rebased to the surface.
                        let x = x + ((id % self.cols) * TILE_WIDTH) as i32;
                        let y = y + ((id / self.cols) * TILE_HEIGHT) as i32;
                        // Legacy bookkeeping value: position minus four,
                        // taken after the rectangle was consumed.
                        let offset = (self.inner.stream_position()? - 4) as u32;
                        out.push(MaskInfo {
                            id,
                            offset,
                            x,
                            y,
                            width,
                            height,
                            size: payload,
                        });
                        self.skip(payload)?;
                    }
                    0 => break,
                    _ => self.skip(block.size)?,
                }
            },
        }

        Ok(out)
    }

    /// Decompress and unpack mask `index` of tile `id` into an LA8 image
    /// (luminance 255, alpha `sample * 85`).
    ///
    /// # Errors
    ///
    /// [`AssetError::Corrupt`] when the payload does not decompress to
    /// exactly `ceil(w/4) * h` bytes — no partial mask is ever returned.
    pub fn mask_image(&mut self, id: u32, index: usize) -> Result<Image, AssetError> {
        let infos = self.mask_infos(id)?;
        let info = *infos.get(index).ok_or_else(|| {
            AssetError::InvalidParameter(format!(
                "mask index {index} out of range (tile {id} has {})",
                infos.len()
            ))
        })?;

        // The stored offset is bookkeeping (see `mask_infos`); the payload
        // position differs per variant.
        let payload_at = match self.format {
            MapFormat::M1 => u64::from(info.offset) + 20,
            MapFormat::MapX => u64::from(info.offset) + 4,
        };
        self.inner.seek(SeekFrom::Start(payload_at))?;
        let mut compressed = vec![0u8; info.size as usize];
        self.inner.read_exact(&mut compressed)?;

        let w = info.width as usize;
        let h = info.height as usize;
        let row_bytes = w.div_ceil(4);
        let expected = row_bytes * h;
        let mut unpacked = vec![0u8; expected];
        let produced = gge_comp::lzo::decompress(&compressed, &mut unpacked);
        if produced != expected {
            warn!(tile = id, index, produced, expected, "mask decompression came up short");
            return Err(AssetError::Corrupt(format!(
                "mask payload decompressed to {produced} bytes, expected {expected}"
            )));
        }

        // Four 2-bit alpha samples per byte; rows advance to the next byte
        // after ceil(w/4) bytes.
        let mut la = vec![0u8; w * h * 2];
        for row in 0..h {
            let src_row = &unpacked[row * row_bytes..(row + 1) * row_bytes];
            for x in 0..w {
                let sample = (src_row[x / 4] >> ((x % 4) * 2)) & 3;
                la[(row * w + x) * 2] = 255;
                la[(row * w + x) * 2 + 1] = sample * 85;
            }
        }

        Image::new(info.width, info.height, PixelFormat::La8, la)
    }

    /// Build the global obstacle grid: `(cols*16) × (rows*12)` bytes, one
    /// per cell, 0 walkable and 1 blocked.
    ///
    /// Every cell starts blocked; each tile's first CELL block clears the
    /// cells its zero bytes name. At most 16×12 source bytes per tile are
    /// honored, so an oversized block cannot leak into a neighbour.
    pub fn obstacles(&mut self) -> Result<Vec<u8>, AssetError> {
        let grid_w = (self.cols * CELLS_PER_TILE_X) as usize;
        let grid_h = (self.rows * CELLS_PER_TILE_Y) as usize;
        let mut grid = vec![1u8; grid_w * grid_h];

        for tile_row in 0..self.rows {
            let row_base = tile_row as usize * CELLS_PER_TILE_Y as usize * grid_w;
            for tile_col in 0..self.cols {
                let id = tile_row * self.cols + tile_col;
                let Some(cell) = self.find_cell_block(id)? else {
                    continue;
                };
                let base = row_base + tile_col as usize * CELLS_PER_TILE_X as usize;
                let per_tile = (CELLS_PER_TILE_X * CELLS_PER_TILE_Y) as usize;
                for (i, &b) in cell.iter().take(per_tile).enumerate() {
                    if b == 0 {
                        grid[base + (i / 16) * grid_w + (i % 16)] = 0;
                    }
                }
            }
        }

        Ok(grid)
    }

    /// Raw `(tag, payload)` listing of a tile's sub-blocks, for diagnostics.
    pub fn tile_blocks(&mut self, id: u32) -> Result<Vec<(u32, Vec<u8>)>, AssetError> {
        self.seek_past_mask_bookkeeping(id)?;

        let mut out = Vec::new();
        loop {
            let Ok(block) = BlockInfo::parse(&mut self.inner) else {
                break;
            };
            if block.tag == 0 {
                break;
            }
            let data = self.read_payload(block.size)?;
            out.push((block.tag, data));
        }
        Ok(out)
    }

    // -- internal helpers ---------------------------------------------------

    fn tile_start(&self, id: u32) -> Result<u64, AssetError> {
        let offset = *self.tile_offsets.get(id as usize).ok_or_else(|| {
            AssetError::InvalidParameter(format!(
                "tile id {id} out of range (total {})",
                self.tile_offsets.len()
            ))
        })?;
        Ok(u64::from(offset))
    }

    /// Seek to a tile's block list, past the mask count (and, for M1.0, the
    /// mask-id list).
    fn seek_past_mask_bookkeeping(&mut self, id: u32) -> Result<(), AssetError> {
        let start = self.tile_start(id)?;
        self.inner.seek(SeekFrom::Start(start))?;
        let mask_num = self.inner.read_u32::<LittleEndian>()?;
        if self.format == MapFormat::M1 && mask_num > 0 {
            self.inner
                .seek(SeekFrom::Current(i64::from(mask_num) * 4))?;
        }
        Ok(())
    }

    /// Find and return the first CELL payload of tile `id`, if any.
    fn find_cell_block(&mut self, id: u32) -> Result<Option<Vec<u8>>, AssetError> {
        self.seek_past_mask_bookkeeping(id)?;
        loop {
            let Ok(block) = BlockInfo::parse(&mut self.inner) else {
                return Ok(None);
            };
            match block.tag {
                TAG_CELL => return Ok(Some(self.read_payload(block.size)?)),
                0 => {
                    self.skip(block.size)?;
                    return Ok(None);
                }
                _ => self.skip(block.size)?,
            }
        }
    }

    fn read_payload(&mut self, size: u32) -> Result<Vec<u8>, AssetError> {
        let mut data = vec![0u8; size as usize];
        self.inner.read_exact(&mut data)?;
        Ok(data)
    }

    fn skip(&mut self, size: u32) -> Result<(), AssetError> {
        self.inner.seek(SeekFrom::Current(i64::from(size)))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
