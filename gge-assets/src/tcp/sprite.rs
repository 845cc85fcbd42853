//! PS-variant sprite container parsing and frame decoding.

use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

use crate::color;
use crate::error::AssetError;
use crate::image::{Image, PixelFormat};
use crate::tcp::structs::{TcpFrameInfo, TcpHeader, TCP_FLAG_PR, TCP_FLAG_PS};

/// Frames larger than this on either axis are rejected as corrupt.
const MAX_FRAME_DIM: u32 = 8192;

/// A loaded sprite container.
///
/// Holds the raw buffer, the decoded palette, and the materialised
/// frame-offset table; frames decode on demand with [`frame`].
///
/// [`frame`]: TcpSprite::frame
pub struct TcpSprite {
    header: TcpHeader,
    dts: Vec<u8>,
    raw_palette: [u16; 256],
    palette: [[u8; 4]; 256],
    frame_offsets: Vec<u32>,
    data: Vec<u8>,
}

impl TcpSprite {
    /// Parse a sprite container from its raw bytes.
    ///
    /// # Errors
    ///
    /// * [`AssetError::UnsupportedVariant`] for 'PR'-flagged containers.
    /// * [`AssetError::UnrecognizedFormat`] for anything else that is not
    ///   'PS'.
    /// * [`AssetError::Corrupt`] when the declared layout does not fit the
    ///   buffer.
    pub fn load(data: Vec<u8>) -> Result<Self, AssetError> {
        if data.len() < TcpHeader::SIZE {
            return Err(AssetError::Corrupt(
                "buffer shorter than the sprite header".to_string(),
            ));
        }
        let header = TcpHeader::parse(&data[..])?;
        match header.flag {
            TCP_FLAG_PS => {}
            TCP_FLAG_PR => {
                return Err(AssetError::UnsupportedVariant(
                    "PR-flagged sprite containers are not supported".to_string(),
                ));
            }
            other => {
                return Err(AssetError::UnrecognizedFormat(format!(
                    "sprite flag {other:#06X}"
                )));
            }
        }

        let header_len = usize::from(header.header_len);
        if header_len < 12 {
            return Err(AssetError::Corrupt(format!(
                "header length {header_len} below the fixed 12 bytes"
            )));
        }
        let dts_len = header_len - 12;
        let palette_off = TcpHeader::SIZE + dts_len;
        let table_off = palette_off + 512;
        let total_frames = usize::from(header.group_count) * usize::from(header.frame_count);
        let table_end = table_off + total_frames * 4;
        if data.len() < table_end {
            return Err(AssetError::Corrupt(format!(
                "buffer ends inside the sprite tables ({} < {table_end})",
                data.len()
            )));
        }

        let dts = data[TcpHeader::SIZE..palette_off].to_vec();

        let mut raw_palette = [0u16; 256];
        LittleEndian::read_u16_into(&data[palette_off..palette_off + 512], &mut raw_palette);
        let mut palette = [[0u8; 4]; 256];
        for (out, &raw) in palette.iter_mut().zip(raw_palette.iter()) {
            *out = color::rgb565_to_rgba8(raw, 255);
        }

        // Stored offsets are relative to header_len + 4; zero means absent.
        let mut frame_offsets = Vec::with_capacity(total_frames);
        for i in 0..total_frames {
            let raw = LittleEndian::read_u32(&data[table_off + i * 4..]);
            frame_offsets.push(if raw == 0 {
                0
            } else {
                raw.wrapping_add(header.header_len as u32 + 4)
            });
        }

        trace!(
            groups = header.group_count,
            frames = header.frame_count,
            dts_len,
            "loaded sprite container"
        );

        Ok(Self {
            header,
            dts,
            raw_palette,
            palette,
            frame_offsets,
            data,
        })
    }

    /// The parsed container header.
    pub const fn header(&self) -> &TcpHeader {
        &self.header
    }

    /// Animation group count.
    pub const fn group_count(&self) -> u16 {
        self.header.group_count
    }

    /// Frames per group.
    pub const fn frame_count(&self) -> u16 {
        self.header.frame_count
    }

    /// Total frame slots (groups × frames); absent slots decode to `None`.
    pub fn total_frames(&self) -> u32 {
        self.frame_offsets.len() as u32
    }

    /// Nominal sprite dimensions.
    pub const fn size(&self) -> (u16, u16) {
        (self.header.width, self.header.height)
    }

    /// The sprite anchor point.
    pub const fn key_point(&self) -> (i16, i16) {
        (self.header.key_x, self.header.key_y)
    }

    /// The opaque DTS metadata block.
    pub fn dts_data(&self) -> &[u8] {
        &self.dts
    }

    /// The frame prefix for `index`, or `None` for an absent slot.
    ///
    /// # Errors
    ///
    /// [`AssetError::InvalidParameter`] for an out-of-range index,
    /// [`AssetError::Corrupt`] when the offset points outside the buffer.
    pub fn frame_info(&self, index: u32) -> Result<Option<TcpFrameInfo>, AssetError> {
        let Some(base) = self.frame_base(index)? else {
            return Ok(None);
        };
        Ok(Some(TcpFrameInfo::parse(&self.data[base..])?))
    }

    /// Decode frame `index` into an RGBA8 image.
    ///
    /// Malformed run data truncates the frame (remaining pixels stay
    /// transparent) rather than failing; the writer never emits more than
    /// `width` pixels per row and neither does this decoder.
    ///
    /// # Errors
    ///
    /// [`AssetError::InvalidParameter`] for an out-of-range index,
    /// [`AssetError::Corrupt`] for an unusable frame prefix.
    pub fn frame(&self, index: u32) -> Result<Option<Image>, AssetError> {
        let Some(base) = self.frame_base(index)? else {
            return Ok(None);
        };
        let info = TcpFrameInfo::parse(&self.data[base..])?;
        if info.width == 0 || info.height == 0 {
            return Err(AssetError::Corrupt(format!(
                "frame {index} has zero dimensions"
            )));
        }
        if info.width > MAX_FRAME_DIM || info.height > MAX_FRAME_DIM {
            return Err(AssetError::Corrupt(format!(
                "frame {index} claims {}x{}",
                info.width, info.height
            )));
        }

        let w = info.width as usize;
        let h = info.height as usize;
        let mut pixels = vec![0u8; w * h * 4];
        self.decode_rows(base, w, h, &mut pixels);

        Ok(Some(Image::new(
            info.width,
            info.height,
            PixelFormat::Rgba8,
            pixels,
        )?))
    }

    /// Re-derive the palette, applying the fixed-point channel matrix to
    /// entries in `[start, end)`. Entries outside the range are reset to the
    /// plain RGB565 expansion.
    ///
    /// `red`, `green`, and `blue` are the contributions of the respective
    /// source channel to the (r, g, b) outputs; coefficients are scaled by
    /// 256 internally.
    ///
    /// # Errors
    ///
    /// [`AssetError::InvalidParameter`] when the range is inverted or runs
    /// past 256.
    pub fn set_palette_transform(
        &mut self,
        start: usize,
        end: usize,
        red: [f32; 3],
        green: [f32; 3],
        blue: [f32; 3],
    ) -> Result<(), AssetError> {
        if start > end || end > 256 {
            return Err(AssetError::InvalidParameter(format!(
                "palette range {start}..{end} outside 0..256"
            )));
        }
        let red = red.map(|c| (c * 256.0) as u32);
        let green = green.map(|c| (c * 256.0) as u32);
        let blue = blue.map(|c| (c * 256.0) as u32);

        for (i, (out, &raw)) in self
            .palette
            .iter_mut()
            .zip(self.raw_palette.iter())
            .enumerate()
        {
            *out = if (start..end).contains(&i) {
                color::rgb565_transform(raw, red, green, blue)
            } else {
                color::rgb565_to_rgba8(raw, 255)
            };
        }
        Ok(())
    }

    fn frame_base(&self, index: u32) -> Result<Option<usize>, AssetError> {
        let offset = *self.frame_offsets.get(index as usize).ok_or_else(|| {
            AssetError::InvalidParameter(format!(
                "frame index {index} out of range (total {})",
                self.frame_offsets.len()
            ))
        })?;
        if offset == 0 {
            return Ok(None);
        }
        let base = offset as usize;
        if base + TcpFrameInfo::SIZE > self.data.len() {
            return Err(AssetError::Corrupt(format!(
                "frame {index} offset {base:#X} outside the buffer"
            )));
        }
        Ok(Some(base))
    }

    /// Run-decode every row. Stops quietly on any out-of-bounds read.
    fn decode_rows(&self, frame_base: usize, w: usize, h: usize, pixels: &mut [u8]) {
        let data = &self.data;
        let line_table = frame_base + TcpFrameInfo::SIZE;

        for row in 0..h {
            let table_at = line_table + row * 4;
            if table_at + 4 > data.len() {
                trace!(row, "line-offset table truncated");
                return;
            }
            let rel = LittleEndian::read_u32(&data[table_at..]) as usize;
            let mut p = frame_base + rel;

            let Some(&first) = data.get(p) else {
                trace!(row, "line offset outside the buffer");
                return;
            };
            if first == 0 {
                // Row repeats the previous one; the first row stays
                // transparent.
                if row > 0 {
                    let prev = (row - 1) * w * 4;
                    pixels.copy_within(prev..prev + w * 4, row * w * 4);
                }
                continue;
            }

            let line = &mut pixels[row * w * 4..(row + 1) * w * 4];
            let mut x = 0usize;
            loop {
                let Some(&op) = data.get(p) else { return };
                if op == 0 || x >= w {
                    break;
                }
                p += 1;
                match op >> 6 {
                    0 => {
                        if op & 0x20 != 0 {
                            // Single pixel with a 5-bit alpha.
                            let alpha = (op & 0x1f) << 3;
                            let Some(&idx) = data.get(p) else { return };
                            p += 1;
                            let mut c = self.palette[usize::from(idx)];
                            c[3] = alpha;
                            line[x * 4..x * 4 + 4].copy_from_slice(&c);
                            x += 1;
                        } else {
                            // Repeated pixel with an explicit alpha byte.
                            let repeat = op & 0x1f;
                            let Some(&alpha_raw) = data.get(p) else { return };
                            p += 1;
                            let Some(&idx) = data.get(p) else { return };
                            p += 1;
                            let mut c = self.palette[usize::from(idx)];
                            c[3] = alpha_raw << 3;
                            for _ in 0..repeat {
                                if x >= w {
                                    break;
                                }
                                line[x * 4..x * 4 + 4].copy_from_slice(&c);
                                x += 1;
                            }
                        }
                    }
                    1 => {
                        // Literal run of palette indices.
                        let count = op & 0x3f;
                        for _ in 0..count {
                            if x >= w {
                                break;
                            }
                            let Some(&idx) = data.get(p) else { return };
                            p += 1;
                            line[x * 4..x * 4 + 4]
                                .copy_from_slice(&self.palette[usize::from(idx)]);
                            x += 1;
                        }
                    }
                    2 => {
                        // One palette index repeated.
                        let repeat = op & 0x3f;
                        let Some(&idx) = data.get(p) else { return };
                        p += 1;
                        let c = self.palette[usize::from(idx)];
                        for _ in 0..repeat {
                            if x >= w {
                                break;
                            }
                            line[x * 4..x * 4 + 4].copy_from_slice(&c);
                            x += 1;
                        }
                    }
                    _ => {
                        // Transparent skip; zero is the edge marker.
                        let skip = op & 0x3f;
                        if skip == 0 {
                            if x > 0 {
                                line[(x - 1) * 4 + 3] |= 0xFF;
                            }
                            p += 2;
                        } else {
                            x += usize::from(skip);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED565: u16 = 0xF800;
    const GREEN565: u16 = 0x07E0;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const GREEN: [u8; 4] = [0, 255, 0, 255];

    /// Build a PS container: no DTS, palette with entry 5 red and entry 7
    /// green, one group of two frames where the second slot is absent.
    fn build_sprite(frame_rows: &[&[u8]], frame_w: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        // Header
        buf.extend_from_slice(&TCP_FLAG_PS.to_le_bytes());
        buf.extend_from_slice(&12u16.to_le_bytes()); // header_len (no DTS)
        buf.extend_from_slice(&1u16.to_le_bytes()); // groups
        buf.extend_from_slice(&2u16.to_le_bytes()); // frames per group
        buf.extend_from_slice(&(frame_w as u16).to_le_bytes());
        buf.extend_from_slice(&(frame_rows.len() as u16).to_le_bytes());
        buf.extend_from_slice(&3i16.to_le_bytes()); // key_x
        buf.extend_from_slice(&(-4i16).to_le_bytes()); // key_y

        // Palette
        for i in 0u16..256 {
            let c = match i {
                5 => RED565,
                7 => GREEN565,
                _ => 0,
            };
            buf.extend_from_slice(&c.to_le_bytes());
        }

        // Offset table: frame 0 present, frame 1 absent. Stored offsets are
        // rebased by header_len + 4 on load.
        let frame_pos = (buf.len() + 8) as u32;
        buf.extend_from_slice(&(frame_pos - (12 + 4)).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());

        // Frame prefix
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&2i32.to_le_bytes());
        buf.extend_from_slice(&frame_w.to_le_bytes());
        buf.extend_from_slice(&(frame_rows.len() as u32).to_le_bytes());

        // Line-offset table, relative to the frame prefix.
        let mut rel = (TcpFrameInfo::SIZE + frame_rows.len() * 4) as u32;
        for row in frame_rows {
            buf.extend_from_slice(&rel.to_le_bytes());
            rel += row.len() as u32;
        }
        for row in frame_rows {
            buf.extend_from_slice(row);
        }

        buf
    }

    fn pixel(img: &Image, x: u32, y: u32) -> [u8; 4] {
        let at = ((y * img.width + x) * 4) as usize;
        img.data[at..at + 4].try_into().unwrap()
    }

    #[test]
    fn rejects_foreign_and_pr_flags() {
        let mut buf = build_sprite(&[&[0x00]], 1);
        buf[0..2].copy_from_slice(&TCP_FLAG_PR.to_le_bytes());
        assert!(matches!(
            TcpSprite::load(buf),
            Err(AssetError::UnsupportedVariant(_))
        ));

        let mut buf = build_sprite(&[&[0x00]], 1);
        buf[0..2].copy_from_slice(&0x4142u16.to_le_bytes());
        assert!(matches!(
            TcpSprite::load(buf),
            Err(AssetError::UnrecognizedFormat(_))
        ));

        assert!(matches!(
            TcpSprite::load(vec![0x53, 0x50]),
            Err(AssetError::Corrupt(_))
        ));
    }

    #[test]
    fn parses_header_and_tables() {
        let sprite = TcpSprite::load(build_sprite(&[&[0x00], &[0x00]], 2)).unwrap();
        assert_eq!(sprite.group_count(), 1);
        assert_eq!(sprite.frame_count(), 2);
        assert_eq!(sprite.total_frames(), 2);
        assert_eq!(sprite.size(), (2, 2));
        assert_eq!(sprite.key_point(), (3, -4));
        assert!(sprite.dts_data().is_empty());

        let info = sprite.frame_info(0).unwrap().unwrap();
        assert_eq!((info.x, info.y), (1, 2));
        assert_eq!((info.width, info.height), (2, 2));
        assert!(sprite.frame_info(1).unwrap().is_none());
        assert!(sprite.frame_info(9).is_err());
    }

    #[test]
    fn repeat_run_and_row_copy() {
        // Row 0: repeat two pixels of palette entry 5; row 1 copies row 0.
        let sprite =
            TcpSprite::load(build_sprite(&[&[0x82, 0x05, 0x00], &[0x00]], 2)).unwrap();
        let img = sprite.frame(0).unwrap().unwrap();
        assert_eq!((img.width, img.height), (2, 2));
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert_eq!(pixel(&img, x, y), RED, "pixel {x},{y}");
        }
    }

    #[test]
    fn absent_frame_is_none() {
        let sprite = TcpSprite::load(build_sprite(&[&[0x00]], 1)).unwrap();
        assert!(sprite.frame(1).unwrap().is_none());
        assert!(sprite.frame(5).is_err());
    }

    #[test]
    fn literal_alpha_and_skip_opcodes() {
        // Literal run (5, 7), skip one transparent pixel, then a single
        // pixel with a 5-bit alpha.
        let row: &[u8] = &[0x42, 0x05, 0x07, 0xC1, 0x3F, 0x05, 0x00];
        let sprite = TcpSprite::load(build_sprite(&[row], 4)).unwrap();
        let img = sprite.frame(0).unwrap().unwrap();

        assert_eq!(pixel(&img, 0, 0), RED);
        assert_eq!(pixel(&img, 1, 0), GREEN);
        assert_eq!(pixel(&img, 2, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&img, 3, 0), [255, 0, 0, 0xF8]);
    }

    #[test]
    fn alpha_repeat_opcode() {
        // Repeat two pixels of entry 7 with explicit alpha 0x10 << 3.
        let row: &[u8] = &[0x02, 0x10, 0x07, 0x00];
        let sprite = TcpSprite::load(build_sprite(&[row], 2)).unwrap();
        let img = sprite.frame(0).unwrap().unwrap();
        assert_eq!(pixel(&img, 0, 0), [0, 255, 0, 0x80]);
        assert_eq!(pixel(&img, 1, 0), [0, 255, 0, 0x80]);
    }

    #[test]
    fn edge_marker_forces_opaque() {
        // A translucent pixel followed by the zero-skip edge marker, which
        // re-opaques the pixel before it and consumes two bookkeeping bytes.
        let row: &[u8] = &[0x3F, 0x05, 0xC0, 0xAA, 0xBB, 0x00];
        let sprite = TcpSprite::load(build_sprite(&[row], 2)).unwrap();
        let img = sprite.frame(0).unwrap().unwrap();
        assert_eq!(pixel(&img, 0, 0), [255, 0, 0, 0xFF]);
        assert_eq!(pixel(&img, 1, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn runs_clamp_at_the_row_width() {
        // A repeat of 40 against a 2-wide frame must stop at the edge.
        let row: &[u8] = &[0xA8, 0x05, 0x00];
        let sprite = TcpSprite::load(build_sprite(&[row], 2)).unwrap();
        let img = sprite.frame(0).unwrap().unwrap();
        assert_eq!(pixel(&img, 0, 0), RED);
        assert_eq!(pixel(&img, 1, 0), RED);
        assert_eq!(img.data.len(), 2 * 4);
    }

    #[test]
    fn truncated_run_data_yields_a_partial_frame() {
        // The literal run promises two indices but the buffer ends first.
        let row: &[u8] = &[0x42, 0x05];
        let sprite = TcpSprite::load(build_sprite(&[row], 2)).unwrap();
        let img = sprite.frame(0).unwrap().unwrap();
        assert_eq!(pixel(&img, 0, 0), RED);
        assert_eq!(pixel(&img, 1, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn palette_transform_applies_only_inside_the_range() {
        let mut sprite =
            TcpSprite::load(build_sprite(&[&[0x42, 0x05, 0x07, 0x00]], 2)).unwrap();

        // Funnel red into the green output channel for entry 5 only.
        sprite
            .set_palette_transform(5, 6, [0.0, 1.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0])
            .unwrap();
        let img = sprite.frame(0).unwrap().unwrap();
        let transformed = pixel(&img, 0, 0);
        assert_eq!(transformed[0], 0);
        assert_ne!(transformed[1], 0);
        // Entry 7 is outside the range and stays at the baseline expansion.
        assert_eq!(pixel(&img, 1, 0), GREEN);

        // Re-applying with an identity matrix over the full range restores
        // the baseline everywhere.
        sprite
            .set_palette_transform(0, 256, [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0])
            .unwrap();
        let img = sprite.frame(0).unwrap().unwrap();
        assert_eq!(pixel(&img, 0, 0), RED);

        assert!(sprite
            .set_palette_transform(10, 5, [0.0; 3], [0.0; 3], [0.0; 3])
            .is_err());
        assert!(sprite
            .set_palette_transform(0, 300, [0.0; 3], [0.0; 3], [0.0; 3])
            .is_err());
    }
}
