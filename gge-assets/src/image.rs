//! The narrow image interface between the asset readers and the host.

use crate::error::AssetError;

/// Pixel layouts produced by this crate or expected from decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit RGBA, 4 bytes per pixel.
    Rgba8,
    /// 8-bit luminance + alpha, 2 bytes per pixel.
    La8,
}

impl PixelFormat {
    /// Bytes per pixel for this layout.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::La8 => 2,
        }
    }
}

/// A decoded raster image, returned by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl Image {
    /// Wrap pixel data, checking that its length matches the dimensions.
    ///
    /// # Errors
    ///
    /// [`AssetError::InvalidParameter`] on a size mismatch.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, AssetError> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(AssetError::InvalidParameter(format!(
                "image data is {} bytes, {width}x{height} {format:?} needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }
}

/// Standard-format decoding, supplied by the host.
///
/// The asset readers only ever extract the raw JPEG/PNG/WebP byte streams;
/// turning those into pixels is the embedder's business (and its choice of
/// codec). Implementations report refusals as
/// [`AssetError::DecodeFailure`].
pub trait ImageDecoder {
    fn decode_jpeg(&self, data: &[u8]) -> Result<Image, AssetError>;
    fn decode_png(&self, data: &[u8]) -> Result<Image, AssetError>;
    fn decode_webp(&self, data: &[u8]) -> Result<Image, AssetError>;
}
