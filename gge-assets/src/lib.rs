//! Decoders for the proprietary game-asset containers.
//!
//! Three binary formats live here: TCP sprite sheets (palette-indexed,
//! run-length-encoded frames), M1.0/MAPX tiled maps (compressed image
//! tiles plus bit-packed obstacle and alpha-mask layers), and the repair
//! pass for the non-standard JPEG variant some map tiles carry.
//!
//! Standard image formats are never decoded in-process; callers supply an
//! [`ImageDecoder`] and this crate hands it the raw JPEG/PNG/WebP bytes.

pub mod color;
pub mod error;
pub mod image;
pub mod jpeg;
pub mod map;
pub mod tcp;

pub use error::AssetError;
pub use image::{Image, ImageDecoder, PixelFormat};
pub use map::{MapFormat, MapReader, MaskInfo};
pub use tcp::{TcpFrameInfo, TcpHeader, TcpSprite};
