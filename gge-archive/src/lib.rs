//! WDF archive reading.
//!
//! A WDF file is a flat bag of blobs indexed by the 32-bit legacy path hash
//! (see [`gge_secure::hash`]). The index is a plain array living anywhere in
//! the file; blobs may overlap and sit in any order before it. Sprite blobs
//! can be handed straight to [`gge_assets::TcpSprite`] via the composition
//! helpers.

pub mod wdf;

pub use wdf::reader::WdfArchive;
pub use wdf::structs::{WdfEntry, WdfHeader, WDF_MAGIC};
pub use wdf::WdfError;
