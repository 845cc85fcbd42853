//! Tiled map containers (M1.0 and MAPX).

pub mod reader;
pub mod structs;

pub use reader::MapReader;
pub use structs::{MapFormat, MapHeader, MaskInfo};
