//! TIFF container module
//!
//! This module provides the structures and sessions for reading and
//! writing TIFF and BigTIFF files: header, directory codec, layout
//! resolution and the reader/writer built on top of them.

pub mod constants;
pub mod errors;
pub mod value;
pub mod ifd;
pub mod header;
pub mod directory;
pub mod layout;
pub mod description;
pub mod reader;
pub mod writer;
pub mod types;
pub mod geotags;
pub(crate) mod validation;
#[cfg(test)]
mod tests;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use description::{BigTiffMode, ImageDescription, WriterOptions};
pub use directory::WrittenDirectory;
pub use errors::{TiffError, TiffResult};
pub use header::{TiffHeader, TiffVariant};
pub use ifd::{IFD, IFDEntry};
pub use layout::{Organization, PixelLayout, PlanarConfig, SampleFormat};
pub use reader::{DecodedRegion, TiffReader};
pub use types::TIFF;
pub use value::{FieldType, TagValue};
pub use writer::TiffWriter;
