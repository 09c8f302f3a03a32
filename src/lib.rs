pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod extractor;
pub mod commands;

pub use tiff::{ImageDescription, TiffError, TiffReader, TiffResult, TiffWriter, WriterOptions};
pub use extractor::{AbortFlag, Region, TransferControl};
pub use compression::{Compression, Predictor};
