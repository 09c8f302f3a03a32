//! Byte-order adapter over a seekable byte source
//!
//! `TiffSource` binds a reader to the byte order and offset width declared in
//! the file header, so the directory codec and transfer engine can issue
//! typed reads without threading the handler through every call.

use std::io::SeekFrom;

use log::trace;

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::validation;

/// A seekable byte source with its byte order resolved
pub struct TiffSource<R: SeekableReader> {
    reader: R,
    handler: Box<dyn ByteOrderHandler>,
    file_size: u64,
}

impl<R: SeekableReader> TiffSource<R> {
    /// Wraps `reader`, remembering its total length for bounds checks
    pub fn new(mut reader: R, byte_order: ByteOrder) -> TiffResult<Self> {
        let file_size = validation::get_file_size(&mut reader)?;
        Ok(TiffSource {
            reader,
            handler: byte_order.create_handler(),
            file_size,
        })
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.handler.byte_order()
    }

    /// The byte-order strategy used for typed reads
    pub fn handler(&self) -> &dyn ByteOrderHandler {
        self.handler.as_ref()
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn seek(&mut self, position: u64) -> TiffResult<()> {
        trace!("Seeking to {}", position);
        self.reader.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    pub fn position(&mut self) -> TiffResult<u64> {
        Ok(self.reader.stream_position()?)
    }

    pub fn read_u16(&mut self) -> TiffResult<u16> {
        Ok(self.handler.read_u16(&mut self.reader)?)
    }

    pub fn read_u32(&mut self) -> TiffResult<u32> {
        Ok(self.handler.read_u32(&mut self.reader)?)
    }

    pub fn read_u64(&mut self) -> TiffResult<u64> {
        Ok(self.handler.read_u64(&mut self.reader)?)
    }

    /// Reads a 4-byte (classic) or 8-byte (BigTIFF) offset or count field
    pub fn read_offset(&mut self, is_big_tiff: bool) -> TiffResult<u64> {
        if is_big_tiff {
            self.read_u64()
        } else {
            self.read_u32().map(u64::from)
        }
    }

    /// Fills `buffer` from the current position
    pub fn read_exact(&mut self, buffer: &mut [u8]) -> TiffResult<()> {
        self.reader.read_exact(buffer)?;
        Ok(())
    }

    /// Reads `length` bytes starting at `position`, checking the file bounds first
    pub fn read_bytes_at(&mut self, position: u64, length: usize) -> TiffResult<Vec<u8>> {
        let end = position.checked_add(length as u64).ok_or_else(|| {
            TiffError::CorruptData(format!("byte range at {} overflows", position))
        })?;
        if end > self.file_size {
            return Err(TiffError::CorruptData(format!(
                "byte range {}..{} exceeds file size {}",
                position, end, self.file_size
            )));
        }
        self.seek(position)?;
        let mut buffer = vec![0u8; length];
        self.reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Gives up the adapter and returns the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}
