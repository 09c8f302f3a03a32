//! TIFF file reader implementation
//!
//! A `TiffReader` is one read session over one open byte source. Directories
//! are parsed lazily, the first time a layer is visited, and cached for the
//! lifetime of the session together with their resolved pixel layouts.
//! A session is single-threaded; use one reader per thread.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::{debug, info, trace};

use crate::extractor::control::TransferControl;
use crate::extractor::mapper;
use crate::extractor::region::Region;
use crate::extractor::transfer::TransferEngine;
use crate::io::byte_order::swap_sample_bytes;
use crate::io::seekable::SeekableReader;
use crate::io::source::TiffSource;
use crate::tiff::directory;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::header::TiffHeader;
use crate::tiff::ifd::IFD;
use crate::tiff::layout::{self, PixelLayout, SampleFormat};
use crate::tiff::types::TIFF;

/// Decoded pixels of a region, pixel-interleaved, in native byte order
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRegion {
    pub width: u64,
    pub height: u64,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    pub sample_format: SampleFormat,
    pub data: Vec<u8>,
}

/// Reader for TIFF and BigTIFF files
pub struct TiffReader<R: SeekableReader> {
    source: TiffSource<R>,
    header: TiffHeader,
    /// Directories parsed so far, in chain order
    directories: Vec<IFD>,
    /// Directory offsets already visited (loop detection)
    visited: HashSet<u64>,
    /// Offset of the next unparsed directory, 0 once the chain has ended
    next_offset: u64,
    current_layer: Option<usize>,
    layouts: HashMap<usize, PixelLayout>,
}

impl TiffReader<BufReader<File>> {
    /// Opens the file at `path` with a 1MB read buffer
    pub fn open_file<P: AsRef<Path>>(path: P) -> TiffResult<Self> {
        info!("Loading TIFF file: {}", path.as_ref().display());
        let file = File::open(path)?;
        Self::open(BufReader::with_capacity(1024 * 1024, file))
    }
}

impl<R: SeekableReader> TiffReader<R> {
    /// Starts a session by parsing the header; no directory is read yet
    pub fn open(mut reader: R) -> TiffResult<Self> {
        let header = TiffHeader::read(&mut reader)?;
        let source = TiffSource::new(reader, header.byte_order)?;

        Ok(TiffReader {
            source,
            header,
            directories: Vec::new(),
            visited: HashSet::new(),
            next_offset: header.first_ifd_offset,
            current_layer: None,
            layouts: HashMap::new(),
        })
    }

    pub fn header(&self) -> &TiffHeader {
        &self.header
    }

    pub fn is_big_tiff(&self) -> bool {
        self.header.variant.is_big_tiff()
    }

    /// Follows the directory chain until layer `index` is parsed
    fn load_through(&mut self, index: usize) -> TiffResult<()> {
        while self.directories.len() <= index {
            if self.next_offset == 0 {
                return Err(TiffError::IndexOutOfRange(format!(
                    "layer {} requested, file has {}",
                    index,
                    self.directories.len()
                )));
            }
            if !self.visited.insert(self.next_offset) {
                return Err(TiffError::CorruptData(format!(
                    "directory chain loops back to offset {}",
                    self.next_offset
                )));
            }

            let number = self.directories.len();
            let ifd = directory::read_directory(&mut self.source, self.header.variant, self.next_offset, number)?;
            self.next_offset = ifd.next_ifd_offset;
            self.directories.push(ifd);
        }
        Ok(())
    }

    /// Makes `index` the current layer; selecting the current layer again is a no-op
    pub fn select_layer(&mut self, index: usize) -> TiffResult<()> {
        if self.current_layer == Some(index) {
            trace!("Layer {} already selected", index);
            return Ok(());
        }
        self.load_through(index)?;
        debug!("Selected layer {}", index);
        self.current_layer = Some(index);
        Ok(())
    }

    pub fn current_layer(&self) -> Option<usize> {
        self.current_layer
    }

    /// Number of layers, scanning the rest of the chain if necessary
    pub fn layer_count(&mut self) -> TiffResult<usize> {
        while self.next_offset != 0 {
            let next = self.directories.len();
            self.load_through(next)?;
        }
        Ok(self.directories.len())
    }

    /// The directory of layer `index`
    pub fn directory(&mut self, index: usize) -> TiffResult<&IFD> {
        self.load_through(index)?;
        self.directories
            .get(index)
            .ok_or_else(|| TiffError::IndexOutOfRange(format!("layer {}", index)))
    }

    /// The resolved pixel layout of layer `index`
    pub fn layout(&mut self, index: usize) -> TiffResult<&PixelLayout> {
        if !self.layouts.contains_key(&index) {
            let ifd = self.directory(index)?;
            let resolved = layout::resolve(ifd)?;
            info!("Layer {}: {}x{}, {} x {}-bit, {}",
                  index, resolved.width, resolved.height,
                  resolved.samples_per_pixel, resolved.bits_per_sample, resolved.compression);
            self.layouts.insert(index, resolved);
        }
        self.layouts
            .get(&index)
            .ok_or_else(|| TiffError::IndexOutOfRange(format!("layer {}", index)))
    }

    /// Decodes `region` of layer `index`, honoring its subsampling steps
    ///
    /// The abort flag is polled before every transfer unit; progress is
    /// reported in destination rows.
    pub fn read_region(
        &mut self,
        index: usize,
        region: &Region,
        control: &TransferControl,
    ) -> TiffResult<DecodedRegion> {
        self.select_layer(index)?;
        self.layout(index)?;
        let layout = self
            .layouts
            .get(&index)
            .ok_or_else(|| TiffError::IndexOutOfRange(format!("layer {}", index)))?;

        let plan = mapper::plan(layout, *region)?;
        let dest_width = plan.dest_width();
        let dest_height = plan.dest_height();
        let samples_per_pixel = layout.samples_per_pixel;
        let bytes_per_sample = layout.bytes_per_sample();

        let size = dest_width
            .checked_mul(dest_height)
            .and_then(|pixels| pixels.checked_mul(u64::from(samples_per_pixel) * bytes_per_sample as u64))
            .and_then(|bytes| usize::try_from(bytes).ok())
            .ok_or_else(|| TiffError::IndexOutOfRange(format!("region {} too large to buffer", region)))?;

        debug!("Reading region {} of layer {} into {}x{} ({} bytes)",
               region, index, dest_width, dest_height, size);

        let mut data = vec![0u8; size];
        let mut engine = TransferEngine::new(&mut self.source, layout);
        let mut row = 0;
        for unit in plan {
            control.check()?;
            if unit.dest_y != row {
                row = unit.dest_y;
                control.report(row, dest_height);
            }

            let at = unit.dest_offset(dest_width, samples_per_pixel, bytes_per_sample);
            let dest = data.get_mut(at..at + unit.len).ok_or_else(|| {
                TiffError::GenericError(format!("transfer at {} overruns {}-byte buffer", at, size))
            })?;
            engine.copy(&unit, dest)?;
        }
        control.report(dest_height, dest_height);

        Ok(DecodedRegion {
            width: dest_width,
            height: dest_height,
            samples_per_pixel,
            bits_per_sample: layout.bits_per_sample,
            sample_format: layout.sample_format,
            data,
        })
    }

    /// Decodes the whole of layer `index`
    pub fn read_layer(&mut self, index: usize, control: &TransferControl) -> TiffResult<DecodedRegion> {
        let (width, height) = {
            let layout = self.layout(index)?;
            (layout.width, layout.height)
        };
        self.read_region(index, &Region::full(width, height), control)
    }

    /// Decodes one strip or tile of layer `index`, samples in native byte order
    ///
    /// Works for any bit depth, including sub-byte samples that region reads reject.
    pub fn read_unit(&mut self, index: usize, unit: usize) -> TiffResult<Vec<u8>> {
        self.layout(index)?;
        let layout = self
            .layouts
            .get(&index)
            .ok_or_else(|| TiffError::IndexOutOfRange(format!("layer {}", index)))?;

        let mut data = {
            let mut engine = TransferEngine::new(&mut self.source, layout);
            engine.decode_unit(unit)?
        };
        if !self.source.byte_order().is_native() && layout.is_byte_aligned() {
            swap_sample_bytes(&mut data, layout.bytes_per_sample());
        }
        Ok(data)
    }

    /// All directories of the file
    pub fn summary(&mut self) -> TiffResult<TIFF> {
        self.layer_count()?;
        let mut tiff = TIFF::new(self.header.variant, self.header.byte_order);
        tiff.ifds = self.directories.clone();
        info!("Read {} IFDs from TIFF file", tiff.ifds.len());
        Ok(tiff)
    }

    /// Ends the session and returns the underlying reader
    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }
}
