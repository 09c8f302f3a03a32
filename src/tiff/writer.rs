//! TIFF file writer implementation
//!
//! A `TiffWriter` is one write session over one seekable sink. Each layer is
//! written as its directory first, then its strips or tiles; the offset and
//! byte-count tables are back-filled once the data has been streamed, and
//! the layer is linked into the directory chain last. A layer interrupted
//! by an error or abort is therefore never reachable from the chain.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use log::{debug, info};

use crate::compression::{predictor, CompressionFactory, Predictor, PredictorLayout};
use crate::extractor::control::TransferControl;
use crate::extractor::transfer::gather_unit;
use crate::io::byte_order::{swap_sample_bytes, ByteOrder, ByteOrderHandler};
use crate::io::seekable::SeekableWriter;
use crate::tiff::constants::tags;
use crate::tiff::description::{ImageDescription, WriterOptions};
use crate::tiff::directory::{self, WrittenDirectory};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::header::{TiffHeader, TiffVariant};
use crate::tiff::ifd::IFD;
use crate::tiff::value::TagValue;

/// Writer for TIFF and BigTIFF files
pub struct TiffWriter<W: SeekableWriter> {
    sink: W,
    byte_order: ByteOrder,
    handler: Box<dyn ByteOrderHandler>,
    variant: TiffVariant,
    layers: usize,
    /// Position of the pointer the next directory is linked from
    link_position: u64,
}

impl TiffWriter<BufWriter<File>> {
    /// Creates the file at `path`, choosing the variant for `description`
    pub fn create_file<P: AsRef<Path>>(
        path: P,
        options: WriterOptions,
        description: &ImageDescription,
    ) -> TiffResult<Self> {
        info!("Writing TIFF to {}", path.as_ref().display());
        let file = File::create(path)?;
        Self::for_image(BufWriter::with_capacity(1024 * 1024, file), options, description)
    }
}

impl<W: SeekableWriter> TiffWriter<W> {
    /// Starts a session by writing the header for `variant`
    pub fn new(mut sink: W, options: WriterOptions, variant: TiffVariant) -> TiffResult<Self> {
        TiffHeader::write(options.byte_order, variant, &mut sink)?;
        debug!("Started {} {} output", variant.name(), options.byte_order.name());

        Ok(TiffWriter {
            sink,
            byte_order: options.byte_order,
            handler: options.byte_order.create_handler(),
            variant,
            layers: 0,
            link_position: variant.first_ifd_pointer_position(),
        })
    }

    /// Starts a session whose variant follows `options.bigtiff` for this image
    pub fn for_image(sink: W, options: WriterOptions, description: &ImageDescription) -> TiffResult<Self> {
        let variant = description.variant(&options);
        Self::new(sink, options, variant)
    }

    pub fn variant(&self) -> TiffVariant {
        self.variant
    }

    pub fn layer_count(&self) -> usize {
        self.layers
    }

    /// Writes one layer from native-order, pixel-interleaved `samples`
    ///
    /// The abort flag is polled before every strip/tile; progress is
    /// reported in units written.
    pub fn write_layer(
        &mut self,
        description: &ImageDescription,
        samples: &[u8],
        control: &TransferControl,
    ) -> TiffResult<WrittenDirectory> {
        let mut layout = description.layout()?;
        if samples.len() as u64 != layout.raw_size() {
            return Err(TiffError::GenericError(format!(
                "sample buffer holds {} bytes, a {}x{} image needs {}",
                samples.len(),
                layout.width,
                layout.height,
                layout.raw_size()
            )));
        }

        let is_big = self.variant.is_big_tiff();
        let mut ifd = IFD::new(self.layers, 0);
        for (&tag, value) in &description.extra_tags {
            ifd.set(tag, value.clone());
        }
        if description.subfile_type != 0 {
            ifd.set(tags::NEW_SUBFILE_TYPE, TagValue::Long(vec![description.subfile_type as u32]));
        }
        layout.apply_to(&mut ifd, is_big);

        let written = directory::write_directory(&mut self.sink, self.handler.as_ref(), self.variant, &ifd)?;

        let codec = CompressionFactory::create_handler(layout.compression);
        let unit_count = layout.unit_count() as usize;
        let swap = !self.byte_order.is_native();
        let predictor_layout = PredictorLayout {
            samples: usize::from(layout.samples_per_unit_pixel()),
            bytes_per_sample: layout.bytes_per_sample(),
            byte_order: self.byte_order,
        };

        for index in 0..unit_count {
            control.check()?;

            let geometry = layout.unit_geometry(index);
            let mut unit = gather_unit(&layout, samples, index)?;
            if swap {
                swap_sample_bytes(&mut unit, layout.bytes_per_sample());
            }
            if layout.predictor == Predictor::Horizontal {
                predictor::encode(&mut unit, geometry, predictor_layout)?;
            }
            let mut encoded = codec.compress(&unit, geometry)?;
            layout.fill_order.apply(&mut encoded);

            let offset = self.sink.stream_position()?;
            let end = offset + encoded.len() as u64;
            if !is_big && end > u64::from(u32::MAX) {
                return Err(TiffError::GenericError(format!(
                    "unit {} ends at {}, beyond classic TIFF offsets; use BigTIFF",
                    index, end
                )));
            }
            self.sink.write_all(&encoded)?;
            layout.offsets[index] = offset;
            layout.byte_counts[index] = encoded.len() as u64;

            debug!("Unit {}: {} -> {} bytes at {}", index, unit.len(), encoded.len(), offset);
            control.report(index as u64 + 1, unit_count as u64);
        }

        let (offsets_tag, counts_tag) = if layout.is_tiled() {
            (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };
        self.patch_table(&written, offsets_tag, layout.offsets.clone())?;
        self.patch_table(&written, counts_tag, layout.byte_counts.clone())?;

        directory::patch_pointer(&mut self.sink, self.handler.as_ref(), self.variant,
                                 self.link_position, written.position)?;
        self.link_position = written.next_pointer_position;
        self.layers += 1;

        info!("Wrote layer {}: {}x{}, {} units, {}",
              ifd.number, layout.width, layout.height, unit_count, layout.compression);
        Ok(written)
    }

    fn patch_table(&mut self, written: &WrittenDirectory, tag: u16, values: Vec<u64>) -> TiffResult<()> {
        let position = written.value_positions.get(&tag).copied().ok_or_else(|| {
            TiffError::GenericError(format!("tag {} was not written", tag))
        })?;
        let value = TagValue::offsets(values, self.variant.is_big_tiff());
        directory::patch_value(&mut self.sink, self.handler.as_ref(), position, &value)
    }

    /// Flushes the sink and ends the session
    pub fn finish(mut self) -> TiffResult<W> {
        self.sink.flush()?;
        debug!("Finished output with {} layers", self.layers);
        Ok(self.sink)
    }
}
