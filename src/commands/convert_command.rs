//! Compression and layout conversion command
//!
//! This module implements the command for re-encoding every layer of a
//! TIFF file with a different compression, predictor, strip/tile layout,
//! byte order or container variant.

use std::fs::File;
use std::io::BufWriter;

use clap::ArgMatches;
use log::info;

use crate::commands::args;
use crate::commands::carry_tags;
use crate::commands::command_traits::Command;
use crate::compression::{Compression, Predictor};
use crate::extractor::control::TransferControl;
use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::tags;
use crate::tiff::description::{BigTiffMode, ImageDescription, WriterOptions};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::layout::{Organization, PixelLayout};
use crate::tiff::{TiffReader, TiffWriter};
use crate::utils::progress::ProgressTracker;

/// Command for converting TIFF compression and layout
pub struct ConvertCommand {
    input_file: String,
    output_file: String,
    compression: Compression,
    predictor: Predictor,
    /// None keeps each layer's own strip/tile layout
    organization: Option<Organization>,
    options: WriterOptions,
}

impl ConvertCommand {
    /// Create a new convert command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    ///
    /// # Returns
    /// A new ConvertCommand instance or an error
    pub fn new(args: &ArgMatches) -> TiffResult<Self> {
        let input_file = args.get_one::<String>("input")
            .ok_or_else(|| TiffError::GenericError("Missing input file".to_string()))?
            .clone();

        let output_file = args.get_one::<String>("output")
            .ok_or_else(|| TiffError::GenericError("Missing output file path for conversion".to_string()))?
            .clone();

        let compression = match args.get_one::<String>("compression") {
            Some(name) => Compression::from_name(name)?,
            None => Compression::None,
        };

        let predictor = if args.get_flag("predictor") {
            Predictor::Horizontal
        } else {
            Predictor::None
        };

        let organization = if let Some(size) = args.get_one::<String>("tile") {
            let (tile_width, tile_height) = args::parse_size(size)?;
            Some(Organization::Tiles { tile_width, tile_height })
        } else if let Some(rows) = args.get_one::<String>("rows-per-strip") {
            let rows_per_strip = rows.parse::<u64>()
                .map_err(|_| TiffError::GenericError(format!("Invalid rows per strip: {}", rows)))?;
            Some(Organization::Strips { rows_per_strip })
        } else {
            None
        };

        let options = WriterOptions {
            byte_order: if args.get_flag("big-endian") { ByteOrder::BigEndian } else { ByteOrder::LittleEndian },
            bigtiff: if args.get_flag("bigtiff") { BigTiffMode::Always } else { BigTiffMode::Auto },
        };

        info!("Using compression: {}", compression);
        Ok(ConvertCommand {
            input_file,
            output_file,
            compression,
            predictor,
            organization,
            options,
        })
    }

    fn describe(&self, source: &PixelLayout) -> ImageDescription {
        let mut description = ImageDescription::from_layout(source)
            .with_planar(source.planar)
            .with_compression(self.compression)
            .with_predictor(self.predictor);
        description.organization = Some(self.organization.unwrap_or(source.organization));
        description
    }
}

impl Command for ConvertCommand {
    fn execute(&self) -> TiffResult<()> {
        info!("Converting file {} to {} with {} compression",
              self.input_file, self.output_file, self.compression);

        let mut reader = TiffReader::open_file(&self.input_file)?;
        let layer_count = reader.layer_count()?;

        let mut total_raw = 0u64;
        for layer in 0..layer_count {
            total_raw += reader.layout(layer)?.raw_size();
        }
        let variant = self.options.bigtiff.variant_for(total_raw);

        let file = File::create(&self.output_file)?;
        let sink = BufWriter::with_capacity(1024 * 1024, file);
        let mut writer = TiffWriter::new(sink, self.options, variant)?;

        for layer in 0..layer_count {
            let layout = reader.layout(layer)?.clone();
            let ifd = reader.directory(layer)?.clone();
            let decoded = reader.read_layer(layer, &TransferControl::none())?;

            let mut description = carry_tags(&ifd, self.describe(&layout));
            if let Some(flags) = ifd.get_tag_value(tags::NEW_SUBFILE_TYPE) {
                description = description.with_subfile_type(flags);
            }

            let tracker = ProgressTracker::new(layout.unit_count(), &format!("Layer {}", layer));
            let control = TransferControl::none().with_progress(&tracker);
            writer.write_layer(&description, &decoded.data, &control)?;
            tracker.finish();
        }

        writer.finish()?;
        info!("Compression conversion successful ({} layers, {})", layer_count, variant.name());
        Ok(())
    }
}
