//! Region extraction command
//!
//! Reads a (possibly subsampled) region of one layer and writes it as a new
//! single-layer TIFF, keeping the source's sample layout, compression and
//! non-structural tags.

use clap::ArgMatches;
use log::info;

use crate::commands::args;
use crate::commands::carry_tags;
use crate::commands::command_traits::Command;
use crate::compression::{Compression, Predictor};
use crate::extractor::control::TransferControl;
use crate::extractor::region::Region;
use crate::tiff::description::{ImageDescription, WriterOptions};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::{TiffReader, TiffWriter};
use crate::utils::progress::ProgressTracker;

/// Command for extracting a region into a new file
pub struct ExtractCommand {
    input_file: String,
    output_file: String,
    /// None extracts the whole layer
    region: Option<Region>,
    step: (u64, u64),
    layer: usize,
}

impl ExtractCommand {
    /// Create a new extract command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    ///
    /// # Returns
    /// A new ExtractCommand instance or an error
    pub fn new(args: &ArgMatches) -> TiffResult<Self> {
        let input_file = args.get_one::<String>("input")
            .ok_or_else(|| TiffError::GenericError("Missing input file".to_string()))?
            .clone();

        let output_file = args.get_one::<String>("output")
            .ok_or_else(|| TiffError::GenericError("Missing output file path for extraction".to_string()))?
            .clone();

        let region = args.get_one::<String>("region")
            .map(|value| args::parse_region(value))
            .transpose()?;

        let step = args.get_one::<String>("step")
            .map(|value| args::parse_step(value))
            .transpose()?
            .unwrap_or((1, 1));

        let layer = args.get_one::<String>("layer")
            .map(|value| value.parse::<usize>()
                .map_err(|_| TiffError::GenericError(format!("Invalid layer: {}", value))))
            .transpose()?
            .unwrap_or(0);

        Ok(ExtractCommand {
            input_file,
            output_file,
            region,
            step,
            layer,
        })
    }
}

impl Command for ExtractCommand {
    fn execute(&self) -> TiffResult<()> {
        let mut reader = TiffReader::open_file(&self.input_file)?;
        let byte_order = reader.header().byte_order;
        let layout = reader.layout(self.layer)?.clone();
        let ifd = reader.directory(self.layer)?.clone();

        let region = self.region
            .unwrap_or_else(|| Region::full(layout.width, layout.height))
            .with_step(self.step.0, self.step.1);
        info!("Extracting {} from layer {} of {}", region, self.layer, self.input_file);

        let tracker = ProgressTracker::new(region.dest_height(), "Reading rows");
        let control = TransferControl::none().with_progress(&tracker);
        let decoded = reader.read_region(self.layer, &region, &control)?;
        tracker.finish();

        let mut description = ImageDescription::from_layout(&layout)
            .with_planar(layout.planar)
            .with_compression(layout.compression);
        description.width = decoded.width;
        description.height = decoded.height;
        if layout.compression == Compression::Lzw {
            description = description.with_predictor(layout.predictor);
        } else {
            description = description.with_predictor(Predictor::None);
        }
        let description = carry_tags(&ifd, description);

        let options = WriterOptions { byte_order, ..WriterOptions::default() };
        let mut writer = TiffWriter::create_file(&self.output_file, options, &description)?;
        writer.write_layer(&description, &decoded.data, &TransferControl::none())?;
        writer.finish()?;

        info!("Wrote {}x{} region to {}", decoded.width, decoded.height, self.output_file);
        Ok(())
    }
}
