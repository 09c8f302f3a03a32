//! TIFF/GeoTIFF structure analysis command
//!
//! This module implements the command for analyzing and displaying
//! the structure of TIFF and GeoTIFF files.

use std::fmt::Write;

use clap::ArgMatches;
use log::{info, warn};

use crate::commands::command_traits::Command;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::tags;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::geotags;
use crate::tiff::ifd::IFD;
use crate::tiff::TiffReader;

/// Command for analyzing TIFF file structure
pub struct AnalyzeCommand {
    /// Path to the input file
    input_file: String,
    /// Whether to list GeoKeys and layout details
    verbose: bool,
}

impl AnalyzeCommand {
    /// Create a new analyze command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    ///
    /// # Returns
    /// A new AnalyzeCommand instance or an error
    pub fn new(args: &ArgMatches) -> TiffResult<Self> {
        let input_file = args.get_one::<String>("input")
            .ok_or_else(|| TiffError::GenericError("Missing input file".to_string()))?
            .clone();

        Ok(AnalyzeCommand {
            input_file,
            verbose: args.get_flag("verbose"),
        })
    }

    /// Builds the full analysis text for an open file
    pub fn report<R: SeekableReader>(&self, reader: &mut TiffReader<R>) -> TiffResult<String> {
        let tiff = reader.summary()?;
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = write!(out, "{}", tiff);

        for ifd in &tiff.ifds {
            match reader.layout(ifd.number) {
                Ok(layout) => {
                    let _ = writeln!(out, "Layout of IFD #{}:", ifd.number);
                    let _ = write!(out, "{}", layout);
                }
                Err(e) => {
                    warn!("IFD #{} cannot be decoded: {}", ifd.number, e);
                    let _ = writeln!(out, "Layout of IFD #{}: not decodable ({})", ifd.number, e);
                }
            }

            if self.verbose {
                self.describe_geo_keys(ifd, &mut out);
            }
        }
        Ok(out)
    }

    /// Lists the GeoKey directory entries by name
    fn describe_geo_keys(&self, ifd: &IFD, out: &mut String) {
        let geo_tags = ifd.entries().filter(|entry| geotags::is_geotiff_tag(entry.tag)).count();
        if geo_tags == 0 {
            return;
        }
        let _ = writeln!(out, "  GeoTIFF tags: {}", geo_tags);

        let directory = match ifd.get_tag_values(tags::GEO_KEY_DIRECTORY_TAG) {
            Some(values) => values,
            None => return,
        };

        let keys = geotags::list_geo_keys(&directory);
        let _ = writeln!(out, "  GeoKeys ({}):", keys.len());
        for (key, name) in keys {
            let _ = writeln!(out, "    {} ({})", key, name);
        }
    }
}

impl Command for AnalyzeCommand {
    fn execute(&self) -> TiffResult<()> {
        info!("Analyzing TIFF file: {}", self.input_file);
        let mut reader = TiffReader::open_file(&self.input_file)?;
        let report = self.report(&mut reader)?;
        println!("{}", report);
        Ok(())
    }
}
