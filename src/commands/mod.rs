//! CLI command implementations
//!
//! This module contains implementations of various commands
//! supported by the CLI application using the Command pattern.

pub mod command_traits;
pub mod args;
pub mod analyze_command;
pub mod extract_command;
pub mod convert_command;

pub use command_traits::{Command, CommandFactory};
pub use analyze_command::AnalyzeCommand;
pub use extract_command::ExtractCommand;
pub use convert_command::ConvertCommand;

use clap::{Arg, ArgAction, ArgMatches};

use crate::tiff::constants::tags;
use crate::tiff::description::ImageDescription;
use crate::tiff::errors::TiffResult;
use crate::tiff::ifd::IFD;
use crate::tiff::value::FieldType;

/// Builds the `tiffkit` argument parser
pub fn cli() -> clap::Command {
    clap::Command::new("tiffkit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Analyze, extract from and re-encode TIFF/BigTIFF files")
        .arg(
            Arg::new("input")
                .help("Input TIFF file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Also write log records to this file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("extract")
                .short('e')
                .long("extract")
                .help("Extract a region into a new file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("convert")
                .short('c')
                .long("convert")
                .help("Re-encode all layers into a new file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output TIFF file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("region")
                .long("region")
                .help("Region to extract (x,y,width,height)")
                .value_name("X,Y,W,H"),
        )
        .arg(
            Arg::new("step")
                .long("step")
                .help("Subsampling steps for extraction (sx,sy)")
                .value_name("SX,SY"),
        )
        .arg(
            Arg::new("layer")
                .long("layer")
                .help("Layer (IFD index) to extract")
                .value_name("N"),
        )
        .arg(
            Arg::new("compression")
                .long("compression")
                .help("Target compression (none, lzw, packbits)")
                .value_name("NAME"),
        )
        .arg(
            Arg::new("predictor")
                .long("predictor")
                .help("Apply horizontal differencing (LZW only)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tile")
                .long("tile")
                .help("Write tiles of this size")
                .value_name("WxH")
                .conflicts_with("rows-per-strip"),
        )
        .arg(
            Arg::new("rows-per-strip")
                .long("rows-per-strip")
                .help("Write strips of this many rows")
                .value_name("N"),
        )
        .arg(
            Arg::new("bigtiff")
                .long("bigtiff")
                .help("Always write BigTIFF")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("big-endian")
                .long("big-endian")
                .help("Write big-endian (MM) output")
                .action(ArgAction::SetTrue),
        )
}

/// Copies the non-structural tags of `ifd` onto `description`
///
/// Tags holding file offsets are dropped since they would dangle in the new file.
pub fn carry_tags(ifd: &IFD, mut description: ImageDescription) -> ImageDescription {
    for entry in ifd.entries() {
        let pointer = tags::FILE_POINTERS.contains(&entry.tag)
            || matches!(entry.field_type(), FieldType::Ifd | FieldType::Ifd8);
        if !pointer && !tags::STRUCTURAL.contains(&entry.tag) {
            description.extra_tags.insert(entry.tag, entry.value.clone());
        }
    }
    description
}

/// Factory for creating command instances based on CLI arguments
///
/// This factory examines the command-line arguments and creates
/// the appropriate command instance for execution.
#[derive(Default)]
pub struct TiffkitCommandFactory;

impl TiffkitCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        TiffkitCommandFactory
    }
}

impl CommandFactory for TiffkitCommandFactory {
    fn create_command(&self, args: &ArgMatches) -> TiffResult<Box<dyn Command>> {
        if args.get_flag("extract") {
            Ok(Box::new(ExtractCommand::new(args)?))
        } else if args.get_flag("convert") {
            Ok(Box::new(ConvertCommand::new(args)?))
        } else {
            // Default to analyze command
            Ok(Box::new(AnalyzeCommand::new(args)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::value::TagValue;

    #[test]
    fn test_cli_parses_convert_flags() {
        let matches = cli()
            .try_get_matches_from(["tiffkit", "in.tif", "-c", "-o", "out.tif", "--compression", "lzw", "--tile", "16x16"])
            .unwrap();
        assert!(matches.get_flag("convert"));
        assert_eq!(matches.get_one::<String>("compression").map(String::as_str), Some("lzw"));
        assert!(ConvertCommand::new(&matches).is_ok());
    }

    #[test]
    fn test_tile_and_strips_conflict() {
        let result = cli().try_get_matches_from(["tiffkit", "in.tif", "--tile", "16x16", "--rows-per-strip", "4"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_carry_tags_skips_structure_and_pointers() {
        let mut ifd = IFD::new(0, 8);
        ifd.set(tags::IMAGE_WIDTH, TagValue::Short(vec![4]));
        ifd.set(tags::SOFTWARE, TagValue::Ascii("x".to_string()));
        ifd.set(tags::EXIF_IFD, TagValue::Long(vec![1234]));
        ifd.set(tags::GEO_KEY_DIRECTORY_TAG, TagValue::Short(vec![1, 1, 0, 0]));

        let description = carry_tags(&ifd, ImageDescription::new(4, 4, 1, 8));
        let carried: Vec<u16> = description.extra_tags.keys().copied().collect();
        assert_eq!(carried, vec![tags::SOFTWARE, tags::GEO_KEY_DIRECTORY_TAG]);
    }
}
