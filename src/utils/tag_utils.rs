//! TIFF tag utilities
//!
//! Human-readable names for tags, field types and common code values.

use crate::tiff::constants::{compression, field_types, photometric, planar_config, tags};
use crate::tiff::geotags;
use crate::tiff::value::TagValue;

/// Number of array elements shown before an ellipsis
const PREVIEW_LEN: usize = 8;

/// Get the name of a TIFF tag
///
/// Returns a human-readable name for a tag based on its numeric ID.
/// GeoTIFF and GDAL tags are looked up in the GeoTIFF definitions table.
/// If the tag is not recognized, returns "Unknown".
pub fn get_tag_name(tag: u16) -> &'static str {
    match tag {
        // Basic image structure tags
        tags::NEW_SUBFILE_TYPE => "NewSubfileType",
        tags::IMAGE_WIDTH => "ImageWidth",
        tags::IMAGE_LENGTH => "ImageLength",
        tags::BITS_PER_SAMPLE => "BitsPerSample",
        tags::COMPRESSION => "Compression",
        tags::PHOTOMETRIC_INTERPRETATION => "PhotometricInterpretation",
        tags::FILL_ORDER => "FillOrder",
        tags::STRIP_OFFSETS => "StripOffsets",
        tags::SAMPLES_PER_PIXEL => "SamplesPerPixel",
        tags::ROWS_PER_STRIP => "RowsPerStrip",
        tags::STRIP_BYTE_COUNTS => "StripByteCounts",
        tags::PLANAR_CONFIGURATION => "PlanarConfiguration",
        tags::PREDICTOR => "Predictor",
        tags::COLOR_MAP => "ColorMap",
        tags::SAMPLE_FORMAT => "SampleFormat",

        // Other common tags
        tags::X_RESOLUTION => "XResolution",
        tags::Y_RESOLUTION => "YResolution",
        tags::RESOLUTION_UNIT => "ResolutionUnit",
        tags::SOFTWARE => "Software",
        tags::DATE_TIME => "DateTime",
        tags::COPYRIGHT => "Copyright",

        // Tiling tags
        tags::TILE_WIDTH => "TileWidth",
        tags::TILE_LENGTH => "TileLength",
        tags::TILE_OFFSETS => "TileOffsets",
        tags::TILE_BYTE_COUNTS => "TileByteCounts",

        _ => geotags::get_tag_name(tag).unwrap_or("Unknown"),
    }
}

/// Get the name of a TIFF field type
pub fn get_field_type_name(field_type: u16) -> &'static str {
    match field_type {
        field_types::BYTE => "BYTE",
        field_types::ASCII => "ASCII",
        field_types::SHORT => "SHORT",
        field_types::LONG => "LONG",
        field_types::RATIONAL => "RATIONAL",
        field_types::SBYTE => "SBYTE",
        field_types::UNDEFINED => "UNDEFINED",
        field_types::SSHORT => "SSHORT",
        field_types::SLONG => "SLONG",
        field_types::SRATIONAL => "SRATIONAL",
        field_types::FLOAT => "FLOAT",
        field_types::DOUBLE => "DOUBLE",
        field_types::IFD => "IFD",
        field_types::LONG8 => "LONG8",
        field_types::SLONG8 => "SLONG8",
        field_types::IFD8 => "IFD8",
        _ => "Unknown",
    }
}

/// Get the name of a compression method
pub fn get_compression_name(compression_code: u64) -> &'static str {
    match compression_code as u16 {
        compression::NONE => "None",
        compression::CCITT_RLE => "CCITT RLE",
        compression::CCITT_FAX3 => "CCITT Group 3 Fax",
        compression::CCITT_FAX4 => "CCITT Group 4 Fax",
        compression::LZW => "LZW",
        compression::JPEG_OLD => "Old JPEG",
        compression::JPEG => "JPEG",
        compression::DEFLATE => "Adobe Deflate",
        compression::ZSTD => "Zstandard",
        compression::PACKBITS => "PackBits",
        _ => "Unknown",
    }
}

/// Get the name of a photometric interpretation method
pub fn get_photometric_name(photometric_code: u64) -> &'static str {
    match photometric_code as u16 {
        photometric::WHITE_IS_ZERO => "WhiteIsZero",
        photometric::BLACK_IS_ZERO => "BlackIsZero",
        photometric::RGB => "RGB",
        photometric::PALETTE => "Palette",
        photometric::TRANSPARENCY_MASK => "TransparencyMask",
        photometric::CMYK => "CMYK",
        photometric::YCBCR => "YCbCr",
        photometric::CIELAB => "CIELAB",
        _ => "Unknown",
    }
}

/// Get the name of a planar configuration
pub fn get_planar_config_name(code: u64) -> &'static str {
    match code as u16 {
        planar_config::CHUNKY => "Chunky",
        planar_config::PLANAR => "Planar",
        _ => "Unknown",
    }
}

/// Formats a tag value for display, decorating well-known code tags
pub fn format_value(tag: u16, value: &TagValue) -> String {
    if let Some(text) = value.as_ascii() {
        return format!("\"{}\"", text);
    }

    let first = value.first_u64().unwrap_or(0);
    match tag {
        tags::COMPRESSION => return format!("{} ({})", first, get_compression_name(first)),
        tags::PHOTOMETRIC_INTERPRETATION => return format!("{} ({})", first, get_photometric_name(first)),
        tags::PLANAR_CONFIGURATION => return format!("{} ({})", first, get_planar_config_name(first)),
        _ => {}
    }

    let rendered: Vec<String> = match value {
        TagValue::Rational(_) | TagValue::SRational(_) | TagValue::Float(_) | TagValue::Double(_) => value
            .as_f64_vec()
            .iter()
            .take(PREVIEW_LEN)
            .map(|v| v.to_string())
            .collect(),
        _ => value
            .as_u64_vec()
            .iter()
            .take(PREVIEW_LEN)
            .map(|v| v.to_string())
            .collect(),
    };

    let mut text = rendered.join(", ");
    if value.count() as usize > PREVIEW_LEN {
        text.push_str(", ...");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tag_names() {
        assert_eq!(get_tag_name(tags::ROWS_PER_STRIP), "RowsPerStrip");
        assert_eq!(get_tag_name(tags::GEO_KEY_DIRECTORY_TAG), "GeoKeyDirectoryTag");
        assert_eq!(get_tag_name(65000), "Unknown");
    }

    #[test]
    fn test_format_value_truncates_long_arrays() {
        let value = TagValue::Long((0..20).collect());
        let text = format_value(tags::STRIP_OFFSETS, &value);
        assert!(text.starts_with("0, 1, 2"));
        assert!(text.ends_with("..."));
    }

    #[test]
    fn test_format_compression() {
        let text = format_value(tags::COMPRESSION, &TagValue::Short(vec![32773]));
        assert_eq!(text, "32773 (PackBits)");
    }
}
