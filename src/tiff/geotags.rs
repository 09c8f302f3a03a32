//! GeoTIFF tag definitions
//!
//! Names for the GeoTIFF and GDAL private tags and the GeoKeys they carry.
//! The values themselves are passed through untouched; only their names are
//! resolved here, for directory listings.

use std::collections::HashMap;
use lazy_static::lazy_static;
use log::warn;

use crate::tiff::constants::tags;
use crate::tiff::errors::{TiffError, TiffResult};

lazy_static! {
    // Parse the TOML file at startup
    static ref GEOTIFF_DEFINITIONS: GeoTiffDefinitions = {
        let content = include_str!("../../geotiff_tags.toml");
        GeoTiffDefinitions::from_str(content).unwrap_or_else(|e| {
            warn!("Failed to parse GeoTIFF tag definitions: {}", e);
            GeoTiffDefinitions::default()
        })
    };
}

/// Container for GeoTIFF tag and key definitions
#[derive(Debug, Default)]
pub struct GeoTiffDefinitions {
    // Maps tag IDs to tag names
    pub tag_names: HashMap<u16, String>,
    // Maps GeoKey IDs to key names
    pub key_names: HashMap<u16, String>,
}

impl GeoTiffDefinitions {
    /// Parse GeoTIFF definitions from a TOML string
    pub fn from_str(content: &str) -> TiffResult<Self> {
        let toml_value: toml::Value = match content.parse() {
            Ok(value) => value,
            Err(e) => return Err(TiffError::GenericError(format!("Failed to parse TOML: {}", e))),
        };

        let mut defs = GeoTiffDefinitions::default();
        Self::parse_code_table(&toml_value, "tag_ids", &mut defs.tag_names);
        Self::parse_code_table(&toml_value, "key_ids", &mut defs.key_names);

        Ok(defs)
    }

    /// Helper to parse code tables from TOML
    fn parse_code_table(toml_value: &toml::Value, table_name: &str, target: &mut HashMap<u16, String>) {
        if let Some(table) = toml_value.get(table_name).and_then(|v| v.as_table()) {
            for (k, v) in table {
                if let (Ok(id), Some(name)) = (k.parse::<u16>(), v.as_str()) {
                    target.insert(id, name.to_string());
                }
            }
        }
    }
}

/// Check if a tag is a GeoTIFF tag
pub fn is_geotiff_tag(tag: u16) -> bool {
    matches!(tag,
        tags::MODEL_PIXEL_SCALE_TAG |
        tags::MODEL_TIEPOINT_TAG |
        tags::MODEL_TRANSFORMATION_TAG |
        tags::GEO_KEY_DIRECTORY_TAG |
        tags::GEO_DOUBLE_PARAMS_TAG |
        tags::GEO_ASCII_PARAMS_TAG)
}

/// Get a GeoTIFF (or GDAL) tag name
pub fn get_tag_name(tag: u16) -> Option<&'static str> {
    GEOTIFF_DEFINITIONS.tag_names.get(&tag).map(|name| name.as_str())
}

/// Get a GeoKey name
pub fn get_key_name(key: u16) -> Option<&'static str> {
    GEOTIFF_DEFINITIONS.key_names.get(&key).map(|name| name.as_str())
}

/// Lists the key ids and names declared in a GeoKeyDirectoryTag value
///
/// The directory is a SHORT array: a 4-element header whose last element is
/// the key count, followed by 4 elements per key (id, location, count, value).
pub fn list_geo_keys(directory: &[u64]) -> Vec<(u16, &'static str)> {
    if directory.len() < 4 {
        return Vec::new();
    }

    let key_count = directory[3] as usize;
    directory[4..]
        .chunks_exact(4)
        .take(key_count)
        .map(|key| {
            let id = key[0] as u16;
            (id, get_key_name(id).unwrap_or("Unknown"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_definitions_parse() {
        assert_eq!(get_tag_name(tags::MODEL_TIEPOINT_TAG), Some("ModelTiepointTag"));
        assert_eq!(get_tag_name(tags::GDAL_NODATA), Some("GDAL_NODATA"));
        assert_eq!(get_key_name(1024), Some("GTModelTypeGeoKey"));
    }

    #[test]
    fn test_list_geo_keys() {
        let directory = vec![1, 1, 0, 2, 1024, 0, 1, 2, 3072, 0, 1, 32633];
        let keys = list_geo_keys(&directory);
        assert_eq!(keys, vec![(1024, "GTModelTypeGeoKey"), (3072, "ProjectedCSTypeGeoKey")]);
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        assert!(GeoTiffDefinitions::from_str("[tag_ids\n").is_err());
    }
}
