//! Parsers for the comma- and x-separated CLI values

use crate::extractor::region::Region;
use crate::tiff::errors::{TiffError, TiffResult};

fn parse_numbers(value: &str, separator: char, expected: usize, what: &str) -> TiffResult<Vec<u64>> {
    let numbers = value
        .split(separator)
        .map(|part| part.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| TiffError::GenericError(format!("Invalid {}: {}", what, value)))?;

    if numbers.len() != expected {
        return Err(TiffError::GenericError(format!(
            "Invalid {}: {} (expected {} values)",
            what, value, expected
        )));
    }
    Ok(numbers)
}

/// Parses `x,y,width,height`
pub fn parse_region(value: &str) -> TiffResult<Region> {
    let n = parse_numbers(value, ',', 4, "region")?;
    Ok(Region::new(n[0], n[1], n[2], n[3]))
}

/// Parses `sx,sy`, or a single value used for both axes
pub fn parse_step(value: &str) -> TiffResult<(u64, u64)> {
    if !value.contains(',') {
        let step = parse_numbers(value, ',', 1, "step")?[0];
        return Ok((step, step));
    }
    let n = parse_numbers(value, ',', 2, "step")?;
    Ok((n[0], n[1]))
}

/// Parses `WIDTHxHEIGHT`
pub fn parse_size(value: &str) -> TiffResult<(u64, u64)> {
    let n = parse_numbers(&value.to_lowercase(), 'x', 2, "size")?;
    Ok((n[0], n[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_region("1, 2,30,40").unwrap(), Region::new(1, 2, 30, 40));
        assert_eq!(parse_step("2").unwrap(), (2, 2));
        assert_eq!(parse_step("2,3").unwrap(), (2, 3));
        assert_eq!(parse_size("256X128").unwrap(), (256, 128));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_region("1,2,3").is_err());
        assert!(parse_step("a,b").is_err());
        assert!(parse_size("256").is_err());
    }
}
