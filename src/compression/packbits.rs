//! PackBits run-length codec (compression code 32773)
//!
//! Control byte `n` (as i8):
//! * `0..=127`: copy the next `n + 1` bytes literally
//! * `-127..=-1`: repeat the next byte `1 - n` times
//! * `-128`: no-op
//!
//! Runs never cross a row boundary, so every row is encoded and decoded on
//! its own.

use log::trace;

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{CompressionHandler, UnitGeometry};

/// Longest literal or replicate run
const MAX_RUN: usize = 128;

/// Shortest replicate run the encoder starts on its own
const MIN_REPLICATE: usize = 3;

const NOOP: u8 = 0x80;

/// PackBits handler (compression code 32773)
pub struct PackBitsHandler;

impl CompressionHandler for PackBitsHandler {
    fn decompress(&self, data: &[u8], geometry: UnitGeometry) -> TiffResult<Vec<u8>> {
        decode(data, geometry)
    }

    fn compress(&self, data: &[u8], geometry: UnitGeometry) -> TiffResult<Vec<u8>> {
        if geometry.row_bytes == 0 {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(data.len() + data.len() / MAX_RUN + geometry.rows);
        for row in data.chunks(geometry.row_bytes) {
            encode_row(row, &mut out);
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "PackBits"
    }

    fn code(&self) -> u64 {
        u64::from(compression::PACKBITS)
    }
}

/// Length of the run of bytes equal to `row[start]`, capped at `MAX_RUN`
fn repeat_len(row: &[u8], start: usize) -> usize {
    let value = row[start];
    row[start..]
        .iter()
        .take(MAX_RUN)
        .take_while(|&&b| b == value)
        .count()
}

/// Encodes one row, appending to `out`
///
/// Apart from a row of a single byte, no run shorter than two bytes is ever
/// emitted: a lone byte is merged into a neighbouring run.
pub fn encode_row(row: &[u8], out: &mut Vec<u8>) {
    let n = row.len();
    let mut i = 0;

    while i < n {
        let run = repeat_len(row, i);
        if run >= MIN_REPLICATE {
            let mut len = run;
            if n - (i + len) == 1 {
                len -= 1;
            }
            out.push((1i16 - len as i16) as u8);
            out.push(row[i]);
            i += len;
            continue;
        }

        let mut len = 1;
        while i + len < n && len < MAX_RUN && repeat_len(row, i + len) < MIN_REPLICATE {
            len += 1;
        }
        if len == 1 && i + 1 < n {
            // Borrow the first byte of the replicate run that follows
            len = 2;
        }
        if n - (i + len) == 1 {
            if len < MAX_RUN {
                len += 1;
            } else {
                len -= 1;
            }
        }

        out.push((len - 1) as u8);
        out.extend_from_slice(&row[i..i + len]);
        i += len;
    }
}

/// Decodes exactly `geometry.rows` rows of `geometry.row_bytes` bytes
pub fn decode(data: &[u8], geometry: UnitGeometry) -> TiffResult<Vec<u8>> {
    let mut out = Vec::with_capacity(geometry.len());
    let mut pos = 0;

    for row in 0..geometry.rows {
        let row_end = out.len() + geometry.row_bytes;

        while out.len() < row_end {
            let control = *data.get(pos).ok_or_else(|| {
                TiffError::CorruptData(format!(
                    "PackBits input exhausted in row {} at byte {}",
                    row, pos
                ))
            })?;
            pos += 1;

            if control == NOOP {
                continue;
            }

            if control < NOOP {
                let len = control as usize + 1;
                if out.len() + len > row_end {
                    return Err(TiffError::CorruptData(format!(
                        "PackBits literal run of {} at byte {} crosses the end of row {}",
                        len, pos - 1, row
                    )));
                }
                let literal = data.get(pos..pos + len).ok_or_else(|| {
                    TiffError::CorruptData(format!("PackBits literal run truncated at byte {}", pos))
                })?;
                out.extend_from_slice(literal);
                pos += len;
            } else {
                let len = 1 - (control as i8) as isize;
                let len = len as usize;
                if out.len() + len > row_end {
                    return Err(TiffError::CorruptData(format!(
                        "PackBits replicate run of {} at byte {} crosses the end of row {}",
                        len, pos - 1, row
                    )));
                }
                let value = *data.get(pos).ok_or_else(|| {
                    TiffError::CorruptData(format!("PackBits replicate run truncated at byte {}", pos))
                })?;
                pos += 1;
                out.resize(out.len() + len, value);
            }
        }
    }

    if pos < data.len() {
        trace!("PackBits: {} trailing bytes ignored", data.len() - pos);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Splits an encoded row into (control-decoded length) runs
    fn run_lengths(encoded: &[u8]) -> Vec<usize> {
        let mut runs = Vec::new();
        let mut pos = 0;
        while pos < encoded.len() {
            let control = encoded[pos] as i8;
            if control >= 0 {
                runs.push(control as usize + 1);
                pos += control as usize + 2;
            } else {
                runs.push((1 - control as isize) as usize);
                pos += 2;
            }
        }
        runs
    }

    fn encode(row: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_row(row, &mut out);
        out
    }

    #[test]
    fn test_literal_example() {
        let encoded = encode(&[0x41, 0x42, 0x43]);
        assert_eq!(encoded, vec![2, 0x41, 0x42, 0x43]);
        assert_eq!(decode(&encoded, UnitGeometry::new(3, 1)).unwrap(), vec![0x41, 0x42, 0x43]);
    }

    #[test]
    fn test_replicate_example() {
        let encoded = encode(&[0x41; 4]);
        assert_eq!(encoded, vec![0xFD, 0x41]);
        assert_eq!(decode(&encoded, UnitGeometry::new(4, 1)).unwrap(), vec![0x41; 4]);
    }

    #[test]
    fn test_no_single_byte_runs() {
        let rows: Vec<Vec<u8>> = vec![
            vec![1, 1, 1, 2],
            vec![1, 2, 2, 2],
            vec![5, 5, 5, 9, 5, 5, 5],
            (0..=128).map(|v| v as u8).collect(),
            vec![7; 129],
            vec![7; 257],
            vec![3, 4],
        ];

        for row in rows {
            let encoded = encode(&row);
            let runs = run_lengths(&encoded);
            assert!(runs.iter().all(|&len| (2..=MAX_RUN).contains(&len)), "row {:?} -> runs {:?}", row, runs);
            assert_eq!(runs.iter().sum::<usize>(), row.len());
            assert_eq!(decode(&encoded, UnitGeometry::new(row.len(), 1)).unwrap(), row);
        }
    }

    #[test]
    fn test_identical_rows_stay_separate() {
        let row = vec![9u8; 6];
        let data: Vec<u8> = row.iter().chain(row.iter()).copied().collect();
        let geometry = UnitGeometry::new(6, 2);
        let encoded = PackBitsHandler.compress(&data, geometry).unwrap();
        // One replicate run per row, never a single 12-byte run
        assert_eq!(encoded, vec![0xFB, 9, 0xFB, 9]);
        assert_eq!(PackBitsHandler.decompress(&encoded, geometry).unwrap(), data);
    }

    #[test]
    fn test_noop_control_is_skipped() {
        let decoded = decode(&[0x80, 0x01, 0xAA, 0xBB], UnitGeometry::new(2, 1)).unwrap();
        assert_eq!(decoded, vec![0xAA, 0xBB]);
    }

    #[test]
    fn test_run_crossing_row_is_corrupt() {
        // Replicate of 4 into rows of 2
        let result = decode(&[0xFD, 0x41], UnitGeometry::new(2, 2));
        assert!(matches!(result, Err(TiffError::CorruptData(_))));
    }

    #[test]
    fn test_exhausted_input_is_corrupt() {
        let result = decode(&[0x01, 0x41, 0x42], UnitGeometry::new(2, 2));
        assert!(matches!(result, Err(TiffError::CorruptData(_))));
    }
}
