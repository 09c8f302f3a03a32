//! LZW codec (compression code 5)
//!
//! Codes are packed most-significant-bit first and start at 9 bits. Codes
//! 0-255 are single bytes, 256 clears the dictionary, 257 ends the stream and
//! new strings are numbered from 258. The code width follows the TIFF
//! "early change" convention: the decoder widens one code before the table
//! crosses a power of two, so the encoder widens as soon as it assigns code
//! `2^n - 1`'s successor.

use std::collections::HashMap;

use log::{trace, warn};

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{CompressionHandler, UnitGeometry};

pub const CLEAR_CODE: u16 = 256;
pub const EOI_CODE: u16 = 257;
pub const FIRST_CODE: u16 = 258;

const MIN_BITS: u32 = 9;
const MAX_BITS: u32 = 12;

/// Largest code the 12-bit width can carry
const MAX_CODE: u16 = (1 << MAX_BITS) - 1;

/// LZW handler (compression code 5)
pub struct LzwHandler;

impl CompressionHandler for LzwHandler {
    fn decompress(&self, data: &[u8], geometry: UnitGeometry) -> TiffResult<Vec<u8>> {
        let expected = geometry.len();
        let mut out = decode(data, expected)?;
        if out.len() < expected {
            warn!("LZW unit decoded to {} bytes, expected {}; padding with zeros", out.len(), expected);
            out.resize(expected, 0);
        }
        Ok(out)
    }

    fn compress(&self, data: &[u8], _geometry: UnitGeometry) -> TiffResult<Vec<u8>> {
        Ok(encode(data))
    }

    fn name(&self) -> &'static str {
        "LZW"
    }

    fn code(&self) -> u64 {
        u64::from(compression::LZW)
    }
}

/// Packs variable-width codes MSB-first
struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    bits: u32,
}

impl BitWriter {
    fn new(capacity: usize) -> Self {
        BitWriter { out: Vec::with_capacity(capacity), acc: 0, bits: 0 }
    }

    fn write(&mut self, code: u16, width: u32) {
        self.acc = (self.acc << width) | u32::from(code);
        self.bits += width;
        while self.bits >= 8 {
            self.bits -= 8;
            self.out.push((self.acc >> self.bits) as u8);
        }
        self.acc &= (1 << self.bits) - 1;
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.out.push((self.acc << (8 - self.bits)) as u8);
        }
        self.out
    }
}

/// Reads variable-width codes MSB-first
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    acc: u32,
    bits: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        BitReader { data, pos: 0, acc: 0, bits: 0 }
    }

    /// Next code, or None once fewer than `width` bits remain
    fn read(&mut self, width: u32) -> Option<u16> {
        while self.bits < width {
            let byte = *self.data.get(self.pos)?;
            self.pos += 1;
            self.acc = (self.acc << 8) | u32::from(byte);
            self.bits += 8;
        }
        self.bits -= width;
        let code = (self.acc >> self.bits) as u16;
        self.acc &= (1 << self.bits) - 1;
        Some(code)
    }
}

/// Encoder dictionary: (prefix code, next byte) -> code
struct EncoderTable {
    codes: HashMap<(u16, u8), u16>,
    next_code: u16,
    width: u32,
}

impl EncoderTable {
    fn new() -> Self {
        EncoderTable {
            codes: HashMap::with_capacity(usize::from(MAX_CODE)),
            next_code: FIRST_CODE,
            width: MIN_BITS,
        }
    }

    fn reset(&mut self) {
        self.codes.clear();
        self.next_code = FIRST_CODE;
        self.width = MIN_BITS;
    }

    /// Accounts for one more assigned code; returns true when the table is full
    fn advance(&mut self) -> bool {
        self.next_code += 1;
        if self.next_code == MAX_CODE - 1 {
            return true;
        }
        if u32::from(self.next_code) >= (1 << self.width) && self.width < MAX_BITS {
            self.width += 1;
        }
        false
    }
}

/// Compresses `data` into a complete stream (leading clear, trailing EOI)
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut writer = BitWriter::new(data.len() / 2 + 4);
    let mut table = EncoderTable::new();
    writer.write(CLEAR_CODE, table.width);

    let mut bytes = data.iter();
    let mut prefix = match bytes.next() {
        Some(&first) => u16::from(first),
        None => {
            writer.write(EOI_CODE, table.width);
            return writer.finish();
        }
    };

    for &byte in bytes {
        if let Some(&code) = table.codes.get(&(prefix, byte)) {
            prefix = code;
            continue;
        }

        writer.write(prefix, table.width);
        table.codes.insert((prefix, byte), table.next_code);
        if table.advance() {
            trace!("LZW table full, emitting clear code");
            writer.write(CLEAR_CODE, table.width);
            table.reset();
        }
        prefix = u16::from(byte);
    }

    // The decoder adds one more entry after the last code, so account for it
    writer.write(prefix, table.width);
    if table.advance() {
        writer.write(CLEAR_CODE, table.width);
        table.reset();
    }
    writer.write(EOI_CODE, table.width);
    writer.finish()
}

/// Decoder dictionary stored as prefix links
struct DecoderTable {
    prefix: Vec<u16>,
    suffix: Vec<u8>,
    first: Vec<u8>,
    length: Vec<usize>,
}

impl DecoderTable {
    fn new() -> Self {
        let size = usize::from(MAX_CODE) + 1;
        let mut table = DecoderTable {
            prefix: vec![0; size],
            suffix: vec![0; size],
            first: vec![0; size],
            length: vec![0; size],
        };
        for byte in 0..=255u8 {
            let code = usize::from(byte);
            table.suffix[code] = byte;
            table.first[code] = byte;
            table.length[code] = 1;
        }
        table
    }

    /// Appends the string for `code` to `out`
    fn emit(&self, code: u16, out: &mut Vec<u8>) {
        let len = self.length[usize::from(code)];
        let start = out.len();
        out.resize(start + len, 0);

        let mut current = code;
        for slot in out[start..].iter_mut().rev() {
            let index = usize::from(current);
            *slot = self.suffix[index];
            current = self.prefix[index];
        }
    }

    fn add(&mut self, code: u16, prefix: u16, suffix: u8) {
        let index = usize::from(code);
        let parent = usize::from(prefix);
        self.prefix[index] = prefix;
        self.suffix[index] = suffix;
        self.first[index] = self.first[parent];
        self.length[index] = self.length[parent] + 1;
    }
}

/// Decompresses a stream up to its EOI code (or the end of input)
///
/// Decoding stops once `limit` bytes have been produced; the output never
/// exceeds `limit`.
pub fn decode(data: &[u8], limit: usize) -> TiffResult<Vec<u8>> {
    let mut reader = BitReader::new(data);
    let mut table = DecoderTable::new();
    let mut out = Vec::with_capacity(data.len().saturating_mul(2).min(limit));

    let mut width = MIN_BITS;
    let mut next_code = FIRST_CODE;
    let mut previous: Option<u16> = None;

    loop {
        let code = match reader.read(width) {
            Some(code) => code,
            None => {
                trace!("LZW stream ended without an EOI code");
                break;
            }
        };

        if code == CLEAR_CODE {
            width = MIN_BITS;
            next_code = FIRST_CODE;
            previous = None;
            continue;
        }
        if code == EOI_CODE {
            break;
        }

        let prev = match previous {
            None => {
                if code > 255 {
                    return Err(TiffError::CorruptData(format!(
                        "LZW code {} follows a clear code at byte {}",
                        code, reader.pos
                    )));
                }
                table.emit(code, &mut out);
                if out.len() >= limit {
                    out.truncate(limit);
                    break;
                }
                previous = Some(code);
                continue;
            }
            Some(prev) => prev,
        };

        if code < next_code {
            table.emit(code, &mut out);
            if next_code <= MAX_CODE {
                table.add(next_code, prev, table.first[usize::from(code)]);
                next_code += 1;
            }
        } else if code == next_code && next_code <= MAX_CODE {
            // KwKwK: the new string is prev + first byte of prev
            table.add(next_code, prev, table.first[usize::from(prev)]);
            next_code += 1;
            table.emit(code, &mut out);
        } else {
            return Err(TiffError::CorruptData(format!(
                "LZW code {} exceeds next assignable code {} at byte {}",
                code, next_code, reader.pos
            )));
        }

        if out.len() >= limit {
            trace!("LZW unit filled after {} of {} input bytes", reader.pos, data.len());
            out.truncate(limit);
            break;
        }

        if u32::from(next_code) + 1 >= (1 << width) && width < MAX_BITS {
            width += 1;
        }
        previous = Some(code);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reads back every code of a stream, tracking width like the decoder
    fn code_sequence(stream: &[u8]) -> Vec<u16> {
        let mut reader = BitReader::new(stream);
        let mut codes = Vec::new();
        let mut width = MIN_BITS;
        let mut next_code = FIRST_CODE;
        let mut seen_first = false;
        while let Some(code) = reader.read(width) {
            codes.push(code);
            match code {
                CLEAR_CODE => {
                    width = MIN_BITS;
                    next_code = FIRST_CODE;
                    seen_first = false;
                    continue;
                }
                EOI_CODE => break,
                _ if !seen_first => {
                    seen_first = true;
                    continue;
                }
                _ => next_code += 1,
            }
            if u32::from(next_code) + 1 >= (1 << width) && width < MAX_BITS {
                width += 1;
            }
        }
        codes
    }

    /// A deterministic byte pattern with little repetition
    fn noisy(len: usize) -> Vec<u8> {
        let mut state: u32 = 0x1234_5678;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect()
    }

    #[test]
    fn test_empty_stream() {
        let stream = encode(&[]);
        assert_eq!(code_sequence(&stream), vec![CLEAR_CODE, EOI_CODE]);
        assert!(decode(&stream, usize::MAX).unwrap().is_empty());
    }

    #[test]
    fn test_first_code_layout() {
        // 9-bit CLEAR (256) then 'A' (65): 1000_0000 0 | 0010_0000 1 ...
        let stream = encode(b"A");
        assert_eq!(stream[0], 0x80);
        assert_eq!(stream[1], 0x10);
        assert_eq!(decode(&stream, usize::MAX).unwrap(), b"A".to_vec());
    }

    #[test]
    fn test_repetitive_input() {
        let data: Vec<u8> = b"TOBEORNOTTOBEORTOBEORNOT".iter().cycle().take(2000).copied().collect();
        let stream = encode(&data);
        assert!(stream.len() < data.len() / 2);
        assert_eq!(decode(&stream, usize::MAX).unwrap(), data);
    }

    #[test]
    fn test_clear_code_emitted_when_table_fills() {
        let data = noisy(20_000);
        let stream = encode(&data);
        let codes = code_sequence(&stream);

        let clears: Vec<usize> = codes
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == CLEAR_CODE)
            .map(|(i, _)| i)
            .collect();
        assert!(clears.len() >= 2, "expected a mid-stream clear, got {:?}", clears);
        // Between clears the data codes never exceed 12 bits worth of dictionary
        assert!(clears.windows(2).all(|w| w[1] - w[0] - 1 <= usize::from(MAX_CODE - FIRST_CODE)));
        assert!(codes.iter().all(|&c| c <= MAX_CODE));

        assert_eq!(decode(&stream, usize::MAX).unwrap(), data);
    }

    #[test]
    fn test_code_beyond_table_is_corrupt() {
        let mut writer = BitWriter::new(4);
        writer.write(CLEAR_CODE, 9);
        writer.write(65, 9);
        writer.write(300, 9);
        let stream = writer.finish();
        assert!(matches!(decode(&stream, usize::MAX), Err(TiffError::CorruptData(_))));
    }

    #[test]
    fn test_missing_eoi_is_tolerated() {
        let mut writer = BitWriter::new(4);
        writer.write(CLEAR_CODE, 9);
        writer.write(u16::from(b'x'), 9);
        writer.write(u16::from(b'y'), 9);
        let stream = writer.finish();
        assert_eq!(decode(&stream, usize::MAX).unwrap(), b"xy".to_vec());
    }

    #[test]
    fn test_handler_pads_short_output() {
        let stream = encode(&[1, 2, 3]);
        let out = LzwHandler.decompress(&stream, UnitGeometry::new(3, 2)).unwrap();
        assert_eq!(out, vec![1, 2, 3, 0, 0, 0]);
    }

    #[test]
    fn test_output_stops_at_limit() {
        let stream = encode(&vec![0u8; 2_000_000]);
        assert!(stream.len() < 20_000);

        let out = decode(&stream, 4).unwrap();
        assert_eq!(out, vec![0u8; 4]);
        assert!(out.capacity() <= 4096 + 4);

        let unit = LzwHandler.decompress(&stream, UnitGeometry::new(4, 1)).unwrap();
        assert_eq!(unit, vec![0u8; 4]);
    }
}
