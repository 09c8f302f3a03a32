//! Typed tag values
//!
//! Every TIFF field type maps to one variant of [`TagValue`]; the set is
//! closed, so consumers match instead of downcasting.

use std::io::Cursor;

use byteorder::ReadBytesExt;

use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::constants::field_types;
use crate::tiff::errors::{TiffError, TiffResult};

/// The scalar type of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SByte,
    Undefined,
    SShort,
    SLong,
    SRational,
    Float,
    Double,
    Ifd,
    Long8,
    SLong8,
    Ifd8,
}

impl FieldType {
    /// Maps an on-disk type code to a field type
    pub fn from_code(code: u16) -> TiffResult<Self> {
        let field_type = match code {
            field_types::BYTE => FieldType::Byte,
            field_types::ASCII => FieldType::Ascii,
            field_types::SHORT => FieldType::Short,
            field_types::LONG => FieldType::Long,
            field_types::RATIONAL => FieldType::Rational,
            field_types::SBYTE => FieldType::SByte,
            field_types::UNDEFINED => FieldType::Undefined,
            field_types::SSHORT => FieldType::SShort,
            field_types::SLONG => FieldType::SLong,
            field_types::SRATIONAL => FieldType::SRational,
            field_types::FLOAT => FieldType::Float,
            field_types::DOUBLE => FieldType::Double,
            field_types::IFD => FieldType::Ifd,
            field_types::LONG8 => FieldType::Long8,
            field_types::SLONG8 => FieldType::SLong8,
            field_types::IFD8 => FieldType::Ifd8,
            _ => {
                return Err(TiffError::UnsupportedFormat(format!(
                    "unknown field type code {}",
                    code
                )))
            }
        };
        Ok(field_type)
    }

    pub fn code(&self) -> u16 {
        match self {
            FieldType::Byte => field_types::BYTE,
            FieldType::Ascii => field_types::ASCII,
            FieldType::Short => field_types::SHORT,
            FieldType::Long => field_types::LONG,
            FieldType::Rational => field_types::RATIONAL,
            FieldType::SByte => field_types::SBYTE,
            FieldType::Undefined => field_types::UNDEFINED,
            FieldType::SShort => field_types::SSHORT,
            FieldType::SLong => field_types::SLONG,
            FieldType::SRational => field_types::SRATIONAL,
            FieldType::Float => field_types::FLOAT,
            FieldType::Double => field_types::DOUBLE,
            FieldType::Ifd => field_types::IFD,
            FieldType::Long8 => field_types::LONG8,
            FieldType::SLong8 => field_types::SLONG8,
            FieldType::Ifd8 => field_types::IFD8,
        }
    }

    /// Size in bytes of a single element of this type
    pub fn size(&self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float | FieldType::Ifd => 4,
            FieldType::Rational | FieldType::SRational | FieldType::Double => 8,
            FieldType::Long8 | FieldType::SLong8 | FieldType::Ifd8 => 8,
        }
    }

    /// Whether the type only exists in BigTIFF files
    pub fn is_big_tiff_only(&self) -> bool {
        matches!(self, FieldType::Long8 | FieldType::SLong8 | FieldType::Ifd8)
    }
}

/// The decoded value array of a directory entry
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Byte(Vec<u8>),
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Ifd(Vec<u32>),
    Long8(Vec<u64>),
    SLong8(Vec<i64>),
    Ifd8(Vec<u64>),
}

impl TagValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            TagValue::Byte(_) => FieldType::Byte,
            TagValue::Ascii(_) => FieldType::Ascii,
            TagValue::Short(_) => FieldType::Short,
            TagValue::Long(_) => FieldType::Long,
            TagValue::Rational(_) => FieldType::Rational,
            TagValue::SByte(_) => FieldType::SByte,
            TagValue::Undefined(_) => FieldType::Undefined,
            TagValue::SShort(_) => FieldType::SShort,
            TagValue::SLong(_) => FieldType::SLong,
            TagValue::SRational(_) => FieldType::SRational,
            TagValue::Float(_) => FieldType::Float,
            TagValue::Double(_) => FieldType::Double,
            TagValue::Ifd(_) => FieldType::Ifd,
            TagValue::Long8(_) => FieldType::Long8,
            TagValue::SLong8(_) => FieldType::SLong8,
            TagValue::Ifd8(_) => FieldType::Ifd8,
        }
    }

    /// Element count as stored in the entry's count field
    ///
    /// ASCII counts include the terminating NUL.
    pub fn count(&self) -> u64 {
        let count = match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => v.len(),
            TagValue::Ascii(s) => s.len() + 1,
            TagValue::Short(v) => v.len(),
            TagValue::Long(v) | TagValue::Ifd(v) => v.len(),
            TagValue::Rational(v) => v.len(),
            TagValue::SByte(v) => v.len(),
            TagValue::SShort(v) => v.len(),
            TagValue::SLong(v) => v.len(),
            TagValue::SRational(v) => v.len(),
            TagValue::Float(v) => v.len(),
            TagValue::Double(v) => v.len(),
            TagValue::Long8(v) | TagValue::Ifd8(v) => v.len(),
            TagValue::SLong8(v) => v.len(),
        };
        count as u64
    }

    /// Total value size in bytes (`count * type_size`)
    pub fn byte_len(&self) -> u64 {
        self.count() * self.field_type().size() as u64
    }

    /// Integer view of the elements
    ///
    /// Signed values are sign-extended, rationals yield their integer quotient
    /// and floats are truncated. ASCII yields an empty list.
    pub fn as_u64_vec(&self) -> Vec<u64> {
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => v.iter().map(|&x| x as u64).collect(),
            TagValue::Ascii(_) => Vec::new(),
            TagValue::Short(v) => v.iter().map(|&x| x as u64).collect(),
            TagValue::Long(v) | TagValue::Ifd(v) => v.iter().map(|&x| x as u64).collect(),
            TagValue::Rational(v) => v
                .iter()
                .map(|&(n, d)| if d == 0 { 0 } else { (n / d) as u64 })
                .collect(),
            TagValue::SByte(v) => v.iter().map(|&x| x as u64).collect(),
            TagValue::SShort(v) => v.iter().map(|&x| x as u64).collect(),
            TagValue::SLong(v) => v.iter().map(|&x| x as u64).collect(),
            TagValue::SRational(v) => v
                .iter()
                .map(|&(n, d)| if d == 0 { 0 } else { (n / d) as u64 })
                .collect(),
            TagValue::Float(v) => v.iter().map(|&x| x as u64).collect(),
            TagValue::Double(v) => v.iter().map(|&x| x as u64).collect(),
            TagValue::Long8(v) | TagValue::Ifd8(v) => v.clone(),
            TagValue::SLong8(v) => v.iter().map(|&x| x as u64).collect(),
        }
    }

    /// First element as an integer, if any
    pub fn first_u64(&self) -> Option<u64> {
        self.as_u64_vec().first().copied()
    }

    /// Floating point view of the elements (rationals are divided out)
    pub fn as_f64_vec(&self) -> Vec<f64> {
        match self {
            TagValue::Rational(v) => v.iter().map(|&(n, d)| n as f64 / d as f64).collect(),
            TagValue::SRational(v) => v.iter().map(|&(n, d)| n as f64 / d as f64).collect(),
            TagValue::Float(v) => v.iter().map(|&x| x as f64).collect(),
            TagValue::Double(v) => v.clone(),
            TagValue::SByte(v) => v.iter().map(|&x| x as f64).collect(),
            TagValue::SShort(v) => v.iter().map(|&x| x as f64).collect(),
            TagValue::SLong(v) => v.iter().map(|&x| x as f64).collect(),
            TagValue::SLong8(v) => v.iter().map(|&x| x as f64).collect(),
            other => other.as_u64_vec().into_iter().map(|x| x as f64).collect(),
        }
    }

    pub fn as_ascii(&self) -> Option<&str> {
        match self {
            TagValue::Ascii(s) => Some(s),
            _ => None,
        }
    }

    /// Decodes `count` elements of `field_type` from raw file bytes
    pub fn decode(
        field_type: FieldType,
        count: usize,
        bytes: &[u8],
        handler: &dyn ByteOrderHandler,
    ) -> TiffResult<Self> {
        let needed = count * field_type.size();
        if bytes.len() < needed {
            return Err(TiffError::CorruptData(format!(
                "value needs {} bytes, only {} available",
                needed,
                bytes.len()
            )));
        }

        let mut cursor = Cursor::new(&bytes[..needed]);
        let value = match field_type {
            FieldType::Byte => TagValue::Byte(bytes[..count].to_vec()),
            FieldType::Undefined => TagValue::Undefined(bytes[..count].to_vec()),
            FieldType::Ascii => {
                let raw = &bytes[..count];
                let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                TagValue::Ascii(String::from_utf8_lossy(&raw[..end]).into_owned())
            }
            FieldType::SByte => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(cursor.read_i8()?);
                }
                TagValue::SByte(values)
            }
            FieldType::Short => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(handler.read_u16(&mut cursor)?);
                }
                TagValue::Short(values)
            }
            FieldType::SShort => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(handler.read_i16(&mut cursor)?);
                }
                TagValue::SShort(values)
            }
            FieldType::Long | FieldType::Ifd => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(handler.read_u32(&mut cursor)?);
                }
                if field_type == FieldType::Ifd {
                    TagValue::Ifd(values)
                } else {
                    TagValue::Long(values)
                }
            }
            FieldType::SLong => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(handler.read_i32(&mut cursor)?);
                }
                TagValue::SLong(values)
            }
            FieldType::Rational => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(handler.read_rational(&mut cursor)?);
                }
                TagValue::Rational(values)
            }
            FieldType::SRational => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(handler.read_srational(&mut cursor)?);
                }
                TagValue::SRational(values)
            }
            FieldType::Float => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(handler.read_f32(&mut cursor)?);
                }
                TagValue::Float(values)
            }
            FieldType::Double => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(handler.read_f64(&mut cursor)?);
                }
                TagValue::Double(values)
            }
            FieldType::Long8 | FieldType::Ifd8 => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(handler.read_u64(&mut cursor)?);
                }
                if field_type == FieldType::Ifd8 {
                    TagValue::Ifd8(values)
                } else {
                    TagValue::Long8(values)
                }
            }
            FieldType::SLong8 => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(handler.read_i64(&mut cursor)?);
                }
                TagValue::SLong8(values)
            }
        };

        Ok(value)
    }

    /// Encodes the value array into file bytes (exactly `byte_len()` long)
    pub fn encode(&self, handler: &dyn ByteOrderHandler) -> TiffResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(self.byte_len() as usize));
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => return Ok(v.clone()),
            TagValue::Ascii(s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                return Ok(bytes);
            }
            TagValue::SByte(v) => return Ok(v.iter().map(|&x| x as u8).collect()),
            TagValue::Short(v) => {
                for &x in v {
                    handler.write_u16(&mut cursor, x)?;
                }
            }
            TagValue::SShort(v) => {
                for &x in v {
                    handler.write_i16(&mut cursor, x)?;
                }
            }
            TagValue::Long(v) | TagValue::Ifd(v) => {
                for &x in v {
                    handler.write_u32(&mut cursor, x)?;
                }
            }
            TagValue::SLong(v) => {
                for &x in v {
                    handler.write_i32(&mut cursor, x)?;
                }
            }
            TagValue::Rational(v) => {
                for &(n, d) in v {
                    handler.write_u32(&mut cursor, n)?;
                    handler.write_u32(&mut cursor, d)?;
                }
            }
            TagValue::SRational(v) => {
                for &(n, d) in v {
                    handler.write_i32(&mut cursor, n)?;
                    handler.write_i32(&mut cursor, d)?;
                }
            }
            TagValue::Float(v) => {
                for &x in v {
                    handler.write_f32(&mut cursor, x)?;
                }
            }
            TagValue::Double(v) => {
                for &x in v {
                    handler.write_f64(&mut cursor, x)?;
                }
            }
            TagValue::Long8(v) | TagValue::Ifd8(v) => {
                for &x in v {
                    handler.write_u64(&mut cursor, x)?;
                }
            }
            TagValue::SLong8(v) => {
                for &x in v {
                    handler.write_i64(&mut cursor, x)?;
                }
            }
        }
        Ok(cursor.into_inner())
    }

    /// Builds an offset or byte-count array in the width the file variant needs
    pub fn offsets(values: Vec<u64>, is_big_tiff: bool) -> Self {
        if is_big_tiff {
            TagValue::Long8(values)
        } else {
            TagValue::Long(values.into_iter().map(|v| v as u32).collect())
        }
    }
}
