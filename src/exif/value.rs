//! Typed tag values.
//!
//! A [`TagValue`] holds the decoded values of one IFD entry. Decoding reads
//! raw entry bytes in the source byte order; encoding always writes
//! big-endian, which is what the encoder emits.
//!
//! ASCII entries that are not valid UTF-8 (Latin-1 artist names, for one)
//! decode to [`TagValue::RawAscii`] and are written back byte for byte.

use super::codec::ByteOrder;
use super::tags::FieldType;

/// Unsigned rational: numerator over denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: u32,
    pub den: u32,
}

impl Rational {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Value as a float, or `None` for a zero denominator.
    pub fn to_f64(self) -> Option<f64> {
        if self.den == 0 {
            None
        } else {
            Some(self.num as f64 / self.den as f64)
        }
    }
}

/// Signed rational: numerator over denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SRational {
    pub num: i32,
    pub den: i32,
}

impl SRational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    pub fn to_f64(self) -> Option<f64> {
        if self.den == 0 {
            None
        } else {
            Some(self.num as f64 / self.den as f64)
        }
    }
}

/// Decoded values of one IFD entry, one variant per field type.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Byte(Vec<u8>),
    Ascii(String),
    /// ASCII entry whose bytes are not valid UTF-8, without the NUL
    RawAscii(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<Rational>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<SRational>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl TagValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            TagValue::Byte(_) => FieldType::Byte,
            TagValue::Ascii(_) | TagValue::RawAscii(_) => FieldType::Ascii,
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
        }
    }

    /// Entry count as written to the IFD. ASCII counts include the NUL.
    pub fn count(&self) -> usize {
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => v.len(),
            TagValue::Ascii(s) => s.len() + 1,
            TagValue::RawAscii(v) => v.len() + 1,
            TagValue::Short(v) => v.len(),
            TagValue::Long(v) => v.len(),
            TagValue::Rational(v) => v.len(),
            TagValue::SByte(v) => v.len(),
            TagValue::SShort(v) => v.len(),
            TagValue::SLong(v) => v.len(),
            TagValue::SRational(v) => v.len(),
            TagValue::Float(v) => v.len(),
            TagValue::Double(v) => v.len(),
        }
    }

    /// Size of the encoded value in bytes.
    pub fn byte_len(&self) -> usize {
        self.field_type().size_in_bytes() * self.count()
    }

    /// Text of an ASCII value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Ascii(s) => Some(s),
            _ => None,
        }
    }

    /// First value of an integer entry.
    pub fn first_u32(&self) -> Option<u32> {
        match self {
            TagValue::Byte(v) => v.first().map(|&x| x as u32),
            TagValue::Short(v) => v.first().map(|&x| x as u32),
            TagValue::Long(v) => v.first().copied(),
            _ => None,
        }
    }

    /// First value of a numeric entry as a float.
    pub fn first_f64(&self) -> Option<f64> {
        match self {
            TagValue::Rational(v) => v.first().and_then(|r| r.to_f64()),
            TagValue::SRational(v) => v.first().and_then(|r| r.to_f64()),
            TagValue::Float(v) => v.first().map(|&x| x as f64),
            TagValue::Double(v) => v.first().copied(),
            TagValue::SShort(v) => v.first().map(|&x| x as f64),
            TagValue::SLong(v) => v.first().map(|&x| x as f64),
            _ => self.first_u32().map(|x| x as f64),
        }
    }

    /// Decode `count` values of `field_type` from `bytes`.
    ///
    /// `bytes` must hold exactly `count * size_in_bytes` bytes.
    pub fn decode(field_type: FieldType, bytes: &[u8], order: ByteOrder) -> TagValue {
        match field_type {
            FieldType::Byte => TagValue::Byte(bytes.to_vec()),
            FieldType::Undefined => TagValue::Undefined(bytes.to_vec()),
            FieldType::SByte => TagValue::SByte(bytes.iter().map(|&b| b as i8).collect()),
            FieldType::Ascii => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                match std::str::from_utf8(&bytes[..end]) {
                    Ok(text) => TagValue::Ascii(text.to_string()),
                    Err(_) => TagValue::RawAscii(bytes[..end].to_vec()),
                }
            }
            FieldType::Short => {
                TagValue::Short(bytes.chunks_exact(2).map(|c| order.read_u16(c)).collect())
            }
            FieldType::SShort => TagValue::SShort(
                bytes
                    .chunks_exact(2)
                    .map(|c| order.read_u16(c) as i16)
                    .collect(),
            ),
            FieldType::Long => {
                TagValue::Long(bytes.chunks_exact(4).map(|c| order.read_u32(c)).collect())
            }
            FieldType::SLong => TagValue::SLong(
                bytes
                    .chunks_exact(4)
                    .map(|c| order.read_u32(c) as i32)
                    .collect(),
            ),
            FieldType::Float => TagValue::Float(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_bits(order.read_u32(c)))
                    .collect(),
            ),
            FieldType::Rational => TagValue::Rational(
                bytes
                    .chunks_exact(8)
                    .map(|c| Rational::new(order.read_u32(&c[..4]), order.read_u32(&c[4..])))
                    .collect(),
            ),
            FieldType::SRational => TagValue::SRational(
                bytes
                    .chunks_exact(8)
                    .map(|c| {
                        SRational::new(
                            order.read_u32(&c[..4]) as i32,
                            order.read_u32(&c[4..]) as i32,
                        )
                    })
                    .collect(),
            ),
            FieldType::Double => TagValue::Double(
                bytes
                    .chunks_exact(8)
                    .map(|c| f64::from_bits(order.read_u64(c)))
                    .collect(),
            ),
        }
    }

    /// Encode as big-endian bytes.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => out.extend_from_slice(v),
            TagValue::SByte(v) => out.extend(v.iter().map(|&b| b as u8)),
            TagValue::Ascii(s) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            }
            TagValue::RawAscii(v) => {
                out.extend_from_slice(v);
                out.push(0);
            }
            TagValue::Short(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
            TagValue::SShort(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
            TagValue::Long(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
            TagValue::SLong(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
            TagValue::Float(v) => v
                .iter()
                .for_each(|x| out.extend_from_slice(&x.to_bits().to_be_bytes())),
            TagValue::Double(v) => v
                .iter()
                .for_each(|x| out.extend_from_slice(&x.to_bits().to_be_bytes())),
            TagValue::Rational(v) => v.iter().for_each(|r| {
                out.extend_from_slice(&r.num.to_be_bytes());
                out.extend_from_slice(&r.den.to_be_bytes());
            }),
            TagValue::SRational(v) => v.iter().for_each(|r| {
                out.extend_from_slice(&r.num.to_be_bytes());
                out.extend_from_slice(&r.den.to_be_bytes());
            }),
        }
    }
}
