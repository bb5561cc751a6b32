//! Exif block decoding and encoding.
//!
//! An Exif block is a classic TIFF structure:
//!
//! ```text
//! Bytes 0-1: Byte order ("II" little-endian, "MM" big-endian)
//! Bytes 2-3: Version (42)
//! Bytes 4-7: Offset to IFD0
//! ```
//!
//! IFD0 describes the primary image and may point at the Exif, GPS and
//! (through the Exif IFD) Interoperability sub-IFDs. IFD0's next-IFD link
//! leads to IFD1, which describes the embedded thumbnail.
//!
//! Decoding respects the declared byte order. Encoding always writes
//! big-endian with entries sorted by tag and every offset recomputed.

use std::collections::BTreeMap;

use tracing::debug;

use super::tags::{image, is_structural, pointer, FieldType};
use super::value::TagValue;
use crate::error::ExifError;

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Version number for classic TIFF
const VERSION_TIFF: u16 = 42;

/// Size of the TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of one IFD entry in bytes
const ENTRY_SIZE: usize = 12;

/// Largest Exif block that fits in one APP1 segment.
///
/// The segment length field is 16 bits and counts itself (2 bytes) plus the
/// `Exif\0\0` identifier (6 bytes).
pub const MAX_EXIF_LEN: usize = 65535 - 8;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of an Exif block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from the first two bytes of a slice.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        }
    }

    /// Read a u32 from the first four bytes of a slice.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        }
    }

    /// Read a u64 from the first eight bytes of a slice.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(raw),
            ByteOrder::BigEndian => u64::from_be_bytes(raw),
        }
    }
}

// =============================================================================
// ExifData
// =============================================================================

/// Tags of one IFD keyed by tag ID.
pub type Ifd = BTreeMap<u16, TagValue>;

/// Which IFD of an Exif block a tag lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfdKind {
    /// IFD0, the primary image
    Zeroth,
    /// Exif sub-IFD (camera settings)
    Exif,
    /// GPS sub-IFD
    Gps,
    /// Interoperability sub-IFD
    Interop,
    /// IFD1, the thumbnail image
    First,
}

/// Decoded Exif block.
///
/// Offset pointer tags are not stored; the encoder regenerates them from
/// which IFDs are non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifData {
    pub zeroth: Ifd,
    pub exif: Ifd,
    pub gps: Ifd,
    pub interop: Ifd,
    pub first: Ifd,

    /// Embedded thumbnail JPEG referenced by IFD1
    pub thumbnail: Option<Vec<u8>>,
}

impl ExifData {
    pub fn ifd(&self, kind: IfdKind) -> &Ifd {
        match kind {
            IfdKind::Zeroth => &self.zeroth,
            IfdKind::Exif => &self.exif,
            IfdKind::Gps => &self.gps,
            IfdKind::Interop => &self.interop,
            IfdKind::First => &self.first,
        }
    }

    pub fn ifd_mut(&mut self, kind: IfdKind) -> &mut Ifd {
        match kind {
            IfdKind::Zeroth => &mut self.zeroth,
            IfdKind::Exif => &mut self.exif,
            IfdKind::Gps => &mut self.gps,
            IfdKind::Interop => &mut self.interop,
            IfdKind::First => &mut self.first,
        }
    }

    /// Look up a tag.
    pub fn get(&self, kind: IfdKind, tag: u16) -> Option<&TagValue> {
        self.ifd(kind).get(&tag)
    }

    /// Set a tag, replacing any previous value.
    pub fn set(&mut self, kind: IfdKind, tag: u16, value: TagValue) {
        self.ifd_mut(kind).insert(tag, value);
    }

    pub fn is_empty(&self) -> bool {
        self.zeroth.is_empty()
            && self.exif.is_empty()
            && self.gps.is_empty()
            && self.interop.is_empty()
            && self.first.is_empty()
            && self.thumbnail.is_none()
    }

    /// Decode an Exif block (the bytes after `Exif\0\0`).
    ///
    /// Entries with an unknown field type or with data outside the block are
    /// skipped. A malformed header or IFD0 is an error.
    pub fn parse(data: &[u8]) -> Result<Self, ExifError> {
        if data.len() < TIFF_HEADER_SIZE {
            return Err(ExifError::Truncated {
                required: TIFF_HEADER_SIZE,
                actual: data.len(),
            });
        }

        let order = match u16::from_be_bytes([data[0], data[1]]) {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            other => return Err(ExifError::InvalidMagic(other)),
        };

        let version = order.read_u16(&data[2..4]);
        if version != VERSION_TIFF {
            return Err(ExifError::InvalidVersion(version));
        }

        let ifd0_offset = order.read_u32(&data[4..8]);
        let (mut zeroth, next) = parse_ifd(data, ifd0_offset, order)?;

        let mut result = ExifData::default();

        if let Some(offset) = pointer_value(&zeroth, pointer::EXIF_IFD) {
            let (mut exif, _) = parse_ifd(data, offset, order)?;
            if let Some(offset) = pointer_value(&exif, pointer::INTEROP_IFD) {
                result.interop = strip_structural(parse_ifd(data, offset, order)?.0);
            }
            exif.retain(|tag, _| !is_structural(*tag));
            result.exif = exif;
        }

        if let Some(offset) = pointer_value(&zeroth, pointer::GPS_IFD) {
            result.gps = strip_structural(parse_ifd(data, offset, order)?.0);
        }

        if next != 0 && next != ifd0_offset {
            let (first, _) = parse_ifd(data, next, order)?;
            result.thumbnail = thumbnail_slice(data, &first);
            result.first = strip_structural(first);
        }

        zeroth.retain(|tag, _| !is_structural(*tag));
        result.zeroth = zeroth;

        Ok(result)
    }

    /// Encode as a big-endian Exif block.
    ///
    /// Fails with [`ExifError::TooLarge`] when the result would not fit in a
    /// single APP1 segment.
    pub fn encode(&self) -> Result<Vec<u8>, ExifError> {
        let has_interop = !self.interop.is_empty();
        let has_exif = !self.exif.is_empty() || has_interop;
        let has_gps = !self.gps.is_empty();
        let has_first = !self.first.is_empty() || self.thumbnail.is_some();

        // pointer entries are inserted with placeholder offsets first, since
        // an entry's size does not depend on its value
        let placeholder = || TagValue::Long(vec![0]);

        let mut zeroth = strip_structural(self.zeroth.clone());
        if has_exif {
            zeroth.insert(pointer::EXIF_IFD, placeholder());
        }
        if has_gps {
            zeroth.insert(pointer::GPS_IFD, placeholder());
        }

        let mut exif = strip_structural(self.exif.clone());
        if has_interop {
            exif.insert(pointer::INTEROP_IFD, placeholder());
        }

        let gps = strip_structural(self.gps.clone());
        let interop = strip_structural(self.interop.clone());

        let mut first = strip_structural(self.first.clone());
        if let Some(thumbnail) = &self.thumbnail {
            first.insert(image::JPEG_INTERCHANGE_FORMAT, placeholder());
            first.insert(
                image::JPEG_INTERCHANGE_FORMAT_LENGTH,
                TagValue::Long(vec![thumbnail.len() as u32]),
            );
        }

        // layout: header, IFD0, Exif, GPS, Interop, IFD1, thumbnail
        let zeroth_offset = TIFF_HEADER_SIZE;
        let exif_offset = zeroth_offset + ifd_size(&zeroth);
        let gps_offset = exif_offset + if has_exif { ifd_size(&exif) } else { 0 };
        let interop_offset = gps_offset + if has_gps { ifd_size(&gps) } else { 0 };
        let first_offset = interop_offset + if has_interop { ifd_size(&interop) } else { 0 };
        let thumbnail_offset = first_offset + if has_first { ifd_size(&first) } else { 0 };
        let total = thumbnail_offset + self.thumbnail.as_ref().map_or(0, Vec::len);

        if total > MAX_EXIF_LEN {
            return Err(ExifError::TooLarge(total));
        }

        if has_exif {
            zeroth.insert(pointer::EXIF_IFD, TagValue::Long(vec![exif_offset as u32]));
        }
        if has_gps {
            zeroth.insert(pointer::GPS_IFD, TagValue::Long(vec![gps_offset as u32]));
        }
        if has_interop {
            exif.insert(
                pointer::INTEROP_IFD,
                TagValue::Long(vec![interop_offset as u32]),
            );
        }
        if self.thumbnail.is_some() {
            first.insert(
                image::JPEG_INTERCHANGE_FORMAT,
                TagValue::Long(vec![thumbnail_offset as u32]),
            );
        }

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&BYTE_ORDER_BIG_ENDIAN.to_be_bytes());
        out.extend_from_slice(&VERSION_TIFF.to_be_bytes());
        out.extend_from_slice(&(zeroth_offset as u32).to_be_bytes());

        let next = if has_first { first_offset as u32 } else { 0 };
        write_ifd(&mut out, &zeroth, next);
        if has_exif {
            write_ifd(&mut out, &exif, 0);
        }
        if has_gps {
            write_ifd(&mut out, &gps, 0);
        }
        if has_interop {
            write_ifd(&mut out, &interop, 0);
        }
        if has_first {
            write_ifd(&mut out, &first, 0);
        }
        if let Some(thumbnail) = &self.thumbnail {
            out.extend_from_slice(thumbnail);
        }

        debug_assert_eq!(out.len(), total);
        Ok(out)
    }
}

// =============================================================================
// IFD parsing
// =============================================================================

/// Parse the IFD at `offset`, returning its entries and the next-IFD offset.
fn parse_ifd(data: &[u8], offset: u32, order: ByteOrder) -> Result<(Ifd, u32), ExifError> {
    let start = offset as usize;
    if start < TIFF_HEADER_SIZE || start + 2 > data.len() {
        return Err(ExifError::InvalidIfdOffset(offset));
    }

    let count = order.read_u16(&data[start..]) as usize;
    let entries_end = start + 2 + count * ENTRY_SIZE;
    if entries_end > data.len() {
        return Err(ExifError::Truncated {
            required: entries_end,
            actual: data.len(),
        });
    }

    let mut ifd = Ifd::new();
    for i in 0..count {
        let entry = &data[start + 2 + i * ENTRY_SIZE..][..ENTRY_SIZE];
        let tag = order.read_u16(&entry[0..2]);
        let raw_type = order.read_u16(&entry[2..4]);
        let value_count = order.read_u32(&entry[4..8]) as usize;

        let Some(field_type) = FieldType::from_u16(raw_type) else {
            debug!(tag = tag, field_type = raw_type, "Skipping entry with unknown field type");
            continue;
        };

        let Some(len) = value_count.checked_mul(field_type.size_in_bytes()) else {
            debug!(tag = tag, "Skipping entry with overflowing count");
            continue;
        };

        let bytes = if len <= FieldType::INLINE_THRESHOLD {
            &entry[8..8 + len]
        } else {
            let value_offset = order.read_u32(&entry[8..12]) as usize;
            match value_offset
                .checked_add(len)
                .filter(|&end| end <= data.len())
            {
                Some(end) => &data[value_offset..end],
                None => {
                    debug!(tag = tag, offset = value_offset, len = len, "Skipping entry outside block");
                    continue;
                }
            }
        };

        ifd.insert(tag, TagValue::decode(field_type, bytes, order));
    }

    // some writers omit the trailing link on the last IFD
    let next = if entries_end + 4 <= data.len() {
        order.read_u32(&data[entries_end..])
    } else {
        0
    };

    Ok((ifd, next))
}

fn pointer_value(ifd: &Ifd, tag: u16) -> Option<u32> {
    ifd.get(&tag).and_then(TagValue::first_u32).filter(|&v| v != 0)
}

fn strip_structural(mut ifd: Ifd) -> Ifd {
    ifd.retain(|tag, _| !is_structural(*tag));
    ifd
}

fn thumbnail_slice(data: &[u8], first: &Ifd) -> Option<Vec<u8>> {
    let offset = pointer_value(first, image::JPEG_INTERCHANGE_FORMAT)? as usize;
    let len = pointer_value(first, image::JPEG_INTERCHANGE_FORMAT_LENGTH)? as usize;
    let end = offset.checked_add(len)?;
    data.get(offset..end).map(<[u8]>::to_vec)
}

// =============================================================================
// IFD writing
// =============================================================================

/// Encoded size of an IFD including its out-of-line data.
fn ifd_size(ifd: &Ifd) -> usize {
    2 + ifd.len() * ENTRY_SIZE + 4 + ifd.values().map(out_of_line_len).sum::<usize>()
}

/// Bytes a value occupies after the entry table, padded to a word boundary.
fn out_of_line_len(value: &TagValue) -> usize {
    let len = value.byte_len();
    if len <= FieldType::INLINE_THRESHOLD {
        0
    } else {
        len + (len & 1)
    }
}

/// Append an IFD at the end of `out`. Offsets are absolute within the block.
fn write_ifd(out: &mut Vec<u8>, ifd: &Ifd, next: u32) {
    let start = out.len();
    let mut data_offset = start + 2 + ifd.len() * ENTRY_SIZE + 4;
    let mut data = Vec::new();

    out.extend_from_slice(&(ifd.len() as u16).to_be_bytes());
    for (&tag, value) in ifd {
        out.extend_from_slice(&tag.to_be_bytes());
        out.extend_from_slice(&(value.field_type() as u16).to_be_bytes());
        out.extend_from_slice(&(value.count() as u32).to_be_bytes());

        let mut encoded = Vec::with_capacity(value.byte_len());
        value.encode(&mut encoded);

        if encoded.len() <= FieldType::INLINE_THRESHOLD {
            encoded.resize(FieldType::INLINE_THRESHOLD, 0);
            out.extend_from_slice(&encoded);
        } else {
            out.extend_from_slice(&(data_offset as u32).to_be_bytes());
            if encoded.len() % 2 == 1 {
                encoded.push(0);
            }
            data_offset += encoded.len();
            data.extend_from_slice(&encoded);
        }
    }
    out.extend_from_slice(&next.to_be_bytes());
    out.extend_from_slice(&data);
}
