//! Locating and replacing the Exif segment of a JPEG stream.
//!
//! Exif metadata is carried in an APP1 segment whose payload begins with
//! the identifier `Exif\0\0`, followed by the TIFF-structured block:
//!
//! ```text
//! FF D8                      SOI
//! FF E0 <len> JFIF...        APP0 (optional)
//! FF E1 <len> Exif\0\0 ...   APP1 / Exif
//! ...                        other segments
//! FF DA ...                  SOS, then entropy-coded data
//! ```
//!
//! Segment walking stops at SOS; everything from there on is copied through
//! untouched.

use bytes::{BufMut, Bytes, BytesMut};

use super::codec::{ExifData, MAX_EXIF_LEN};
use crate::error::ExifError;

// =============================================================================
// JPEG Markers
// =============================================================================

/// Start Of Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker byte
const EOI: u8 = 0xD9;

/// Start Of Scan marker byte
const SOS: u8 = 0xDA;

/// Application segment 0 (JFIF) marker byte
const APP0: u8 = 0xE0;

/// Application segment 1 (Exif) marker byte
const APP1: u8 = 0xE1;

/// Identifier at the start of an Exif APP1 payload
pub const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";

// =============================================================================
// Segments
// =============================================================================

/// One marker segment, as byte positions in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Marker byte (the byte after 0xFF)
    pub marker: u8,
    /// Position of the 0xFF byte
    pub start: usize,
    /// Position one past the end of the segment
    pub end: usize,
}

impl Segment {
    /// Payload after the two length bytes.
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.start + 4..self.end]
    }

    fn is_exif(&self, data: &[u8]) -> bool {
        self.marker == APP1 && self.payload(data).starts_with(EXIF_HEADER)
    }
}

/// Check for the SOI marker.
#[inline]
pub fn is_jpeg(data: &[u8]) -> bool {
    data.starts_with(&SOI)
}

/// List the marker segments between SOI and SOS.
pub fn segments(data: &[u8]) -> Result<Vec<Segment>, ExifError> {
    if !is_jpeg(data) {
        return Err(ExifError::NotJpeg);
    }

    let mut result = Vec::new();
    let mut pos = SOI.len();

    while pos < data.len() {
        if data[pos] != 0xFF {
            return Err(ExifError::MalformedJpeg(format!(
                "expected marker at offset {}, found 0x{:02X}",
                pos, data[pos]
            )));
        }

        // fill bytes
        let mut marker_pos = pos;
        while marker_pos + 1 < data.len() && data[marker_pos + 1] == 0xFF {
            marker_pos += 1;
        }
        let Some(&marker) = data.get(marker_pos + 1) else {
            return Err(ExifError::MalformedJpeg("stream ends inside a marker".to_string()));
        };

        if marker == SOS || marker == EOI {
            break;
        }

        // standalone markers carry no length
        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            pos = marker_pos + 2;
            continue;
        }

        if marker_pos + 4 > data.len() {
            return Err(ExifError::MalformedJpeg(format!(
                "segment 0x{:02X} at offset {} has no length",
                marker, marker_pos
            )));
        }
        let len = u16::from_be_bytes([data[marker_pos + 2], data[marker_pos + 3]]) as usize;
        if len < 2 {
            return Err(ExifError::MalformedJpeg(format!(
                "segment 0x{:02X} at offset {} has invalid length {}",
                marker, marker_pos, len
            )));
        }
        let end = marker_pos + 2 + len;
        if end > data.len() {
            return Err(ExifError::MalformedJpeg(format!(
                "segment 0x{:02X} at offset {} runs past end of stream",
                marker, marker_pos
            )));
        }

        result.push(Segment {
            marker,
            start: marker_pos,
            end,
        });
        pos = end;
    }

    Ok(result)
}

// =============================================================================
// Exif access
// =============================================================================

/// Find the Exif block (the bytes after `Exif\0\0`) of a JPEG stream.
pub fn find_exif(data: &[u8]) -> Result<Option<&[u8]>, ExifError> {
    Ok(segments(data)?
        .into_iter()
        .find(|s| s.is_exif(data))
        .map(|s| &s.payload(data)[EXIF_HEADER.len()..]))
}

/// Decode the Exif block of a JPEG stream, if it has one.
pub fn read_exif(data: &[u8]) -> Result<Option<ExifData>, ExifError> {
    find_exif(data)?.map(ExifData::parse).transpose()
}

/// Build an APP1 segment around an encoded Exif block.
pub fn exif_segment(block: &[u8]) -> Result<Bytes, ExifError> {
    if block.len() > MAX_EXIF_LEN {
        return Err(ExifError::TooLarge(block.len()));
    }
    let len = 2 + EXIF_HEADER.len() + block.len();

    let mut out = BytesMut::with_capacity(2 + len);
    out.put_u8(0xFF);
    out.put_u8(APP1);
    out.put_u16(len as u16);
    out.put_slice(EXIF_HEADER);
    out.put_slice(block);
    Ok(out.freeze())
}

/// Write an encoded Exif block into a JPEG stream.
///
/// An existing Exif segment is replaced in place. Otherwise the new segment
/// goes directly after SOI, or after APP0 when the stream starts with one.
/// All other bytes are preserved.
pub fn insert_exif(data: &[u8], block: &[u8]) -> Result<Bytes, ExifError> {
    let segments = segments(data)?;
    let segment = exif_segment(block)?;

    let existing: Vec<&Segment> = segments.iter().filter(|s| s.is_exif(data)).collect();

    let insert_at = match existing.first() {
        Some(first) => first.start,
        None => match segments.first() {
            Some(s) if s.marker == APP0 => s.end,
            _ => SOI.len(),
        },
    };

    let mut out = BytesMut::with_capacity(data.len() + segment.len());
    let mut pos = 0;
    let mut inserted = false;

    for s in &existing {
        if !inserted {
            out.put_slice(&data[pos..insert_at]);
            out.put_slice(&segment);
            inserted = true;
        } else {
            out.put_slice(&data[pos..s.start]);
        }
        pos = s.end;
    }

    if !inserted {
        out.put_slice(&data[..insert_at]);
        out.put_slice(&segment);
        pos = insert_at;
    }
    out.put_slice(&data[pos..]);

    Ok(out.freeze())
}
