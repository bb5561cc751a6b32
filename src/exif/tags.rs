//! TIFF field types and the Exif tag IDs the gallery reads or writes.
//!
//! Exif data is a small TIFF structure, so the vocabulary here is the TIFF
//! one: every entry carries a field type that fixes how its values are laid
//! out, and values of four bytes or fewer are stored inline in the entry.

// =============================================================================
// Field Types
// =============================================================================

/// TIFF field types that determine how values are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    Byte = 1,

    /// 8-bit ASCII character, NUL terminated
    Ascii = 2,

    /// Unsigned 16-bit integer
    Short = 3,

    /// Unsigned 32-bit integer
    Long = 4,

    /// Two LONGs: numerator, denominator
    Rational = 5,

    /// Signed 8-bit integer
    SByte = 6,

    /// Opaque bytes
    Undefined = 7,

    /// Signed 16-bit integer
    SShort = 8,

    /// Signed 32-bit integer
    SLong = 9,

    /// Two SLONGs: numerator, denominator
    SRational = 10,

    /// IEEE single precision float
    Float = 11,

    /// IEEE double precision float
    Double = 12,
}

impl FieldType {
    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float => 4,
            FieldType::Rational | FieldType::SRational | FieldType::Double => 8,
        }
    }

    /// Create a FieldType from its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            _ => None,
        }
    }

    /// Maximum bytes stored inline in an IFD entry.
    pub const INLINE_THRESHOLD: usize = 4;

    /// Check if `count` values of this type fit inline in an entry.
    #[inline]
    pub fn fits_inline(self, count: usize) -> bool {
        self.size_in_bytes() * count <= Self::INLINE_THRESHOLD
    }
}

// =============================================================================
// Tag IDs
// =============================================================================

/// IFD0 (primary image) tags.
pub mod image {
    pub const IMAGE_DESCRIPTION: u16 = 0x010E;
    pub const MAKE: u16 = 0x010F;
    pub const MODEL: u16 = 0x0110;
    pub const ORIENTATION: u16 = 0x0112;
    pub const X_RESOLUTION: u16 = 0x011A;
    pub const Y_RESOLUTION: u16 = 0x011B;
    pub const RESOLUTION_UNIT: u16 = 0x0128;
    pub const SOFTWARE: u16 = 0x0131;
    pub const DATE_TIME: u16 = 0x0132;

    /// Offset of the thumbnail JPEG (IFD1)
    pub const JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;

    /// Length of the thumbnail JPEG (IFD1)
    pub const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;
}

/// Exif sub-IFD tags.
pub mod exif {
    pub const EXPOSURE_TIME: u16 = 0x829A;
    pub const F_NUMBER: u16 = 0x829D;
    pub const ISO_SPEED_RATINGS: u16 = 0x8827;
    pub const DATE_TIME_ORIGINAL: u16 = 0x9003;
    pub const EXPOSURE_BIAS_VALUE: u16 = 0x9204;
    pub const FOCAL_LENGTH: u16 = 0x920A;
    pub const LENS_MODEL: u16 = 0xA434;
}

/// Tags whose value is the offset of another IFD.
///
/// These are dropped on decode and regenerated on encode, since offsets
/// change whenever anything is rewritten.
pub mod pointer {
    pub const EXIF_IFD: u16 = 0x8769;
    pub const GPS_IFD: u16 = 0x8825;
    pub const INTEROP_IFD: u16 = 0xA005;
}

/// Check whether a tag is an offset pointer regenerated by the encoder.
pub fn is_structural(tag: u16) -> bool {
    matches!(
        tag,
        pointer::EXIF_IFD
            | pointer::GPS_IFD
            | pointer::INTEROP_IFD
            | image::JPEG_INTERCHANGE_FORMAT
            | image::JPEG_INTERCHANGE_FORMAT_LENGTH
    )
}
