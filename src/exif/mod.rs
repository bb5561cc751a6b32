//! Exif metadata embedded in JPEG files.
//!
//! This module reads and rewrites the APP1 Exif segment of a JPEG without
//! touching the compressed image data:
//!
//! - [`jpeg`] walks marker segments and splices the APP1 segment
//! - [`codec`] decodes and encodes the TIFF-structured Exif block
//! - [`fields`] converts client-supplied values into tag values
//!
//! # Example
//!
//! ```ignore
//! let fields = ExifFields { make: Some("FUJIFILM".into()), ..Default::default() };
//! let updated = rewrite_metadata(&jpeg_bytes, &fields)?;
//! ```

pub mod codec;
pub mod fields;
pub mod jpeg;
pub mod tags;
pub mod value;

use bytes::Bytes;
use tracing::{debug, warn};

pub use codec::{ByteOrder, ExifData, Ifd, IfdKind, MAX_EXIF_LEN};
pub use fields::{ExifFields, FieldInput};
pub use jpeg::{find_exif, insert_exif, is_jpeg, read_exif};
pub use tags::FieldType;
pub use value::{Rational, SRational, TagValue};

use crate::error::ExifError;

/// Apply `fields` to the Exif block of a JPEG and return the new file.
///
/// A missing Exif segment starts from an empty block. An existing block that
/// fails to decode is logged and replaced, since the request carries the
/// values the caller wants kept.
pub fn rewrite_metadata(jpeg: &[u8], fields: &ExifFields) -> Result<Bytes, ExifError> {
    let mut data = match jpeg::find_exif(jpeg)? {
        Some(block) => ExifData::parse(block).unwrap_or_else(|e| {
            warn!(error = %e, "Existing Exif block is unreadable, starting from empty");
            ExifData::default()
        }),
        None => {
            debug!("No Exif segment present, starting from empty");
            ExifData::default()
        }
    };

    let applied = fields.apply(&mut data)?;
    let block = data.encode()?;
    debug!(fields = applied, block_len = block.len(), "Re-encoded Exif block");

    jpeg::insert_exif(jpeg, &block)
}
