//! Display metadata extracted from a photo's Exif block.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::exif::tags::{exif, image};
use crate::exif::{read_exif, ExifData, IfdKind, TagValue};

/// Number of leading bytes searched for a date when the Exif block has none.
pub const DATE_SCAN_LEN: usize = 8192;

/// Exif date layout, `YYYY:MM:DD HH:MM:SS`.
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

const DATE_LEN: usize = 19;

/// Camera settings shown next to a photo.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhotoMeta {
    pub make: String,
    pub model: String,
    pub lens: String,
    pub f_number: Option<f64>,
    pub iso: Option<u32>,
    pub exposure_time: String,
    pub focal_length: Option<u32>,
    pub ev: Option<f64>,
    pub date: String,
}

impl PhotoMeta {
    /// Extract metadata from raw image bytes.
    ///
    /// Non-JPEG files and unreadable Exif blocks yield empty metadata.
    pub fn from_image(data: &[u8]) -> Self {
        match read_exif(data) {
            Ok(Some(exif)) => Self::from_exif(&exif),
            _ => Self::default(),
        }
    }

    /// Extract metadata from a decoded Exif block.
    pub fn from_exif(data: &ExifData) -> Self {
        let text = |kind, tag| {
            data.get(kind, tag)
                .and_then(TagValue::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        let f_number = data
            .get(IfdKind::Exif, exif::F_NUMBER)
            .and_then(TagValue::first_f64)
            .map(round_tenth);

        let focal_length = data
            .get(IfdKind::Exif, exif::FOCAL_LENGTH)
            .and_then(TagValue::first_f64)
            .map(|v| v.max(0.0) as u32);

        // a zero denominator reads as no bias
        let ev = data
            .get(IfdKind::Exif, exif::EXPOSURE_BIAS_VALUE)
            .map(|v| v.first_f64().map(round_tenth).unwrap_or(0.0));

        Self {
            make: text(IfdKind::Zeroth, image::MAKE),
            model: text(IfdKind::Zeroth, image::MODEL),
            lens: text(IfdKind::Exif, exif::LENS_MODEL),
            f_number,
            iso: data
                .get(IfdKind::Exif, exif::ISO_SPEED_RATINGS)
                .and_then(TagValue::first_u32),
            exposure_time: data
                .get(IfdKind::Exif, exif::EXPOSURE_TIME)
                .map(format_exposure)
                .unwrap_or_default(),
            focal_length,
            ev,
            date: text(IfdKind::Exif, exif::DATE_TIME_ORIGINAL),
        }
    }
}

/// Render an exposure time as `1/den` when it is a unit fraction.
fn format_exposure(value: &TagValue) -> String {
    match value {
        TagValue::Rational(r) if r.first().is_some_and(|r| r.num == 1 && r.den != 0) => {
            format!("1/{}", r[0].den)
        }
        other => other
            .first_f64()
            .map(|v| v.to_string())
            .unwrap_or_default(),
    }
}

fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Earliest plausible `YYYY:MM:DD HH:MM:SS` string in the file header.
///
/// Dates starting with `0000` are placeholders and ignored.
pub fn scan_header_date(data: &[u8]) -> Option<String> {
    let header = &data[..data.len().min(DATE_SCAN_LEN)];
    if header.len() < DATE_LEN {
        return None;
    }

    (0..=header.len() - DATE_LEN)
        .map(|i| &header[i..i + DATE_LEN])
        .filter(|w| looks_like_date(w) && !w.starts_with(b"0000"))
        .filter_map(|w| std::str::from_utf8(w).ok())
        .min()
        .map(str::to_string)
}

fn looks_like_date(window: &[u8]) -> bool {
    window.iter().enumerate().all(|(i, &b)| match i {
        4 | 7 | 13 | 16 => b == b':',
        10 => b == b' ',
        _ => b.is_ascii_digit(),
    })
}

/// File modification time in Exif date layout, local time.
pub fn modified_date(path: &Path) -> Option<String> {
    let modified: SystemTime = std::fs::metadata(path).ok()?.modified().ok()?;
    let local: DateTime<Local> = modified.into();
    Some(local.format(EXIF_DATE_FORMAT).to_string())
}

/// Pick the date a photo was taken.
///
/// Prefers the Exif original date, then a header scan, then the file's
/// modification time.
pub fn date_taken(meta: &PhotoMeta, data: &[u8], path: &Path) -> String {
    if !meta.date.is_empty() && !meta.date.starts_with("0000") {
        return meta.date.clone();
    }
    scan_header_date(data)
        .or_else(|| modified_date(path))
        .unwrap_or_default()
}
