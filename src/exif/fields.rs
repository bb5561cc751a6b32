//! Editable metadata fields and their conversion into tag values.
//!
//! Clients send human-friendly values (`"1/50"`, `1.8`, `"35mm"`); this
//! module turns them into the TIFF representations stored in the Exif block.
//! Numeric inputs follow loose browser-style parsing: a leading number is
//! taken and trailing text ignored.

use serde::Deserialize;

use super::codec::{ExifData, IfdKind};
use super::tags::{exif, image};
use super::value::{Rational, TagValue};
use crate::error::ExifError;

/// A numeric field as sent by a client: JSON number or text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldInput {
    Number(f64),
    Text(String),
}

impl FieldInput {
    /// Empty text and zero count as "not provided".
    pub fn is_blank(&self) -> bool {
        match self {
            FieldInput::Number(n) => *n == 0.0,
            FieldInput::Text(s) => s.trim().is_empty(),
        }
    }

    /// Leading float of the input.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldInput::Number(n) => Some(*n),
            FieldInput::Text(s) => parse_float_prefix(s),
        }
    }

    /// Leading integer of the input, truncating any fraction.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldInput::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            FieldInput::Number(_) => None,
            FieldInput::Text(s) => parse_int_prefix(s),
        }
    }
}

impl From<f64> for FieldInput {
    fn from(value: f64) -> Self {
        FieldInput::Number(value)
    }
}

impl From<&str> for FieldInput {
    fn from(value: &str) -> Self {
        FieldInput::Text(value.to_string())
    }
}

/// Metadata fields a client may change. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExifFields {
    pub title: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens: Option<String>,
    pub iso: Option<FieldInput>,
    pub focal_length: Option<FieldInput>,
    pub f_number: Option<FieldInput>,
    pub exposure_time: Option<FieldInput>,
}

impl ExifFields {
    /// True when applying these fields would change nothing.
    pub fn is_empty(&self) -> bool {
        let blank = |f: &Option<FieldInput>| f.as_ref().map_or(true, FieldInput::is_blank);
        self.title.is_none()
            && self.make.is_none()
            && self.model.is_none()
            && self.lens.is_none()
            && blank(&self.iso)
            && blank(&self.focal_length)
            && blank(&self.f_number)
            && blank(&self.exposure_time)
    }

    /// Write the provided fields into `data`, returning how many were set.
    ///
    /// Nothing is written unless every provided field converts.
    pub fn apply(&self, data: &mut ExifData) -> Result<usize, ExifError> {
        let mut updates: Vec<(IfdKind, u16, TagValue)> = Vec::new();

        let text_fields = [
            (IfdKind::Zeroth, image::IMAGE_DESCRIPTION, &self.title),
            (IfdKind::Zeroth, image::MAKE, &self.make),
            (IfdKind::Zeroth, image::MODEL, &self.model),
            (IfdKind::Exif, exif::LENS_MODEL, &self.lens),
        ];
        for (kind, tag, value) in text_fields {
            if let Some(text) = value {
                updates.push((kind, tag, ascii(tag, text)?));
            }
        }

        if let Some(input) = present(&self.iso) {
            let value = iso(input).map_err(|m| invalid(exif::ISO_SPEED_RATINGS, m))?;
            updates.push((IfdKind::Exif, exif::ISO_SPEED_RATINGS, TagValue::Short(vec![value])));
        }
        if let Some(input) = present(&self.focal_length) {
            let value = focal_length(input).map_err(|m| invalid(exif::FOCAL_LENGTH, m))?;
            updates.push((IfdKind::Exif, exif::FOCAL_LENGTH, TagValue::Rational(vec![value])));
        }
        if let Some(input) = present(&self.f_number) {
            let value = f_number(input).map_err(|m| invalid(exif::F_NUMBER, m))?;
            updates.push((IfdKind::Exif, exif::F_NUMBER, TagValue::Rational(vec![value])));
        }
        if let Some(input) = present(&self.exposure_time) {
            let value = exposure_time(input).map_err(|m| invalid(exif::EXPOSURE_TIME, m))?;
            updates.push((IfdKind::Exif, exif::EXPOSURE_TIME, TagValue::Rational(vec![value])));
        }

        let count = updates.len();
        for (kind, tag, value) in updates {
            data.set(kind, tag, value);
        }
        Ok(count)
    }
}

fn present(field: &Option<FieldInput>) -> Option<&FieldInput> {
    field.as_ref().filter(|f| !f.is_blank())
}

fn invalid(tag: u16, message: String) -> ExifError {
    ExifError::InvalidValue { tag, message }
}

fn ascii(tag: u16, text: &str) -> Result<TagValue, ExifError> {
    if text.contains('\0') {
        return Err(invalid(tag, "text must not contain NUL".to_string()));
    }
    Ok(TagValue::Ascii(text.to_string()))
}

// =============================================================================
// Conversions
// =============================================================================

/// ISO speed as a SHORT.
pub fn iso(input: &FieldInput) -> Result<u16, String> {
    let value = input
        .as_i64()
        .ok_or_else(|| format!("not a number: {}", describe(input)))?;
    u16::try_from(value).map_err(|_| format!("ISO out of range: {}", value))
}

/// Focal length in whole millimetres: `[round(v), 1]`.
pub fn focal_length(input: &FieldInput) -> Result<Rational, String> {
    let value = number(input)?;
    Ok(Rational::new(to_u32(value.round())?, 1))
}

/// Aperture with two decimals: `[round(v * 100), 100]`.
pub fn f_number(input: &FieldInput) -> Result<Rational, String> {
    let value = number(input)?;
    Ok(Rational::new(to_u32((value * 100.0).round())?, 100))
}

/// Exposure time.
///
/// `"a/b"` is taken literally. Whole seconds become `[v, 1]`, other values
/// of a second or more keep two decimals, and fractions of a second become
/// `[1, round(1 / v)]`.
pub fn exposure_time(input: &FieldInput) -> Result<Rational, String> {
    if let FieldInput::Text(text) = input {
        if let Some((num, den)) = text.split_once('/') {
            let num = parse_int_prefix(num).ok_or_else(|| format!("not a fraction: {}", text))?;
            let den = parse_int_prefix(den).ok_or_else(|| format!("not a fraction: {}", text))?;
            if den == 0 {
                return Err(format!("zero denominator: {}", text));
            }
            return Ok(Rational::new(to_u32(num as f64)?, to_u32(den as f64)?));
        }
    }

    let value = number(input)?;
    if value <= 0.0 {
        return Err(format!("exposure must be positive: {}", value));
    }

    if value >= 1.0 {
        if value.fract() == 0.0 {
            Ok(Rational::new(to_u32(value)?, 1))
        } else {
            Ok(Rational::new(to_u32((value * 100.0).round())?, 100))
        }
    } else {
        Ok(Rational::new(1, to_u32((1.0 / value).round())?))
    }
}

fn number(input: &FieldInput) -> Result<f64, String> {
    input
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("not a number: {}", describe(input)))
}

fn to_u32(value: f64) -> Result<u32, String> {
    if value.is_finite() && value >= 0.0 && value <= u32::MAX as f64 {
        Ok(value as u32)
    } else {
        Err(format!("out of range: {}", value))
    }
}

fn describe(input: &FieldInput) -> String {
    match input {
        FieldInput::Number(n) => n.to_string(),
        FieldInput::Text(s) => format!("{:?}", s),
    }
}

/// Parse the longest leading integer, ignoring leading whitespace.
fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let sign_len = usize::from(text.starts_with(['+', '-']));
    let digits = text[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    text[..sign_len + digits].parse().ok()
}

/// Parse the longest leading decimal number, ignoring leading whitespace.
fn parse_float_prefix(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = usize::from(text.starts_with(['+', '-']));

    let int_digits = bytes[end..].iter().take_while(|b| b.is_ascii_digit()).count();
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = bytes[end + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        end += 1 + frac_digits;
    }

    if int_digits + frac_digits == 0 {
        return None;
    }

    // exponent only counts when followed by digits
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = bytes[exp_end.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    text[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(num: u32, den: u32) -> Rational {
        Rational::new(num, den)
    }

    #[test]
    fn test_exposure_time() {
        assert_eq!(exposure_time(&"1/50".into()), Ok(r(1, 50)));
        assert_eq!(exposure_time(&"2".into()), Ok(r(2, 1)));
        assert_eq!(exposure_time(&"0.02".into()), Ok(r(1, 50)));
        assert_eq!(exposure_time(&"2.5".into()), Ok(r(250, 100)));
        assert_eq!(exposure_time(&FieldInput::Number(0.004)), Ok(r(1, 250)));
        assert_eq!(exposure_time(&FieldInput::Number(30.0)), Ok(r(30, 1)));
        assert_eq!(exposure_time(&"1/8000s".into()), Ok(r(1, 8000)));
    }

    #[test]
    fn test_exposure_time_invalid() {
        assert!(exposure_time(&"fast".into()).is_err());
        assert!(exposure_time(&"1/0".into()).is_err());
        assert!(exposure_time(&"a/50".into()).is_err());
        assert!(exposure_time(&"-0.5".into()).is_err());
    }

    #[test]
    fn test_f_number() {
        assert_eq!(f_number(&FieldInput::Number(1.8)), Ok(r(180, 100)));
        assert_eq!(f_number(&"2.8".into()), Ok(r(280, 100)));
        assert_eq!(f_number(&"16".into()), Ok(r(1600, 100)));
        assert!(f_number(&"f/2".into()).is_err());
    }

    #[test]
    fn test_focal_length() {
        assert_eq!(focal_length(&"35mm".into()), Ok(r(35, 1)));
        assert_eq!(focal_length(&FieldInput::Number(23.4)), Ok(r(23, 1)));
        assert_eq!(focal_length(&"50.5".into()), Ok(r(51, 1)));
        assert!(focal_length(&"wide".into()).is_err());
    }

    #[test]
    fn test_iso() {
        assert_eq!(iso(&"400".into()), Ok(400));
        assert_eq!(iso(&" 3200 ISO".into()), Ok(3200));
        assert_eq!(iso(&FieldInput::Number(100.7)), Ok(100));
        assert!(iso(&"ISO 100".into()).is_err());
        assert!(iso(&"70000".into()).is_err());
        assert!(iso(&"-5".into()).is_err());
    }

    #[test]
    fn test_parse_prefixes() {
        assert_eq!(parse_int_prefix("  42abc"), Some(42));
        assert_eq!(parse_int_prefix("-7"), Some(-7));
        assert_eq!(parse_int_prefix("x1"), None);
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("1e3x"), Some(1000.0));
        assert_eq!(parse_float_prefix("2e"), Some(2.0));
        assert_eq!(parse_float_prefix("-"), None);
        assert_eq!(parse_float_prefix("."), None);
    }

    #[test]
    fn test_deserialize_mixed_inputs() {
        let fields: ExifFields = serde_json::from_str(
            r#"{"title":"Dunes","iso":"400","fNumber":1.8,"exposureTime":"1/125","focalLength":null}"#,
        )
        .unwrap();

        assert_eq!(fields.title.as_deref(), Some("Dunes"));
        assert_eq!(fields.iso, Some(FieldInput::Text("400".into())));
        assert_eq!(fields.f_number, Some(FieldInput::Number(1.8)));
        assert_eq!(fields.focal_length, None);
    }

    #[test]
    fn test_apply() {
        let fields = ExifFields {
            title: Some("Dunes".into()),
            make: Some("FUJIFILM".into()),
            lens: Some("XF23mmF2".into()),
            iso: Some("800".into()),
            f_number: Some(FieldInput::Number(2.0)),
            exposure_time: Some("1/250".into()),
            ..Default::default()
        };

        let mut data = ExifData::default();
        assert_eq!(fields.apply(&mut data).unwrap(), 6);

        assert_eq!(
            data.get(IfdKind::Zeroth, image::IMAGE_DESCRIPTION),
            Some(&TagValue::Ascii("Dunes".into()))
        );
        assert_eq!(
            data.get(IfdKind::Exif, exif::LENS_MODEL),
            Some(&TagValue::Ascii("XF23mmF2".into()))
        );
        assert_eq!(
            data.get(IfdKind::Exif, exif::ISO_SPEED_RATINGS),
            Some(&TagValue::Short(vec![800]))
        );
        assert_eq!(
            data.get(IfdKind::Exif, exif::EXPOSURE_TIME),
            Some(&TagValue::Rational(vec![r(1, 250)]))
        );
        assert!(data.get(IfdKind::Zeroth, image::MODEL).is_none());
    }

    #[test]
    fn test_blank_numbers_are_ignored() {
        let fields = ExifFields {
            iso: Some("".into()),
            focal_length: Some(FieldInput::Number(0.0)),
            ..Default::default()
        };
        assert!(fields.is_empty());

        let mut data = ExifData::default();
        assert_eq!(fields.apply(&mut data).unwrap(), 0);
        assert!(data.is_empty());
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let fields = ExifFields {
            make: Some("Leica".into()),
            f_number: Some("wide open".into()),
            ..Default::default()
        };

        let mut data = ExifData::default();
        let err = fields.apply(&mut data).unwrap_err();
        assert!(matches!(err, ExifError::InvalidValue { tag, .. } if tag == exif::F_NUMBER));
        assert!(data.is_empty());
    }
}
