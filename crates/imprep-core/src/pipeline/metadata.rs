//! EXIF metadata extraction into a [`TagMap`].

use exif::{In, Reader, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::MetadataError;
use crate::types::{TagMap, TagValue};

/// Reads the embedded EXIF block of an image file.
pub struct MetadataReader;

impl MetadataReader {
    /// Extract every primary-IFD field of `path` into a tag map.
    ///
    /// The file is opened read-only. A file that cannot be opened, carries no
    /// EXIF container, or whose container has no primary fields is reported
    /// as [`MetadataError::Unreadable`].
    pub fn read(path: &Path) -> Result<TagMap, MetadataError> {
        let file =
            File::open(path).map_err(|e| MetadataError::unreadable(path, e.to_string()))?;
        let mut reader = BufReader::new(file);
        let exif = Reader::new()
            .read_from_container(&mut reader)
            .map_err(|e| MetadataError::unreadable(path, e.to_string()))?;

        let tags: TagMap = exif
            .fields()
            .filter(|f| f.ifd_num == In::PRIMARY)
            .map(|f| (f.tag.to_string(), Self::convert(&f.value)))
            .collect();

        if tags.is_empty() {
            return Err(MetadataError::unreadable(path, "no EXIF fields found"));
        }

        tracing::trace!("Read {} tags from {:?}", tags.len(), path);
        Ok(tags)
    }

    /// Map an EXIF value onto the reduced `TagValue` model.
    fn convert(value: &Value) -> TagValue {
        match value {
            Value::Ascii(strings) => {
                let text = strings
                    .first()
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .unwrap_or_default();
                TagValue::Text(text.trim_end_matches('\0').trim().to_string())
            }
            Value::Byte(v) => TagValue::Integers(v.iter().map(|&x| x as i64).collect()),
            Value::Short(v) => TagValue::Integers(v.iter().map(|&x| x as i64).collect()),
            Value::Long(v) => TagValue::Integers(v.iter().map(|&x| x as i64).collect()),
            Value::SByte(v) => TagValue::Integers(v.iter().map(|&x| x as i64).collect()),
            Value::SShort(v) => TagValue::Integers(v.iter().map(|&x| x as i64).collect()),
            Value::SLong(v) => TagValue::Integers(v.iter().map(|&x| x as i64).collect()),
            Value::Rational(v) => Self::rationals(v.iter().map(|r| r.to_f64()).collect()),
            Value::SRational(v) => Self::rationals(v.iter().map(|r| r.to_f64()).collect()),
            Value::Float(v) => Self::rationals(v.iter().map(|&x| x as f64).collect()),
            Value::Double(v) => Self::rationals(v.clone()),
            Value::Undefined(bytes, _) => TagValue::Bytes(bytes.len()),
            Value::Unknown(_, count, _) => TagValue::Bytes(*count as usize),
            #[allow(unreachable_patterns)]
            _ => TagValue::Bytes(0),
        }
    }

    fn rationals(values: Vec<f64>) -> TagValue {
        if values.len() == 1 {
            TagValue::Rational(values[0])
        } else {
            TagValue::Rationals(values)
        }
    }
}
