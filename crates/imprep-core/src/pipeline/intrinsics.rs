//! Pinhole camera intrinsics from EXIF tags.
//!
//! `f_px = f_mm * width_px / sensor_width_mm`, square pixels, principal point
//! at the image centre. No distortion model.

use super::sensor::SensorSizeTable;
use crate::types::{CameraIntrinsics, TagMap};

/// Derives a 3×3 intrinsics matrix from tags and a sensor table.
pub struct IntrinsicsResolver;

impl IntrinsicsResolver {
    /// Resolve intrinsics using the pixel size recorded in the tags.
    ///
    /// Returns `None` when the model is unknown to the table or any of the
    /// required tags (model, focal length, pixel size) is missing.
    pub fn resolve(tags: &TagMap, sensors: &SensorSizeTable) -> Option<CameraIntrinsics> {
        let (width, height) = tags.image_size()?;
        Self::resolve_with_size(tags, sensors, width, height)
    }

    /// Resolve intrinsics with caller-provided pixel dimensions.
    pub fn resolve_with_size(
        tags: &TagMap,
        sensors: &SensorSizeTable,
        width: u32,
        height: u32,
    ) -> Option<CameraIntrinsics> {
        let model = tags.camera_model()?;
        let Some(sensor_width_mm) = sensors.lookup_camera(tags.camera_make(), model) else {
            tracing::debug!("No sensor width for camera model {:?}", model);
            return None;
        };
        let focal_mm = tags.focal_length_mm().filter(|f| *f > 0.0)?;
        if width == 0 || height == 0 || sensor_width_mm <= 0.0 {
            return None;
        }

        let focal_px = focal_mm * width as f64 / sensor_width_mm;
        Some(CameraIntrinsics::new(
            focal_px,
            width as f64 / 2.0,
            height as f64 / 2.0,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TagValue;

    fn tags(model: Option<&str>) -> TagMap {
        let mut tags = TagMap::new();
        if let Some(model) = model {
            tags.insert("Model", TagValue::Text(model.into()));
        }
        tags.insert("FocalLength", TagValue::Rational(8.8));
        tags.insert("PixelXDimension", TagValue::Integers(vec![5472]));
        tags.insert("PixelYDimension", TagValue::Integers(vec![3648]));
        tags
    }

    #[test]
    fn test_resolve_known_camera() {
        let k = IntrinsicsResolver::resolve(&tags(Some("FC6310")), &SensorSizeTable::builtin())
            .unwrap();
        let expected = 8.8 * 5472.0 / 13.2;
        assert!((k.focal_px() - expected).abs() < 1e-9);
        assert_eq!(k.principal_point(), (2736.0, 1824.0));
        let m = k.matrix();
        assert_eq!(m[0][0], m[1][1]);
        assert_eq!(m[0][1], 0.0);
        assert_eq!(m[1][0], 0.0);
        assert_eq!(m[2], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_missing_model_is_none() {
        assert!(IntrinsicsResolver::resolve(&tags(None), &SensorSizeTable::builtin()).is_none());
    }

    #[test]
    fn test_unknown_model_is_none() {
        let table = SensorSizeTable::builtin();
        assert!(IntrinsicsResolver::resolve(&tags(Some("Mystery 9000")), &table).is_none());
    }

    #[test]
    fn test_missing_focal_length_is_none() {
        let mut t = TagMap::new();
        t.insert("Model", TagValue::Text("FC6310".into()));
        t.insert("PixelXDimension", TagValue::Integers(vec![5472]));
        t.insert("PixelYDimension", TagValue::Integers(vec![3648]));
        assert!(IntrinsicsResolver::resolve(&t, &SensorSizeTable::builtin()).is_none());
    }

    #[test]
    fn test_resolve_with_explicit_size() {
        let mut t = TagMap::new();
        t.insert("Model", TagValue::Text("FC6310".into()));
        t.insert("FocalLength", TagValue::Rational(8.8));
        let table = SensorSizeTable::builtin();
        assert!(IntrinsicsResolver::resolve(&t, &table).is_none());
        let k = IntrinsicsResolver::resolve_with_size(&t, &table, 1320, 880).unwrap();
        assert!((k.focal_px() - 880.0).abs() < 1e-9);
        assert_eq!(k.principal_point(), (660.0, 440.0));
    }
}
