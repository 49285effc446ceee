//! Core annotation model.
//!
//! One [`AnnotationRecord`] describes one image and every bounding box drawn
//! on it. The wire names (`image_url`, `image_details`, `label`, `topX`, ...)
//! follow the JSON-lines layout produced by the upstream labeling tools.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One image and its labeled bounding boxes.
///
/// Only `image_url` is required. Keys this model does not know about are kept
/// in `extra` and written back unchanged, so rewriting a record never loses
/// data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Reference to the image file (a path or URL).
    #[serde(rename = "image_url")]
    pub image_reference: String,

    /// Format and dimensions of the image, passed through untouched.
    ///
    /// Labeling tools disagree on its shape (`7168` vs `7168.0`), and nothing
    /// here reads it, so it stays raw JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_details: Option<Value>,

    /// Bounding boxes drawn on the image, in their original order.
    #[serde(rename = "label", default)]
    pub labels: Vec<BoundingBoxLabel>,

    /// Any other keys found on the input line.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnnotationRecord {
    /// Creates a record with no image details and no extra keys.
    pub fn new(image_reference: impl Into<String>, labels: Vec<BoundingBoxLabel>) -> Self {
        Self {
            image_reference: image_reference.into(),
            image_details: None,
            labels,
            extra: Map::new(),
        }
    }

    /// Sets the image details from a format and pixel size.
    pub fn with_details(mut self, format: impl Into<String>, width: u32, height: u32) -> Self {
        self.image_details = Some(json!({
            "format": format.into(),
            "width": width,
            "height": height,
        }));
        self
    }

    /// Image width from `image_details`, whether written as an integer or a float.
    pub fn width(&self) -> Option<f64> {
        self.detail_number("width")
    }

    /// Image height from `image_details`, whether written as an integer or a float.
    pub fn height(&self) -> Option<f64> {
        self.detail_number("height")
    }

    fn detail_number(&self, key: &str) -> Option<f64> {
        self.image_details.as_ref()?.get(key)?.as_f64()
    }
}

/// A labeled bounding box in normalized `[0, 1]` coordinates.
///
/// Only the class is required; the splitter never looks at coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxLabel {
    /// Class identifier.
    pub label: String,

    #[serde(rename = "topX", default, skip_serializing_if = "Option::is_none")]
    pub top_x: Option<f64>,

    #[serde(rename = "topY", default, skip_serializing_if = "Option::is_none")]
    pub top_y: Option<f64>,

    #[serde(rename = "bottomX", default, skip_serializing_if = "Option::is_none")]
    pub bottom_x: Option<f64>,

    #[serde(rename = "bottomY", default, skip_serializing_if = "Option::is_none")]
    pub bottom_y: Option<f64>,

    /// Any other keys found on the box (e.g. `isCrowd`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BoundingBoxLabel {
    /// Creates a box from its class and corner coordinates.
    pub fn new(label: impl Into<String>, top_x: f64, top_y: f64, bottom_x: f64, bottom_y: f64) -> Self {
        Self {
            label: label.into(),
            top_x: Some(top_x),
            top_y: Some(top_y),
            bottom_x: Some(bottom_x),
            bottom_y: Some(bottom_y),
            extra: Map::new(),
        }
    }
}

/// One bounding box flattened next to its parent image reference.
///
/// Rows sharing a `file_name` always travel together between the train and
/// val sides of a split.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotationRow {
    pub file_name: String,
    pub label: String,
}

/// Flattens records to one row per bounding box, in record then box order.
///
/// Records without boxes contribute no rows.
pub fn flatten_rows(records: &[AnnotationRecord]) -> Vec<AnnotationRow> {
    records
        .iter()
        .flat_map(|record| {
            record.labels.iter().map(move |bbox| AnnotationRow {
                file_name: record.image_reference.clone(),
                label: bbox.label.clone(),
            })
        })
        .collect()
}

/// Splits rows into the parallel `(file_names, labels)` columns the splitter takes.
pub fn unzip_rows(rows: Vec<AnnotationRow>) -> (Vec<String>, Vec<String>) {
    rows.into_iter().map(|row| (row.file_name, row.label)).unzip()
}
