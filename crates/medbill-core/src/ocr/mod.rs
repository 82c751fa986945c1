//! OCR backends for pages without a text layer.

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::{OcrEnginePool, PureOcrEngine};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Anything that can turn a page image into text.
///
/// Implementations are shared across OCR workers, so they must be
/// `Send + Sync`; an implementation whose engine is not safe for concurrent
/// use has to keep one engine per worker.
pub trait OcrBackend: Send + Sync {
    /// Recognize text in an image. An image without text yields `""`.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        (**self).recognize(image)
    }
}

/// Backend standing in for an OCR engine that could not be loaded.
///
/// Every call fails with the load error, so documents with a text layer
/// still work while scanned pages surface the failure.
#[derive(Debug, Clone)]
pub struct UnavailableOcr {
    reason: String,
}

impl UnavailableOcr {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl OcrBackend for UnavailableOcr {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        Err(OcrError::ModelLoad(self.reason.clone()))
    }
}

/// A detected text box with its coordinates and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4) for quadrilateral.
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }

    fn center_y(&self) -> f32 {
        let (_, top, _, bottom) = self.rect();
        (top + bottom) / 2.0
    }

    fn height(&self) -> f32 {
        let (_, top, _, bottom) = self.rect();
        bottom - top
    }
}

/// Result of OCR processing on an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    /// Recognized text boxes in reading order.
    pub boxes: Vec<TextBox>,

    /// Full text, one line per visual row.
    pub text: String,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,

    /// Image dimensions (width, height).
    pub image_size: (u32, u32),
}

impl OcrResult {
    /// Build a result from unordered boxes.
    pub fn from_boxes(boxes: Vec<TextBox>, processing_time_ms: u64, image_size: (u32, u32)) -> Self {
        let rows = group_rows(boxes);
        let text = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| b.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            boxes: rows.into_iter().flatten().collect(),
            text,
            processing_time_ms,
            image_size,
        }
    }
}

/// Group boxes into visual rows, top to bottom, each sorted left to right.
///
/// A box joins the current row when its vertical centre is within half a
/// box height of the row's mean centre. Bill rows must stay on one line for
/// the line parser to see the name and its numbers together.
fn group_rows(mut boxes: Vec<TextBox>) -> Vec<Vec<TextBox>> {
    boxes.sort_by(|a, b| a.center_y().total_cmp(&b.center_y()));

    let mut rows: Vec<Vec<TextBox>> = Vec::new();
    // (sum of centres, sum of heights) of the open row
    let mut sums = (0.0f32, 0.0f32);

    for b in boxes {
        let center = b.center_y();
        let height = b.height();

        let joins = match rows.last() {
            Some(row) => {
                let n = row.len() as f32;
                let tolerance = (sums.1 / n).max(height) / 2.0;
                (center - sums.0 / n).abs() <= tolerance
            }
            None => false,
        };

        if joins {
            sums = (sums.0 + center, sums.1 + height);
            if let Some(row) = rows.last_mut() {
                row.push(b);
            }
        } else {
            sums = (center, height);
            rows.push(vec![b]);
        }
    }

    for row in &mut rows {
        row.sort_by(|a, b| a.rect().0.total_cmp(&b.rect().0));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_box(x: f32, y: f32, text: &str) -> TextBox {
        TextBox {
            bbox: [x, y, x + 50.0, y, x + 50.0, y + 10.0, x, y + 10.0],
            text: text.to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_rows_joined_with_spaces() {
        let boxes = vec![
            text_box(300.0, 102.0, "21.00"),
            text_box(10.0, 40.0, "CITY PHARMACY"),
            text_box(10.0, 100.0, "Paracetamol"),
            text_box(200.0, 101.0, "2"),
        ];

        let result = OcrResult::from_boxes(boxes, 5, (600, 800));
        assert_eq!(result.text, "CITY PHARMACY\nParacetamol 2 21.00");
        assert_eq!(result.boxes[0].text, "CITY PHARMACY");
    }

    #[test]
    fn test_row_straddling_band_edge_stays_together() {
        let boxes = vec![
            text_box(400.0, 101.0, "50"),
            text_box(10.0, 99.0, "Syringe"),
            text_box(300.0, 100.5, "10"),
            text_box(200.0, 101.0, "5"),
            text_box(10.0, 120.0, "Gloves 2 15 30"),
        ];

        let result = OcrResult::from_boxes(boxes, 0, (600, 800));
        assert_eq!(result.text, "Syringe 5 10 50\nGloves 2 15 30");

        let item = crate::bill::parse_line(result.text.lines().next().unwrap()).unwrap();
        assert_eq!(item.name, "Syringe");
        assert_eq!(item.amount, 50.0);
    }

    #[test]
    fn test_empty_boxes() {
        let result = OcrResult::from_boxes(Vec::new(), 0, (10, 10));
        assert_eq!(result.text, "");
    }
}
