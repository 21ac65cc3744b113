use super::preprocessing::Letterbox;
use crate::detection::{BoundingBox, Detection};
use crate::utils::error::PredictError;
use crate::Result;
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2};
use std::collections::BTreeMap;

/// Decodes YOLOv8-style detection heads into [`Detection`]s.
///
/// The head is `[1, 4 + nc, anchors]` (or its transpose); each anchor holds
/// a centre-format box in model input pixels followed by one score per class.
pub struct YoloDecoder<'a> {
    pub class_names: &'a [String],
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl<'a> YoloDecoder<'a> {
    pub fn decode(&self, output: ArrayViewD<'_, f32>, letterbox: &Letterbox) -> Result<Vec<Detection>> {
        let shape = output.shape().to_vec();
        let head = match shape.as_slice() {
            [1, _, _] => output
                .index_axis(Axis(0), 0)
                .into_dimensionality::<Ix2>()
                .map_err(|e| PredictError::Inference(e.to_string()))?,
            [_, _] => output
                .view()
                .into_dimensionality::<Ix2>()
                .map_err(|e| PredictError::Inference(e.to_string()))?,
            _ => {
                return Err(PredictError::Inference(format!(
                    "Unsupported detection output shape: {:?}",
                    shape
                )))
            }
        };

        let head = if self.is_transposed(head.nrows(), head.ncols()) {
            head.reversed_axes()
        } else {
            head
        };
        if head.nrows() <= 4 {
            return Err(PredictError::Inference(format!(
                "Detection output has no class scores: {:?}",
                shape
            )));
        }

        let candidates = self.candidates(head, letterbox);
        Ok(self.non_max_suppression(candidates))
    }

    /// `[4 + nc, anchors]` is the export layout. The head is read as
    /// `[anchors, 4 + nc]` only when the class count pins the attribute axis
    /// to the columns, or when the rows are too few to hold any class score.
    fn is_transposed(&self, rows: usize, cols: usize) -> bool {
        if self.class_names.is_empty() {
            return rows <= 4 && cols > 4;
        }
        let attributes = 4 + self.class_names.len();
        cols == attributes && rows != attributes
    }

    fn candidates(&self, head: ArrayView2<'_, f32>, letterbox: &Letterbox) -> Vec<Detection> {
        let num_classes = head.nrows() - 4;
        let mut candidates = Vec::new();

        for anchor in head.axis_iter(Axis(1)) {
            let (class_id, confidence) = (0..num_classes)
                .map(|c| (c, anchor[4 + c]))
                .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

            if confidence < self.confidence_threshold {
                continue;
            }

            let raw = BoundingBox::from_center(anchor[0], anchor[1], anchor[2], anchor[3]);
            let (x1, y1) = letterbox.to_original(raw.x1, raw.y1);
            let (x2, y2) = letterbox.to_original(raw.x2, raw.y2);

            candidates.push(Detection::new(
                class_id,
                self.class_name(class_id),
                confidence,
                BoundingBox { x1, y1, x2, y2 },
            ));
        }

        candidates
    }

    /// Greedy class-wise NMS, highest confidence first.
    fn non_max_suppression(&self, mut candidates: Vec<Detection>) -> Vec<Detection> {
        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut kept: Vec<Detection> = Vec::new();
        for candidate in candidates {
            if kept.len() >= self.max_detections {
                break;
            }
            let suppressed = kept.iter().any(|k| {
                k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > self.iou_threshold
            });
            if !suppressed {
                kept.push(candidate);
            }
        }
        kept
    }

    fn class_name(&self, class_id: usize) -> String {
        self.class_names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }
}

/// Parses the `names` metadata written by Ultralytics exports,
/// e.g. `{0: 'straw-ripe', 1: 'straw-unripe'}`.
pub fn parse_class_names(raw: &str) -> Vec<String> {
    let body = raw.trim().trim_start_matches('{').trim_end_matches('}');

    let mut by_id = BTreeMap::new();
    for entry in body.split(',') {
        let Some((id, name)) = entry.split_once(':') else {
            continue;
        };
        let Ok(id) = id.trim().trim_matches(|c| c == '\'' || c == '"').parse::<usize>() else {
            continue;
        };
        let name = name.trim().trim_matches(|c| c == '\'' || c == '"');
        by_id.insert(id, name.to_string());
    }

    let len = by_id.keys().next_back().map_or(0, |max| max + 1);
    (0..len)
        .map(|id| by_id.remove(&id).unwrap_or_else(|| format!("class_{}", id)))
        .collect()
}
