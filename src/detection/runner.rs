use super::labels::LabelTally;
use super::types::{Detection, DetectionModel};
use crate::Result;
use image::DynamicImage;
use std::hash::Hash;
use std::time::Instant;

/// Runs one model on one image and keeps detections at or above the threshold.
///
/// Model errors are passed through untouched; they already carry the
/// `Inference` variant.
pub fn detect(
    model: &dyn DetectionModel,
    image: &DynamicImage,
    confidence_threshold: f32,
) -> Result<Vec<Detection>> {
    let start = Instant::now();
    let detections: Vec<Detection> = model
        .detect(image, confidence_threshold)?
        .into_iter()
        .filter(|d| d.confidence >= confidence_threshold)
        .collect();

    tracing::debug!(
        "{} model: {} detections >= {:.2} in {:.3}s",
        model.name(),
        detections.len(),
        confidence_threshold,
        start.elapsed().as_secs_f32()
    );

    Ok(detections)
}

pub fn tally<L>(detections: &[Detection]) -> LabelTally<L>
where
    L: Eq + Hash + for<'a> From<&'a str>,
{
    LabelTally::from_labels(detections.iter().map(|d| d.label.as_str()))
}
