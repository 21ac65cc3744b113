use super::aggregator::aggregate;
use super::types::RipenessResult;
use crate::detection::{self, LabelTally, RipenessLabel, SpoilageLabel};
use crate::image::ImageLoader;
use crate::models::{LoadedModels, ModelRegistry};
use crate::Result;
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;

/// Image bytes → both detectors → [`RipenessResult`].
///
/// Blocking; web handlers call it from `spawn_blocking`.
pub struct RipenessPipeline {
    registry: Arc<ModelRegistry>,
    confidence_threshold: f32,
}

impl RipenessPipeline {
    pub fn new(registry: Arc<ModelRegistry>, confidence_threshold: f32) -> Self {
        Self {
            registry,
            confidence_threshold,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn predict(&self, image_bytes: &[u8]) -> Result<RipenessResult> {
        let models = self.registry.ensure_loaded()?;
        let image = ImageLoader::from_bytes(image_bytes)?;
        self.predict_image(&models, &image)
    }

    fn predict_image(
        &self,
        models: &LoadedModels,
        image: &DynamicImage,
    ) -> Result<RipenessResult> {
        let start = Instant::now();

        let ripeness_detections =
            detection::detect(models.ripeness.as_ref(), image, self.confidence_threshold)?;
        let spoilage_detections =
            detection::detect(models.spoilage.as_ref(), image, self.confidence_threshold)?;

        let ripeness_tally: LabelTally<RipenessLabel> = detection::tally(&ripeness_detections);
        let spoilage_tally: LabelTally<SpoilageLabel> = detection::tally(&spoilage_detections);

        if ripeness_tally.is_empty() && spoilage_tally.is_empty() {
            tracing::info!(
                "No fruit detected, time={:.3}s",
                start.elapsed().as_secs_f32()
            );
            return Ok(RipenessResult::empty());
        }

        tracing::debug!(
            "Tallies: ripeness={:?} ({} total), spoilage={:?} ({} total)",
            ripeness_tally.to_named_counts(),
            ripeness_tally.total(),
            spoilage_tally.to_named_counts(),
            spoilage_tally.total()
        );

        let result = aggregate(&ripeness_tally, &spoilage_tally);

        tracing::info!(
            "Ripeness predicted: ripe={}, unripe={}, healthy={}, spoiled={}, total={}, percent={:.1}, time={:.3}s",
            result.ripe,
            result.unripe,
            result.healthy,
            result.spoiled,
            result.total,
            result.ripeness_percent,
            start.elapsed().as_secs_f32()
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BoundingBox, Detection, DetectionModel};
    use crate::models::{ModelKind, ModelLoader};
    use crate::utils::error::PredictError;
    use image::ImageFormat;
    use std::io::Cursor;

    struct ScriptedModel {
        name: &'static str,
        detections: Vec<(&'static str, f32)>,
    }

    impl DetectionModel for ScriptedModel {
        fn name(&self) -> &str {
            self.name
        }

        fn detect(&self, _image: &DynamicImage, _threshold: f32) -> Result<Vec<Detection>> {
            Ok(self
                .detections
                .iter()
                .map(|(label, conf)| Detection::new(0, *label, *conf, BoundingBox::default()))
                .collect())
        }
    }

    struct ScriptedLoader {
        ripeness: Vec<(&'static str, f32)>,
        spoilage: Vec<(&'static str, f32)>,
        fail: bool,
    }

    impl ModelLoader for ScriptedLoader {
        fn load(&self, kind: ModelKind) -> Result<Arc<dyn DetectionModel>> {
            if self.fail {
                return Err(PredictError::ModelLoad("weights missing".to_string()));
            }
            let detections = match kind {
                ModelKind::Ripeness => self.ripeness.clone(),
                ModelKind::Spoilage => self.spoilage.clone(),
            };
            Ok(Arc::new(ScriptedModel {
                name: kind.name(),
                detections,
            }))
        }
    }

    fn pipeline(loader: ScriptedLoader) -> RipenessPipeline {
        RipenessPipeline::new(Arc::new(ModelRegistry::new(loader)), 0.25)
    }

    fn jpeg() -> Vec<u8> {
        let mut buffer = Vec::new();
        DynamicImage::new_rgb8(64, 64)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .unwrap();
        buffer
    }

    #[test]
    fn predicts_from_both_models() {
        let pipeline = pipeline(ScriptedLoader {
            ripeness: vec![("straw-ripe", 0.9), ("straw-ripe", 0.8), ("straw-ripe", 0.7), ("straw-unripe", 0.6)],
            spoilage: vec![("strwa_healthy", 0.5), ("strwa_healthy", 0.1)],
            fail: false,
        });

        let result = pipeline.predict(&jpeg()).unwrap();
        assert_eq!(result.ripe, 3);
        assert_eq!(result.unripe, 1);
        assert_eq!(result.healthy, 1);
        assert_eq!(result.total, 4);
        assert_eq!(result.ripeness_percent, 75.0);
        assert!(!result.spoiled);
    }

    #[test]
    fn no_detections_is_a_valid_zero_result() {
        let pipeline = pipeline(ScriptedLoader {
            ripeness: Vec::new(),
            spoilage: Vec::new(),
            fail: false,
        });
        assert_eq!(pipeline.predict(&jpeg()).unwrap(), RipenessResult::empty());
    }

    #[test]
    fn load_failure_is_reported_not_defaulted() {
        let pipeline = pipeline(ScriptedLoader {
            ripeness: Vec::new(),
            spoilage: Vec::new(),
            fail: true,
        });
        assert!(matches!(pipeline.predict(&jpeg()), Err(PredictError::ModelLoad(_))));
    }

    #[test]
    fn undecodable_bytes_are_invalid_image() {
        let pipeline = pipeline(ScriptedLoader {
            ripeness: Vec::new(),
            spoilage: Vec::new(),
            fail: false,
        });
        assert!(matches!(
            pipeline.predict(b"GIF89a-but-not-really"),
            Err(PredictError::InvalidImage(_))
        ));
    }
}
