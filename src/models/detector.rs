use crate::detection::{Detection, DetectionModel};
use crate::image::{parse_class_names, ImagePreprocessor, YoloDecoder};
use crate::utils::error::PredictError;
use crate::{Config, Result};
use image::DynamicImage;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// YOLOv8 ONNX export wrapped as a [`DetectionModel`].
pub struct YoloDetector {
    name: String,
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
    class_names: Vec<String>,
    input_size: u32,
    iou_threshold: f32,
    max_detections: usize,
}

impl YoloDetector {
    pub fn new(name: &str, model_path: &Path, config: &Config) -> Result<Self> {
        if !model_path.exists() {
            return Err(PredictError::ModelLoad(format!(
                "{} model not found: {}",
                name,
                model_path.display()
            )));
        }

        tracing::info!("Loading {} model from: {}", name, model_path.display());

        let load_err = |e: ort::Error| {
            PredictError::ModelLoad(format!("{} model ({}): {}", name, model_path.display(), e))
        };

        let session = Session::builder()
            .map_err(load_err)?
            .with_optimization_level(optimization_level(config.onnx_config.optimization_level))
            .map_err(load_err)?
            .with_intra_threads(config.onnx_config.intra_threads)
            .map_err(load_err)?
            .commit_from_file(model_path)
            .map_err(load_err)?;

        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => {
                return Err(PredictError::ModelLoad(format!("{} model has no inputs", name)));
            }
        };
        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => {
                return Err(PredictError::ModelLoad(format!("{} model has no outputs", name)));
            }
        };

        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("{} output[{}]: '{}'", name, i, output.name);
        }

        let class_names = session
            .metadata()
            .ok()
            .and_then(|metadata| metadata.custom("names").ok().flatten())
            .map(|raw| parse_class_names(&raw))
            .unwrap_or_default();

        if class_names.is_empty() {
            tracing::warn!("{} model carries no class names, using class_<id> labels", name);
        } else {
            tracing::info!("{} model classes: {:?}", name, class_names);
        }

        let detection = &config.detection_config;
        Ok(Self {
            name: name.to_string(),
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
            class_names,
            input_size: detection.input_size,
            iou_threshold: detection.iou_threshold,
            max_detections: detection.max_detections,
        })
    }
}

impl DetectionModel for YoloDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, image: &DynamicImage, confidence_threshold: f32) -> Result<Vec<Detection>> {
        let (input, letterbox) = ImagePreprocessor::letterbox(image, self.input_size);

        let inference_err = |e: ort::Error| PredictError::Inference(format!("{}: {}", self.name, e));
        let input_tensor = Tensor::from_array(input).map_err(inference_err)?;

        let prediction = {
            let mut session = self.session.lock();
            let outputs = session
                .run(inputs![self.input_name.as_str() => input_tensor])
                .map_err(inference_err)?;

            let array = match outputs.get(self.output_name.as_str()) {
                Some(output) => output
                    .try_extract_array::<f32>()
                    .map_err(inference_err)?
                    .into_owned(),
                None => {
                    let available: Vec<String> = outputs.keys().map(|s| s.to_string()).collect();
                    return Err(PredictError::Inference(format!(
                        "{}: output '{}' not found. Available outputs: {:?}",
                        self.name, self.output_name, available
                    )));
                }
            };
            array
        };

        let decoder = YoloDecoder {
            class_names: &self.class_names,
            confidence_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        };
        decoder.decode(prediction.view(), &letterbox)
    }
}

fn optimization_level(level: i32) -> GraphOptimizationLevel {
    match level {
        i32::MIN..=0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_weights_are_a_load_error() {
        let config = Config::new(
            "127.0.0.1:0".to_string(),
            "/nonexistent/models".to_string(),
            "uploads".to_string(),
            Some(1),
            false,
        )
        .unwrap();

        let err = YoloDetector::new("ripeness", &config.ripeness_model_path(), &config)
            .err()
            .unwrap();
        assert!(matches!(err, PredictError::ModelLoad(msg) if msg.contains("ripe_straw.onnx")));
    }

    #[test]
    fn optimization_levels_clamp() {
        assert!(matches!(optimization_level(-1), GraphOptimizationLevel::Disable));
        assert!(matches!(optimization_level(9), GraphOptimizationLevel::Level3));
    }
}
