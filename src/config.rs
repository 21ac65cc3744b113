use crate::utils::error::PredictError;
use crate::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,

    /// Directory holding the ONNX weight files
    pub models_dir: PathBuf,

    /// Directory where uploaded crop photos are stored
    pub upload_dir: PathBuf,

    /// Ripeness model weights, relative to `models_dir`
    pub ripeness_model_file: String,

    /// Spoilage model weights, relative to `models_dir`
    pub spoilage_model_file: String,

    /// Number of runtime worker threads
    pub workers: usize,

    /// Development mode
    pub dev_mode: bool,

    pub onnx_config: OnnxConfig,

    pub server_config: ServerConfig,

    pub detection_config: DetectionConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// Intra-op threads per session
    pub intra_threads: usize,

    /// Graph optimization level (0-3)
    pub optimization_level: i32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Minimum confidence for a detection to be counted
    pub confidence_threshold: f32,

    /// IoU above which overlapping boxes of the same class are suppressed
    pub iou_threshold: f32,

    /// Square model input edge in pixels
    pub input_size: u32,

    /// Upper bound on detections kept per image
    pub max_detections: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            input_size: 640,
            max_detections: 300,
        }
    }
}

impl Config {
    pub fn new(
        bind_addr: String,
        models_dir: String,
        upload_dir: String,
        workers: Option<usize>,
        dev_mode: bool,
    ) -> Result<Self> {
        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores);

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores / 2).max(1), // two sessions share the machine
            optimization_level: 3,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            max_request_size: 20 * 1024 * 1024,
        };

        let config = Self {
            bind_addr,
            models_dir: PathBuf::from(models_dir),
            upload_dir: PathBuf::from(upload_dir),
            ripeness_model_file: "ripe_straw.onnx".to_string(),
            spoilage_model_file: "rotten_straw.onnx".to_string(),
            workers,
            dev_mode,
            onnx_config,
            server_config,
            detection_config: DetectionConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_detection(mut self, detection_config: DetectionConfig) -> Result<Self> {
        self.detection_config = detection_config;
        self.validate()?;
        Ok(self)
    }

    pub fn with_model_files(
        mut self,
        ripeness_model_file: impl Into<String>,
        spoilage_model_file: impl Into<String>,
    ) -> Self {
        self.ripeness_model_file = ripeness_model_file.into();
        self.spoilage_model_file = spoilage_model_file.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        let detection = &self.detection_config;
        if !(0.0..=1.0).contains(&detection.confidence_threshold) {
            return Err(PredictError::Config(format!(
                "confidence threshold must be within [0, 1], got {}",
                detection.confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&detection.iou_threshold) {
            return Err(PredictError::Config(format!(
                "IoU threshold must be within [0, 1], got {}",
                detection.iou_threshold
            )));
        }
        if detection.input_size == 0 {
            return Err(PredictError::Config("input size must be positive".to_string()));
        }
        if self.workers == 0 {
            return Err(PredictError::Config("worker count must be positive".to_string()));
        }
        Ok(())
    }

    /// Path of the ripe/unripe detector weights
    pub fn ripeness_model_path(&self) -> PathBuf {
        self.models_dir.join(&self.ripeness_model_file)
    }

    /// Path of the healthy/spoiled detector weights
    pub fn spoilage_model_path(&self) -> PathBuf {
        self.models_dir.join(&self.spoilage_model_file)
    }
}
