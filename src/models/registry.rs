use crate::detection::DetectionModel;
use crate::models::YoloDetector;
use crate::utils::error::PredictError;
use crate::{Config, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Ripeness,
    Spoilage,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Ripeness => "ripeness",
            ModelKind::Spoilage => "spoilage",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds a detection model from its weight source.
pub trait ModelLoader: Send + Sync {
    fn load(&self, kind: ModelKind) -> Result<Arc<dyn DetectionModel>>;
}

/// Loads YOLO ONNX weights from the configured models directory.
pub struct OnnxModelLoader {
    config: Config,
}

impl OnnxModelLoader {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self, kind: ModelKind) -> Result<Arc<dyn DetectionModel>> {
        let path = match kind {
            ModelKind::Ripeness => self.config.ripeness_model_path(),
            ModelKind::Spoilage => self.config.spoilage_model_path(),
        };
        let detector = YoloDetector::new(kind.name(), &path, &self.config)?;
        Ok(Arc::new(detector))
    }
}

/// Both models, handed out together so callers never see half a load.
#[derive(Clone)]
pub struct LoadedModels {
    pub ripeness: Arc<dyn DetectionModel>,
    pub spoilage: Arc<dyn DetectionModel>,
}

/// Holds at most one instance of each model, created on first use.
///
/// The load runs under the models lock, so concurrent first requests wait for
/// the in-flight attempt. Waiters whose attempt failed get that same error
/// back; only requests arriving after the failure try again.
pub struct ModelRegistry {
    loader: Box<dyn ModelLoader>,
    models: Mutex<Option<LoadedModels>>,
    /// Held only briefly, never across a load
    last_error: Mutex<Option<String>>,
    attempts: AtomicU64,
    ready: AtomicBool,
}

impl ModelRegistry {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            models: Mutex::new(None),
            last_error: Mutex::new(None),
            attempts: AtomicU64::new(0),
            ready: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(OnnxModelLoader::new(config.clone()))
    }

    /// Returns both models, loading them if either is missing.
    pub fn ensure_loaded(&self) -> Result<LoadedModels> {
        let observed = self.attempts.load(Ordering::Acquire);
        let mut slot = self.models.lock();

        if let Some(models) = slot.as_ref() {
            return Ok(models.clone());
        }

        if self.attempts.load(Ordering::Acquire) > observed {
            if let Some(err) = self.last_error.lock().clone() {
                return Err(PredictError::ModelLoad(err));
            }
        }

        let start = Instant::now();
        tracing::info!("Loading detection models...");

        let outcome = self
            .loader
            .load(ModelKind::Ripeness)
            .and_then(|ripeness| {
                let spoilage = self.loader.load(ModelKind::Spoilage)?;
                Ok(LoadedModels { ripeness, spoilage })
            });

        let result = match outcome {
            Ok(models) => {
                tracing::info!(
                    "Detection models loaded in {:.3}s",
                    start.elapsed().as_secs_f32()
                );
                *slot = Some(models.clone());
                *self.last_error.lock() = None;
                self.ready.store(true, Ordering::Release);
                Ok(models)
            }
            Err(e) => {
                let message = match e {
                    PredictError::ModelLoad(message) => message,
                    other => other.to_string(),
                };
                tracing::error!("Failed to load detection models: {}", message);
                *slot = None;
                *self.last_error.lock() = Some(message.clone());
                Err(PredictError::ModelLoad(message))
            }
        };

        self.attempts.fetch_add(1, Ordering::AcqRel);
        result
    }

    /// True only once both models are loaded. Never blocks on a load.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Number of completed load attempts.
    pub fn load_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Message of the most recent failed load, if the models are still unavailable.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

/// Registry snapshot for the info endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub ready: bool,
    pub load_attempts: u64,
    pub models: Vec<ModelKind>,
    pub intra_threads: usize,
    pub optimization_level: i32,
}

impl ModelStats {
    pub fn collect(registry: &ModelRegistry, config: &Config) -> Self {
        Self {
            ready: registry.is_ready(),
            load_attempts: registry.load_attempts(),
            models: vec![ModelKind::Ripeness, ModelKind::Spoilage],
            intra_threads: config.onnx_config.intra_threads,
            optimization_level: config.onnx_config.optimization_level,
        }
    }
}
