pub mod detector;
pub mod registry;

pub use detector::YoloDetector;
pub use registry::{LoadedModels, ModelKind, ModelLoader, ModelRegistry, ModelStats, OnnxModelLoader};
