pub mod loader;
pub mod postprocessing;
pub mod preprocessing;

pub use loader::ImageLoader;
pub use postprocessing::{parse_class_names, YoloDecoder};
pub use preprocessing::{ImagePreprocessor, Letterbox};
