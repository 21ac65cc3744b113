pub mod config;
pub mod detection;
pub mod image;
pub mod models;
pub mod ripeness;
pub mod storage;
pub mod utils;
pub mod web;

pub use config::Config;
pub use ripeness::{RipenessPipeline, RipenessResult};
pub use utils::error::PredictError;

pub type Result<T> = std::result::Result<T, PredictError>;
