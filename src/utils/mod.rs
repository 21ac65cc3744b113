pub mod error;

pub use error::PredictError;
