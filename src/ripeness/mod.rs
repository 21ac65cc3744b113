pub mod aggregator;
pub mod pipeline;
pub mod types;

pub use aggregator::{aggregate, from_counts};
pub use pipeline::RipenessPipeline;
pub use types::RipenessResult;
