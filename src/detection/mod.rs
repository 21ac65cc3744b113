pub mod labels;
pub mod runner;
pub mod types;

pub use labels::{LabelTally, RipenessLabel, SpoilageLabel};
pub use runner::{detect, tally};
pub use types::{BoundingBox, Detection, DetectionModel};
