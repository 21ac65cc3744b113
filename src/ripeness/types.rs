use serde::Serialize;

/// Ripeness estimate for one crop photo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RipenessResult {
    pub ripe: usize,
    pub unripe: usize,
    pub healthy: usize,
    /// Any spoiled detection at all, regardless of count
    pub spoiled: bool,
    pub total: usize,
    /// `ripe / total * 100` rounded to one decimal, `0.0` when `total == 0`
    pub ripeness_percent: f64,
}

impl RipenessResult {
    pub fn empty() -> Self {
        Self {
            ripe: 0,
            unripe: 0,
            healthy: 0,
            spoiled: false,
            total: 0,
            ripeness_percent: 0.0,
        }
    }
}
