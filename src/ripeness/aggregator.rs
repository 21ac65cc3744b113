use super::types::RipenessResult;
use crate::detection::{LabelTally, RipenessLabel, SpoilageLabel};

/// Combines both models' tallies into a [`RipenessResult`].
///
/// The ripeness model decides `total` whenever it saw any ripe or unripe
/// fruit. Only when it saw none does `total` fall back to the spoilage
/// model's healthy count; spoiled detections never contribute to `total`.
pub fn aggregate(
    ripeness: &LabelTally<RipenessLabel>,
    spoilage: &LabelTally<SpoilageLabel>,
) -> RipenessResult {
    from_counts(
        ripeness.get(&RipenessLabel::Ripe),
        ripeness.get(&RipenessLabel::Unripe),
        spoilage.get(&SpoilageLabel::Healthy),
        spoilage.get(&SpoilageLabel::Spoiled),
    )
}

pub fn from_counts(ripe: usize, unripe: usize, healthy: usize, spoiled_count: usize) -> RipenessResult {
    let spoiled = spoiled_count > 0;

    // TODO: confirm with product whether the fallback should be healthy + spoiled
    let total = if ripe + unripe > 0 { ripe + unripe } else { healthy };

    let ripeness_percent = if total > 0 {
        round_one_decimal(ripe as f64 / total as f64 * 100.0)
    } else {
        0.0
    };

    RipenessResult {
        ripe,
        unripe,
        healthy,
        spoiled,
        total,
        ripeness_percent,
    }
}

/// Rounds the exact binary value of `value`, breaking exact ties to even:
/// 12.25 gives 12.2, while 0.05 (stored slightly above the tie) gives 0.1.
fn round_one_decimal(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_one_decimal(value: f64) -> bool {
        let scaled = value * 10.0;
        (scaled - scaled.round()).abs() < 1e-9
    }

    #[test]
    fn ripeness_model_drives_total() {
        let result = from_counts(3, 1, 0, 0);
        assert_eq!(result.total, 4);
        assert_eq!(result.ripeness_percent, 75.0);
        assert!(!result.spoiled);
    }

    #[test]
    fn falls_back_to_healthy_count() {
        let result = from_counts(0, 0, 5, 2);
        assert_eq!(result.total, 5);
        assert_eq!(result.ripeness_percent, 0.0);
        assert!(result.spoiled);
    }

    #[test]
    fn nothing_detected_is_a_zero_result() {
        let result = from_counts(0, 0, 0, 0);
        assert_eq!(result, RipenessResult::empty());
    }

    #[test]
    fn ripeness_precedence_ignores_healthy() {
        let result = from_counts(2, 0, 10, 0);
        assert_eq!(result.total, 2);
        assert_eq!(result.ripeness_percent, 100.0);
    }

    #[test]
    fn spoiled_only_keeps_total_at_healthy() {
        let result = from_counts(0, 0, 0, 3);
        assert_eq!(result.total, 0);
        assert_eq!(result.ripeness_percent, 0.0);
        assert!(result.spoiled);
    }

    #[test]
    fn spoiled_flag_ignores_count() {
        assert_eq!(from_counts(1, 1, 0, 1), from_counts(1, 1, 0, 50));
    }

    #[test]
    fn total_follows_precedence_for_all_small_inputs() {
        for ripe in 0..12 {
            for unripe in 0..12 {
                for healthy in 0..12 {
                    for spoiled in [0, 1, 7] {
                        let result = from_counts(ripe, unripe, healthy, spoiled);
                        if ripe + unripe > 0 {
                            assert_eq!(result.total, ripe + unripe);
                        } else {
                            assert_eq!(result.total, healthy);
                        }
                        assert!((0.0..=100.0).contains(&result.ripeness_percent));
                        assert!(has_one_decimal(result.ripeness_percent));
                        assert_eq!(result.spoiled, spoiled > 0);
                    }
                }
            }
        }
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(from_counts(1, 2, 0, 0).ripeness_percent, 33.3);
        assert_eq!(from_counts(2, 1, 0, 0).ripeness_percent, 66.7);
        assert_eq!(from_counts(1, 5, 0, 0).ripeness_percent, 16.7);
        assert_eq!(from_counts(1, 7, 0, 0).ripeness_percent, 12.5);
        assert_eq!(from_counts(49, 351, 0, 0).ripeness_percent, 12.2);
    }

    #[test]
    fn rounding_uses_the_stored_value_for_large_totals() {
        assert_eq!(from_counts(1, 1999, 0, 0).ripeness_percent, 0.1);
        assert_eq!(from_counts(1, 3999, 0, 0).ripeness_percent, 0.0);
        assert_eq!(from_counts(0, 0, 0, 0).ripeness_percent, 0.0);
    }

    #[test]
    fn aggregates_from_tallies() {
        let ripeness = LabelTally::from_labels(["straw-ripe", "straw-ripe", "straw-unripe", "stem"]);
        let spoilage = LabelTally::from_labels(["strwa_healthy", "starw_rotten"]);
        let result = aggregate(&ripeness, &spoilage);
        assert_eq!(result.ripe, 2);
        assert_eq!(result.unripe, 1);
        assert_eq!(result.healthy, 1);
        assert!(result.spoiled);
        assert_eq!(result.total, 3);
        assert_eq!(result.ripeness_percent, 66.7);
    }
}
