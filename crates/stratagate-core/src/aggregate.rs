//! Weighted aggregation of layer scores.

use crate::domain::{clamp_score, LayerResult};
use crate::policy::LayerWeights;

/// `round(Σ weight_i × score_i)`, half rounded up.
///
/// Computed in integer points (`Σ points_i × score_i` over 100) so the result
/// is exact and identical for identical inputs. Layers absent from `layers`
/// contribute zero.
pub fn aggregate(layers: &[LayerResult], weights: &LayerWeights) -> u8 {
    let weighted: u64 = layers
        .iter()
        .map(|l| u64::from(weights.points(l.layer)) * u64::from(l.score))
        .sum();
    clamp_score(((weighted + 50) / 100) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LayerName;

    fn layers(scores: [u8; 5]) -> Vec<LayerResult> {
        LayerName::ALL
            .iter()
            .zip(scores)
            .map(|(l, s)| LayerResult::with_score(*l, i64::from(s), vec![]))
            .collect()
    }

    #[test]
    fn uniform_scores_aggregate_to_themselves() {
        let w = LayerWeights::default();
        for s in [0u8, 37, 64, 100] {
            assert_eq!(aggregate(&layers([s; 5]), &w), s);
        }
    }

    #[test]
    fn weighted_sum_rounds_half_up() {
        // 0.25*65 + 0.20*70 + 0.25*35 + 0.20*60 + 0.10*50 = 56.0
        let w = LayerWeights::default();
        assert_eq!(aggregate(&layers([65, 70, 35, 60, 50]), &w), 56);
        // 0.25*1 + 0.20*1 + 0.25*1 + 0.20*0 + 0.10*1 = 0.80 -> 1
        assert_eq!(aggregate(&layers([1, 1, 1, 0, 1]), &w), 1);
        // 0.25*2 + 0 = 0.5 -> 1
        assert_eq!(aggregate(&layers([2, 0, 0, 0, 0]), &w), 1);
    }

    #[test]
    fn aggregate_stays_in_range_for_extremes() {
        let w = LayerWeights::default();
        for a in [0u8, 100] {
            for b in [0u8, 100] {
                let v = aggregate(&layers([a, b, a, b, a]), &w);
                assert!(v <= 100);
            }
        }
        assert_eq!(aggregate(&layers([100; 5]), &w), 100);
    }
}
