//! Evidence layer: source count and source-quality tiers.

use serde_json::json;

use crate::domain::snapshot::LOWEST_TIER;
use crate::domain::{Diagnostic, EntitySnapshot, LayerName, LayerResult, Severity};

use super::BASELINE;

pub const NO_SOURCES_DEDUCTION: u32 = 30;
pub const NO_TIER_ONE_DEDUCTION: u32 = 20;

/// Where the counted sources came from.
fn source_tiers(snapshot: &EntitySnapshot) -> (&'static str, Vec<u8>) {
    if !snapshot.data_sources.is_empty() {
        let tiers = snapshot
            .data_sources
            .iter()
            .map(|s| s.effective_tier())
            .collect();
        ("data_sources", tiers)
    } else if !snapshot.deliverables.is_empty() {
        // Attached deliverables carry no tier of their own.
        ("deliverables", vec![LOWEST_TIER; snapshot.deliverables.len()])
    } else {
        ("none", Vec::new())
    }
}

/// Tier shares as whole percentages that sum to exactly 100.
///
/// Uses largest-remainder rounding; ties go to the better tier. All zero when
/// there are no sources.
pub fn tier_distribution(tiers: &[u8]) -> [u8; 4] {
    let total = tiers.len() as u64;
    if total == 0 {
        return [0; 4];
    }
    let mut counts = [0u64; 4];
    for tier in tiers {
        let idx = usize::from((*tier).clamp(1, LOWEST_TIER) - 1);
        counts[idx] += 1;
    }

    let mut shares = [0u64; 4];
    let mut remainders = [(0u64, 0usize); 4];
    for (i, count) in counts.iter().enumerate() {
        shares[i] = count * 100 / total;
        remainders[i] = (count * 100 % total, i);
    }
    let mut leftover = 100 - shares.iter().sum::<u64>();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for (_, i) in remainders {
        if leftover == 0 {
            break;
        }
        shares[i] += 1;
        leftover -= 1;
    }
    shares.map(|s| s as u8)
}

pub fn evaluate(snapshot: &EntitySnapshot) -> LayerResult {
    let (origin, tiers) = source_tiers(snapshot);
    let mut diagnostics = Vec::with_capacity(2);

    if tiers.is_empty() {
        diagnostics.push(Diagnostic::fail(
            "source_count",
            Severity::High,
            NO_SOURCES_DEDUCTION,
            "target declares no data sources",
        ));
    } else {
        diagnostics.push(Diagnostic::pass(
            "source_count",
            format!("{} source(s) from {origin}", tiers.len()),
        ));
        if tiers.contains(&1) {
            diagnostics.push(Diagnostic::pass("tier_one_source", "tier-1 source present"));
        } else {
            diagnostics.push(Diagnostic::fail(
                "tier_one_source",
                Severity::Medium,
                NO_TIER_ONE_DEDUCTION,
                "no tier-1 quality source",
            ));
        }
    }

    let [t1, t2, t3, t4] = tier_distribution(&tiers);
    LayerResult::from_deductions(LayerName::Evidence, BASELINE, diagnostics)
        .derive("source_count", tiers.len() as u64)
        .derive("source_origin", origin)
        .derive(
            "tier_distribution",
            json!({ "tier_1": t1, "tier_2": t2, "tier_3": t3, "tier_4": t4 }),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataSource, DeliverableRef};
    use stratagate_store::{EntityKind, TargetRef};

    fn snap() -> EntitySnapshot {
        EntitySnapshot::empty(TargetRef::new(EntityKind::Strategy, "s-1"))
    }

    fn source(tier: Option<u8>) -> DataSource {
        DataSource {
            name: "src".into(),
            tier,
        }
    }

    #[test]
    fn zero_sources_scores_70_with_zero_distribution() {
        let r = evaluate(&snap());
        assert_eq!(r.score, 70);
        assert_eq!(
            r.derived["tier_distribution"],
            json!({ "tier_1": 0, "tier_2": 0, "tier_3": 0, "tier_4": 0 })
        );
    }

    #[test]
    fn sources_without_tier_one_lose_twenty() {
        let mut s = snap();
        s.data_sources = vec![source(Some(2)), source(None)];
        let r = evaluate(&s);
        assert_eq!(r.score, 80);
        assert_eq!(r.failed_checks(), vec!["tier_one_source"]);
    }

    #[test]
    fn tier_one_source_keeps_full_score() {
        let mut s = snap();
        s.data_sources = vec![source(Some(1)), source(Some(3)), source(Some(4))];
        assert_eq!(evaluate(&s).score, 100);
    }

    #[test]
    fn deliverables_stand_in_for_missing_sources() {
        let mut s = snap();
        s.deliverables = vec![DeliverableRef {
            code: "D1".into(),
            confidence_score: None,
        }];
        let r = evaluate(&s);
        assert_eq!(r.score, 80);
        assert_eq!(r.derived["source_origin"], json!("deliverables"));
        assert_eq!(r.derived["tier_distribution"]["tier_4"], json!(100));
    }

    #[test]
    fn distribution_always_sums_to_hundred() {
        for tiers in [
            vec![1, 2, 3],
            vec![1, 1, 2, 3, 4, 4, 4],
            vec![2; 7],
            vec![1, 2, 2, 3, 3, 3],
        ] {
            let dist = tier_distribution(&tiers);
            assert_eq!(dist.iter().map(|d| u32::from(*d)).sum::<u32>(), 100, "{tiers:?}");
        }
        assert_eq!(tier_distribution(&[1, 2, 3]), [34, 33, 33, 0]);
    }
}
