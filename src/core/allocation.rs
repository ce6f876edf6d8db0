//! Compares current holdings against the target allocation.
use crate::core::portfolio::{AllocationTarget, Asset};
use tracing::warn;

/// Allowed deviation of the target weights' sum from 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationLine {
    pub id: String,
    pub target_weight: f64,
    pub current_weight: f64,
    pub current_value: f64,
    /// `current_weight - target_weight`; positive means overweight.
    pub drift: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationReport {
    pub lines: Vec<AllocationLine>,
    pub total_value: f64,
    pub weight_sum: f64,
    /// False when the targets do not add up to 1. Tolerated, not rejected.
    pub weights_balanced: bool,
    /// Valued assets matched by no target.
    pub unallocated_value: f64,
}

fn matches(target: &AllocationTarget, asset: &Asset) -> bool {
    asset.id == target.id || asset.asset_class.as_deref() == Some(target.id.as_str())
}

/// Builds an allocation report from assets already valued in base currency.
pub fn build_report(
    assets: &[Asset],
    targets: &[AllocationTarget],
    total_value: f64,
) -> AllocationReport {
    let weight_sum: f64 = targets.iter().map(|t| t.target_weight).sum();
    let weights_balanced = (weight_sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE;
    if !targets.is_empty() && !weights_balanced {
        warn!(weight_sum, "Target allocation weights do not sum to 1");
    }

    let lines = targets
        .iter()
        .map(|target| {
            let current_value: f64 = assets
                .iter()
                .filter(|a| matches(target, a))
                .filter_map(|a| a.value_in_base)
                .sum();
            let current_weight = if total_value > 0.0 {
                current_value / total_value
            } else {
                0.0
            };
            AllocationLine {
                id: target.id.clone(),
                target_weight: target.target_weight,
                current_weight,
                current_value,
                drift: current_weight - target.target_weight,
            }
        })
        .collect();

    let unallocated_value = assets
        .iter()
        .filter(|a| !targets.iter().any(|t| matches(t, a)))
        .filter_map(|a| a.value_in_base)
        .sum();

    AllocationReport {
        lines,
        total_value,
        weight_sum,
        weights_balanced,
        unallocated_value,
    }
}
