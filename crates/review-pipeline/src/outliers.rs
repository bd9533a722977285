use serde::{Deserialize, Serialize};

use crate::config::LengthBounds;
use crate::tokenize::CleanedReview;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub kept: usize,
    pub removed: usize,
    pub too_short: usize,
    pub too_long: usize,
}

/// Keep reviews whose token count lies within `bounds`, preserving order.
pub fn filter_outliers(
    reviews: Vec<CleanedReview>,
    bounds: LengthBounds,
) -> (Vec<CleanedReview>, OutlierReport) {
    let mut report = OutlierReport::default();
    let kept: Vec<CleanedReview> = reviews
        .into_iter()
        .filter(|review| {
            let n = review.len();
            if n < bounds.min {
                report.too_short += 1;
            } else if n > bounds.max {
                report.too_long += 1;
            }
            bounds.contains(n)
        })
        .collect();
    report.kept = kept.len();
    report.removed = report.too_short + report.too_long;
    (kept, report)
}
