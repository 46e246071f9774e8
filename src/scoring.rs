//! Rider suitability scoring and selection.
//!
//! A rider's score for a cohort is the sum of four parts:
//! landmark familiarity, current same-day workload, rating and success rate.
//! Higher is better; the best possible score with default weights is 100.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::grouping::Cohort;
use crate::model::{LandmarkId, OrderStatus, Rider, RiderId};
use crate::traits::{OrderFilter, OrderStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Awarded when the cohort's landmark is one of the rider's preferred landmarks.
    pub familiarity: f64,
    /// Awarded for zero active same-day orders.
    pub workload_idle: f64,
    /// Awarded for 1..=`light_max` active same-day orders.
    pub workload_light: f64,
    /// Awarded for `light_max`+1..=`moderate_max` active same-day orders.
    pub workload_moderate: f64,
    pub light_max: usize,
    pub moderate_max: usize,
    /// Scaled by `rating / 5`.
    pub rating: f64,
    /// Scaled by `success_rate / 100`.
    pub success_rate: f64,
    /// Riders scoring below this are not candidates.
    pub minimum_score: Option<f64>,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            familiarity: 30.0,
            workload_idle: 25.0,
            workload_light: 15.0,
            workload_moderate: 5.0,
            light_max: 2,
            moderate_max: 5,
            rating: 25.0,
            success_rate: 20.0,
            minimum_score: None,
        }
    }
}

impl ScoringWeights {
    pub fn workload_points(&self, active_orders: usize) -> f64 {
        match active_orders {
            0 => self.workload_idle,
            n if n <= self.light_max => self.workload_light,
            n if n <= self.moderate_max => self.workload_moderate,
            _ => 0.0,
        }
    }
}

/// Score breakdown for one rider against one cohort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiderScore {
    pub rider: RiderId,
    pub familiarity: f64,
    pub workload: f64,
    pub rating: f64,
    pub success_rate: f64,
    /// Orders already ASSIGNED or IN_TRANSIT for the cohort date.
    pub active_orders: usize,
}

impl RiderScore {
    pub fn total(&self) -> f64 {
        self.familiarity + self.workload + self.rating + self.success_rate
    }
}

/// Scores a rider given its current same-day workload. Pure.
pub fn score_rider(
    rider: &Rider,
    landmark: LandmarkId,
    active_orders: usize,
    weights: &ScoringWeights,
) -> RiderScore {
    let familiarity = if rider.prefers(landmark) {
        weights.familiarity
    } else {
        0.0
    };

    RiderScore {
        rider: rider.id,
        familiarity,
        workload: weights.workload_points(active_orders),
        rating: rider.clamped_rating() / 5.0 * weights.rating,
        success_rate: rider.success_rate() / 100.0 * weights.success_rate,
        active_orders,
    }
}

/// Picks the strictly highest total. Ties go to the earliest entry.
pub fn select_best<'a>(scores: &'a [RiderScore], weights: &ScoringWeights) -> Option<&'a RiderScore> {
    let mut best: Option<&RiderScore> = None;

    for score in scores {
        if let Some(minimum) = weights.minimum_score {
            if score.total() < minimum {
                continue;
            }
        }
        match best {
            Some(current) if score.total() <= current.total() => {}
            _ => best = Some(score),
        }
    }

    best
}

/// Counts a rider's ASSIGNED or IN_TRANSIT orders on the cohort date.
pub fn active_workload<S>(store: &S, rider: RiderId, cohort: &Cohort) -> Result<usize, StoreError>
where
    S: OrderStore + ?Sized,
{
    // The first order's date is the cohort date by construction.
    let date = match cohort.orders.first() {
        Some(order) => order.delivery_date,
        None => cohort.delivery_date,
    };

    let filter = OrderFilter::default()
        .status(OrderStatus::Assigned)
        .status(OrderStatus::InTransit)
        .assigned_to(rider)
        .on(date);

    Ok(store.find_orders(&filter)?.len())
}

/// Scores every rider for a cohort, preserving the input order of `riders`.
pub fn rank_riders<S>(
    store: &S,
    riders: &[Rider],
    cohort: &Cohort,
    weights: &ScoringWeights,
    parallel: bool,
) -> Result<Vec<RiderScore>, StoreError>
where
    S: OrderStore + Sync + ?Sized,
{
    let score_one = |rider: &Rider| -> Result<RiderScore, StoreError> {
        let workload = active_workload(store, rider.id, cohort)?;
        let score = score_rider(rider, cohort.landmark, workload, weights);
        debug!(
            rider = %rider.id,
            landmark = %cohort.landmark,
            active_orders = workload,
            total = score.total(),
            "scored rider"
        );
        Ok(score)
    };

    if parallel {
        riders.par_iter().map(score_one).collect()
    } else {
        riders.iter().map(score_one).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rider(id: u64) -> Rider {
        Rider::new(id, format!("rider {id}"), format!("07120000{id:02}"))
    }

    fn perfect_rider(id: u64, landmark: LandmarkId) -> Rider {
        let mut rider = rider(id);
        rider.preferred_landmarks.insert(landmark);
        rider.rating = 5.0;
        rider.total_deliveries = 10;
        rider.successful_deliveries = 10;
        rider
    }

    #[test]
    fn perfect_rider_scores_one_hundred() {
        let landmark = LandmarkId(7);
        let score = score_rider(&perfect_rider(1, landmark), landmark, 0, &ScoringWeights::default());
        assert_eq!(score.total(), 100.0);
    }

    #[test]
    fn workload_bucket_boundaries() {
        let weights = ScoringWeights::default();
        assert_eq!(weights.workload_points(0), 25.0);
        assert_eq!(weights.workload_points(1), 15.0);
        assert_eq!(weights.workload_points(2), 15.0);
        assert_eq!(weights.workload_points(3), 5.0);
        assert_eq!(weights.workload_points(5), 5.0);
        assert_eq!(weights.workload_points(6), 0.0);
    }

    #[test]
    fn unfamiliar_rider_gets_no_familiarity_points() {
        let landmark = LandmarkId(7);
        let score = score_rider(&perfect_rider(1, LandmarkId(8)), landmark, 0, &ScoringWeights::default());
        assert_eq!(score.familiarity, 0.0);
        assert_eq!(score.total(), 70.0);
    }

    #[test]
    fn out_of_range_rating_is_clamped() {
        let mut over = rider(1);
        over.rating = 9.0;
        let score = score_rider(&over, LandmarkId(1), 0, &ScoringWeights::default());
        assert_eq!(score.rating, 25.0);
    }

    #[test]
    fn ties_go_to_first_seen() {
        let weights = ScoringWeights::default();
        let scores = vec![
            score_rider(&rider(1), LandmarkId(1), 0, &weights),
            score_rider(&rider(2), LandmarkId(1), 0, &weights),
        ];
        assert_eq!(scores[0].total(), scores[1].total());
        assert_eq!(select_best(&scores, &weights).map(|s| s.rider), Some(RiderId(1)));
    }

    #[test]
    fn strictly_higher_score_wins() {
        let weights = ScoringWeights::default();
        let scores = vec![
            score_rider(&rider(1), LandmarkId(1), 3, &weights),
            score_rider(&rider(2), LandmarkId(1), 0, &weights),
        ];
        assert_eq!(select_best(&scores, &weights).map(|s| s.rider), Some(RiderId(2)));
    }

    #[test]
    fn empty_pool_selects_nobody() {
        assert!(select_best(&[], &ScoringWeights::default()).is_none());
    }

    #[test]
    fn minimum_score_excludes_weak_candidates() {
        let weights = ScoringWeights {
            minimum_score: Some(50.0),
            ..ScoringWeights::default()
        };
        let mut weak = rider(1);
        weak.rating = 0.0;
        let scores = vec![score_rider(&weak, LandmarkId(1), 6, &weights)];
        assert!(select_best(&scores, &weights).is_none());
    }
}
