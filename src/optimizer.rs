//! Re-sequences a rider's outstanding routes by earliest time window.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument};

use crate::dispatcher::Dispatcher;
use crate::error::AssignmentError;
use crate::model::{DeliveryRoute, RiderId, RouteId};
use crate::traits::{DeliveryStore, Notifier, RouteFilter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub route: RouteId,
    pub sequence: u32,
    pub landmark: String,
    /// Estimated arrival, e.g. `09:00 AM`.
    pub time: String,
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizationSummary {
    pub rider: String,
    pub date: NaiveDate,
    pub route_count: usize,
    pub routes: Vec<RouteSummary>,
}

/// New `(route, sequence)` pairs ordering routes by estimated arrival.
///
/// The sort is stable, so routes with equal arrival keep their relative order.
pub fn resequence(routes: &[DeliveryRoute]) -> Vec<(RouteId, u32)> {
    let mut ordered: Vec<&DeliveryRoute> = routes.iter().collect();
    ordered.sort_by_key(|route| route.estimated_arrival);

    ordered
        .into_iter()
        .zip(1..)
        .map(|(route, sequence)| (route.id, sequence))
        .collect()
}

impl<S, N> Dispatcher<S, N>
where
    S: DeliveryStore,
    N: Notifier,
{
    /// Renumbers the rider's incomplete routes for `date` as 1..N by arrival.
    ///
    /// Completed routes are not touched. Running it twice in a row gives the
    /// same numbering.
    #[instrument(skip(self))]
    pub fn optimize(&self, rider: RiderId, date: NaiveDate) -> Result<OptimizationSummary, AssignmentError> {
        let rider = self
            .store
            .rider(rider)?
            .ok_or(AssignmentError::UnknownRider(rider))?;

        let mut routes = self
            .store
            .find_routes(&RouteFilter::new(rider.id, date).outstanding())?;

        let sequences = resequence(&routes);
        self.store.renumber_routes(&sequences)?;

        for route in &mut routes {
            if let Some(&(_, sequence)) = sequences.iter().find(|(id, _)| *id == route.id) {
                route.sequence = sequence;
            }
        }
        routes.sort_by_key(|route| route.sequence);

        let summaries: Vec<RouteSummary> = routes
            .iter()
            .map(|route| RouteSummary {
                route: route.id,
                sequence: route.sequence,
                landmark: self.landmark_name(route.landmark),
                time: route.estimated_arrival.format("%I:%M %p").to_string(),
                orders: route.orders.len(),
            })
            .collect();

        info!(rider = %rider.id, %date, routes = summaries.len(), "routes resequenced");

        Ok(OptimizationSummary {
            rider: rider.name,
            date,
            route_count: summaries.len(),
            routes: summaries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LandmarkId;
    use chrono::NaiveTime;

    fn route(id: u64, sequence: u32, hour: u32) -> DeliveryRoute {
        DeliveryRoute {
            id: RouteId(id),
            rider: RiderId(1),
            route_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            landmark: LandmarkId(1),
            orders: Vec::new(),
            sequence,
            estimated_arrival: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            completed: false,
            completed_at: None,
        }
    }

    #[test]
    fn orders_by_arrival() {
        let routes = vec![route(1, 1, 14), route(2, 2, 9), route(3, 3, 11)];
        assert_eq!(
            resequence(&routes),
            vec![(RouteId(2), 1), (RouteId(3), 2), (RouteId(1), 3)]
        );
    }

    #[test]
    fn equal_arrivals_keep_relative_order() {
        let routes = vec![route(5, 1, 10), route(3, 2, 10), route(4, 3, 8)];
        assert_eq!(
            resequence(&routes),
            vec![(RouteId(4), 1), (RouteId(5), 2), (RouteId(3), 3)]
        );
    }

    #[test]
    fn empty_day_yields_nothing() {
        assert!(resequence(&[]).is_empty());
    }
}
