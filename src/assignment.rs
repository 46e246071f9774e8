//! Cohort assignment: group confirmed orders, pick a rider per cohort, build
//! the route and notify the rider.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::dispatcher::Dispatcher;
use crate::error::{AssignmentError, StoreError};
use crate::grouping::{group_orders, Cohort};
use crate::model::{
    DeliveryRoute, LandmarkId, Order, OrderNumber, OrderStatus, Rider, RiderId, RiderStatus, RouteId,
};
use crate::notify::rider_assignment_message;
use crate::route_builder::build_route;
use crate::scoring::{rank_riders, select_best};
use crate::traits::{
    DeliveryStore, NotificationContext, NotificationKind, Notifier, OrderFilter, RiderFilter,
    SequenceSlot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Nothing was eligible; not an error.
    NoOrders,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    NoAvailableRiders,
    NoSuitableRider,
    /// Every order in the cohort was assigned by another pass first.
    OrdersTaken,
    /// A persistence call failed before anything was committed.
    Store(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAvailableRiders => f.write_str("no available riders"),
            Self::NoSuitableRider => f.write_str("no suitable rider found"),
            Self::OrdersTaken => f.write_str("orders already assigned"),
            Self::Store(detail) => write!(f, "store failure: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CohortResult {
    Assigned {
        rider: RiderId,
        rider_name: String,
        route: RouteId,
        sequence: u32,
        /// Orders claimed for the rider. Fewer than the cohort when another
        /// pass took some of them first.
        orders: usize,
        /// Whether the rider notification went out. Assignment stands either way.
        notified: bool,
    },
    /// Orders and rider were committed but the route could not be written.
    /// The rider is off the pool and the orders need a route by hand.
    Unrouted {
        rider: RiderId,
        rider_name: String,
        orders: usize,
        error: String,
    },
    Failed {
        reason: FailureReason,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortOutcome {
    pub landmark: LandmarkId,
    pub landmark_name: String,
    pub delivery_date: NaiveDate,
    pub order_count: usize,
    pub result: CohortResult,
}

impl CohortOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.result, CohortResult::Assigned { .. })
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.result {
            CohortResult::Failed { reason } => Some(reason),
            CohortResult::Assigned { .. } | CohortResult::Unrouted { .. } => None,
        }
    }

    /// Orders this cohort actually moved to ASSIGNED.
    pub fn assigned_orders(&self) -> usize {
        match &self.result {
            CohortResult::Assigned { orders, .. } | CohortResult::Unrouted { orders, .. } => *orders,
            CohortResult::Failed { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentReport {
    pub status: AssignmentStatus,
    /// Eligible orders considered in this pass.
    pub total_orders: usize,
    pub assigned_count: usize,
    /// Supplied orders that were not CONFIRMED and unassigned, or unknown.
    pub skipped: usize,
    pub details: Vec<CohortOutcome>,
}

impl AssignmentReport {
    fn no_orders(skipped: usize) -> Self {
        Self {
            status: AssignmentStatus::NoOrders,
            total_orders: 0,
            assigned_count: 0,
            skipped,
            details: Vec::new(),
        }
    }
}

/// Result of a manual single-order assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualAssignment {
    pub order: Order,
    pub route: DeliveryRoute,
    pub notified: bool,
}

impl<S, N> Dispatcher<S, N>
where
    S: DeliveryStore + Sync,
    N: Notifier,
{
    /// Assigns confirmed, unassigned orders to riders cohort by cohort.
    ///
    /// With `None`, every CONFIRMED and unassigned order in the store is
    /// considered. Supplied orders are re-read from the store and only the
    /// ones still eligible are touched. Cohort failures are reported in the
    /// returned report; `Err` means the initial order query failed.
    #[instrument(skip_all)]
    pub fn assign(&self, orders: Option<Vec<Order>>) -> Result<AssignmentReport, AssignmentError> {
        let (orders, skipped) = match orders {
            None => {
                let filter = OrderFilter::default().status(OrderStatus::Confirmed).unassigned();
                (self.store.find_orders(&filter)?, 0)
            }
            Some(supplied) => self.eligible(supplied)?,
        };

        if orders.is_empty() {
            info!(skipped, "no orders to assign");
            return Ok(AssignmentReport::no_orders(skipped));
        }

        let total_orders = orders.len();
        let mut assigned_count = 0;
        let mut details = Vec::new();

        for cohort in group_orders(orders) {
            let outcome = self.assign_cohort(&cohort);
            assigned_count += outcome.assigned_orders();
            details.push(outcome);
        }

        info!(total_orders, assigned_count, cohorts = details.len(), "assignment pass finished");

        Ok(AssignmentReport {
            status: AssignmentStatus::Completed,
            total_orders,
            assigned_count,
            skipped,
            details,
        })
    }

    /// Assigns one order to an explicit rider, bypassing scoring.
    ///
    /// The order gets its own route with sequence 1, even if the rider already
    /// has routes that day. All inputs are validated before anything is
    /// written, and the order is claimed conditionally so a concurrent
    /// assignment can never give it a second rider. The rider's status is
    /// left as is.
    #[instrument(skip(self))]
    pub fn manual_assign(
        &self,
        order_number: &OrderNumber,
        rider: Option<RiderId>,
    ) -> Result<ManualAssignment, AssignmentError> {
        let rider_id = rider.ok_or(AssignmentError::MissingRider)?;
        let rider = self
            .store
            .rider(rider_id)?
            .ok_or(AssignmentError::UnknownRider(rider_id))?;
        let current = self.load_order(order_number)?;
        current.status.transition(OrderStatus::Assigned)?;

        let claimed = self
            .store
            .claim_orders(std::slice::from_ref(order_number), rider.id)?;
        let Some(order) = claimed.into_iter().next() else {
            let current = self.load_order(order_number)?;
            return Err(AssignmentError::UnexpectedStatus {
                order: current.order_number,
                status: current.status,
            });
        };

        let route = build_route(
            &self.store,
            rider.id,
            order.landmark,
            order.delivery_date,
            std::slice::from_ref(&order),
            SequenceSlot::Fixed(1),
        )?
        .ok_or_else(|| StoreError::Backend("route created without orders".to_string()))?;

        let notified = self.notify_rider(&rider, std::slice::from_ref(&order), &route);

        info!(rider = %rider.id, route = %route.id, notified, "order assigned manually");

        Ok(ManualAssignment {
            order,
            route,
            notified,
        })
    }

    /// Re-reads supplied orders and keeps the eligible ones, once each.
    fn eligible(&self, supplied: Vec<Order>) -> Result<(Vec<Order>, usize), StoreError> {
        let mut seen: HashSet<OrderNumber> = HashSet::new();
        let mut eligible = Vec::new();
        let mut skipped = 0;

        for order in supplied {
            if !seen.insert(order.order_number.clone()) {
                continue;
            }
            match self.store.order(&order.order_number)? {
                Some(current) if current.is_assignable() => eligible.push(current),
                Some(current) => {
                    warn!(order = %current.order_number, status = %current.status, "skipping ineligible order");
                    skipped += 1;
                }
                None => {
                    warn!(order = %order.order_number, "skipping unknown order");
                    skipped += 1;
                }
            }
        }

        Ok((eligible, skipped))
    }

    /// Claims a rider, then the cohort's orders, then builds the route.
    ///
    /// Each claim is a conditional store write, so a concurrent pass can never
    /// hand the same rider or order out twice.
    fn assign_cohort(&self, cohort: &Cohort) -> CohortOutcome {
        let landmark_name = self.landmark_name(cohort.landmark);
        let outcome = |result: CohortResult| CohortOutcome {
            landmark: cohort.landmark,
            landmark_name: landmark_name.clone(),
            delivery_date: cohort.delivery_date,
            order_count: cohort.orders.len(),
            result,
        };
        let failed = |reason: FailureReason| {
            warn!(landmark = %cohort.landmark, date = %cohort.delivery_date, %reason, "cohort not assigned");
            outcome(CohortResult::Failed { reason })
        };

        let (rider, score) = match self.claim_best_rider(cohort) {
            Ok(claimed) => claimed,
            Err(reason) => return failed(reason),
        };

        let numbers: Vec<OrderNumber> = cohort.orders.iter().map(|order| order.order_number.clone()).collect();
        let orders = match self.store.claim_orders(&numbers, rider.id) {
            Ok(orders) if !orders.is_empty() => orders,
            Ok(_) => {
                self.release_rider(&rider);
                return failed(FailureReason::OrdersTaken);
            }
            Err(err) => {
                self.release_rider(&rider);
                return failed(store_failure(err));
            }
        };
        if orders.len() < numbers.len() {
            warn!(
                landmark = %cohort.landmark,
                claimed = orders.len(),
                cohort = numbers.len(),
                "part of the cohort was taken by another pass"
            );
        }

        let route = build_route(
            &self.store,
            rider.id,
            cohort.landmark,
            cohort.delivery_date,
            &orders,
            SequenceSlot::Next,
        )
        .and_then(|route| route.ok_or_else(|| StoreError::Backend("route created without orders".to_string())));
        let route = match route {
            Ok(route) => route,
            Err(err) => {
                // Orders and rider stay committed; the rider is off the pool.
                error!(
                    landmark = %cohort.landmark,
                    rider = %rider.id,
                    orders = orders.len(),
                    error = %err,
                    "orders assigned but route creation failed"
                );
                return outcome(CohortResult::Unrouted {
                    rider: rider.id,
                    rider_name: rider.name,
                    orders: orders.len(),
                    error: err.to_string(),
                });
            }
        };

        let notified = self.notify_rider_named(&rider, &orders, &route, &landmark_name);

        info!(
            landmark = %cohort.landmark,
            rider = %rider.id,
            score,
            orders = orders.len(),
            route = %route.id,
            sequence = route.sequence,
            "cohort assigned"
        );
        outcome(CohortResult::Assigned {
            rider: rider.id,
            rider_name: rider.name,
            route: route.id,
            sequence: route.sequence,
            orders: orders.len(),
            notified,
        })
    }

    /// Scores the AVAILABLE riders and flips the best one to ON_DELIVERY.
    ///
    /// The pool is re-queried for every cohort so riders taken by earlier
    /// cohorts drop out. If a concurrent pass takes the chosen rider first,
    /// the remaining pool is scored again.
    fn claim_best_rider(&self, cohort: &Cohort) -> Result<(Rider, f64), FailureReason> {
        let weights = &self.options.weights;

        loop {
            let riders = self
                .store
                .find_riders(&RiderFilter::available())
                .map_err(store_failure)?;
            if riders.is_empty() {
                return Err(FailureReason::NoAvailableRiders);
            }

            let scores = rank_riders(&self.store, &riders, cohort, weights, self.options.parallel_scoring)
                .map_err(store_failure)?;
            let best = select_best(&scores, weights).ok_or(FailureReason::NoSuitableRider)?;

            let claimed = self
                .store
                .transition_rider(best.rider, RiderStatus::Available, RiderStatus::OnDelivery)
                .map_err(store_failure)?;
            match claimed {
                Some(rider) => return Ok((rider, best.total())),
                None => debug!(rider = %best.rider, "rider taken by another pass, rescoring"),
            }
        }
    }

    /// Puts a claimed rider back in the pool after the cohort fell through.
    fn release_rider(&self, rider: &Rider) {
        match self
            .store
            .transition_rider(rider.id, RiderStatus::OnDelivery, RiderStatus::Available)
        {
            Ok(_) => debug!(rider = %rider.id, "rider released"),
            Err(err) => error!(rider = %rider.id, error = %err, "could not release rider"),
        }
    }

    fn notify_rider(&self, rider: &Rider, orders: &[Order], route: &DeliveryRoute) -> bool {
        let landmark_name = self.landmark_name(route.landmark);
        self.notify_rider_named(rider, orders, route, &landmark_name)
    }

    fn notify_rider_named(
        &self,
        rider: &Rider,
        orders: &[Order],
        route: &DeliveryRoute,
        landmark_name: &str,
    ) -> bool {
        let message = rider_assignment_message(orders.len(), landmark_name, route.estimated_arrival);
        let context = NotificationContext::new(
            NotificationKind::RiderAssignment,
            orders.first().map(|order| &order.order_number),
        );
        self.notifier.notify(&rider.phone, &message, &context)
    }
}

fn store_failure(err: StoreError) -> FailureReason {
    error!(error = %err, "store call failed during cohort");
    FailureReason::Store(err.to_string())
}
