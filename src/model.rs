//! Domain entities for the delivery planner.
//!
//! Orders, riders, landmarks and delivery routes as the engine sees them.
//! Status fields are closed enums; every status change goes through
//! [`OrderStatus::transition`].

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::TransitionError;

/// Public order identity (e.g. `ORD202501151234`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderNumber(pub String);

impl OrderNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RiderId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LandmarkId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteId(pub u64);

impl fmt::Display for RiderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rider#{}", self.0)
    }
}

impl fmt::Display for LandmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "landmark#{}", self.0)
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route#{}", self.0)
    }
}

/// Order lifecycle.
///
/// ```text
/// PendingConfirmation -> Confirmed | RescheduleRequested
/// Confirmed           -> Assigned
/// Assigned            -> InTransit
/// InTransit           -> Delivered | Failed
/// any non-terminal    -> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingConfirmation,
    Confirmed,
    RescheduleRequested,
    Assigned,
    InTransit,
    Delivered,
    Failed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed | Self::Cancelled)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        if next == Cancelled {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (PendingConfirmation, Confirmed)
                | (PendingConfirmation, RescheduleRequested)
                | (Confirmed, Assigned)
                | (Assigned, InTransit)
                | (InTransit, Delivered)
                | (InTransit, Failed)
        )
    }

    /// Validates a move to `next`, returning the new status.
    pub fn transition(self, next: OrderStatus) -> Result<OrderStatus, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError { from: self, to: next })
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingConfirmation => "PENDING_CONFIRMATION",
            Self::Confirmed => "CONFIRMED",
            Self::RescheduleRequested => "RESCHEDULE_REQUESTED",
            Self::Assigned => "ASSIGNED",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiderStatus {
    Available,
    OnDelivery,
    Offline,
}

/// A named delivery reference point. Only used as a grouping and familiarity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub id: LandmarkId,
    pub name: String,
    pub area: String,
    pub city: String,
    /// (lat, lng), informational only.
    pub coordinates: Option<(f64, f64)>,
}

impl Landmark {
    pub fn new(id: u64, name: impl Into<String>, area: impl Into<String>) -> Self {
        Self {
            id: LandmarkId(id),
            name: name.into(),
            area: area.into(),
            city: "Nairobi".to_string(),
            coordinates: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_phone: String,
    pub vendor_phone: Option<String>,
    pub landmark: LandmarkId,
    pub delivery_date: NaiveDate,
    pub delivery_time_start: NaiveTime,
    pub delivery_time_end: NaiveTime,
    pub assigned_rider: Option<RiderId>,
    pub created_at: Option<NaiveDateTime>,
    pub confirmation_sent_at: Option<NaiveDateTime>,
    pub customer_confirmed_at: Option<NaiveDateTime>,
    pub delivered_at: Option<NaiveDateTime>,
    pub delivery_proof: Option<String>,
    pub failure_reason: Option<String>,
}

impl Order {
    /// A fresh order awaiting customer confirmation.
    pub fn new(
        order_number: impl Into<String>,
        landmark: LandmarkId,
        delivery_date: NaiveDate,
        window: (NaiveTime, NaiveTime),
    ) -> Self {
        Self {
            order_number: OrderNumber::new(order_number),
            status: OrderStatus::PendingConfirmation,
            customer_name: String::new(),
            customer_phone: String::new(),
            vendor_phone: None,
            landmark,
            delivery_date,
            delivery_time_start: window.0,
            delivery_time_end: window.1,
            assigned_rider: None,
            created_at: None,
            confirmation_sent_at: None,
            customer_confirmed_at: None,
            delivered_at: None,
            delivery_proof: None,
            failure_reason: None,
        }
    }

    /// Moves the order to `next` if the lifecycle allows it.
    pub fn set_status(&mut self, next: OrderStatus) -> Result<(), TransitionError> {
        self.status = self.status.transition(next)?;
        Ok(())
    }

    /// Eligible for automatic assignment: confirmed and not yet given to a rider.
    pub fn is_assignable(&self) -> bool {
        self.status == OrderStatus::Confirmed && self.assigned_rider.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rider {
    pub id: RiderId,
    pub name: String,
    pub phone: String,
    pub status: RiderStatus,
    pub preferred_landmarks: BTreeSet<LandmarkId>,
    pub total_deliveries: u32,
    pub successful_deliveries: u32,
    pub failed_deliveries: u32,
    pub rating: f64,
}

impl Rider {
    pub fn new(id: u64, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: RiderId(id),
            name: name.into(),
            phone: phone.into(),
            status: RiderStatus::Available,
            preferred_landmarks: BTreeSet::new(),
            total_deliveries: 0,
            successful_deliveries: 0,
            failed_deliveries: 0,
            rating: 5.0,
        }
    }

    /// Percentage of deliveries marked successful, in [0, 100].
    pub fn success_rate(&self) -> f64 {
        if self.total_deliveries == 0 {
            return 0.0;
        }
        let rate = f64::from(self.successful_deliveries) / f64::from(self.total_deliveries) * 100.0;
        rate.clamp(0.0, 100.0)
    }

    /// Rating restricted to its valid [0, 5] domain.
    pub fn clamped_rating(&self) -> f64 {
        if self.rating.is_nan() {
            return 0.0;
        }
        self.rating.clamp(0.0, 5.0)
    }

    pub fn prefers(&self, landmark: LandmarkId) -> bool {
        self.preferred_landmarks.contains(&landmark)
    }

    pub fn record_success(&mut self) {
        self.total_deliveries += 1;
        self.successful_deliveries += 1;
    }

    pub fn record_failure(&mut self) {
        self.total_deliveries += 1;
        self.failed_deliveries += 1;
    }
}

/// One stop in a rider's day, bundling the orders dropped near one landmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRoute {
    pub id: RouteId,
    pub rider: RiderId,
    pub route_date: NaiveDate,
    pub landmark: LandmarkId,
    pub orders: Vec<OrderNumber>,
    /// 1-based position in the rider's day.
    pub sequence: u32,
    pub estimated_arrival: NaiveTime,
    pub completed: bool,
    pub completed_at: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmed_can_only_move_to_assigned_or_cancelled() {
        let from = OrderStatus::Confirmed;
        assert!(from.can_transition_to(OrderStatus::Assigned));
        assert!(from.can_transition_to(OrderStatus::Cancelled));
        assert!(!from.can_transition_to(OrderStatus::InTransit));
        assert!(!from.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn terminal_states_reject_everything() {
        for terminal in [OrderStatus::Delivered, OrderStatus::Failed, OrderStatus::Cancelled] {
            assert!(terminal.is_terminal());
            assert!(terminal.transition(OrderStatus::Cancelled).is_err());
            assert!(terminal.transition(OrderStatus::Assigned).is_err());
        }
    }

    #[test]
    fn transition_error_names_both_states() {
        let err = OrderStatus::PendingConfirmation
            .transition(OrderStatus::Assigned)
            .unwrap_err();
        assert_eq!(err.from, OrderStatus::PendingConfirmation);
        assert_eq!(err.to, OrderStatus::Assigned);
    }

    #[test]
    fn success_rate_is_zero_without_deliveries() {
        let rider = Rider::new(1, "Wanjiku", "0712000001");
        assert_eq!(rider.success_rate(), 0.0);
    }

    #[test]
    fn success_rate_tracks_outcomes() {
        let mut rider = Rider::new(1, "Wanjiku", "0712000001");
        rider.record_success();
        rider.record_success();
        rider.record_success();
        rider.record_failure();
        assert_eq!(rider.total_deliveries, 4);
        assert_eq!(rider.failed_deliveries, 1);
        assert!((rider.success_rate() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn rating_is_clamped() {
        let mut rider = Rider::new(1, "Otieno", "0712000002");
        rider.rating = 7.5;
        assert_eq!(rider.clamped_rating(), 5.0);
        rider.rating = -1.0;
        assert_eq!(rider.clamped_rating(), 0.0);
    }
}
