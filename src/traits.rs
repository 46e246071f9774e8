//! Collaborator contracts for the delivery planner.
//!
//! The planner owns no storage and no transport. Applications implement these
//! traits for their own database and messaging stack; [`crate::memory`] has
//! reference implementations.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, StoreError};
use crate::model::{
    DeliveryRoute, Landmark, LandmarkId, Order, OrderNumber, OrderStatus, Rider, RiderId,
    RiderStatus, RouteId,
};

/// Order query. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Any-of status match. Empty matches all statuses.
    pub statuses: Vec<OrderStatus>,
    pub unassigned_only: bool,
    pub assigned_rider: Option<RiderId>,
    pub landmark: Option<LandmarkId>,
    pub date: Option<NaiveDate>,
    pub customer_phone: Option<String>,
}

impl OrderFilter {
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn unassigned(mut self) -> Self {
        self.unassigned_only = true;
        self
    }

    pub fn assigned_to(mut self, rider: RiderId) -> Self {
        self.assigned_rider = Some(rider);
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&order.status))
            && (!self.unassigned_only || order.assigned_rider.is_none())
            && self.assigned_rider.is_none_or(|rider| order.assigned_rider == Some(rider))
            && self.landmark.is_none_or(|landmark| order.landmark == landmark)
            && self.date.is_none_or(|date| order.delivery_date == date)
            && self
                .customer_phone
                .as_ref()
                .is_none_or(|phone| &order.customer_phone == phone)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiderFilter {
    pub status: Option<RiderStatus>,
}

impl RiderFilter {
    pub fn available() -> Self {
        Self {
            status: Some(RiderStatus::Available),
        }
    }

    pub fn matches(&self, rider: &Rider) -> bool {
        self.status.is_none_or(|status| rider.status == status)
    }
}

#[derive(Debug, Clone)]
pub struct RouteFilter {
    pub rider: RiderId,
    pub date: NaiveDate,
    /// `Some(false)` restricts to outstanding routes.
    pub completed: Option<bool>,
}

impl RouteFilter {
    pub fn new(rider: RiderId, date: NaiveDate) -> Self {
        Self {
            rider,
            date,
            completed: None,
        }
    }

    pub fn outstanding(mut self) -> Self {
        self.completed = Some(false);
        self
    }

    pub fn matches(&self, route: &DeliveryRoute) -> bool {
        route.rider == self.rider
            && route.route_date == self.date
            && self.completed.is_none_or(|completed| route.completed == completed)
    }
}

/// How a new route obtains its sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceSlot {
    /// `1 + max(sequence)` for the rider and date, or 1 when none exist.
    /// Stores must resolve this atomically with the insert.
    Next,
    Fixed(u32),
}

#[derive(Debug, Clone)]
pub struct NewRoute {
    pub rider: RiderId,
    pub route_date: NaiveDate,
    pub landmark: LandmarkId,
    pub sequence: SequenceSlot,
    pub estimated_arrival: chrono::NaiveTime,
}

pub trait OrderStore {
    /// Matching orders in insertion order.
    fn find_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError>;

    fn order(&self, order_number: &OrderNumber) -> Result<Option<Order>, StoreError>;

    fn save_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Writes `order` only if the stored copy is still in `expected` status,
    /// checked and written under one lock or transaction. Returns whether the
    /// write happened.
    fn save_order_if(&self, order: &Order, expected: OrderStatus) -> Result<bool, StoreError>;

    /// Moves each listed order that is still CONFIRMED and unassigned to
    /// ASSIGNED for `rider`, all under one lock or transaction. Returns the
    /// orders it moved; anything taken or changed since it was read is left
    /// alone and missing from the result.
    fn claim_orders(&self, orders: &[OrderNumber], rider: RiderId) -> Result<Vec<Order>, StoreError>;
}

pub trait RiderStore {
    /// Matching riders in a stable order. This order is the scoring tie-break.
    fn find_riders(&self, filter: &RiderFilter) -> Result<Vec<Rider>, StoreError>;

    fn rider(&self, id: RiderId) -> Result<Option<Rider>, StoreError>;

    fn save_rider(&self, rider: &Rider) -> Result<(), StoreError>;

    /// Sets the rider's status to `to` only if it is currently `from`.
    /// `Ok(None)` means the rider was in another status and nothing changed.
    fn transition_rider(
        &self,
        id: RiderId,
        from: RiderStatus,
        to: RiderStatus,
    ) -> Result<Option<Rider>, StoreError>;

    /// Counts one finished delivery against the rider in a single write.
    fn record_delivery(&self, id: RiderId, delivered: bool) -> Result<Rider, StoreError>;
}

pub trait LandmarkStore {
    fn landmark(&self, id: LandmarkId) -> Result<Option<Landmark>, StoreError>;
}

pub trait RouteStore {
    /// Routes for a rider and date, ascending by sequence.
    fn find_routes(&self, filter: &RouteFilter) -> Result<Vec<DeliveryRoute>, StoreError>;

    /// Inserts a route. [`SequenceSlot::Next`] must be resolved under the same
    /// lock or transaction as the insert so concurrent callers never share a
    /// sequence for one rider and date.
    fn create_route(&self, route: NewRoute) -> Result<DeliveryRoute, StoreError>;

    fn add_orders_to_route(&self, route: RouteId, orders: &[OrderNumber]) -> Result<(), StoreError>;

    /// Applies all `(route, sequence)` pairs as one unit.
    fn renumber_routes(&self, sequences: &[(RouteId, u32)]) -> Result<(), StoreError>;

    /// Marks a route done. Completed routes are left out of optimization.
    fn complete_route(&self, route: RouteId, at: NaiveDateTime) -> Result<DeliveryRoute, StoreError>;
}

/// Everything the planner reads and writes.
pub trait DeliveryStore: OrderStore + RiderStore + LandmarkStore + RouteStore {}

impl<T> DeliveryStore for T where T: OrderStore + RiderStore + LandmarkStore + RouteStore {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Confirmation,
    RiderAssignment,
    DeliverySuccess,
    DeliveryFailed,
}

/// What a message is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContext {
    pub kind: NotificationKind,
    pub order: Option<OrderNumber>,
}

impl NotificationContext {
    pub fn new(kind: NotificationKind, order: Option<&OrderNumber>) -> Self {
        Self {
            kind,
            order: order.cloned(),
        }
    }
}

/// Fire-and-forget message delivery. Returns whether the message went out;
/// implementations log every attempt and never panic on transport errors.
pub trait Notifier {
    fn notify(&self, recipient: &str, message: &str, context: &NotificationContext) -> bool;

    /// Attaches a customer's reply to the confirmation sent for `order`.
    /// Returns whether a confirmation record was found.
    fn record_reply(&self, order: &OrderNumber, reply: CustomerReply) -> bool;
}

/// A customer's SMS answer to a confirmation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerReply {
    pub content: String,
    pub received_at: NaiveDateTime,
}

/// A single logged notification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub recipient: String,
    pub kind: NotificationKind,
    pub content: String,
    pub order: Option<OrderNumber>,
    pub sent_at: NaiveDateTime,
    pub delivered: bool,
    /// `Sent` or `Failed: <reason>`.
    pub detail: String,
    pub response: Option<CustomerReply>,
}

/// Durable sink for notification attempts.
pub trait NotificationLog {
    fn record(&self, record: NotificationRecord);

    /// Stores `reply` on the earliest CONFIRMATION record for `order`.
    /// Returns `false` when there is none.
    fn record_reply(&self, order: &OrderNumber, reply: CustomerReply) -> bool;
}

/// A message ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub to: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// Raw SMS transport. Returns the provider's status text on success.
pub trait SmsGateway {
    fn send(&self, message: &OutboundMessage) -> Result<String, GatewayError>;
}
