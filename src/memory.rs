//! In-memory adapters for every collaborator trait.
//!
//! One mutex guards all tables, so a route insert and its sequence lookup
//! always happen together, and every conditional write checks and writes
//! without letting another caller in between.

use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;

use crate::error::{GatewayError, StoreError};
use crate::model::{
    DeliveryRoute, Landmark, LandmarkId, Order, OrderNumber, OrderStatus, Rider, RiderId,
    RiderStatus, RouteId,
};
use crate::route_builder::next_sequence;
use crate::traits::{
    CustomerReply, LandmarkStore, NewRoute, NotificationKind, NotificationLog, NotificationRecord,
    OrderFilter, OrderStore, OutboundMessage, RiderFilter, RiderStore, RouteFilter, RouteStore,
    SequenceSlot, SmsGateway,
};

#[derive(Debug, Default)]
struct Tables {
    landmarks: Vec<Landmark>,
    riders: Vec<Rider>,
    orders: Vec<Order>,
    routes: Vec<DeliveryRoute>,
    next_route_id: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".to_string()))
    }

    pub fn insert_landmark(&self, landmark: Landmark) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        tables.landmarks.retain(|existing| existing.id != landmark.id);
        tables.landmarks.push(landmark);
        Ok(())
    }

    pub fn insert_rider(&self, rider: Rider) -> Result<(), StoreError> {
        self.save_rider(&rider)
    }

    pub fn insert_order(&self, order: Order) -> Result<(), StoreError> {
        self.save_order(&order)
    }

    /// Every route, in creation order.
    pub fn routes(&self) -> Result<Vec<DeliveryRoute>, StoreError> {
        Ok(self.tables()?.routes.clone())
    }
}

fn not_found(entity: &'static str, id: impl std::fmt::Display) -> StoreError {
    StoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}

impl OrderStore for InMemoryStore {
    fn find_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .tables()?
            .orders
            .iter()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect())
    }

    fn order(&self, order_number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        Ok(self
            .tables()?
            .orders
            .iter()
            .find(|order| &order.order_number == order_number)
            .cloned())
    }

    fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        match tables
            .orders
            .iter_mut()
            .find(|existing| existing.order_number == order.order_number)
        {
            Some(existing) => *existing = order.clone(),
            None => tables.orders.push(order.clone()),
        }
        Ok(())
    }

    fn save_order_if(&self, order: &Order, expected: OrderStatus) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        let existing = tables
            .orders
            .iter_mut()
            .find(|existing| existing.order_number == order.order_number)
            .ok_or_else(|| not_found("order", &order.order_number))?;

        if existing.status != expected {
            return Ok(false);
        }
        *existing = order.clone();
        Ok(true)
    }

    fn claim_orders(&self, orders: &[OrderNumber], rider: RiderId) -> Result<Vec<Order>, StoreError> {
        let mut tables = self.tables()?;
        let mut claimed = Vec::new();

        for number in orders {
            let Some(order) = tables
                .orders
                .iter_mut()
                .find(|existing| &existing.order_number == number)
            else {
                continue;
            };
            if order.is_assignable() && order.set_status(OrderStatus::Assigned).is_ok() {
                order.assigned_rider = Some(rider);
                claimed.push(order.clone());
            }
        }
        Ok(claimed)
    }
}

impl RiderStore for InMemoryStore {
    fn find_riders(&self, filter: &RiderFilter) -> Result<Vec<Rider>, StoreError> {
        Ok(self
            .tables()?
            .riders
            .iter()
            .filter(|rider| filter.matches(rider))
            .cloned()
            .collect())
    }

    fn rider(&self, id: RiderId) -> Result<Option<Rider>, StoreError> {
        Ok(self.tables()?.riders.iter().find(|rider| rider.id == id).cloned())
    }

    fn save_rider(&self, rider: &Rider) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        match tables.riders.iter_mut().find(|existing| existing.id == rider.id) {
            Some(existing) => *existing = rider.clone(),
            None => tables.riders.push(rider.clone()),
        }
        Ok(())
    }

    fn transition_rider(
        &self,
        id: RiderId,
        from: RiderStatus,
        to: RiderStatus,
    ) -> Result<Option<Rider>, StoreError> {
        let mut tables = self.tables()?;
        let rider = tables
            .riders
            .iter_mut()
            .find(|rider| rider.id == id)
            .ok_or_else(|| not_found("rider", id))?;

        if rider.status != from {
            return Ok(None);
        }
        rider.status = to;
        Ok(Some(rider.clone()))
    }

    fn record_delivery(&self, id: RiderId, delivered: bool) -> Result<Rider, StoreError> {
        let mut tables = self.tables()?;
        let rider = tables
            .riders
            .iter_mut()
            .find(|rider| rider.id == id)
            .ok_or_else(|| not_found("rider", id))?;

        if delivered {
            rider.record_success();
        } else {
            rider.record_failure();
        }
        Ok(rider.clone())
    }
}

impl LandmarkStore for InMemoryStore {
    fn landmark(&self, id: LandmarkId) -> Result<Option<Landmark>, StoreError> {
        Ok(self
            .tables()?
            .landmarks
            .iter()
            .find(|landmark| landmark.id == id)
            .cloned())
    }
}

impl RouteStore for InMemoryStore {
    fn find_routes(&self, filter: &RouteFilter) -> Result<Vec<DeliveryRoute>, StoreError> {
        let mut routes: Vec<DeliveryRoute> = self
            .tables()?
            .routes
            .iter()
            .filter(|route| filter.matches(route))
            .cloned()
            .collect();
        routes.sort_by_key(|route| route.sequence);
        Ok(routes)
    }

    fn create_route(&self, route: NewRoute) -> Result<DeliveryRoute, StoreError> {
        let mut tables = self.tables()?;

        let sequence = match route.sequence {
            SequenceSlot::Next => next_sequence(&tables.routes, route.rider, route.route_date),
            SequenceSlot::Fixed(sequence) => sequence,
        };

        tables.next_route_id += 1;
        let created = DeliveryRoute {
            id: RouteId(tables.next_route_id),
            rider: route.rider,
            route_date: route.route_date,
            landmark: route.landmark,
            orders: Vec::new(),
            sequence,
            estimated_arrival: route.estimated_arrival,
            completed: false,
            completed_at: None,
        };
        tables.routes.push(created.clone());
        Ok(created)
    }

    fn add_orders_to_route(&self, route: RouteId, orders: &[OrderNumber]) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        let route = tables
            .routes
            .iter_mut()
            .find(|existing| existing.id == route)
            .ok_or_else(|| not_found("route", route))?;

        for order in orders {
            if !route.orders.contains(order) {
                route.orders.push(order.clone());
            }
        }
        Ok(())
    }

    fn renumber_routes(&self, sequences: &[(RouteId, u32)]) -> Result<(), StoreError> {
        let mut tables = self.tables()?;

        if let Some((missing, _)) = sequences
            .iter()
            .find(|(id, _)| !tables.routes.iter().any(|route| route.id == *id))
        {
            return Err(not_found("route", missing));
        }

        for (id, sequence) in sequences {
            if let Some(route) = tables.routes.iter_mut().find(|route| route.id == *id) {
                route.sequence = *sequence;
            }
        }
        Ok(())
    }

    fn complete_route(&self, route: RouteId, at: NaiveDateTime) -> Result<DeliveryRoute, StoreError> {
        let mut tables = self.tables()?;
        let route = tables
            .routes
            .iter_mut()
            .find(|existing| existing.id == route)
            .ok_or_else(|| not_found("route", route))?;
        route.completed = true;
        route.completed_at = Some(at);
        Ok(route.clone())
    }
}

/// Keeps notification attempts in memory.
#[derive(Debug, Default)]
pub struct MemoryNotificationLog {
    records: Mutex<Vec<NotificationRecord>>,
}

impl MemoryNotificationLog {
    pub fn records(&self) -> Vec<NotificationRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl NotificationLog for MemoryNotificationLog {
    fn record(&self, record: NotificationRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }

    fn record_reply(&self, order: &OrderNumber, reply: CustomerReply) -> bool {
        let Ok(mut records) = self.records.lock() else {
            return false;
        };
        let confirmation = records.iter_mut().find(|record| {
            record.kind == NotificationKind::Confirmation && record.order.as_ref() == Some(order)
        });
        match confirmation {
            Some(record) => {
                record.response = Some(reply);
                true
            }
            None => false,
        }
    }
}

/// Gateway that keeps outgoing messages instead of sending them.
///
/// Recipients registered with [`RecordingGateway::reject`] fail delivery.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<OutboundMessage>>,
    rejected: Mutex<Vec<String>>,
}

impl RecordingGateway {
    pub fn reject(&self, recipient: impl Into<String>) {
        if let Ok(mut rejected) = self.rejected.lock() {
            rejected.push(recipient.into());
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl SmsGateway for RecordingGateway {
    fn send(&self, message: &OutboundMessage) -> Result<String, GatewayError> {
        let rejected = self
            .rejected
            .lock()
            .map(|rejected| rejected.contains(&message.to))
            .unwrap_or(false);
        if rejected {
            return Err(GatewayError::Rejected(format!("{} is unreachable", message.to)));
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok("Success".to_string())
    }
}
