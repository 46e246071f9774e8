//! In-memory store that fails chosen calls on demand.
//!
//! Arm a failure with [`FlakyStore::fail`], naming the trait method. The next
//! `times` calls of that method return a backend error without touching the
//! data; later calls go through.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDateTime;

use dispatch_planner::error::StoreError;
use dispatch_planner::memory::InMemoryStore;
use dispatch_planner::model::{
    DeliveryRoute, Landmark, LandmarkId, Order, OrderNumber, OrderStatus, Rider, RiderId, RiderStatus,
    RouteId,
};
use dispatch_planner::traits::{
    LandmarkStore, NewRoute, OrderFilter, OrderStore, RiderFilter, RiderStore, RouteFilter, RouteStore,
};

#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    failures: Mutex<HashMap<&'static str, u32>>,
}

impl FlakyStore {
    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn fail(&self, method: &'static str, times: u32) {
        self.failures.lock().unwrap().insert(method, times);
    }

    fn check(&self, method: &'static str) -> Result<(), StoreError> {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(method) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(StoreError::Backend("boom".to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl OrderStore for FlakyStore {
    fn find_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        self.check("find_orders")?;
        self.inner.find_orders(filter)
    }

    fn order(&self, order_number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        self.check("order")?;
        self.inner.order(order_number)
    }

    fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        self.check("save_order")?;
        self.inner.save_order(order)
    }

    fn save_order_if(&self, order: &Order, expected: OrderStatus) -> Result<bool, StoreError> {
        self.check("save_order_if")?;
        self.inner.save_order_if(order, expected)
    }

    fn claim_orders(&self, orders: &[OrderNumber], rider: RiderId) -> Result<Vec<Order>, StoreError> {
        self.check("claim_orders")?;
        self.inner.claim_orders(orders, rider)
    }
}

impl RiderStore for FlakyStore {
    fn find_riders(&self, filter: &RiderFilter) -> Result<Vec<Rider>, StoreError> {
        self.check("find_riders")?;
        self.inner.find_riders(filter)
    }

    fn rider(&self, id: RiderId) -> Result<Option<Rider>, StoreError> {
        self.check("rider")?;
        self.inner.rider(id)
    }

    fn save_rider(&self, rider: &Rider) -> Result<(), StoreError> {
        self.check("save_rider")?;
        self.inner.save_rider(rider)
    }

    fn transition_rider(
        &self,
        id: RiderId,
        from: RiderStatus,
        to: RiderStatus,
    ) -> Result<Option<Rider>, StoreError> {
        self.check("transition_rider")?;
        self.inner.transition_rider(id, from, to)
    }

    fn record_delivery(&self, id: RiderId, delivered: bool) -> Result<Rider, StoreError> {
        self.check("record_delivery")?;
        self.inner.record_delivery(id, delivered)
    }
}

impl LandmarkStore for FlakyStore {
    fn landmark(&self, id: LandmarkId) -> Result<Option<Landmark>, StoreError> {
        self.check("landmark")?;
        self.inner.landmark(id)
    }
}

impl RouteStore for FlakyStore {
    fn find_routes(&self, filter: &RouteFilter) -> Result<Vec<DeliveryRoute>, StoreError> {
        self.check("find_routes")?;
        self.inner.find_routes(filter)
    }

    fn create_route(&self, route: NewRoute) -> Result<DeliveryRoute, StoreError> {
        self.check("create_route")?;
        self.inner.create_route(route)
    }

    fn add_orders_to_route(&self, route: RouteId, orders: &[OrderNumber]) -> Result<(), StoreError> {
        self.check("add_orders_to_route")?;
        self.inner.add_orders_to_route(route, orders)
    }

    fn renumber_routes(&self, sequences: &[(RouteId, u32)]) -> Result<(), StoreError> {
        self.check("renumber_routes")?;
        self.inner.renumber_routes(sequences)
    }

    fn complete_route(&self, route: RouteId, at: NaiveDateTime) -> Result<DeliveryRoute, StoreError> {
        self.check("complete_route")?;
        self.inner.complete_route(route, at)
    }
}
