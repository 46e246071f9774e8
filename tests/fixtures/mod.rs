//! Test fixtures for dispatch-planner.
//!
//! Provides:
//! - Nairobi landmarks
//! - Builders for orders and riders with sensible defaults
//! - A dispatcher wired to in-memory adapters
//! - A store wrapper that fails chosen calls

#![allow(dead_code)]

pub mod flaky_store;
pub mod nairobi_landmarks;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use dispatch_planner::memory::{InMemoryStore, MemoryNotificationLog, RecordingGateway};
use dispatch_planner::model::{LandmarkId, Order, OrderNumber, OrderStatus, Rider, RiderId, RiderStatus};
use dispatch_planner::notify::{NotifierConfig, SmsNotifier};
use dispatch_planner::traits::{DeliveryStore, NotificationRecord};
use dispatch_planner::{AssignmentOptions, Dispatcher};

pub use flaky_store::FlakyStore;
pub use nairobi_landmarks::*;

pub type TestNotifier = SmsNotifier<RecordingGateway, MemoryNotificationLog>;
pub type TestDispatcher = Dispatcher<InMemoryStore, TestNotifier>;
pub type FlakyDispatcher = Dispatcher<FlakyStore, TestNotifier>;

// ============================================================================
// Time helpers
// ============================================================================

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub fn stamp(d: u32, hour: u32, minute: u32) -> NaiveDateTime {
    day(d).and_time(at(hour, minute))
}

// ============================================================================
// Dispatcher
// ============================================================================

pub fn dispatcher() -> TestDispatcher {
    dispatcher_with(AssignmentOptions::default())
}

pub fn dispatcher_with(options: AssignmentOptions) -> TestDispatcher {
    let store = InMemoryStore::new();
    for landmark in ALL {
        store.insert_landmark(landmark.to_landmark()).unwrap();
    }
    Dispatcher::with_options(store, notifier(), options)
}

/// Dispatcher over a [`FlakyStore`]; arm failures with `store().fail(..)`.
pub fn flaky_dispatcher() -> FlakyDispatcher {
    let store = FlakyStore::default();
    for landmark in ALL {
        store.inner().insert_landmark(landmark.to_landmark()).unwrap();
    }
    Dispatcher::new(store, notifier())
}

fn notifier() -> TestNotifier {
    SmsNotifier::new(
        RecordingGateway::default(),
        MemoryNotificationLog::default(),
        NotifierConfig::default(),
    )
}

pub fn seed<S: DeliveryStore>(dispatcher: &Dispatcher<S, TestNotifier>, orders: Vec<Order>, riders: Vec<Rider>) {
    for rider in riders {
        dispatcher.store().save_rider(&rider).unwrap();
    }
    for order in orders {
        dispatcher.store().save_order(&order).unwrap();
    }
}

pub fn order<S: DeliveryStore>(dispatcher: &Dispatcher<S, TestNotifier>, number: &str) -> Order {
    dispatcher
        .store()
        .order(&OrderNumber::new(number))
        .unwrap()
        .expect("order exists")
}

pub fn rider<S: DeliveryStore>(dispatcher: &Dispatcher<S, TestNotifier>, id: u64) -> Rider {
    dispatcher.store().rider(RiderId(id)).unwrap().expect("rider exists")
}

pub fn set_rider_status<S: DeliveryStore>(dispatcher: &Dispatcher<S, TestNotifier>, id: u64, status: RiderStatus) {
    dispatcher.set_rider_status(RiderId(id), status).unwrap();
}

pub fn notifications<S: DeliveryStore>(dispatcher: &Dispatcher<S, TestNotifier>) -> Vec<NotificationRecord> {
    dispatcher.notifier().log().records()
}

// ============================================================================
// Builders
// ============================================================================

/// Builder for test orders. Defaults to CONFIRMED, 09:00-10:00.
#[derive(Clone, Debug)]
pub struct TestOrder {
    order: Order,
}

impl TestOrder {
    pub fn new(number: &str, landmark: &LandmarkFixture, date: NaiveDate) -> Self {
        let mut order = Order::new(number, landmark.id(), date, (at(9, 0), at(10, 0)));
        order.status = OrderStatus::Confirmed;
        order.customer_name = format!("Customer {number}");
        order.customer_phone = "0722000000".to_string();
        Self { order }
    }

    pub fn window(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.order.delivery_time_start = start;
        self.order.delivery_time_end = end;
        self
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.order.status = status;
        self
    }

    pub fn assigned_to(mut self, rider: u64) -> Self {
        self.order.assigned_rider = Some(RiderId(rider));
        self
    }

    pub fn customer(mut self, name: &str, phone: &str) -> Self {
        self.order.customer_name = name.to_string();
        self.order.customer_phone = phone.to_string();
        self
    }

    pub fn vendor(mut self, phone: &str) -> Self {
        self.order.vendor_phone = Some(phone.to_string());
        self
    }

    pub fn created(mut self, when: NaiveDateTime) -> Self {
        self.order.created_at = Some(when);
        self
    }

    pub fn landmark(mut self, landmark: LandmarkId) -> Self {
        self.order.landmark = landmark;
        self
    }

    pub fn build(self) -> Order {
        self.order
    }
}

/// Builder for test riders. Defaults to AVAILABLE, rating 5, no history.
#[derive(Clone, Debug)]
pub struct TestRider {
    rider: Rider,
}

impl TestRider {
    pub fn new(id: u64, name: &str) -> Self {
        Self {
            rider: Rider::new(id, name, format!("07000000{id:02}")),
        }
    }

    pub fn prefers(mut self, landmark: &LandmarkFixture) -> Self {
        self.rider.preferred_landmarks.insert(landmark.id());
        self
    }

    pub fn rating(mut self, rating: f64) -> Self {
        self.rider.rating = rating;
        self
    }

    pub fn history(mut self, successful: u32, failed: u32) -> Self {
        self.rider.successful_deliveries = successful;
        self.rider.failed_deliveries = failed;
        self.rider.total_deliveries = successful + failed;
        self
    }

    pub fn status(mut self, status: RiderStatus) -> Self {
        self.rider.status = status;
        self
    }

    pub fn build(self) -> Rider {
        self.rider
    }
}

/// International form of the phone [`TestRider`] gives rider `id`.
pub fn rider_phone(id: u64) -> String {
    format!("+2547000000{id:02}")
}
