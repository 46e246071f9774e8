//! Partition orders into cohorts sharing a landmark and delivery date.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};

use crate::model::{LandmarkId, Order};

/// Orders assigned together as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Cohort {
    pub landmark: LandmarkId,
    pub delivery_date: NaiveDate,
    /// Never empty. Input order is preserved.
    pub orders: Vec<Order>,
}

impl Cohort {
    pub fn key(&self) -> (LandmarkId, NaiveDate) {
        (self.landmark, self.delivery_date)
    }

    /// Earliest delivery window start across the cohort.
    pub fn earliest_start(&self) -> Option<NaiveTime> {
        self.orders.iter().map(|order| order.delivery_time_start).min()
    }
}

/// Groups orders by `(landmark, delivery_date)`.
///
/// Every input order lands in exactly one cohort. Cohorts come back in order
/// of first appearance, which callers may rely on for reproducible logs but
/// not for correctness.
pub fn group_orders(orders: impl IntoIterator<Item = Order>) -> Vec<Cohort> {
    let mut index: HashMap<(LandmarkId, NaiveDate), usize> = HashMap::new();
    let mut cohorts: Vec<Cohort> = Vec::new();

    for order in orders {
        let key = (order.landmark, order.delivery_date);
        match index.get(&key) {
            Some(&slot) => cohorts[slot].orders.push(order),
            None => {
                index.insert(key, cohorts.len());
                cohorts.push(Cohort {
                    landmark: key.0,
                    delivery_date: key.1,
                    orders: vec![order],
                });
            }
        }
    }

    cohorts
}
