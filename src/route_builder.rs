//! Builds delivery routes for an assigned cohort.

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use crate::error::StoreError;
use crate::model::{DeliveryRoute, LandmarkId, Order, OrderNumber, RiderId};
use crate::traits::{NewRoute, RouteStore, SequenceSlot};

/// Next free sequence for a rider's day: `1 + max`, or 1 for an empty day.
///
/// Stores call this while holding whatever lock guards route inserts.
pub fn next_sequence<'a>(
    routes: impl IntoIterator<Item = &'a DeliveryRoute>,
    rider: RiderId,
    date: NaiveDate,
) -> u32 {
    routes
        .into_iter()
        .filter(|route| route.rider == rider && route.route_date == date)
        .map(|route| route.sequence)
        .max()
        .map_or(1, |max| max + 1)
}

/// Earliest window start across the orders.
pub fn estimated_arrival(orders: &[Order]) -> Option<NaiveTime> {
    orders.iter().map(|order| order.delivery_time_start).min()
}

/// Creates a route for `orders` and links them to it.
///
/// Returns `Ok(None)` when `orders` is empty.
pub fn build_route<S>(
    store: &S,
    rider: RiderId,
    landmark: LandmarkId,
    date: NaiveDate,
    orders: &[Order],
    sequence: SequenceSlot,
) -> Result<Option<DeliveryRoute>, StoreError>
where
    S: RouteStore + ?Sized,
{
    let Some(arrival) = estimated_arrival(orders) else {
        return Ok(None);
    };

    let mut route = store.create_route(NewRoute {
        rider,
        route_date: date,
        landmark,
        sequence,
        estimated_arrival: arrival,
    })?;

    let numbers: Vec<OrderNumber> = orders.iter().map(|order| order.order_number.clone()).collect();
    store.add_orders_to_route(route.id, &numbers)?;
    route.orders = numbers;

    debug!(
        route = %route.id,
        rider = %rider,
        sequence = route.sequence,
        stops = route.orders.len(),
        "built route"
    );

    Ok(Some(route))
}
