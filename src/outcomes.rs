//! Delivery progress: pickup, final outcome, route completion and rider
//! availability.
//!
//! Recording an outcome keeps the rider's performance counters in step with
//! the order: DELIVERED counts a success, FAILED counts a failure, exactly
//! once per order.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::dispatcher::Dispatcher;
use crate::error::AssignmentError;
use crate::model::{DeliveryRoute, Order, OrderNumber, OrderStatus, Rider, RiderId, RiderStatus, RouteId};
use crate::notify::{
    delivery_failed_message, delivery_success_customer_message, delivery_success_vendor_message,
};
use crate::traits::{DeliveryStore, NotificationContext, NotificationKind, Notifier};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryOutcome {
    Delivered { proof: Option<String> },
    Failed { reason: String },
}

impl<S, N> Dispatcher<S, N>
where
    S: DeliveryStore,
    N: Notifier,
{
    /// ASSIGNED -> IN_TRANSIT.
    pub fn start_delivery(&self, order_number: &OrderNumber) -> Result<Order, AssignmentError> {
        let mut order = self.load_order(order_number)?;
        let previous = order.status;
        order.set_status(OrderStatus::InTransit)?;
        self.save_from(&order, previous)?;
        Ok(order)
    }

    /// IN_TRANSIT -> DELIVERED or FAILED, updating the rider's counters and
    /// notifying the customer and vendor.
    ///
    /// The order is written first and only if it is still IN_TRANSIT, so a
    /// repeated or concurrent call for the same order is rejected instead of
    /// counting the delivery twice.
    #[instrument(skip(self))]
    pub fn record_outcome(
        &self,
        order_number: &OrderNumber,
        outcome: DeliveryOutcome,
        at: NaiveDateTime,
    ) -> Result<Order, AssignmentError> {
        let mut order = self.load_order(order_number)?;
        let previous = order.status;

        match &outcome {
            DeliveryOutcome::Delivered { proof } => {
                order.set_status(OrderStatus::Delivered)?;
                order.delivered_at = Some(at);
                order.delivery_proof = proof.clone();
            }
            DeliveryOutcome::Failed { reason } => {
                order.set_status(OrderStatus::Failed)?;
                order.failure_reason = Some(reason.clone());
            }
        }
        self.save_from(&order, previous)?;

        match order.assigned_rider {
            Some(rider) => {
                let delivered = order.status == OrderStatus::Delivered;
                if let Err(err) = self.store.record_delivery(rider, delivered) {
                    error!(
                        order = %order.order_number,
                        %rider,
                        error = %err,
                        "outcome saved but rider counters not updated"
                    );
                    return Err(err.into());
                }
            }
            None => warn!(order = %order.order_number, "outcome recorded without a rider"),
        }

        info!(order = %order.order_number, status = %order.status, "delivery outcome recorded");

        self.announce_outcome(&order, at);
        Ok(order)
    }

    /// Marks a route as done so later optimizer runs leave it alone.
    pub fn complete_route(&self, route: RouteId, at: NaiveDateTime) -> Result<DeliveryRoute, AssignmentError> {
        let route = self.store.complete_route(route, at)?;
        info!(route = %route.id, rider = %route.rider, "route completed");
        Ok(route)
    }

    /// Sets a rider's availability, e.g. back to AVAILABLE after a shift of
    /// deliveries or OFFLINE at the end of the day.
    pub fn set_rider_status(&self, id: RiderId, status: RiderStatus) -> Result<Rider, AssignmentError> {
        loop {
            let current = self.store.rider(id)?.ok_or(AssignmentError::UnknownRider(id))?;
            if current.status == status {
                return Ok(current);
            }
            // Retry if an assignment pass flipped the rider in between.
            if let Some(rider) = self.store.transition_rider(id, current.status, status)? {
                info!(rider = %id, from = ?current.status, to = ?status, "rider status changed");
                return Ok(rider);
            }
        }
    }

    fn announce_outcome(&self, order: &Order, at: NaiveDateTime) {
        let vendor = order.vendor_phone.as_deref().filter(|phone| !phone.trim().is_empty());
        if vendor.is_none() {
            warn!(order = %order.order_number, "no vendor phone, vendor not notified");
        }

        match order.status {
            OrderStatus::Delivered => {
                let context = NotificationContext::new(NotificationKind::DeliverySuccess, Some(&order.order_number));
                self.notifier.notify(
                    &order.customer_phone,
                    &delivery_success_customer_message(order),
                    &context,
                );
                if let Some(vendor) = vendor {
                    self.notifier
                        .notify(vendor, &delivery_success_vendor_message(order, at), &context);
                }
            }
            OrderStatus::Failed => {
                let context = NotificationContext::new(NotificationKind::DeliveryFailed, Some(&order.order_number));
                if let Some(vendor) = vendor {
                    self.notifier.notify(vendor, &delivery_failed_message(order), &context);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn load_order(&self, order_number: &OrderNumber) -> Result<Order, AssignmentError> {
        self.store
            .order(order_number)?
            .ok_or_else(|| AssignmentError::UnknownOrder(order_number.clone()))
    }

    /// Writes `order` if the stored copy is still in `previous`; otherwise
    /// reports the status someone else moved it to.
    pub(crate) fn save_from(&self, order: &Order, previous: OrderStatus) -> Result<(), AssignmentError> {
        if self.store.save_order_if(order, previous)? {
            return Ok(());
        }
        let current = self.load_order(&order.order_number)?;
        Err(AssignmentError::UnexpectedStatus {
            order: current.order_number,
            status: current.status,
        })
    }
}
