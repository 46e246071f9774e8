//! Customer confirmation: ask for it, then act on the SMS reply.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::dispatcher::Dispatcher;
use crate::error::AssignmentError;
use crate::model::{Order, OrderNumber, OrderStatus};
use crate::notify::{confirmation_message, normalize_phone, reschedule_follow_up_message};
use crate::traits::{
    CustomerReply, DeliveryStore, NotificationContext, NotificationKind, Notifier, OrderFilter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyAction {
    Confirmed,
    RescheduleRequested,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyOutcome {
    pub action: ReplyAction,
    pub order: OrderNumber,
}

impl<S, N> Dispatcher<S, N>
where
    S: DeliveryStore,
    N: Notifier,
{
    /// Sends the confirm/reschedule prompt. Only valid while the order awaits
    /// confirmation. Returns whether the message went out.
    pub fn request_confirmation(&self, order_number: &OrderNumber, at: NaiveDateTime) -> Result<bool, AssignmentError> {
        let mut order = self.load_order(order_number)?;
        if order.status != OrderStatus::PendingConfirmation {
            return Err(AssignmentError::UnexpectedStatus {
                order: order.order_number,
                status: order.status,
            });
        }

        let message = confirmation_message(&order, &self.landmark_name(order.landmark));
        let context = NotificationContext::new(NotificationKind::Confirmation, Some(&order.order_number));
        let sent = self.notifier.notify(&order.customer_phone, &message, &context);

        if sent {
            order.confirmation_sent_at = Some(at);
            if !self.store.save_order_if(&order, OrderStatus::PendingConfirmation)? {
                warn!(order = %order.order_number, "order changed while prompting, send time not stored");
            }
        }
        Ok(sent)
    }

    /// Applies a customer reply: `1` confirms, `2` asks to reschedule.
    ///
    /// The reply applies to the newest order still awaiting confirmation for
    /// that phone number, and is attached to that order's logged prompt.
    #[instrument(skip(self))]
    pub fn handle_reply(&self, phone: &str, text: &str, at: NaiveDateTime) -> Result<ReplyOutcome, AssignmentError> {
        let mut order = self
            .pending_order_for(phone)?
            .ok_or_else(|| AssignmentError::NoPendingOrder(phone.to_string()))?;

        let previous = order.status;
        let reply = text.trim();
        let action = match reply {
            "1" => {
                order.set_status(OrderStatus::Confirmed)?;
                order.customer_confirmed_at = Some(at);
                ReplyAction::Confirmed
            }
            "2" => {
                order.set_status(OrderStatus::RescheduleRequested)?;
                ReplyAction::RescheduleRequested
            }
            other => return Err(AssignmentError::InvalidReply(other.to_string())),
        };
        self.save_from(&order, previous)?;

        self.notifier.record_reply(
            &order.order_number,
            CustomerReply {
                content: reply.to_string(),
                received_at: at,
            },
        );

        if action == ReplyAction::RescheduleRequested {
            let context = NotificationContext::new(NotificationKind::Confirmation, Some(&order.order_number));
            self.notifier
                .notify(phone, &reschedule_follow_up_message(&order), &context);
        }

        info!(order = %order.order_number, ?action, "customer reply applied");
        Ok(ReplyOutcome {
            action,
            order: order.order_number,
        })
    }

    fn pending_order_for(&self, phone: &str) -> Result<Option<Order>, AssignmentError> {
        // Compare in normalized form; stored numbers may be local or international.
        let country_code = &self.options.country_code;
        let wanted = normalize_phone(phone, country_code);
        let pending = self
            .store
            .find_orders(&OrderFilter::default().status(OrderStatus::PendingConfirmation))?;

        Ok(pending
            .into_iter()
            .filter(|order| normalize_phone(&order.customer_phone, country_code) == wanted)
            .max_by_key(|order| order.created_at))
    }
}
