//! Outbound notifications: message templates, phone normalization and a
//! [`Notifier`] that sends through an [`SmsGateway`] and logs every attempt.

use chrono::{NaiveDateTime, NaiveTime, Utc};
use tracing::{info, warn};

use crate::model::{Order, OrderNumber};
use crate::traits::{
    CustomerReply, NotificationContext, NotificationLog, NotificationRecord, Notifier,
    OutboundMessage, SmsGateway,
};

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// International dialling code without `+`, used for local numbers.
    pub country_code: String,
    /// Sender id passed to the gateway, if the account has one.
    pub sender_id: Option<String>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            country_code: "254".to_string(),
            sender_id: None,
        }
    }
}

/// Rewrites a local number to international `+<cc>` form.
///
/// `0712345678` and `254712345678` both become `+254712345678`; numbers
/// already starting with `+` are left alone.
pub fn normalize_phone(phone: &str, country_code: &str) -> String {
    let phone = phone.trim();
    if phone.starts_with('+') {
        return phone.to_string();
    }
    if let Some(rest) = phone.strip_prefix('0') {
        return format!("+{country_code}{rest}");
    }
    if phone.starts_with(country_code) {
        return format!("+{phone}");
    }
    format!("+{country_code}{phone}")
}

fn clock(time: NaiveTime) -> String {
    time.format("%I:%M%p").to_string()
}

pub fn confirmation_message(order: &Order, landmark_name: &str) -> String {
    format!(
        "Hello {}! Your order #{} will be delivered on {} between {} - {} near {}. \
         Reply 1 to CONFIRM or 2 to RESCHEDULE.",
        order.customer_name,
        order.order_number,
        order.delivery_date.format("%d/%m/%Y"),
        clock(order.delivery_time_start),
        clock(order.delivery_time_end),
        landmark_name,
    )
}

pub fn rider_assignment_message(stops: usize, landmark_name: &str, start: NaiveTime) -> String {
    format!(
        "New delivery assignment! {stops} stop(s) near {landmark_name}. Start at {}. \
         Check your dashboard for details.",
        clock(start),
    )
}

pub fn delivery_success_customer_message(order: &Order) -> String {
    format!(
        "Your order #{} has been delivered successfully. Thank you for your business!",
        order.order_number
    )
}

pub fn delivery_success_vendor_message(order: &Order, delivered_at: NaiveDateTime) -> String {
    format!(
        "Order #{} to {} delivered successfully at {}.",
        order.order_number,
        order.customer_name,
        clock(delivered_at.time()),
    )
}

pub fn delivery_failed_message(order: &Order) -> String {
    format!(
        "Delivery failed for order #{} to {}. Reason: {}. Please contact customer at {}.",
        order.order_number,
        order.customer_name,
        order.failure_reason.as_deref().unwrap_or(""),
        order.customer_phone,
    )
}

pub fn reschedule_follow_up_message(order: &Order) -> String {
    format!(
        "We'll contact you shortly to reschedule order #{}.",
        order.order_number
    )
}

/// Sends through a gateway and records each attempt, success or not.
pub struct SmsNotifier<G, L> {
    gateway: G,
    log: L,
    config: NotifierConfig,
}

impl<G, L> SmsNotifier<G, L>
where
    G: SmsGateway,
    L: NotificationLog,
{
    pub fn new(gateway: G, log: L, config: NotifierConfig) -> Self {
        Self { gateway, log, config }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn log(&self) -> &L {
        &self.log
    }
}

impl<G, L> Notifier for SmsNotifier<G, L>
where
    G: SmsGateway,
    L: NotificationLog,
{
    fn notify(&self, recipient: &str, message: &str, context: &NotificationContext) -> bool {
        let to = normalize_phone(recipient, &self.config.country_code);
        let outbound = OutboundMessage {
            to: to.clone(),
            message: message.to_string(),
            from: self.config.sender_id.clone(),
        };

        let (delivered, detail) = match self.gateway.send(&outbound) {
            Ok(status) => {
                info!(recipient = %to, kind = ?context.kind, %status, "notification sent");
                (true, "Sent".to_string())
            }
            Err(err) => {
                warn!(recipient = %to, kind = ?context.kind, error = %err, "notification failed");
                (false, format!("Failed: {err}"))
            }
        };

        self.log.record(NotificationRecord {
            recipient: to,
            kind: context.kind,
            content: message.to_string(),
            order: context.order.clone(),
            sent_at: Utc::now().naive_utc(),
            delivered,
            detail,
            response: None,
        });

        delivered
    }

    fn record_reply(&self, order: &OrderNumber, reply: CustomerReply) -> bool {
        let found = self.log.record_reply(order, reply);
        if !found {
            warn!(%order, "reply received without a logged confirmation");
        }
        found
    }
}
