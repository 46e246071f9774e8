//! Error types for the planner and its adapters.

use thiserror::Error;

use crate::model::{OrderNumber, OrderStatus, RiderId};

/// Failure reported by a persistence adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// An order status change the lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal order transition {from} -> {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Rejections surfaced by the single-request entry points.
///
/// The batch [`assign`](crate::Dispatcher::assign) path
/// only returns this when its initial order query fails; per-cohort problems
/// are reported in the [`AssignmentReport`](crate::assignment::AssignmentReport).
#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("rider_id is required")]
    MissingRider,
    #[error("unknown rider {0}")]
    UnknownRider(RiderId),
    #[error("unknown order {0}")]
    UnknownOrder(OrderNumber),
    #[error("order {order} is {status}")]
    UnexpectedStatus { order: OrderNumber, status: OrderStatus },
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
    #[error("invalid reply {0:?}, expected 1 to confirm or 2 to reschedule")]
    InvalidReply(String),
    #[error("no pending order for {0}")]
    NoPendingOrder(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure sending through an SMS gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway rejected message: {0}")]
    Rejected(String),
}
