//! The planner service: holds the injected store and notifier.
//!
//! Entry points live next to the logic they drive:
//! [`assign`](Dispatcher::assign) and [`manual_assign`](Dispatcher::manual_assign)
//! in [`crate::assignment`], [`optimize`](Dispatcher::optimize) in
//! [`crate::optimizer`], delivery outcomes in [`crate::outcomes`] and customer
//! replies in [`crate::confirmation`].

use serde::Deserialize;
use tracing::warn;

use crate::model::LandmarkId;
use crate::scoring::ScoringWeights;
use crate::traits::{DeliveryStore, Notifier};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssignmentOptions {
    pub weights: ScoringWeights,
    /// Score riders on the rayon pool. Selection order is unaffected.
    pub parallel_scoring: bool,
    /// Dialling code used when matching customer phone numbers.
    pub country_code: String,
}

impl Default for AssignmentOptions {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            parallel_scoring: true,
            country_code: "254".to_string(),
        }
    }
}

pub struct Dispatcher<S, N> {
    pub(crate) store: S,
    pub(crate) notifier: N,
    pub(crate) options: AssignmentOptions,
}

impl<S, N> Dispatcher<S, N>
where
    S: DeliveryStore,
    N: Notifier,
{
    pub fn new(store: S, notifier: N) -> Self {
        Self::with_options(store, notifier, AssignmentOptions::default())
    }

    pub fn with_options(store: S, notifier: N, options: AssignmentOptions) -> Self {
        Self {
            store,
            notifier,
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn options(&self) -> &AssignmentOptions {
        &self.options
    }

    /// Display name for a landmark, falling back to its id.
    pub(crate) fn landmark_name(&self, id: LandmarkId) -> String {
        match self.store.landmark(id) {
            Ok(Some(landmark)) => landmark.name,
            Ok(None) => id.to_string(),
            Err(err) => {
                warn!(landmark = %id, error = %err, "landmark lookup failed");
                id.to_string()
            }
        }
    }
}
