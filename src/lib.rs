//! dispatch-planner core
//!
//! Rider assignment and routing for last-mile delivery: group confirmed
//! orders by landmark and date, score available riders, build ordered routes
//! and keep route sequencing consistent.

pub mod model;
pub mod error;
pub mod traits;
pub mod grouping;
pub mod scoring;
pub mod route_builder;
pub mod dispatcher;
pub mod assignment;
pub mod optimizer;
pub mod outcomes;
pub mod confirmation;
pub mod notify;
pub mod gateway;
pub mod memory;

pub use dispatcher::{AssignmentOptions, Dispatcher};
