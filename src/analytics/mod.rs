//! Read-side aggregations over a snapshot of a user's trips.
//!
//! Nothing in here touches the trip store: callers fetch the trips and hand
//! them over, so every function is side-effect free and safe to call
//! concurrently.

pub mod by_mode;
pub mod series;

pub use by_mode::{aggregate_by_mode, ModeLookup, TripsByMode};
pub use series::{cumulative_series, Granularity, ImpactPoint};

use crate::models::trip::Trip;

pub fn total_impact(trips: &[Trip]) -> f64 {
    trips.iter().map(|trip| trip.carbon_impact_kg).sum()
}
