use chrono::NaiveDate;
use tracing::info;

use crate::{
    analytics::ModeLookup,
    error::AppError,
    models::trip::{DistanceSource, NewTrip, Trip, TripRequest},
    services::{
        geocoder::{distance_between, Geocoder},
        impact::{carbon_impact, ImpactProvider},
    },
    state::AppState,
};

pub struct TripResolver<'a> {
    pub modes: &'a dyn ModeLookup,
    pub geocoder: &'a dyn Geocoder,
    pub impact: &'a dyn ImpactProvider,
}

impl<'a> TripResolver<'a> {
    pub fn from_state(state: &'a AppState) -> Self {
        Self {
            modes: &state.modes,
            geocoder: state.geocoder.as_ref(),
            impact: state.impact.as_ref(),
        }
    }

    /// Input errors are reported before any lookup runs. The geocoder is only
    /// consulted when no positive distance was given.
    pub async fn resolve(
        &self,
        user_id: i64,
        request: &TripRequest,
        today: NaiveDate,
    ) -> Result<NewTrip, AppError> {
        let mode_id = request.mode_id()?;
        let source = request.distance_source()?;

        if self.modes.find_mode(mode_id).await?.is_none() {
            return Err(AppError::NotFound(format!("mode {mode_id} not found")));
        }

        let (distance_km, start_address, end_address) = match source {
            DistanceSource::Direct(km) => (km, None, None),
            DistanceSource::Geocoded { start, end } => {
                let km = distance_between(self.geocoder, &start, &end).await?;
                (km, Some(start), Some(end))
            }
        };

        let carbon_impact_kg = carbon_impact(self.impact, mode_id, distance_km).await?;

        Ok(NewTrip {
            user_id,
            start_address,
            end_address,
            distance_km,
            mode_id,
            carbon_impact_kg,
            trip_date: request.trip_date.unwrap_or(today),
        })
    }
}

pub async fn register_trip(
    state: &AppState,
    user_id: i64,
    request: &TripRequest,
    today: NaiveDate,
) -> Result<Trip, AppError> {
    let new_trip = TripResolver::from_state(state)
        .resolve(user_id, request, today)
        .await?;
    let trip = state.trips.insert(&new_trip).await?;
    info!(
        trip_id = trip.id,
        user_id,
        mode_id = trip.mode_id,
        distance_km = trip.distance_km,
        carbon_impact_kg = trip.carbon_impact_kg,
        "trip registered"
    );
    Ok(trip)
}

pub async fn replace_trip(
    state: &AppState,
    user_id: i64,
    trip_id: i64,
    request: &TripRequest,
    today: NaiveDate,
) -> Result<Trip, AppError> {
    let existing = state.trips.get_owned(trip_id, user_id).await?;
    let resolved = TripResolver::from_state(state)
        .resolve(user_id, request, today)
        .await?;

    let replacement = Trip {
        id: existing.id,
        user_id: existing.user_id,
        start_address: resolved.start_address,
        end_address: resolved.end_address,
        distance_km: resolved.distance_km,
        mode_id: resolved.mode_id,
        carbon_impact_kg: resolved.carbon_impact_kg,
        trip_date: resolved.trip_date,
        created_at: existing.created_at,
    };
    let trip = state.trips.replace(&replacement).await?;
    info!(trip_id, user_id, "trip replaced");
    Ok(trip)
}
