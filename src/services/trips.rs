use chrono::Utc;

use crate::{
    db::DbPool,
    error::AppError,
    models::trip::{NewTrip, Trip},
};

const TRIP_COLUMNS: &str = "id, user_id, start_address, end_address, distance_km, mode_id, \
                            carbon_impact_kg, trip_date, created_at";

#[derive(Clone)]
pub struct TripStore {
    db: DbPool,
}

impl TripStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// All trips of a user, in no particular order. Unknown users are `NotFound`.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Trip>, AppError> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("user not found".into()));
        }

        let trips = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE user_id = ?1"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(trips)
    }

    pub async fn get(&self, trip_id: i64) -> Result<Trip, AppError> {
        sqlx::query_as::<_, Trip>(&format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"))
            .bind(trip_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("trip not found".into()))
    }

    pub async fn get_owned(&self, trip_id: i64, user_id: i64) -> Result<Trip, AppError> {
        let trip = self.get(trip_id).await?;
        if trip.user_id != user_id {
            return Err(AppError::NotFound("trip not found".into()));
        }
        Ok(trip)
    }

    pub async fn insert(&self, trip: &NewTrip) -> Result<Trip, AppError> {
        let created = sqlx::query_as::<_, Trip>(&format!(
            "INSERT INTO trips (user_id, start_address, end_address, distance_km, mode_id, \
             carbon_impact_kg, trip_date, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING {TRIP_COLUMNS}"
        ))
        .bind(trip.user_id)
        .bind(&trip.start_address)
        .bind(&trip.end_address)
        .bind(trip.distance_km)
        .bind(trip.mode_id)
        .bind(trip.carbon_impact_kg)
        .bind(trip.trip_date)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;
        Ok(created)
    }

    pub async fn replace(&self, trip: &Trip) -> Result<Trip, AppError> {
        let result = sqlx::query(
            "UPDATE trips SET user_id = ?1, start_address = ?2, end_address = ?3, \
             distance_km = ?4, mode_id = ?5, carbon_impact_kg = ?6, trip_date = ?7, \
             created_at = ?8 WHERE id = ?9",
        )
        .bind(trip.user_id)
        .bind(&trip.start_address)
        .bind(&trip.end_address)
        .bind(trip.distance_km)
        .bind(trip.mode_id)
        .bind(trip.carbon_impact_kg)
        .bind(trip.trip_date)
        .bind(trip.created_at)
        .bind(trip.id)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("trip not found".into()));
        }
        Ok(trip.clone())
    }

    pub async fn delete(&self, trip_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM trips WHERE id = ?1")
            .bind(trip_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("trip not found".into()));
        }
        Ok(())
    }
}
