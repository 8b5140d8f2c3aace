use async_trait::async_trait;

use crate::{
    analytics::ModeLookup, db::DbPool, error::AppError, models::mode::TransportationMode,
};

#[derive(Clone)]
pub struct ModeStore {
    db: DbPool,
}

impl ModeStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<TransportationMode>, AppError> {
        let modes = sqlx::query_as::<_, TransportationMode>(
            "SELECT id, name, description FROM transportation_modes ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(modes)
    }

    pub async fn find(&self, mode_id: i64) -> Result<Option<TransportationMode>, AppError> {
        let mode = sqlx::query_as::<_, TransportationMode>(
            "SELECT id, name, description FROM transportation_modes WHERE id = ?1",
        )
        .bind(mode_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(mode)
    }

    pub async fn get(&self, mode_id: i64) -> Result<TransportationMode, AppError> {
        self.find(mode_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("mode {mode_id} not found")))
    }
}

#[async_trait]
impl ModeLookup for ModeStore {
    async fn find_mode(&self, mode_id: i64) -> Result<Option<TransportationMode>, AppError> {
        self.find(mode_id).await
    }
}
