use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        geocoder::Geocoder, impact::ImpactProvider, modes::ModeStore, trips::TripStore,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub trips: TripStore,
    pub modes: ModeStore,
    pub geocoder: Arc<dyn Geocoder>,
    pub impact: Arc<dyn ImpactProvider>,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DbPool,
        geocoder: Arc<dyn Geocoder>,
        impact: Arc<dyn ImpactProvider>,
    ) -> Self {
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        Self {
            config,
            trips: TripStore::new(db.clone()),
            modes: ModeStore::new(db.clone()),
            db,
            geocoder,
            impact,
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
