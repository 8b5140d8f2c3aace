mod extract;
pub mod public;
pub mod transportation;
pub mod trips;
pub mod user;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use extract::{ApiJson, ApiPath};

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(public::router())
        .nest("/me", user::router())
        .nest("/trips", trips::router())
        .route("/trips/", get(trips::list_trips).post(trips::create_trip))
        .nest("/transportation", transportation::router())
        .route("/transportation/", get(transportation::list_modes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
