use std::{collections::HashMap, fmt, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
};
use carbon::{
    analytics::{self, Granularity, ImpactPoint, TripsByMode},
    auth::{self, AuthenticatedUser},
    config::{AppConfig, DEFAULT_GEOCODER_URL, DEFAULT_IMPACT_API_URL},
    db::{init_pool, run_migrations},
    error::AppError,
    geo::Coordinates,
    models::trip::{Trip, TripRequest},
    routes::create_router,
    services::{geocoder::Geocoder, impact::ImpactProvider, registration},
    state::AppState,
};
use chrono::{Days, Utc};
use cucumber::{given, then, when, World as _};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    registered_user: Option<AuthenticatedUser>,
    token: Option<String>,
    last_registration: Option<Result<Trip, AppError>>,
    last_status: Option<StatusCode>,
    last_body: Option<Value>,
    remembered_trip: Option<Value>,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .app()
    }

    fn user(&self) -> &AuthenticatedUser {
        self.registered_user
            .as_ref()
            .expect("a user must be registered first")
    }

    fn response_trip(&self) -> &Value {
        let trip = &self.last_body.as_ref().expect("a response body")["trip"];
        assert!(trip.is_object(), "no trip in {:?}", self.last_body);
        trip
    }

    fn remembered_trip_id(&self) -> i64 {
        self.remembered_trip
            .as_ref()
            .and_then(|trip| trip["trip_id"].as_i64())
            .expect("a remembered trip")
    }

    fn last_trip(&self) -> &Trip {
        match self.last_registration.as_ref() {
            Some(Ok(trip)) => trip,
            other => panic!("expected a registered trip, got {other:?}"),
        }
    }

    async fn trips(&self) -> Vec<Trip> {
        self.app_state()
            .trips
            .list_for_user(self.user().id)
            .await
            .expect("list trips")
    }
}

/// Known addresses only.
struct StubGeocoder(HashMap<&'static str, Coordinates>);

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn resolve(&self, address: &str) -> Result<Coordinates, AppError> {
        self.0
            .get(address)
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("no results found for address: {address}")))
    }
}

/// Fixed kg per km for the listed modes, no data for the rest.
struct StubImpact(HashMap<i64, f64>);

#[async_trait]
impl ImpactProvider for StubImpact {
    async fn lookup(&self, mode_id: i64, distance_km: f64) -> Result<Option<f64>, AppError> {
        Ok(self.0.get(&mode_id).map(|per_km| per_km * distance_km))
    }
}

struct TestState {
    app: AppState,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let db_path = root.path().join("bdd.sqlite");
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url: database_url.clone(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cookie_secret: "bdd-cookie-secret".into(),
            session_ttl: chrono::Duration::hours(24),
            google_maps_api_key: None,
            geocoder_url: Url::parse(DEFAULT_GEOCODER_URL)?,
            impact_api_url: Url::parse(DEFAULT_IMPACT_API_URL)?,
            upstream_timeout: Duration::from_secs(5),
        };

        let db = init_pool(&config.database_url).await?;
        run_migrations(&db).await?;

        let geocoder = StubGeocoder(HashMap::from([
            ("Paris", Coordinates::new(48.8566, 2.3522)),
            ("London", Coordinates::new(51.5074, -0.1278)),
            ("Lyon", Coordinates::new(45.7640, 4.8357)),
        ]));
        // Car, bike and high-speed train. Mode 9 (bus) is seeded but unknown upstream.
        let impact = StubImpact(HashMap::from([(4, 0.2), (7, 0.0), (2, 0.003)]));

        let app = AppState::new(config, db, Arc::new(geocoder), Arc::new(impact));
        Ok(Self { app, _root: root })
    }

    fn app(&self) -> &AppState {
        &self.app
    }
}

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.registered_user = None;
    world.token = None;
    world.last_registration = None;
    world.last_status = None;
    world.last_body = None;
    world.remembered_trip = None;
}

#[given(
    regex = r#"^a registered user \"([^\"]+)\" with email \"([^\"]+)\" and password \"([^\"]+)\"$"#
)]
async fn given_registered_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    register_user(world, username, email, password).await;
}

#[when(
    regex = r#"^I register a user \"([^\"]+)\" with email \"([^\"]+)\" and password \"([^\"]+)\"$"#
)]
async fn when_register_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    register_user(world, username, email, password).await;
}

#[then(regex = r#"^I can authenticate as \"([^\"]+)\" using password \"([^\"]+)\"$"#)]
async fn then_can_authenticate(world: &mut AppWorld, identifier: String, password: String) {
    let authed = auth::authenticate_user(world.app_state(), &identifier, &password)
        .await
        .expect("authentication");
    assert_eq!(authed.id, world.user().id);
}

#[then(regex = r#"^authenticating as \"([^\"]+)\" with password \"([^\"]+)\" is rejected$"#)]
async fn then_authentication_rejected(world: &mut AppWorld, identifier: String, password: String) {
    let result = auth::authenticate_user(world.app_state(), &identifier, &password).await;
    assert!(
        matches!(result, Err(AppError::Unauthorized)),
        "got {result:?}"
    );
}

#[then(
    regex = r#"^registering \"([^\"]+)\" with email \"([^\"]+)\" and password \"([^\"]+)\" is a conflict$"#
)]
async fn then_registration_conflicts(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    let result = auth::register_user(world.app_state(), &username, &email, &password).await;
    assert!(matches!(result, Err(AppError::Conflict(_))), "got {result:?}");
}

#[given("I am logged in")]
async fn given_logged_in(world: &mut AppWorld) {
    log_in(world).await;
}

#[given(
    regex = r#"^another user \"([^\"]+)\" with email \"([^\"]+)\" and password \"([^\"]+)\" logs in instead$"#
)]
async fn given_other_user_logged_in(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    register_user(world, username, email, password).await;
    log_in(world).await;
}

#[when(regex = r"^I register a trip of ([\d.]+) km with mode (\d+)$")]
async fn when_register_direct_trip(world: &mut AppWorld, km: f64, mode_id: i64) {
    let request = TripRequest {
        distance_km: Some(km),
        mode_id: Some(mode_id),
        ..TripRequest::default()
    };
    submit_trip(world, request).await;
}

#[given(regex = r"^a trip of ([\d.]+) km with mode (\d+) dated (\d+) days ago$")]
async fn given_dated_trip(world: &mut AppWorld, km: f64, mode_id: i64, days_ago: u64) {
    let request = TripRequest {
        distance_km: Some(km),
        mode_id: Some(mode_id),
        trip_date: Some(Utc::now().date_naive() - Days::new(days_ago)),
        ..TripRequest::default()
    };
    submit_trip(world, request).await;
    assert!(
        matches!(world.last_registration, Some(Ok(_))),
        "dated trip was rejected: {:?}",
        world.last_registration
    );
}

#[when(regex = r#"^I register a trip from \"([^\"]*)\" to \"([^\"]*)\" with mode (\d+)$"#)]
async fn when_register_geocoded_trip(
    world: &mut AppWorld,
    start: String,
    end: String,
    mode_id: i64,
) {
    let request = TripRequest {
        start_address: Some(start),
        end_address: Some(end),
        distance_km: Some(0.0),
        mode_id: Some(mode_id),
        ..TripRequest::default()
    };
    submit_trip(world, request).await;
}

#[then(regex = r"^the registration fails as (invalid input|not found)$")]
async fn then_registration_fails(world: &mut AppWorld, kind: String) {
    let outcome = world.last_registration.as_ref().expect("a registration");
    match (kind.as_str(), outcome) {
        ("invalid input", Err(AppError::InvalidInput(_))) => {}
        ("not found", Err(AppError::NotFound(_))) => {}
        (_, other) => panic!("expected {kind}, got {other:?}"),
    }
}

#[then(regex = r"^the last trip covers about ([\d.]+) km$")]
async fn then_last_trip_distance(world: &mut AppWorld, km: f64) {
    let trip = world.last_trip();
    assert!(
        (trip.distance_km - km).abs() < 1.0,
        "distance was {}",
        trip.distance_km
    );
}

#[then(regex = r"^the last trip has an impact of ([\d.]+) kg$")]
async fn then_last_trip_impact(world: &mut AppWorld, kg: f64) {
    let trip = world.last_trip();
    assert!(
        (trip.carbon_impact_kg - kg).abs() < 1e-6,
        "impact was {}",
        trip.carbon_impact_kg
    );
}

#[then(regex = r#"^the last trip keeps the addresses \"([^\"]+)\" and \"([^\"]+)\"$"#)]
async fn then_last_trip_addresses(world: &mut AppWorld, start: String, end: String) {
    let trip = world.last_trip();
    assert_eq!(trip.start_address.as_deref(), Some(start.as_str()));
    assert_eq!(trip.end_address.as_deref(), Some(end.as_str()));
}

#[then(regex = r"^the user has (\d+) stored trips$")]
async fn then_user_has_trips(world: &mut AppWorld, expected: usize) {
    assert_eq!(world.trips().await.len(), expected);
}

#[then(regex = r"^the total impact is ([\d.]+) kg$")]
async fn then_total_impact(world: &mut AppWorld, expected: f64) {
    let total = analytics::total_impact(&world.trips().await);
    assert!((total - expected).abs() < 1e-6, "total was {total}");
}

#[then(regex = r"^mode (\d+) has (\d+) trips and an impact of ([\d.]+) kg$")]
async fn then_mode_totals(world: &mut AppWorld, mode_id: i64, count: u64, impact: f64) {
    let trips = world.trips().await;
    let groups: Vec<TripsByMode> = analytics::aggregate_by_mode(&trips, &world.app_state().modes)
        .await
        .expect("aggregate by mode");
    let group = groups
        .iter()
        .find(|group| group.mode_id == mode_id)
        .unwrap_or_else(|| panic!("no group for mode {mode_id}: {groups:?}"));
    assert_eq!(group.total_trips, count);
    assert!((group.total_impact - impact).abs() < 1e-6);
}

#[then(regex = r"^the (daily|monthly) series has (\d+) points ending at ([\d.]+) kg$")]
async fn then_series(world: &mut AppWorld, granularity: String, len: usize, last: f64) {
    let granularity = match granularity.as_str() {
        "daily" => Granularity::Daily,
        _ => Granularity::Monthly,
    };
    let trips = world.trips().await;
    let points: Vec<ImpactPoint> =
        analytics::cumulative_series(&trips, granularity, Utc::now().date_naive());
    assert_eq!(points.len(), len);
    assert!(points.windows(2).all(|pair| pair[1].y >= pair[0].y));
    let end = points.last().map(|point| point.y).unwrap_or_default();
    assert!((end - last).abs() < 1e-6, "series ended at {end}");
}

#[when(regex = r#"^I call (GET|POST|PUT|DELETE) \"([^\"]+)\"$"#)]
async fn when_call_endpoint(world: &mut AppWorld, method: String, path: String) {
    let token = world.token.clone();
    call_endpoint(world, &method, &path, None, token).await;
}

#[when(regex = r#"^I call (GET|POST|PUT|DELETE) \"([^\"]+)\" with '([^']*)'$"#)]
async fn when_call_endpoint_with_body(
    world: &mut AppWorld,
    method: String,
    path: String,
    body: String,
) {
    let token = world.token.clone();
    call_endpoint(world, &method, &path, Some(body), token).await;
}

#[when(regex = r#"^I call (GET|POST|PUT|DELETE) \"([^\"]+)\" without a session$"#)]
async fn when_call_endpoint_anonymously(world: &mut AppWorld, method: String, path: String) {
    call_endpoint(world, &method, &path, None, None).await;
}

#[when("I remember the trip in the response")]
async fn when_remember_trip(world: &mut AppWorld) {
    world.remembered_trip = Some(world.response_trip().clone());
}

#[then(regex = r"^the response status is (\d+)$")]
async fn then_status(world: &mut AppWorld, status: u16) {
    assert_eq!(world.last_status.map(|s| s.as_u16()), Some(status));
}

#[then("the response is a JSON error")]
async fn then_json_error(world: &mut AppWorld) {
    let body = world.last_body.as_ref().expect("a JSON response body");
    assert!(
        body["error"].as_str().is_some_and(|msg| !msg.is_empty()),
        "got {body}"
    );
}

#[then(regex = r#"^the response error mentions \"([^\"]+)\"$"#)]
async fn then_error_mentions(world: &mut AppWorld, needle: String) {
    let body = world.last_body.as_ref().expect("a JSON response body");
    let message = body["error"].as_str().unwrap_or_default();
    assert!(message.contains(&needle), "error was {message:?}");
}

#[then(
    regex = r"^the response trip covers ([\d.]+) km with mode (\d+) and an impact of ([\d.]+) kg$"
)]
async fn then_response_trip(world: &mut AppWorld, km: f64, mode_id: i64, kg: f64) {
    let trip = world.response_trip();
    assert_eq!(trip["mode_id"].as_i64(), Some(mode_id), "trip {trip}");
    let distance = trip["distance_km"].as_f64().unwrap_or(f64::NAN);
    assert!((distance - km).abs() < 1e-6, "distance was {distance}");
    let impact = trip["carbon_impact_kg"].as_f64().unwrap_or(f64::NAN);
    assert!((impact - kg).abs() < 1e-6, "impact was {impact}");
}

#[then("the response trip keeps the remembered id, owner and creation time")]
async fn then_response_trip_keeps_identity(world: &mut AppWorld) {
    let remembered = world.remembered_trip.as_ref().expect("a remembered trip");
    let trip = world.response_trip();
    for field in ["trip_id", "user_id", "created_at"] {
        assert_eq!(trip[field], remembered[field], "{field} changed");
    }
}

#[then(regex = r#"^the response trip is dated \"([^\"]+)\"$"#)]
async fn then_response_trip_date(world: &mut AppWorld, date: String) {
    assert_eq!(world.response_trip()["trip_date"].as_str(), Some(date.as_str()));
}

#[then("the remembered trip is still stored")]
async fn then_remembered_trip_stored(world: &mut AppWorld) {
    let trip_id = world.remembered_trip_id();
    let stored = world.app_state().trips.get(trip_id).await.expect("stored trip");
    let remembered = world.remembered_trip.as_ref().expect("a remembered trip");
    assert_eq!(Some(stored.distance_km), remembered["distance_km"].as_f64());
}

async fn register_user(world: &mut AppWorld, username: String, email: String, password: String) {
    let created = auth::register_user(world.app_state(), &username, &email, &password)
        .await
        .expect("register user");
    world.registered_user = Some(created);
}

async fn log_in(world: &mut AppWorld) {
    let user_id = world.user().id;
    let token = auth::create_session(world.app_state(), user_id)
        .await
        .expect("create session");
    world.token = Some(token);
}

async fn submit_trip(world: &mut AppWorld, request: TripRequest) {
    let user_id = world.user().id;
    let outcome = registration::register_trip(
        world.app_state(),
        user_id,
        &request,
        Utc::now().date_naive(),
    )
    .await;
    world.last_registration = Some(outcome);
}

async fn call_endpoint(
    world: &mut AppWorld,
    method: &str,
    path: &str,
    body: Option<String>,
    token: Option<String>,
) {
    let method: Method = method.parse().expect("http method");
    let path = match world.remembered_trip.as_ref() {
        Some(_) => path.replace("{trip}", &world.remembered_trip_id().to_string()),
        None => path.to_string(),
    };
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body)),
        None => builder.body(Body::empty()),
    }
    .expect("request");
    let response = create_router(world.app_state().clone())
        .oneshot(request)
        .await
        .expect("router is infallible");
    world.last_status = Some(response.status());
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    world.last_body = serde_json::from_slice(&bytes).ok();
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
