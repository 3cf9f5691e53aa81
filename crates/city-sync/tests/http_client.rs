//! HTTP client tests against a local axum server standing in for the
//! simulation.

use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use city_events::fixtures::{INIT_SNAPSHOT_JSON, STEP_SNAPSHOT_JSON};
use city_events::{AgentKind, AgentSnapshot, Facing, GridSize, StepSnapshot};
use city_sync::{
    FetchError, HttpSimulationClient, ServerConfig, SimulationClient, SyncConfig, SyncManager,
    SyncState,
};
use tokio::net::TcpListener;
use tokio::runtime::Handle;

/// Serves `router` on an ephemeral port and returns its base URL.
async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client_for(base_url: &str) -> HttpSimulationClient {
    HttpSimulationClient::new(&ServerConfig {
        base_url: base_url.to_owned(),
        ..ServerConfig::default()
    })
}

/// Starts a simulation with exactly the requested population.
async fn populate(Path((cars, pedestrians)): Path<(u32, u32)>) -> String {
    let mut snapshot = StepSnapshot {
        grid_size: Some(GridSize(20, 20)),
        ..StepSnapshot::default()
    };
    for i in 0..cars {
        snapshot
            .cars
            .push(AgentSnapshot::new(u64::from(i), i as f32, 0.0, Facing::Right));
    }
    for i in 0..pedestrians {
        snapshot
            .pedestrians
            .push(AgentSnapshot::new(100 + u64::from(i), 0.0, i as f32, Facing::Up));
    }
    serde_json::to_string(&snapshot).unwrap()
}

#[tokio::test]
async fn test_fetch_init_passes_population() {
    let base = serve(Router::new().route("/init/{cars}/{pedestrians}", get(populate))).await;
    let client = client_for(&base);

    let snapshot = client.fetch_init(3, 2).await.unwrap();
    assert_eq!(snapshot.agents(AgentKind::Car).len(), 3);
    assert_eq!(snapshot.agents(AgentKind::Pedestrian).len(), 2);
    assert_eq!(snapshot.pedestrians[1].id, 101);
    assert_eq!(snapshot.cars[2].facing, Facing::Right);
    assert_eq!(snapshot.grid_size, Some(GridSize(20, 20)));
}

#[tokio::test]
async fn test_fetch_step_parses_body() {
    let base = serve(Router::new().route("/data/0", get(|| async { STEP_SNAPSHOT_JSON }))).await;
    let client = client_for(&base);

    let snapshot = client.fetch_step().await.unwrap();
    assert_eq!(snapshot.len(), 6);
    assert_eq!(snapshot.transit_vehicles[0].grid_y, 10.0);
}

#[tokio::test]
async fn test_error_status() {
    let router = Router::new().route(
        "/data/0",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "simulation crashed") }),
    );
    let client = client_for(&serve(router).await);

    match client.fetch_step().await {
        Err(FetchError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "simulation crashed");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_route_is_status_error() {
    let client = client_for(&serve(Router::new()).await);
    assert!(matches!(
        client.fetch_init(1, 1).await,
        Err(FetchError::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_malformed_body() {
    let router = Router::new().route("/data/0", get(|| async { "{\"cars\": [{\"id\": 0" }));
    let client = client_for(&serve(router).await);
    assert!(matches!(
        client.fetch_step().await,
        Err(FetchError::Decode(_))
    ));
}

#[tokio::test]
async fn test_tuple_ids_rejected() {
    let router = Router::new().route(
        "/data/0",
        get(|| async { r#"{"cars": [{"id": [1, 2], "x": 0.0, "y": 0.0}]}"# }),
    );
    let client = client_for(&serve(router).await);
    assert!(matches!(
        client.fetch_step().await,
        Err(FetchError::Decode(_))
    ));
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(&format!("http://{addr}"));
    assert!(matches!(
        client.fetch_step().await,
        Err(FetchError::Network(_))
    ));
}

#[tokio::test]
async fn test_sync_over_http() {
    let router = Router::new()
        .route(
            "/init/{cars}/{pedestrians}",
            get(|| async { INIT_SNAPSHOT_JSON }),
        )
        .route("/data/0", get(|| async { STEP_SNAPSHOT_JSON }));
    let base = serve(router).await;

    let mut config = SyncConfig::default();
    config.server.base_url = base;
    config.server.cars = 3;
    config.server.pedestrians = 2;

    let client = HttpSimulationClient::new(&config.server);
    let mut sync = SyncManager::new(client, &config, Handle::current());
    sync.initialize().unwrap();

    for _ in 0..500 {
        if sync.stats().steps_applied >= 1 {
            break;
        }
        sync.tick(1.0 / 60.0);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert_eq!(sync.state(), SyncState::Synced);
    assert!(sync.stats().steps_applied >= 1, "stats {:?}", sync.stats());
    assert_eq!(sync.registry().total(), 6);
    assert_eq!(sync.grid_size(), Some(GridSize(36, 36)));
    sync.shutdown();
}
