// moonraker-client/tests/gcode_script.rs
// Client against a local mock of the Moonraker API

use axum::http::{Method, StatusCode};
use axum::{Json, Router, extract::State, routing::any};
use moonraker_client::{GcodeScript, MoonrakerClient, MoonrakerConfig, MoonrakerError};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(Method, GcodeScript)>>>,
}

async fn spawn_mock(status: StatusCode) -> (String, Recorded) {
    let recorded = Recorded::default();

    let app = Router::new()
        .route(
            "/printer/gcode/script",
            any(
                move |State(recorded): State<Recorded>, method: Method, Json(body): Json<GcodeScript>| async move {
                    recorded.requests.lock().await.push((method, body));
                    (status, "ok")
                },
            ),
        )
        .route("/server/info", any(|| async { "{}" }))
        .with_state(recorded.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), recorded)
}

#[tokio::test]
async fn test_set_spool_sends_get_with_script_body() {
    let (url, recorded) = spawn_mock(StatusCode::OK).await;
    let client = MoonrakerClient::new(&MoonrakerConfig::new(url)).unwrap();

    client.set_spool_and_filament(3, 7).await.unwrap();

    let requests = recorded.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, Method::GET);
    assert_eq!(requests[0].1.script, "MMU_GATE_MAP NEXT_SPOOLID=3");
}

#[tokio::test]
async fn test_non_200_is_an_error() {
    let (url, recorded) = spawn_mock(StatusCode::INTERNAL_SERVER_ERROR).await;
    let client = MoonrakerClient::new(&MoonrakerConfig::new(url)).unwrap();

    let err = client.set_spool_and_filament(3, 7).await.unwrap_err();
    assert!(matches!(err, MoonrakerError::Status { status: 500, .. }));
    assert_eq!(err.status(), Some(500));
    // Single attempt, no retry
    assert_eq!(recorded.requests.lock().await.len(), 1);
}

#[tokio::test]
async fn test_other_success_codes_are_rejected() {
    let (url, _recorded) = spawn_mock(StatusCode::ACCEPTED).await;
    let client = MoonrakerClient::new(&MoonrakerConfig::new(url)).unwrap();

    let err = client.set_spool_and_filament(1, 1).await.unwrap_err();
    assert_eq!(err.status(), Some(202));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = MoonrakerConfig::new(format!("http://{}", addr)).with_timeout(2);
    let client = MoonrakerClient::new(&config).unwrap();

    let err = client.set_spool_and_filament(1, 1).await.unwrap_err();
    assert!(matches!(err, MoonrakerError::Http(_)));
    assert!(!client.is_online().await);
}

#[tokio::test]
async fn test_is_online() {
    let (url, _recorded) = spawn_mock(StatusCode::OK).await;
    let client = MoonrakerClient::new(&MoonrakerConfig::new(url)).unwrap();
    assert!(client.is_online().await);
}
