//! End-to-end tests over a real TCP listener.

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use request_observability::config::{AppConfig, LogMode};
use request_observability::HttpServer;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

mod common;

#[tokio::test]
async fn test_served_requests_are_logged_with_peer_address() {
    let captured = common::capture_logger(LogMode::Production);

    let routes = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/boom", get(|| async {
            if true {
                panic!("handler exploded");
            }
            "unreachable"
        }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = AppConfig::default();
    config.server.bind_address = addr.to_string();
    config.recovery.include_stack = false;

    let server = HttpServer::new(config, captured.logger.clone(), routes);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        server
            .run_until(listener, async {
                let _ = stop_rx.await;
            })
            .await
    });

    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let res = client
        .get(format!("http://{}/health?x=1", addr))
        .header("user-agent", "e2e-test")
        .send()
        .await
        .expect("server reachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");

    let res = client
        .get(format!("http://{}/boom", addr))
        .send()
        .await
        .expect("server survives handler panic");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "an error occurred");

    drop(client);
    let _ = stop_tx.send(());
    handle.await.unwrap().unwrap();

    let records = captured.file.records();
    let access: Vec<_> = records
        .iter()
        .filter(|r| r["msg"] == "/health" || r["msg"] == "/boom")
        .filter(|r| r["level"] == "INFO")
        .collect();
    assert_eq!(access.len(), 2);

    assert_eq!(access[0]["path"], "/health");
    assert_eq!(access[0]["query"], "x=1");
    assert_eq!(access[0]["ip"], "127.0.0.1");
    assert_eq!(access[0]["user_agent"], "e2e-test");
    assert_eq!(access[0]["status"], 200);

    assert_eq!(access[1]["path"], "/boom");
    assert_eq!(access[1]["status"], 200);

    let panics: Vec<_> = records
        .iter()
        .filter(|r| r["msg"] == "[Recovery from panic]")
        .collect();
    assert_eq!(panics.len(), 1);
    assert_eq!(panics[0]["error"], "handler exploded");

    let lifecycle: Vec<_> = records
        .iter()
        .filter_map(|r| r["msg"].as_str())
        .filter(|msg| msg.starts_with("HTTP server"))
        .collect();
    assert_eq!(lifecycle, vec!["HTTP server starting", "HTTP server stopped"]);
}
