//! HTTP-level tests: status mapping and protocol surface.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use astera::server::ProxyServer;
use astera::store::ModuleRepository;

use common::{fixture, record, Fixture};

async fn start_server(f: &Fixture) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let resolver = Arc::clone(&f.resolver);
    tokio::spawn(async move {
        let _ = ProxyServer::serve(listener, resolver).await;
    });
    addr
}

#[tokio::test]
async fn checksum_endpoint_is_always_404() {
    let f = fixture("");
    f.repository.insert(&record("example.com/m", "v1.0.0")).unwrap();
    let addr = start_server(&f).await;

    let response = reqwest::get(format!("http://{addr}/sumdb/sum.golang.org/supported"))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn stored_artifacts_are_served_with_200() {
    let f = fixture("");
    f.repository.insert(&record("example.com/m", "v1.0.0")).unwrap();
    let addr = start_server(&f).await;

    let response = reqwest::get(format!("http://{addr}/example.com/m/@v/v1.0.0.mod"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"module example.com/m\n");

    let response = reqwest::get(format!("http://{addr}/example.com/m/@v/list"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "v1.0.0");
}

#[tokio::test]
async fn unknown_modules_are_404() {
    let f = fixture("");
    let addr = start_server(&f).await;

    let response = reqwest::get(format!("http://{addr}/example.com/nope/@v/v9.9.9.zip"))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn version_list_of_unknown_module_is_200_and_empty() {
    let f = fixture("");
    let addr = start_server(&f).await;

    let response = reqwest::get(format!("http://{addr}/example.com/nope/@v/list"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_paths_are_400() {
    let f = fixture("");
    let addr = start_server(&f).await;

    for path in ["/github.com/@v", "/github.com/x/m/@v/@latest"] {
        let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
        assert_eq!(response.status(), 400, "{path}");
    }
}

#[tokio::test]
async fn non_get_methods_are_refused() {
    let f = fixture("");
    let addr = start_server(&f).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/example.com/m/@v/list"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 405);
}
