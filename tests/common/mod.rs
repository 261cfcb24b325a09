//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use app_webserver::config::ServerConfig;
use app_webserver::http::outlet_fn;
use app_webserver::{SharedOutlet, WebServer};
use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};

/// Loopback server with an OS-assigned port and quiet lifecycle logs.
pub fn local_config() -> ServerConfig {
    ServerConfig {
        host: Some("127.0.0.1".into()),
        port: None,
        verbose: false,
        ..ServerConfig::default()
    }
}

/// Build and start a server, returning it with its bound address.
pub async fn start_server(config: ServerConfig) -> (WebServer, SocketAddr) {
    let server = WebServer::new(config);
    let addr = server
        .start()
        .await
        .expect("server should start")
        .expect("enabled server reports an address");
    (server, addr)
}

/// Plain HTTP client that never follows redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// HTTPS client trusting the bundled self-signed certificate.
pub fn https_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .danger_accept_invalid_certs(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Contents of a file under `tests/fixtures/ssl`.
pub fn ssl_fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/ssl")
        .join(name);
    std::fs::read_to_string(path).unwrap()
}

/// HTTPS client presenting the client key/cert pair stored as
/// `<name>.key.pem` and `<name>.cert.pem` in the fixtures.
pub fn https_client_as(name: &str) -> reqwest::Client {
    let pem = format!(
        "{}{}",
        ssl_fixture(&format!("{name}.key.pem")),
        ssl_fixture(&format!("{name}.cert.pem"))
    );
    reqwest::Client::builder()
        .no_proxy()
        .danger_accept_invalid_certs(true)
        .identity(reqwest::Identity::from_pem(pem.as_bytes()).unwrap())
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Outlet answering every request with `body`.
pub fn text_outlet(body: &'static str) -> SharedOutlet {
    outlet_fn(move |_request: Request| async move { body.into_response() })
}

/// Outlet echoing the request path.
pub fn echo_outlet() -> SharedOutlet {
    outlet_fn(|request: Request| async move {
        let path = request.uri().path().to_string();
        Response::new(path.into())
    })
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{}{}", addr, path)
}

pub fn https_url(addr: SocketAddr, path: &str) -> String {
    format!("https://{}{}", addr, path)
}

pub fn shared<T: app_webserver::Outlet>(outlet: T) -> SharedOutlet {
    Arc::new(outlet)
}
