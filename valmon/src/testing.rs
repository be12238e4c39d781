//! Shared helpers for unit tests.

use axum::Router;

/// Serve `router` on an ephemeral local port and return its base URL.
pub(crate) async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("test server failed");
    });
    format!("http://{}", addr)
}

/// HTTP client with a short deadline for tests.
pub(crate) fn test_client() -> reqwest::Client {
    crate::utils::http_client::build_client(std::time::Duration::from_secs(5))
        .expect("Failed to build test client")
}
