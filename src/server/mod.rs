//! HTTP server for browser-based access to research sessions
//!
//! Every workflow operation is reachable through the `/api/invoke` command
//! proxy, guarded by a bearer token printed at startup.

mod auth;
mod proxy;
pub mod routes;
pub mod state;

pub use auth::{generate_auth_token, AuthLayer};
pub use proxy::{invoke_handler, InvokeError, InvokeRequest, InvokeResponse};
pub use state::{ServerAppState, SessionHandle};

use crate::shutdown::SHUTDOWN_POLL_INTERVAL;
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue,
    },
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Version information for the server
#[derive(serde::Serialize)]
struct VersionInfo {
    name: String,
    version: String,
}

fn cors_layer(cors_origins: Option<&[String]>) -> CorsLayer {
    // Explicit headers instead of Any: browsers reject a wildcard alongside Authorization
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    match cors_origins {
        Some(origins) if !origins.is_empty() => {
            let allowed: Vec<HeaderValue> =
                origins.iter().filter_map(|o| o.parse().ok()).collect();
            layer.allow_origin(allowed)
        }
        _ => layer.allow_origin(Any),
    }
}

/// Build the application router
pub fn build_router(state: ServerAppState, cors_origins: Option<&[String]>) -> Router {
    // Layer order: cors (outer) -> auth -> handler, so preflight skips auth
    Router::new()
        .route("/api/invoke", post(invoke_handler))
        .route("/api/version", get(version_handler))
        .route("/health", get(health_handler))
        .route("/", get(index_handler))
        .layer(AuthLayer::new(state.auth_token.clone()))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Run the HTTP server until shutdown is requested
pub async fn run_server(
    port: u16,
    bind: &str,
    state: ServerAppState,
    cors_origins: Option<Vec<String>>,
) -> Result<(), String> {
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let cors_display = match &cors_origins {
        Some(origins) if !origins.is_empty() => origins.join(", "),
        _ => "*".to_string(),
    };

    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                      Virtual Lab Server                      ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║                                                              ║");
    println!("║  Server URL: http://{}:{:<24} ║", bind, port);
    println!("║  Auth Token: {}              ║", state.auth_token);
    println!("║  Data Dir:   {:<48}║", state.data_dir.display());
    println!("║  CORS Origins: {:<46}║", cors_display);
    println!("║                                                              ║");
    println!("║  Endpoints:                                                  ║");
    println!("║    POST /api/invoke      - Command proxy                     ║");
    println!("║    GET  /api/version     - Server version info               ║");
    println!("║    GET  /health          - Health check                      ║");
    println!("║                                                              ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let shutdown_state = state.shutdown_state.clone();
    let app = build_router(state, cors_origins.as_deref());

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Server listening on http://{}", addr);

    let shutdown_signal = async move {
        shutdown_state.wait(SHUTDOWN_POLL_INTERVAL).await;
        log::info!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| format!("Server error: {}", e))
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

async fn version_handler() -> Json<VersionInfo> {
    Json(VersionInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Index handler - shows connection instructions
async fn index_handler() -> axum::response::Html<&'static str> {
    axum::response::Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Virtual Lab Server</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            max-width: 600px;
            margin: 50px auto;
            padding: 20px;
            background: #1a1a2e;
            color: #eee;
        }
        h1 { color: #4ade80; }
        code {
            background: #2a2a4e;
            padding: 2px 6px;
            border-radius: 4px;
            font-family: 'Monaco', 'Consolas', monospace;
        }
        .endpoint {
            background: #2a2a4e;
            padding: 10px;
            border-radius: 8px;
            margin: 10px 0;
        }
    </style>
</head>
<body>
    <h1>Virtual Lab Server</h1>
    <p>The server is running. Send commands with the auth token printed at startup.</p>
    <h2>Endpoints</h2>
    <div class="endpoint">
        <strong>POST /api/invoke</strong><br>
        Command proxy - send <code>{"cmd": "...", "args": {...}}</code> with
        <code>Authorization: Bearer &lt;token&gt;</code>
    </div>
    <div class="endpoint">
        <strong>GET /health</strong><br>
        Health check endpoint
    </div>
</body>
</html>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_handler() {
        assert_eq!(health_handler().await, "OK");
    }

    #[tokio::test]
    async fn test_version_handler() {
        let Json(info) = version_handler().await;
        assert_eq!(info.name, "virtual-lab");
        assert!(!info.version.is_empty());
    }
}
