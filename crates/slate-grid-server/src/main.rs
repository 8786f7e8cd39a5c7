use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use slate_grid::{MemoryAlterationStore, MemoryCollection};
use slate_grid_http::config::parse_records;
use slate_grid_http::{GridConfig, GridHttp};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};

fn exit_with(message: String) -> ! {
    error!("{message}");
    std::process::exit(1);
}

fn load_config() -> GridConfig {
    let path =
        std::env::var("SLATE_GRID_CONFIG").unwrap_or_else(|_| "/etc/slate/grid.json".to_string());

    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| exit_with(format!("failed to read config from {path}: {e}")));

    serde_json::from_str(&content)
        .unwrap_or_else(|e| exit_with(format!("failed to parse config from {path}: {e}")))
}

fn load_collection(config: &GridConfig) -> MemoryCollection {
    let path = std::env::var("SLATE_GRID_DATA")
        .ok()
        .or_else(|| config.data.clone());

    let records = match path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| exit_with(format!("failed to read data from {path}: {e}")));
            parse_records(&content)
                .unwrap_or_else(|e| exit_with(format!("failed to parse data from {path}: {e}")))
        }
        None => Vec::new(),
    };

    info!(collection = %config.collection, records = records.len(), "loaded records");
    MemoryCollection::new(config.collection.clone(), records)
}

async fn handle(
    req: Request<Incoming>,
    handler: Arc<GridHttp<MemoryCollection>>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body_bytes = body.collect().await?.to_bytes().to_vec();
    let http_req = Request::from_parts(parts, body_bytes);
    let http_resp = handler.handle(http_req).await;
    let (parts, body_bytes) = http_resp.into_parts();
    Ok(Response::from_parts(parts, Full::new(Bytes::from(body_bytes))))
}

async fn shutdown_signal() {
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => exit_with(format!("failed to register SIGTERM handler: {e}")),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = load_config();
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let collection = load_collection(&config);
    let alterations = Arc::new(MemoryAlterationStore::new());

    info!(id = %config.id, route = %config.route, "serving grid");

    let handler = {
        let config = config.clone();
        Arc::new(GridHttp::new(move || {
            config
                .build(collection.clone())
                .alterations(alterations.clone())
        }))
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| exit_with(format!("failed to bind {bind_addr}: {e}")));

    info!("listening on {bind_addr}");

    let http = http1::Builder::new();
    let graceful = GracefulShutdown::new();
    let mut signal = pin!(shutdown_signal());

    loop {
        tokio::select! {
            Ok((stream, _)) = listener.accept() => {
                let io = TokioIo::new(stream);
                let handler = Arc::clone(&handler);
                let conn = http.serve_connection(io, service_fn(move |req| {
                    let handler = Arc::clone(&handler);
                    handle(req, handler)
                }));
                let fut = graceful.watch(conn);
                tokio::spawn(async move {
                    if let Err(e) = fut.await {
                        error!(error = %e, "connection error");
                    }
                });
            }
            _ = &mut signal => {
                info!("shutdown signal received");
                drop(listener);
                break;
            }
        }
    }

    tokio::select! {
        _ = graceful.shutdown() => {
            info!("shutdown complete");
        }
        _ = tokio::time::sleep(Duration::from_secs(10)) => {
            info!("shutdown timed out after 10s");
        }
    }
}
