//! Session persistence HTTP endpoint
//!
//! Routes:
//! - `POST /api/sessions` - store a session document, 201 `{session_id}`
//! - `GET /api/sessions` - stored ids, newest first
//! - `GET /api/sessions/{id}` - one stored document
//! - `GET /api/health` - liveness
//! - `POST /api/log` - append a client log line to the daily log file
//!
//! Uses hyper for the HTTP server.

use crate::infra::config::Config;
use crate::io::session_store::SessionStore;
use anyhow::Context;
use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    let text = serde_json::to_string_pretty(body).unwrap_or_default();
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(text)))
        .expect("static response should not fail")
}

fn error_response(status: StatusCode, error: &str) -> Response<Full<Bytes>> {
    json_response(status, &json!({ "error": error }))
}

/// Read the body and parse it as a JSON object
async fn read_json_object(
    req: Request<hyper::body::Incoming>,
) -> Result<serde_json::Map<String, Value>, Response<Full<Bytes>>> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "request_body_read_failed");
            return Err(error_response(StatusCode::BAD_REQUEST, "invalid_body"));
        }
    };

    match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => {
            debug!(bytes = %body.len(), "request_invalid_json");
            Err(error_response(StatusCode::BAD_REQUEST, "invalid_json"))
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    store: Arc<SessionStore>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/api/health") => json_response(StatusCode::OK, &json!({ "status": "ok" })),
        (&Method::POST, "/api/sessions") => match read_json_object(req).await {
            Ok(document) => match store.save(document, Utc::now()) {
                Ok(session_id) => {
                    json_response(StatusCode::CREATED, &json!({ "session_id": session_id }))
                }
                Err(e) => {
                    error!(error = %format!("{e:#}"), "session_save_failed");
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "save_failed")
                }
            },
            Err(response) => response,
        },
        (&Method::GET, "/api/sessions") => match store.list() {
            Ok(ids) => json_response(StatusCode::OK, &json!({ "sessions": ids })),
            Err(e) => {
                error!(error = %format!("{e:#}"), "session_list_failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "list_failed")
            }
        },
        (&Method::GET, p) if p.starts_with("/api/sessions/") => {
            let session_id = p.trim_start_matches("/api/sessions/");
            match store.load(session_id) {
                Ok(Some(document)) => json_response(StatusCode::OK, &document),
                Ok(None) => error_response(StatusCode::NOT_FOUND, "session_not_found"),
                Err(e) => {
                    error!(session_id = %session_id, error = %format!("{e:#}"), "session_load_failed");
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "load_failed")
                }
            }
        }
        (&Method::POST, "/api/log") => match read_json_object(req).await {
            Ok(entry) => match store.append_log(&Value::Object(entry), Utc::now()) {
                Ok(_) => json_response(StatusCode::OK, &json!({ "status": "logged" })),
                Err(e) => {
                    error!(error = %format!("{e:#}"), "client_log_write_failed");
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "log_failed")
                }
            },
            Err(response) => response,
        },
        (&Method::OPTIONS, p) if p.starts_with("/api/") => Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type")
            .body(Full::new(Bytes::new()))
            .expect("static response should not fail"),
        _ => error_response(StatusCode::NOT_FOUND, "not_found"),
    };

    debug!(method = %method, path = %path, status = %response.status().as_u16(), "http_request");
    Ok(response)
}

/// Serve requests on an already bound listener until shutdown is signalled
pub async fn serve(
    listener: TcpListener,
    store: Arc<SessionStore>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, data_dir = %store.data_dir().display(), "session_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let store = store.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let store = store.clone();
                                async move { handle_request(req, store).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "session_server_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "session_server_accept_error");
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("session_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Bind the configured address and serve the configured store
pub async fn start_session_server(
    config: &Config,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server_bind_address(), config.server_port())
        .parse()
        .with_context(|| {
            format!("Invalid bind address {}:{}", config.server_bind_address(), config.server_port())
        })?;
    let listener =
        TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {addr}"))?;
    let store = Arc::new(SessionStore::new(config.server_data_dir(), config.server_log_dir()));
    serve(listener, store, shutdown).await
}
