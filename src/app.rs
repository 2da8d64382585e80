use std::net::SocketAddr;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::response::{ok, JsonOk};
use crate::state::AppState;
use crate::{admin, auth, chat, docente, i18n, payments, portatore, schools, ucme};

pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(ucme::router())
        .merge(admin::router())
        .merge(portatore::router())
        .merge(docente::router())
        .merge(chat::router())
        .merge(schools::router())
        .merge(i18n::router())
        .merge(payments::router())
        .route("/health", get(health))
        .fallback(not_found);

    let mut app = Router::new().nest("/api/v1", api);
    if let Some(dir) = state.config.static_dir.clone() {
        tracing::info!(dir = %dir.display(), "serving static frontend");
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.with_state(state)
        .layer(map_response(method_not_allowed_envelope))
        .layer(cors_layer())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

/// Any origin, fixed methods and headers.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn method_not_allowed_envelope(res: Response) -> Response {
    if res.status() == StatusCode::METHOD_NOT_ALLOWED {
        return AppError::MethodNotAllowed.into_response();
    }
    res
}

async fn not_found() -> AppError {
    AppError::not_found("Not found")
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    database: &'static str,
}

async fn health(State(state): State<AppState>) -> JsonOk<Health> {
    let database = match state.store.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = ?e, "database ping failed");
            "unavailable"
        }
    };
    ok(Health {
        status: "ok",
        database,
    })
}

pub async fn serve(config: &AppConfig, app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
