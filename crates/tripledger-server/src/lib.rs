//! tripledger Web Server
//!
//! Axum-based REST API for the tripledger expense reporting tool.
//!
//! - Trip, expense and mileage records
//! - Report generation (standard workbook or a caller-supplied template)
//! - Template analysis, receipt and odometer extraction
//! - Restrictive CORS policy, security headers and sanitized error responses

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use tripledger_core::ai::{AIBackend, AIClient};
use tripledger_core::{Database, DocumentAiClient, RequestContext, Settings};

mod handlers;

/// Maximum file upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Maximum size of a small JSON body (records, report requests)
pub(crate) const MAX_JSON_BODY: usize = 64 * 1024;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub settings: Settings,
    pub ai: Option<AIClient>,
    pub document_ai: Option<DocumentAiClient>,
    /// Shared connection pool for upstream calls
    pub http: reqwest::Client,
}

impl AppState {
    /// Build state from the environment: settings file, AI backend, extraction service
    pub fn from_env(db: Database, config: ServerConfig) -> Self {
        let settings = Settings::load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load settings, using defaults");
            Settings::default()
        });

        let ai = AIClient::from_env().map(|client| client.with_timeout(settings.ai_timeout));
        match ai {
            Some(ref client) => info!(
                "AI backend configured: {} (model: {})",
                client.host(),
                client.model()
            ),
            None => info!(
                "ℹ️  AI backend not configured (set OPENAI_COMPATIBLE_HOST to enable AI features)"
            ),
        }

        let document_ai = DocumentAiClient::from_settings(&settings.extraction);
        if let Some(ref client) = document_ai {
            info!("Document extraction configured: {}", client.endpoint());
        }

        Self {
            db,
            config,
            settings,
            ai,
            document_ai,
            http: reqwest::Client::new(),
        }
    }

    /// Fresh per-request context sharing the connection pool
    pub fn context(&self) -> RequestContext {
        RequestContext::new(self.http.clone(), self.settings.clone())
    }
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    create_router_with_state(AppState::from_env(db, config))
}

/// Create the application router around prepared state (for testing)
pub fn create_router_with_state(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let state = Arc::new(state);

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Records
        .route("/trips", get(handlers::list_trips).post(handlers::create_trip))
        .route("/trips/:id", get(handlers::get_trip))
        .route(
            "/expenses",
            get(handlers::list_expenses).post(handlers::create_expense),
        )
        .route(
            "/mileage",
            get(handlers::list_mileage).post(handlers::create_mileage),
        )
        // Reports and templates
        .route("/reports/generate", post(handlers::generate_report))
        .route("/templates/analyze", post(handlers::analyze_template))
        // Extraction
        .route("/receipts/extract", post(handlers::extract_receipt))
        .route("/receipts/describe", post(handlers::describe_receipt))
        .route("/odometer/extract", post(handlers::extract_odometer));

    // Security headers
    // CSP: API responses are JSON or downloads, nothing may be framed or scripted
    let csp_value = HeaderValue::from_static(
        "default-src 'none'; frame-ancestors 'none'",
    );

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ))
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_DISPOSITION]);

    if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        return base;
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    base.allow_origin(origins)
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16) -> anyhow::Result<()> {
    serve_with_config(db, host, port, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    check_ai_connection().await;

    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection() {
    match AIClient::from_env() {
        Some(client) => {
            if client.health_check().await {
                info!(
                    "✅ AI backend connected: {} (model: {})",
                    client.host(),
                    client.model()
                );
            } else {
                warn!(
                    "⚠️  AI backend configured but not responding: {} (model: {})",
                    client.host(),
                    client.model()
                );
            }
        }
        None => {
            info!("ℹ️  AI backend not configured (set OPENAI_COMPATIBLE_HOST to enable AI features)");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    details: Option<String>,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            details: None,
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn payload_too_large(msg: &str) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, msg)
    }

    /// Attach a client-visible detail string
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = match self.details {
            Some(details) => serde_json::json!({
                "error": self.message,
                "details": details,
            }),
            None => serde_json::json!({
                "error": self.message
            }),
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<tripledger_core::Error> for AppError {
    fn from(err: tripledger_core::Error) -> Self {
        use tripledger_core::Error;

        match err {
            Error::NotFound(msg) => Self::not_found(&msg),
            Error::InvalidData(msg) => Self::bad_request(&msg),
            Error::Report(msg) => Self {
                internal: Some(anyhow::anyhow!("report error: {}", msg)),
                ..Self::internal("Failed to generate report").with_details(msg)
            },
            other => Self {
                internal: Some(other.into()),
                ..Self::internal("An internal error occurred")
            },
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            details: None,
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
