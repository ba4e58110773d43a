// Sales Pulse - Web Server
// JSON API over the aggregation pipeline plus a static dashboard page.
// The dataset is loaded once at startup and shared read-only; handlers are
// pure queries, so the state is an Arc without any locking.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use sales_pulse::{csv_path_from_env, load_csv, Aggregator, PulseError, Summary};

/// Shared application state
#[derive(Clone)]
struct AppState {
    aggregator: Arc<Aggregator>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Query parameters for /api/summary
#[derive(Deserialize)]
struct SummaryParams {
    /// Comma-separated years; absent or empty means all years
    years: Option<String>,
}

fn parse_years(raw: Option<&str>) -> Result<BTreeSet<i32>, String> {
    let mut years = BTreeSet::new();
    let Some(raw) = raw else {
        return Ok(years);
    };

    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let year: i32 = part
            .parse()
            .map_err(|_| format!("Invalid year: {}", part))?;
        years.insert(year);
    }
    Ok(years)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/years - Distinct years present in the dataset
async fn get_years(State(state): State<AppState>) -> impl IntoResponse {
    let years: Vec<i32> = state.aggregator.dataset().years().into_iter().collect();
    Json(ApiResponse::ok(years))
}

/// GET /api/summary?years=2023,2024 - Full summary for a year selection
async fn get_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> impl IntoResponse {
    let selection = match parse_years(params.years.as_deref()) {
        Ok(selection) => selection,
        Err(message) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<Summary>::err(message)),
            )
                .into_response();
        }
    };

    match state.aggregator.summarize(&selection) {
        Ok(summary) => (StatusCode::OK, Json(ApiResponse::ok(summary))).into_response(),
        Err(e @ PulseError::EmptySelection { .. }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::<Summary>::err(e.to_string())),
        )
            .into_response(),
        Err(e) => {
            eprintln!("Error computing summary: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Summary>::err(e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET / - Serve the dashboard page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Sales Pulse - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let csv_path = csv_path_from_env();

    if !csv_path.exists() {
        eprintln!("❌ Sales CSV not found at {}", csv_path.display());
        eprintln!("   Set SALES_CSV or place the file at the default path.");
        std::process::exit(1);
    }

    let dataset = match load_csv(&csv_path) {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", csv_path.display(), e);
            std::process::exit(1);
        }
    };
    println!("✓ Loaded {} transactions from {}", dataset.len(), csv_path.display());

    // Create shared state
    let state = AppState {
        aggregator: Arc::new(Aggregator::new(dataset)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/years", get(get_years))
        .route("/summary", get(get_summary))
        .with_state(state);

    // Build main router
    let app = Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new("web"))
        .layer(CorsLayer::permissive());

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   API: http://localhost:3000/api/summary");
    println!("   UI:  http://localhost:3000");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
