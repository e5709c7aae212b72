//! HTTP API gateway for calcgrid.
//!
//! Public endpoints accept expressions and report their status; internal
//! endpoints hand tasks to agents and collect their results.
//!
//! Built on Axum for high performance async HTTP.

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use calcgrid_config::AppConfig;
use calcgrid_core::error::{Error, TaskError};
use calcgrid_core::protocol::{
    CalculateRequest, CalculateResponse, ExpressionEnvelope, ExpressionList, TaskEnvelope,
    TaskPayload, TaskResultRequest,
};
use calcgrid_core::{ExpressionId, ExpressionRegistry, TaskOutcome};

/// Shared application state for the gateway.
pub type SharedState = Arc<ExpressionRegistry>;

/// Request bodies are tiny; anything bigger is refused.
pub const BODY_LIMIT: usize = 64 * 1024;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    with_layers(
        Router::new()
            .route("/health", get(health_handler))
            .route("/api/v1/calculate", post(calculate_handler))
            .route("/api/v1/expressions", get(list_expressions_handler))
            .route("/api/v1/expressions/{id}", get(get_expression_handler))
            .route(
                "/internal/task",
                get(fetch_task_handler).post(submit_result_handler),
            )
            .with_state(state),
    )
}

/// Middleware shared by every route:
/// - request body size limit
/// - handler panics turned into a bare 500
/// - HTTP trace logging
fn with_layers(router: Router) -> Router {
    router
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Start the orchestrator HTTP server.
///
/// Fails before binding if any operation time limit is missing or invalid.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let limits = config.operation_limits()?;
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state: SharedState = Arc::new(ExpressionRegistry::new(limits));
    let listener = TcpListener::bind(&addr).await?;

    info!(
        addr = %addr,
        addition = ?limits.addition,
        subtraction = ?limits.subtraction,
        multiplication = ?limits.multiplication,
        division = ?limits.division,
        "Orchestrator starting"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down orchestrator");
        })
        .await?;

    Ok(())
}

/// Serve the API on an already-bound listener until the process exits.
pub async fn serve(listener: TcpListener, state: SharedState) -> std::io::Result<()> {
    axum::serve(listener, build_router(state)).await
}

// --- Errors ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map a domain error to a response. Internal failures are logged and
/// reported without detail.
fn from_domain(err: Error) -> ApiError {
    match err {
        e if e.is_malformed_input() => api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        Error::Task(e @ TaskError::NotFound(_)) => api_error(StatusCode::NOT_FOUND, e.to_string()),
        Error::Task(e @ TaskError::Timeout { .. }) => {
            api_error(StatusCode::REQUEST_TIMEOUT, e.to_string())
        }
        e => {
            error!(error = %e, "Request failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn calculate_handler(
    State(registry): State<SharedState>,
    Json(req): Json<CalculateRequest>,
) -> Result<(StatusCode, Json<CalculateResponse>), ApiError> {
    match registry.submit(&req.expression) {
        Ok(id) => Ok((StatusCode::CREATED, Json(CalculateResponse { id }))),
        Err(e) => {
            debug!(error = %e, "Expression rejected");
            Err(from_domain(e))
        }
    }
}

async fn list_expressions_handler(State(registry): State<SharedState>) -> Json<ExpressionList> {
    Json(ExpressionList {
        expressions: registry.list(),
    })
}

async fn get_expression_handler(
    State(registry): State<SharedState>,
    Path(id): Path<ExpressionId>,
) -> Result<Json<ExpressionEnvelope>, ApiError> {
    let expression = registry.get(id).ok_or_else(|| {
        api_error(StatusCode::NOT_FOUND, format!("Expression {id} not found"))
    })?;
    Ok(Json(ExpressionEnvelope {
        expression: expression.snapshot(),
    }))
}

async fn fetch_task_handler(
    State(registry): State<SharedState>,
) -> Result<Json<TaskEnvelope>, StatusCode> {
    let task = registry
        .next_task(Instant::now())
        .ok_or(StatusCode::NOT_FOUND)?;
    debug!(task = %task.id, operator = %task.operator, "Task handed out");
    Ok(Json(TaskEnvelope {
        task: TaskPayload::from(&task),
    }))
}

async fn submit_result_handler(
    State(registry): State<SharedState>,
    Json(req): Json<TaskResultRequest>,
) -> Result<StatusCode, ApiError> {
    if !req.result.is_finite() {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "result must be a finite number",
        ));
    }

    match registry.submit_result(req.id, req.result, Instant::now()) {
        Ok(TaskOutcome::Accepted) => Ok(StatusCode::OK),
        Ok(TaskOutcome::ExpressionCompleted { result }) => {
            info!(expression = %req.id.expression(), result, "Expression result available");
            Ok(StatusCode::OK)
        }
        Err(e) => {
            warn!(task = %req.id, error = %e, "Task result refused");
            Err(from_domain(e))
        }
    }
}
