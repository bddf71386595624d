mod generator;
mod pension;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use chrono::{Datelike, Utc};
use dashmap::DashMap;
use intake_flow::{
    CompletionRecord, CompletionSink, ConversationState, ResponseGenerator, TurnStatus,
    VoivodeshipStat, voivodeship_stats,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::generator::OpenRouterGenerator;
use crate::pension::{CalculationSink, PensionClient};

// Matches the closing acknowledgement pause in the chat UI: the user sees
// the farewell message before the hand-off fires.
const DISPATCH_DELAY: Duration = Duration::from_millis(1500);

#[derive(Clone)]
struct AppState {
    sessions: Arc<DashMap<String, Arc<Mutex<ChatSession>>>>,
    generator: Arc<dyn ResponseGenerator>,
    sink: Arc<dyn CompletionSink>,
    pension: PensionClient,
}

/// One live chat. Sessions are in-memory only and vanish with the process;
/// the conversation state is never persisted.
#[derive(Serialize)]
struct ChatSession {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_pension: Option<f64>,
    state: ConversationState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    session_id: Option<String>,
    content: String,
    /// Desired pension carried over from the landing screen; merged into
    /// the completion record.
    expected_pension: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    session_id: String,
    reply: String,
    status: String,
}

/// Initialize structured JSON tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pension_intake_service=debug,intake_flow=debug,tower_http=debug".into());

    match log_format.as_str() {
        "pretty" => {
            // Human-readable logging for development
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            // Structured JSON logging for production
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(header) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", header);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

#[tokio::main]
async fn main() {
    init_tracing();

    // The chat degrades to a fixed message without a key, so a missing
    // credential is loud but not fatal to the rest of the application.
    if std::env::var("OPENROUTER_API_KEY").is_err() {
        warn!("OPENROUTER_API_KEY not set; chat responses will fall back to the apology message");
    }

    let pension = PensionClient::from_env();
    let app_state = AppState {
        sessions: Arc::new(DashMap::new()),
        generator: Arc::new(OpenRouterGenerator::from_env()),
        sink: Arc::new(CalculationSink::new(pension.clone())),
        pension,
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(chat))
        .route("/session/{id}", get(get_session))
        .route("/report/regions", get(region_report))
        .layer(from_fn(correlation_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind listener");

    info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server failed");
}

async fn health_check() -> &'static str {
    "OK"
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    let session_id_provided = request.session_id.is_some();
    let session_id = request
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if session_id_provided && Uuid::parse_str(&session_id).is_err() {
        error!(session_id = %session_id, "Invalid session ID format");
        return Err(StatusCode::BAD_REQUEST);
    }

    let session = match state.sessions.get(&session_id) {
        Some(entry) => entry.clone(),
        None => {
            // A provided but unknown id is an error; only fresh chats may
            // mint a session.
            if session_id_provided {
                error!(session_id = %session_id, "Session not found");
                return Err(StatusCode::NOT_FOUND);
            }
            info!(session_id = %session_id, "Creating new session");
            let session = Arc::new(Mutex::new(ChatSession {
                id: session_id.clone(),
                expected_pension: None,
                state: ConversationState::new(Utc::now().year()),
            }));
            state.sessions.insert(session_id.clone(), session.clone());
            session
        }
    };

    // One turn is a single logical step: the lock spans the whole
    // read-generate-write cycle, including the remote call.
    let mut session = session.lock().await;

    if request.expected_pension.is_some() {
        session.expected_pension = request.expected_pension;
    }

    info!(
        session_id = %session_id,
        content_length = request.content.len(),
        slot = ?session.state.current_slot(),
        "Processing chat turn"
    );

    let result = session
        .state
        .process_turn(&request.content, state.generator.as_ref())
        .await;

    if result.status == TurnStatus::Completed {
        if let Some(answers) = session.state.take_completion() {
            match CompletionRecord::from_answers(&answers, session.expected_pension) {
                Ok(record) => {
                    let sink = state.sink.clone();
                    let dispatch_session = session_id.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(DISPATCH_DELAY).await;
                        info!(session_id = %dispatch_session, "Dispatching completed intake");
                        sink.deliver(record).await;
                    });
                }
                // Unreachable once the state machine reports completion,
                // but a gap here must not break the chat response.
                Err(e) => error!(session_id = %session_id, error = %e, "Incomplete record"),
            }
        }
    }

    info!(
        session_id = %session_id,
        status = ?result.status,
        slot_filled = result.slot_filled,
        "Chat turn completed"
    );

    Ok(Json(ChatResponse {
        session_id,
        reply: result.reply,
        status: format!("{:?}", result.status),
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.sessions.get(&session_id) {
        Some(entry) => {
            let session = entry.lock().await;
            let snapshot = serde_json::to_value(&*session).map_err(|e| {
                error!(session_id = %session_id, error = %e, "Failed to serialize session");
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            Ok(Json(snapshot))
        }
        None => {
            info!(session_id = %session_id, "Session not found");
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// Regional breakdown of historical calculations for the reporting panel.
async fn region_report(
    State(state): State<AppState>,
) -> Result<Json<Vec<VoivodeshipStat>>, StatusCode> {
    let records = match state.pension.audit().await {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "Failed to fetch audit records");
            return Err(StatusCode::BAD_GATEWAY);
        }
    };

    let zip_codes: Vec<Option<&str>> = records
        .iter()
        .map(|record| record.request.zip_code.as_deref())
        .collect();
    let stats = voivodeship_stats(zip_codes);

    info!(
        records = records.len(),
        regions = stats.len(),
        "Computed region report"
    );
    Ok(Json(stats))
}
