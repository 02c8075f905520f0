use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use mindmap_core::{
    ExtractionPhase, InMemorySessionStorage, MapSession, MindMapError, SessionStorage,
    require_session,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    cache::{ExtractionCache, InMemoryExtractionCache},
    extract::{ExtractorConfig, run_extraction},
    models::{AnalyzeRequest, ClickRequest, ClickResponse, SessionResponse},
    upload::{PDF_MIME, decode_upload, fingerprint, validate_pdf},
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub session_storage: Arc<dyn SessionStorage>,
    pub cache: Arc<dyn ExtractionCache>,
    pub extractor: ExtractorConfig,
}

pub async fn create_app() -> Router {
    let extractor = ExtractorConfig::from_env().unwrap_or_else(|e| {
        error!("Failed to configure extractor: {}", e);
        std::process::exit(1);
    });

    let app_state = AppState {
        session_storage: Arc::new(InMemorySessionStorage::new()),
        cache: Arc::new(InMemoryExtractionCache::new()),
        extractor,
    };
    build_router(app_state)
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/mindmap/analyze", post(start_analysis))
        .route("/mindmap/{session_id}", get(get_session))
        .route("/mindmap/{session_id}/click", post(click_node))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "PDF Mind Map Service",
        "version": "1.0.0",
        "description": "Summarizes an uploaded PDF into an interactive, expandable mind map",
        "endpoints": {
            "POST /mindmap/analyze": "Upload a PDF and start extraction",
            "GET /mindmap/{session_id}": "Get extraction status and the positioned graph",
            "POST /mindmap/{session_id}/click": "Select a node, toggling it when it has children",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn start_analysis(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Value> {
    let file = request
        .files
        .first()
        .ok_or_else(|| bad_request_error("At least one file is required"))?;

    info!("Starting mind-map analysis for: {}", file.name);

    if let Some(mime) = &file.mime_type {
        if mime != PDF_MIME {
            return Err(bad_request_error("Only PDF files are allowed"));
        }
    }

    let pdf_bytes = decode_upload(&file.data).map_err(|e| bad_request_error(&e.to_string()))?;
    validate_pdf(&pdf_bytes).map_err(|e| bad_request_error(&e.to_string()))?;

    let doc_fingerprint = fingerprint(&pdf_bytes);
    let session = MapSession::create(&doc_fingerprint);
    let session_id = session.id.clone();

    save_session(&state, session.clone()).await?;

    let (status, cached) = match state.cache.get(&doc_fingerprint).await {
        Some(snapshot) => {
            info!(
                session_id = %session_id,
                "cache hit for fingerprint {doc_fingerprint}, skipping upstream exchange"
            );
            session.adapter.complete(1, snapshot).map_err(|e| {
                internal_error("Cached extraction failed validation", &e.to_string())
            })?;
            ("complete", true)
        }
        None => {
            tokio::spawn(run_extraction(
                state.extractor.clone(),
                pdf_bytes,
                session,
                state.cache.clone(),
            ));
            ("started", false)
        }
    };

    Ok(Json(json!({
        "session_id": session_id,
        "status": status,
        "cached": cached
    })))
}

async fn save_session(state: &AppState, session: Arc<MapSession>) -> Result<(), ApiError> {
    state.session_storage.save(session).await.map_err(|e| {
        error!("Failed to create session: {}", e);
        internal_error("Failed to create analysis session", &e.to_string())
    })
}

async fn load_session(state: &AppState, session_id: &str) -> Result<Arc<MapSession>, ApiError> {
    match require_session(state.session_storage.as_ref(), session_id).await {
        Ok(session) => Ok(session),
        Err(MindMapError::SessionNotFound(_)) => {
            Err(not_found_error("Session not found", session_id))
        }
        Err(e) => {
            error!("Failed to load session {}: {}", session_id, e);
            Err(internal_error("Failed to load session", &e.to_string()))
        }
    }
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = load_session(&state, &session_id).await?;
    Ok(Json(session_response(&session)))
}

fn session_response(session: &MapSession) -> SessionResponse {
    let extraction = session.adapter.current();
    let status = match extraction.phase {
        ExtractionPhase::Streaming => "streaming",
        ExtractionPhase::Complete => "complete",
        ExtractionPhase::Failed => "failed",
    };

    SessionResponse {
        session_id: session.id.clone(),
        status: status.to_string(),
        title: extraction.root_label(),
        selected: session.selected(),
        graph: session.graph(),
    }
}

async fn click_node(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ClickRequest>,
) -> ApiResult<ClickResponse> {
    let session = load_session(&state, &session_id).await?;

    let selected = session
        .click(&request.node_id)
        .ok_or_else(|| bad_request_error("Node not found in current mind map"))?;

    Ok(Json(ClickResponse {
        session_id,
        selected,
        graph: session.graph(),
    }))
}
