use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State, multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{
    config::AppConfig,
    ingest::{self, IngestError, Upload},
    protocol::{ChatRequest, ChatResponse, HealthResponse, UploadResponse},
    state::{AppState, Services},
};

const SERVICE_NAME: &str = "docchat";
const NO_DOCUMENT: &str = "No document uploaded yet.";
const EMPTY_QUESTION: &str = "Question must not be empty.";
const UPLOAD_OK: &str = "PDF processed successfully.";

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload).layer(upload_limit))
        .route("/chat", post(chat))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let services = Services::from_config(&config).context("failed to initialise services")?;
    let state = AppState::new(services).with_max_upload_bytes(config.server.max_upload_bytes);
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| "invalid host/port for docchat server")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!("docchat listening on http://{}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let document = state.documents.current().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        document_loaded: document.is_some(),
        document: document.map(|d| d.info()),
    })
}

async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<UploadResponse> {
    let result = match multipart {
        Ok(multipart) => receive_and_ingest(&state, multipart).await,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "upload is not a multipart form");
            Err(IngestError::MissingFile)
        }
    };

    match result {
        Ok(()) => Json(UploadResponse::success(UPLOAD_OK)),
        Err(e) => {
            warn!(error = %e, "upload rejected");
            Json(UploadResponse::error(e.to_string()))
        }
    }
}

async fn receive_and_ingest(state: &AppState, multipart: Multipart) -> Result<(), IngestError> {
    let upload = read_file_field(multipart).await?;
    ingest::validate(&upload)?;

    let _uploading = state.documents.begin_upload().await;
    let document = ingest::ingest(&state.services, upload).await?;
    let name = document.name.clone();
    if let Some(previous) = state.documents.install(document).await {
        info!(previous = %previous.name, current = %name, "replaced loaded document");
    }
    Ok(())
}

async fn read_file_field(mut multipart: Multipart) -> Result<Upload, IngestError> {
    while let Some(field) =
        multipart.next_field().await.map_err(|e| IngestError::Internal(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await.map_err(|e| IngestError::Internal(e.body_text()))?;
        return Ok(Upload { filename, content });
    }
    Err(IngestError::MissingFile)
}

async fn chat(
    State(state): State<AppState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Json<ChatResponse> {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => return Json(ChatResponse::error(rejection.body_text())),
    };

    let Some(document) = state.documents.current().await else {
        return Json(ChatResponse::error(NO_DOCUMENT));
    };

    let question = request.question.trim();
    if question.is_empty() {
        return Json(ChatResponse::error(EMPTY_QUESTION));
    }

    match document.chain.ask(question).await {
        Ok(answer) => Json(ChatResponse::answer(answer.text)),
        Err(e) => {
            error!(document = %document.name, error = %e, "failed to answer question");
            Json(ChatResponse::error(e.to_string()))
        }
    }
}
