// HTTP request handlers

use crate::api::models::*;
use crate::ingest::{handle_finalize, FinalizeEvent, TriggerOutcome};
use crate::poster::{PosterPipeline, PosterRequest};
use crate::storage::StorageClient;
use crate::store::DocumentStore;
use crate::tour::{run_festival_sync, TourClient};
use actix_web::{web, HttpResponse, Result};
use std::sync::Arc;
use std::time::SystemTime;

/// Shared per-process handles: effectively immutable connection objects,
/// constructed once at startup and injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub tour: TourClient,
    pub storage: StorageClient,
    pub poster: PosterPipeline,
}

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    let store_status = match state.store.ping().await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };

    let uptime = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        store: store_status.to_string(),
        uptime_seconds: uptime,
    }))
}

/// Manual festival sync trigger. Acknowledges immediately, then runs the sync
/// on a detached task: there is no ordering guarantee between this response
/// and the background run's completion, and callers must not assume the
/// ingestion has finished when the response returns.
pub async fn trigger_festival_sync(state: web::Data<AppState>) -> Result<HttpResponse> {
    tracing::info!("manual festival sync requested");

    let tour = state.tour.clone();
    let store = state.store.clone();
    tokio::spawn(async move {
        match run_festival_sync(&tour, store.as_ref()).await {
            Ok(summary) => tracing::info!(?summary, "manual festival sync finished"),
            Err(e) => tracing::error!("manual festival sync failed: {e:#}"),
        }
    });

    Ok(HttpResponse::Accepted().body("festival sync started; running in the background"))
}

/// Object-storage finalize webhook: runs the village ingestion pipeline.
pub async fn storage_finalize(
    state: web::Data<AppState>,
    payload: web::Json<FinalizeEvent>,
) -> Result<HttpResponse> {
    let event = payload.into_inner();
    tracing::info!(bucket = %event.bucket, object = %event.name, "finalize event received");

    match handle_finalize(&event, &state.storage, state.store.as_ref()).await {
        Ok(TriggerOutcome::NotApplicable) => Ok(HttpResponse::Ok().body("ignored")),
        Ok(TriggerOutcome::ParseRejected) => Ok(HttpResponse::Ok().body("rejected")),
        Ok(TriggerOutcome::Processed { written, skipped }) => Ok(HttpResponse::Ok().json(
            serde_json::json!({ "written": written, "skipped": skipped }),
        )),
        Err(e) => {
            tracing::error!("village ingestion failed: {e:#}");
            Ok(HttpResponse::InternalServerError().body("village ingestion failed"))
        }
    }
}

/// Poster composition endpoint.
pub async fn compose_poster(
    state: web::Data<AppState>,
    payload: web::Json<PosterBody>,
) -> Result<HttpResponse> {
    let body = payload.into_inner();
    if let Some(field) = body.missing_field() {
        return Ok(HttpResponse::BadRequest().body(format!("missing required field: {field}")));
    }

    let req = PosterRequest {
        title_prompt: body.title_prompt.unwrap_or_default(),
        subtitle_prompt: body.subtitle_prompt.unwrap_or_default(),
        ai_image_url: body.ai_image_url.unwrap_or_default(),
        template_file_name: body.template_file_name,
    };

    match state.poster.run(&req).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(e) => {
            tracing::error!("poster pipeline failed: {e:#}");
            Ok(HttpResponse::InternalServerError().body("poster generation failed"))
        }
    }
}

/// Default for routes registered with a different method.
pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().body("method not allowed")
}
