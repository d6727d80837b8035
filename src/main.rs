use anyhow::Result;
use std::sync::Arc;
use tour_sync::api::{ApiServer, AppState};
use tour_sync::poster::PosterPipeline;
use tour_sync::storage::StorageClient;
use tour_sync::store::{DocumentStore, PgDocStore};
use tour_sync::tour::TourClient;
use tour_sync::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    env_util::init_env();
    tour_sync::logging::init_tracing("info,sqlx=warn")?;

    env_util::preflight_check(
        "tour-sync",
        &["TOUR_API_KEY", "GENLANG_API_KEY", "STORAGE_BUCKET"],
        &[
            "DATABASE_URL",
            "TOUR_API_KEY",
            "GENLANG_API_KEY",
            "STORAGE_BASE_URL",
            "STORAGE_BUCKET",
            "TOUR_AREA_CODE",
            "TOUR_PAGE_SIZE",
            "API_HOST",
            "API_PORT",
        ],
    )?;

    // Single initialization point for the per-process client handles; they
    // are cloned/shared from here and never rebuilt per invocation.
    let store: Arc<dyn DocumentStore> = Arc::new(
        PgDocStore::connect(
            &env_util::db_url()?,
            env_util::env_parse("DB_MAX_CONNECTIONS", 5u32),
        )
        .await?,
    );
    let tour = TourClient::from_env()?;
    let storage = StorageClient::from_env()?;
    let poster = PosterPipeline::from_env(storage.clone())?;

    // Monthly schedule runs beside the server, sharing the same sync entry
    // point as the manual trigger.
    tokio::spawn(tour_sync::schedule::run_monthly_schedule(
        tour.clone(),
        store.clone(),
    ));

    let state = AppState {
        store,
        tour,
        storage,
        poster,
    };
    ApiServer::from_env()?.run(state).await
}
