// One-shot festival sync: fetch every page and upsert, then exit.
// Useful for manual runs and cron environments outside the server process.

use anyhow::Result;
use tour_sync::store::PgDocStore;
use tour_sync::tour::{run_festival_sync, TourClient};
use tour_sync::util::env as env_util;

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    tour_sync::logging::init_tracing("info,sqlx=warn")?;

    env_util::preflight_check(
        "festival_sync_once",
        &["TOUR_API_KEY"],
        &["DATABASE_URL", "TOUR_API_KEY", "TOUR_AREA_CODE", "TOUR_PAGE_SIZE"],
    )?;

    let store = PgDocStore::connect(
        &env_util::db_url()?,
        env_util::env_parse("DB_MAX_CONNECTIONS", 5u32),
    )
    .await?;
    let client = TourClient::from_env()?;

    let summary = run_festival_sync(&client, &store).await?;
    println!(
        "festival sync: {} pages, {} written, {} skipped",
        summary.pages, summary.written, summary.skipped
    );
    Ok(())
}
