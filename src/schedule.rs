//! Monthly festival sync schedule: the 1st of every month at 02:00 UTC,
//! invoking the same entry point as the manual HTTP trigger. A failed run is
//! logged and the loop keeps going; failures have no caller to surface to.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::sync::Arc;
use tracing::{error, info};

use crate::store::DocumentStore;
use crate::tour::{run_festival_sync, TourClient};

const RUN_HOUR: u32 = 2;

/// Next 1st-of-month 02:00 strictly after `now`.
pub fn next_monthly_run(now: DateTime<Utc>) -> DateTime<Utc> {
    let (mut year, mut month) = (now.year(), now.month());
    let this_month = Utc
        .with_ymd_and_hms(year, month, 1, RUN_HOUR, 0, 0)
        .single()
        .expect("first of month is always valid");
    if this_month > now {
        return this_month;
    }
    if month == 12 {
        year += 1;
        month = 1;
    } else {
        month += 1;
    }
    Utc.with_ymd_and_hms(year, month, 1, RUN_HOUR, 0, 0)
        .single()
        .expect("first of month is always valid")
}

/// Run the schedule forever. Intended to be spawned next to the API server.
pub async fn run_monthly_schedule(client: TourClient, store: Arc<dyn DocumentStore>) {
    loop {
        let now = Utc::now();
        let next = next_monthly_run(now);
        let wait = (next - now)
            .to_std()
            .unwrap_or_else(|_| std::time::Duration::from_secs(60));
        info!(next = %next, "monthly festival sync sleeping until next run");
        tokio::time::sleep(wait).await;

        match run_festival_sync(&client, store.as_ref()).await {
            Ok(summary) => info!(?summary, "scheduled festival sync finished"),
            Err(e) => error!("scheduled festival sync failed: {e:#}"),
        }
    }
}
