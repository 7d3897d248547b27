// dayschedule-sync/src/sync/schedule.rs
use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use crate::errors;

/// Runs `tick` now and then again `interval` after each run finishes, until
/// `shutdown` resolves. Ticks never overlap.
///
/// A failing tick is logged and the schedule carries on; only fatal
/// (configuration) errors end it early. Returns the number of ticks run.
pub async fn run_on_interval<F, Fut, S>(interval: Duration, shutdown: S, mut tick: F) -> Result<u64>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<()>>,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut ticks = 0u64;

    loop {
        ticks += 1;
        info!(tick = ticks, "⏱️ scheduled sync starting");
        if let Err(e) = tick(ticks).await {
            if errors::is_fatal(&e) {
                error!(tick = ticks, error = ?e, "fatal error, stopping schedule");
                return Err(e);
            }
            error!(tick = ticks, error = ?e, "scheduled sync failed, will retry next tick");
        }

        info!(
            minutes = interval.as_secs() / 60,
            "💤 sleeping until next scheduled sync"
        );
        tokio::select! {
            _ = &mut shutdown => {
                info!(ticks, "🛑 shutdown requested, stopping schedule");
                return Ok(ticks);
            }
            _ = sleep(interval) => {}
        }
    }
}
