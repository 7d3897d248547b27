// dayschedule-sync/src/sync/mod.rs
pub(crate) mod logic;
pub(crate) mod schedule;

use anyhow::{Context, Result};
use tracing::info;

use crate::api::DayScheduleClient;
use crate::config::{AppConfig, OperationConfig};

/// Public entry point for a one-shot sync. Returns the number of bookings written.
pub async fn run_sync_flow(app_config: &AppConfig) -> Result<usize> {
    let sync_options = match &app_config.operation {
        Some(OperationConfig::Sync(opts)) => opts,
        _ => anyhow::bail!("Sync operation selected but no sync configuration found."),
    };

    let client = DayScheduleClient::new(&app_config.api).context("Failed to build API client")?;
    let report = logic::perform_sync_orchestration(&client, app_config, sync_options).await?;
    Ok(report.written)
}

/// Public entry point for scheduled syncs. Runs until Ctrl-C or a fatal error.
pub async fn run_schedule_flow(app_config: &AppConfig) -> Result<u64> {
    let schedule_config = match &app_config.operation {
        Some(OperationConfig::Schedule(cfg)) => cfg,
        _ => anyhow::bail!("Schedule operation selected but no schedule configuration found."),
    };

    let client = DayScheduleClient::new(&app_config.api).context("Failed to build API client")?;
    info!(
        interval_minutes = schedule_config.interval.as_secs() / 60,
        mode = %schedule_config.sync.mode,
        "🗓️ scheduled sync enabled, press Ctrl-C to stop"
    );

    let shutdown = async {
        // If the handler can't be installed the default SIGINT behavior still ends the process.
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    schedule::run_on_interval(schedule_config.interval, shutdown, |tick| {
        let client = &client;
        let sync_options = &schedule_config.sync;
        async move {
            let report = logic::perform_sync_orchestration(client, app_config, sync_options)
                .await
                .with_context(|| format!("Scheduled sync #{} failed", tick))?;
            info!(tick, written = report.written, "scheduled sync finished");
            Ok::<(), anyhow::Error>(())
        }
    })
    .await
}
