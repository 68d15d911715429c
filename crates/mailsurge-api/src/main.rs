use anyhow::Result;
use mailsurge_api::{ApiContext, ServerConfig, router};
use mailsurge_core::constants::SESSION_SWEEP_INTERVAL_SECS;
use mailsurge_core::{EventBroadcaster, JobQueue, MailerRegistry, SessionStore};
use mailsurge_worker::{Scheduler, SchedulerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = ServerConfig::from_env();
    info!(?config, "Starting Mailsurge");

    // Engine components are constructed once here and injected
    // everywhere; nothing reaches for ambient globals
    let queue = Arc::new(JobQueue::new(config.session_concurrency_cap));
    let store = Arc::new(SessionStore::new());
    let events = Arc::new(EventBroadcaster::default());
    let mailers = Arc::new(MailerRegistry::new());

    let scheduler = Scheduler::new(
        Arc::clone(&queue),
        Arc::clone(&store),
        Arc::clone(&events),
        Arc::clone(&mailers),
        SchedulerConfig {
            global_concurrency: config.global_concurrency,
            tick_interval_ms: config.tick_interval_ms,
            retry_base_delay_ms: config.retry_base_delay_ms,
            ..SchedulerConfig::default()
        },
    );
    let dispatch_loop = tokio::spawn(Arc::clone(&scheduler).run());

    // Hourly sweep of aged-out sessions
    {
        let store = Arc::clone(&store);
        let max_age_hours = config.session_max_age_hours;
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));
            interval.tick().await; // the immediate first tick
            loop {
                interval.tick().await;
                store.cleanup_older_than(max_age_hours);
            }
        });
    }

    let bind_addr = config.bind_addr.clone();
    let ctx = ApiContext::new(queue, store, events, mailers, config);
    let app = router(ctx);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "Mailsurge API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop();
    dispatch_loop.await?;
    info!("Mailsurge stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
