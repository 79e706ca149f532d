//! Background sweeper for time-based state transitions.
//!
//! The one recurring job is intent expiry: a QR code is confirmable for 15
//! minutes, and the server owns that deadline. Confirmation itself checks
//! `expires_at`, so the sweep only settles the visible status of intents
//! that were abandoned (initiator closed the app, counterparty never
//! scanned).
//!
//! Tests drive `sweep_tick` directly with a mocked `TimeSource` instead of
//! waiting out the interval.

use sqlx::PgPool;
use std::time::Duration;
use tokio::time;

use crate::{store, telemetry::log_error, time::TimeSource};

pub struct Scheduler {
    pool: PgPool,
    time_source: TimeSource,
    tick_interval: Duration,
}

impl Scheduler {
    pub fn new(
        pool: PgPool,
        time_source: TimeSource,
        tick_interval: Duration,
    ) -> Self {
        Self {
            pool,
            time_source,
            tick_interval,
        }
    }

    pub async fn run(&self) {
        let mut interval = time::interval(self.tick_interval);
        loop {
            interval.tick().await;
            let _ = sweep_tick(&self.pool, &self.time_source)
                .await
                .map_err(log_error);
        }
    }
}

/// Update state once right now.
#[tracing::instrument(skip(pool, time_source))]
pub async fn sweep_tick(
    pool: &PgPool,
    time_source: &TimeSource,
) -> anyhow::Result<()> {
    store::transfer::expire_stale_intents(pool, time_source).await?;
    Ok(())
}
