//! Evaluates the traffic pipeline across the whole day.

use std::sync::Arc;

use anyhow::{Result, bail};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::filter::{MINUTES_PER_DAY, TimeFilter};
use crate::pipeline::TrafficContext;

/// Summary of one slider position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    pub minute: u16,
    pub label: String,
    pub trips: usize,
    pub active_stations: usize,
    pub max_traffic: u64,
    pub busiest_station: Option<String>,
}

impl SweepRow {
    fn at(context: &TrafficContext, minute: u16) -> Self {
        let view = context.view(TimeFilter::At(minute));
        Self {
            minute,
            label: view.label.clone(),
            trips: view.trip_count,
            active_stations: view.active_stations(),
            max_traffic: view.scale.max_traffic,
            busiest_station: view
                .busiest()
                .filter(|s| s.total_traffic > 0)
                .map(|s| s.code.clone()),
        }
    }
}

/// Row with the most trips in window; the earliest one wins ties.
pub fn peak(rows: &[SweepRow]) -> Option<&SweepRow> {
    rows.iter()
        .reduce(|best, r| if r.trips > best.trips { r } else { best })
}

/// Computes a [`SweepRow`] every `step_minutes` from midnight.
///
/// Steps run on the blocking pool, at most `concurrency` at a time. Rows are
/// returned in ascending minute order whatever order the steps finish in.
#[tracing::instrument(skip(context), fields(stations = context.stations().len(), trips = context.trips().len()))]
pub async fn sweep(
    context: Arc<TrafficContext>,
    step_minutes: u16,
    concurrency: usize,
) -> Result<Vec<SweepRow>> {
    if step_minutes == 0 || step_minutes > MINUTES_PER_DAY {
        bail!("step must be within 1..={MINUTES_PER_DAY} minutes, got {step_minutes}");
    }
    if concurrency == 0 {
        bail!("concurrency must be at least 1");
    }

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = vec![];

    for minute in (0..MINUTES_PER_DAY).step_by(usize::from(step_minutes)) {
        let sem = semaphore.clone();
        let context = context.clone();

        tasks.push(tokio::spawn(async move {
            let _permit = sem.acquire_owned().await?;
            let row = tokio::task::spawn_blocking(move || SweepRow::at(&context, minute)).await?;
            debug!(minute, trips = row.trips, "Sweep step done");
            anyhow::Ok(row)
        }));
    }

    let mut rows = Vec::with_capacity(tasks.len());
    for task in tasks {
        rows.push(task.await??);
    }

    info!(steps = rows.len(), "Sweep complete");
    Ok(rows)
}
