//! Shared refresh scheduling for both presentation shells.
//!
//! One abstraction drives the fetch→ingest cadence: the terminal shell
//! spawns the loop and polls snapshots, the web shell additionally listens
//! on the event channel to push snapshots to its clients. Request-driven
//! callers use [`refresh_once`] for a single synchronous cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::fetch::PriceSource;
use crate::sample::Sample;
use crate::tracker::RatioTracker;

/// Outcome of one scheduled cycle, for shells that want push notification.
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    /// A sample was fetched and ingested
    Ingested(Sample),
    /// The fetch failed; tracker state is untouched
    Failed(FetchError),
}

/// Run one fetch+ingest cycle and return the fetched sample.
///
/// On failure nothing is ingested: the prior tracker state is left
/// completely untouched and the error is handed back for the caller to
/// display.
pub async fn refresh_once<S>(source: &S, tracker: &RatioTracker) -> Result<Sample, FetchError>
where
    S: PriceSource + ?Sized,
{
    let sample = source.fetch().await?;
    tracker.ingest(sample);
    Ok(sample)
}

/// Handle to a running refresh loop.
pub struct RefreshHandle {
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Request a cooperative stop and wait for the loop to exit.
    ///
    /// The signal is observed between cycles and takes effect within one;
    /// an in-flight fetch is never cancelled, it simply finishes first.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(()).await;
        let _ = self.task.await;
    }
}

/// Spawn the periodic fetch→ingest task.
///
/// Fetch failures are logged and leave state untouched; the loop stays on
/// its normal schedule indefinitely, with no backoff escalation. A slow
/// fetch delays the next tick rather than overlapping it.
pub fn spawn_refresh_loop<S>(
    source: S,
    tracker: Arc<RatioTracker>,
    interval: Duration,
    events: Option<mpsc::Sender<RefreshEvent>>,
) -> RefreshHandle
where
    S: PriceSource + 'static,
{
    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

    let task = tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs_f64(), "refresh loop started");

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let event = match refresh_once(&source, &tracker).await {
                        Ok(sample) => {
                            debug!(ratio = sample.ratio(), "scheduled ingest complete");
                            RefreshEvent::Ingested(sample)
                        }
                        Err(error) => {
                            warn!(%error, "fetch failed, keeping previous state");
                            RefreshEvent::Failed(error)
                        }
                    };

                    if let Some(tx) = &events {
                        let _ = tx.send(event).await;
                    }
                }
                _ = stop_rx.recv() => {
                    info!("refresh loop stopping");
                    break;
                }
            }
        }
    });

    RefreshHandle { stop_tx, task }
}
