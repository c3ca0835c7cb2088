use std::{fmt::Display, future::Future, time::Duration};
use tokio::{
    sync::watch,
    task::{JoinHandle, JoinSet},
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

/// Keeps a poller alive. Dropping it or calling [`PollHandle::cancel`] stops
/// the timer and aborts cycles that are still in flight.
pub struct PollHandle {
    name: &'static str,
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_active(&self) -> bool {
        !*self.cancel.borrow() && !self.task.is_finished()
    }

    /// Cancels and waits until the timer loop has exited.
    pub async fn shutdown(mut self) {
        self.cancel();
        let _ = (&mut self.task).await;
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        let _ = self.cancel.send(true);
        self.task.abort();
    }
}

/// Runs `task` right away and then every `interval`, on a schedule that does
/// not wait for earlier cycles to finish. Failed cycles are logged and the
/// timer keeps going.
pub fn start_polling<F, Fut, E>(name: &'static str, interval: Duration, task: F) -> PollHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let (cancel, mut cancelled) = watch::channel(false);
    let handle = tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    while in_flight.try_join_next().is_some() {}
                    let cycle = task();
                    in_flight.spawn(async move {
                        if let Err(err) = cycle.await {
                            warn!(poller = name, "refresh failed: {err}");
                        }
                    });
                }
                changed = cancelled.changed() => {
                    if changed.is_err() || *cancelled.borrow() {
                        break;
                    }
                }
            }
        }
        debug!(poller = name, aborted = in_flight.len(), "polling stopped");
    });

    PollHandle {
        name,
        cancel,
        task: handle,
    }
}
