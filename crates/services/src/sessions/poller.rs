use std::time::Duration;

use monitor_core::model::{SessionId, SessionSnapshot};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::error::SessionServiceError;
use crate::sessions::SessionService;

/// Events delivered to the poller's subscriber.
#[derive(Debug)]
pub enum PollEvent {
    /// One observation of the session, taken on the polling cadence.
    Status(SessionSnapshot),
    /// The service failed; polling stops after this event.
    Failed(SessionServiceError),
}

/// Drives `SessionService::poll` for one session on a fixed cadence.
///
/// The poller only observes; finishing is decided by the service. It stops
/// itself on the first `finished` observation and can be cancelled early
/// through the returned handle, after which no further event fires.
pub struct SessionPoller;

impl SessionPoller {
    /// Spawn the polling task.
    ///
    /// Observations arrive on the returned receiver; the channel closes
    /// when polling stops (finished, failed, or cancelled). Polls are
    /// serialized: the next tick is not taken while a poll is in flight,
    /// and a delayed poll shifts the cadence instead of piling up calls.
    #[must_use]
    pub fn spawn(
        service: SessionService,
        id: SessionId,
        period: Duration,
    ) -> (PollHandle, mpsc::UnboundedReceiver<PollEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut cancel_rx => {
                        debug!(session = %id, "polling cancelled");
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                tokio::select! {
                    _ = &mut cancel_rx => {
                        debug!(session = %id, "polling cancelled");
                        return;
                    }
                    polled = service.poll(id) => match polled {
                        Ok(snapshot) => {
                            let finished = snapshot.status.is_finished();
                            if events.send(PollEvent::Status(snapshot)).is_err() {
                                // Subscriber went away; stop quietly.
                                return;
                            }
                            if finished {
                                return;
                            }
                        }
                        Err(err) => {
                            let _ = events.send(PollEvent::Failed(err));
                            return;
                        }
                    },
                }
            }
        });

        (
            PollHandle {
                cancel: Some(cancel_tx),
                task,
            },
            rx,
        )
    }
}

/// Cancellation handle for a polling task.
///
/// Dropping the handle without calling [`PollHandle::cancel`] also stops
/// the task, just without waiting for it to wind down.
pub struct PollHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Cancel polling and wait for the task to terminate.
    ///
    /// Once this returns, the task has exited and no further event is
    /// produced.
    pub async fn cancel(mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
        let _ = self.task.await;
    }

    /// True once the polling task has stopped on its own.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
