use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use quiz_core::model::SessionId;

use super::controller::{SessionState, Tick};
use super::workflow::{SessionEvent, SharedController, record_outcome};
use crate::result_store::ResultStore;

/// One-second countdown for a mock test, running as its own task.
///
/// The task stops by itself once its session is no longer the one in
/// progress; dropping or cancelling the handle stops it immediately. After
/// expiry the task still records the result, so it must be awaited rather
/// than cancelled.
#[derive(Debug)]
pub struct ExamTimer {
    session_id: SessionId,
    handle: JoinHandle<()>,
}

impl ExamTimer {
    #[must_use]
    pub fn spawn(
        session_id: SessionId,
        controller: SharedController,
        store: ResultStore,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        let handle = tokio::spawn(run(session_id, controller, store, events));
        Self { session_id, handle }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to end on its own, e.g. while it records an expired exam.
    pub async fn wait(&mut self) {
        if let Err(err) = (&mut self.handle).await {
            tracing::warn!(session_id = %self.session_id, error = %err, "exam timer task failed");
        }
    }
}

impl Drop for ExamTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(
    session_id: SessionId,
    controller: SharedController,
    store: ResultStore,
    events: UnboundedSender<SessionEvent>,
) {
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let tick = {
            let mut controller = controller.lock().await;
            if controller.session_id() != Some(session_id)
                || controller.state() != SessionState::InProgress
            {
                tracing::debug!(%session_id, "timer stopping, session no longer running");
                return;
            }
            match controller.tick() {
                Ok(tick) => tick,
                Err(err) => {
                    tracing::debug!(%session_id, error = %err, "timer stopping");
                    return;
                }
            }
        };

        match tick {
            Tick::Running { remaining_secs } => {
                let _ = events.send(SessionEvent::Tick {
                    session_id,
                    remaining_secs,
                });
            }
            Tick::Expired(outcome) => {
                let report = record_outcome(&store, outcome).await;
                let _ = events.send(SessionEvent::Expired(report));
                return;
            }
        }
    }
}
