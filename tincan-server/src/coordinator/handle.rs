use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use tincan_core::{RoomCode, SessionId};

use crate::coordinator::event::{CoordinatorEvent, Stats};
use crate::registry::RegistryError;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("coordinator is not running")]
    Unavailable,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Cloneable front door to the coordinator's event queue.
///
/// The transport holds one per connection task; the admin handlers hold one
/// through the shared app state.
#[derive(Clone)]
pub struct CoordinatorHandle {
    events: mpsc::Sender<CoordinatorEvent>,
}

impl CoordinatorHandle {
    pub(crate) fn new(events: mpsc::Sender<CoordinatorEvent>) -> Self {
        Self { events }
    }

    pub async fn opened(&self, session: SessionId) {
        self.post(CoordinatorEvent::Opened { session }).await;
    }

    pub async fn inbound(&self, session: SessionId, line: String) {
        self.post(CoordinatorEvent::Inbound { session, line }).await;
    }

    pub async fn closed(&self, session: SessionId) {
        self.post(CoordinatorEvent::Closed { session }).await;
    }

    /// Registers a fresh room code on behalf of the admin surface.
    pub async fn generate_code(&self) -> Result<RoomCode, AdminError> {
        let (reply, response) = oneshot::channel();
        self.post(CoordinatorEvent::GenerateCode { reply }).await;
        match response.await {
            Ok(result) => result.map_err(AdminError::from),
            Err(_) => Err(AdminError::Unavailable),
        }
    }

    /// Fetches live counters for the health endpoint.
    pub async fn snapshot(&self) -> Result<Stats, AdminError> {
        let (reply, response) = oneshot::channel();
        self.post(CoordinatorEvent::Snapshot { reply }).await;
        response.await.map_err(|_| AdminError::Unavailable)
    }

    async fn post(&self, event: CoordinatorEvent) {
        if self.events.send(event).await.is_err() {
            warn!("coordinator event queue is closed");
        }
    }
}
