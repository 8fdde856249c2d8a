//! tincan-server: the rendezvous half of a 1:1 video-calling sample.
//!
//! Two peers share a six-character room code out of band; each connects a
//! WebSocket to `/rtc`, claims the code with `CONNECTION`, and from then on
//! the server relays their negotiation lines (`OFFER`/`ANSWER`/`ICE`/
//! `START_CALL`) verbatim while broadcasting the room's call state.
//!
//! Layers, outermost first:
//!
//! ```text
//! axum router (/, /generate-code, /healthz, /rtc)
//!   └─ transport: one reader + one writer task per connection
//!        └─ coordinator: single event-loop task, sole mutator
//!             ├─ session table (session → room)
//!             └─ room registry (code → Room, GC sweeps)
//! ```

pub mod admin;
pub mod config;
pub mod coordinator;
pub mod outbound;
pub mod registry;
pub mod room;
pub mod transport;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

pub use config::ServerConfig;
pub use coordinator::{AdminError, Coordinator, CoordinatorHandle, Stats};
pub use outbound::{OutboundFrame, PeerRegistry, SendOutcome};
pub use registry::{RegistryError, RoomRegistry};
pub use room::{Room, ROOM_CAPACITY};

/// Shared state handed to every axum handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: CoordinatorHandle,
    pub peers: PeerRegistry,
    pub config: Arc<ServerConfig>,
}

/// Builds the coordinator, spawns its event loop, and returns the shared
/// app state.
pub fn spawn_coordinator(config: ServerConfig) -> AppState {
    let (coordinator, handle, peers) = Coordinator::new(&config);
    tokio::spawn(coordinator.run());
    AppState {
        coordinator: handle,
        peers,
        config: Arc::new(config),
    }
}

/// The full HTTP surface: the signaling socket plus the admin endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(admin::banner))
        .route("/generate-code", get(admin::generate_code))
        .route("/healthz", get(admin::healthz))
        .route("/rtc", get(transport::ws_handler))
        .with_state(state)
}
