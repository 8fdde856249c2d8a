use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

/// Runtime configuration for the rendezvous server.
///
/// Every knob is a CLI flag with an environment override, so deployments can
/// configure the binary either way.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tincan-server",
    about = "Rendezvous and signaling server for one-to-one calls",
    version
)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to.
    #[arg(long, env = "TINCAN_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Seconds between keep-alive pings on every signaling connection.
    #[arg(long, env = "TINCAN_PING_PERIOD_SECS", default_value_t = 15)]
    pub ping_period_secs: u64,

    /// Seconds of post-ping silence before a connection is torn down.
    #[arg(long, env = "TINCAN_IDLE_TIMEOUT_SECS", default_value_t = 15)]
    pub idle_timeout_secs: u64,

    /// Seconds an empty room survives before it is garbage-collected.
    #[arg(long, env = "TINCAN_ROOM_GRACE_SECS", default_value_t = 60)]
    pub room_grace_secs: u64,

    /// Maximum number of simultaneous rooms (unlimited when absent).
    #[arg(long, env = "TINCAN_ROOM_CAP")]
    pub room_cap: Option<usize>,

    /// Outbound lines buffered per peer before it is dropped as unhealthy.
    #[arg(long, env = "TINCAN_OUTBOX_CAPACITY", default_value_t = 64)]
    pub outbox_capacity: usize,
}

impl ServerConfig {
    pub fn ping_period(&self) -> Duration {
        Duration::from_secs(self.ping_period_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// How long the reader tolerates total silence: one ping period plus the
    /// post-ping allowance.
    pub fn idle_window(&self) -> Duration {
        self.ping_period() + self.idle_timeout()
    }

    pub fn room_grace(&self) -> Duration {
        Duration::from_secs(self.room_grace_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            ping_period_secs: 15,
            idle_timeout_secs: 15,
            room_grace_secs: 60,
            room_cap: None,
            outbox_capacity: 64,
        }
    }
}
