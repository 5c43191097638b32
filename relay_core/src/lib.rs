//! Share-code rendezvous and relay.
//!
//! Two parties that cannot reach each other find one another through a
//! short share code, then exchange messages and chunked files through the
//! server.

pub mod codes;
pub mod config;
pub mod connection;
pub mod error;
pub mod messages;
pub mod outbound;
pub mod pairing;
pub mod registry;
pub mod router;
pub mod server;
pub mod state;
pub mod stats;
pub mod tracker;

pub use codes::{CodeSpace, OriginCode, ShareCode};
pub use config::{BackpressureConfig, RelayConfig};
pub use connection::{Connection, ConnectionHandle, ConnectionId};
pub use error::RelayError;
pub use outbound::Delivery;
pub use state::RelayState;
