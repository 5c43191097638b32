//! Network host for the relay
//!
//! Accepts WebSocket connections and exposes the visit counters over HTTP.

pub mod routes;
pub mod websocket;

pub use routes::{create_router, run, serve};
