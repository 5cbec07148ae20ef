//! HTTP surface: a liveness probe and a read-only fetch by id.

pub mod auth;
pub mod routes;

pub use routes::{SocketRouteState, socket_routes};
