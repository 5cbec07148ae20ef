//! Job sockets: file-backed status records for long-running work.
//!
//! A socket is created by the code doing the work, updated as it goes, and
//! finalized exactly once (successful, error or canceled; deletion may
//! follow any of them). Pollers rebuild it from disk by id.

pub mod document;
pub mod model;
pub mod record;
pub mod safe;
pub mod status;
pub mod store;

pub use model::{Confirmation, JobResult, Progress, SocketData};
pub use record::{PROTECTED_KEYS, Socket};
pub use status::SocketStatus;
pub use store::{SocketStore, random_str, sanitize_id};
