//! Null-tolerant socket operations.
//!
//! Orchestration code often holds an `Option<Socket>` (tracking may be
//! disabled for a run). These functions do nothing for `None` and always
//! persist for `Some`, so call sites need no branching.
//!
//! ```no_run
//! # use job_socket::socket::{safe, SocketStore};
//! # fn run(store: &SocketStore, tracked: bool) -> Result<(), job_socket::error::SocketError> {
//! let mut socket = tracked.then(|| store.create(Some("import"), None));
//! safe::socket_start(socket.as_mut(), Some("Import"), Some("Reading rows"))?;
//! safe::socket_progress(socket.as_mut(), true, 100, 0)?;
//! safe::socket_progress_increase(socket.as_mut(), 10)?;
//! safe::socket_successful(socket.as_mut(), None, None, None)?;
//! # Ok(())
//! # }
//! ```

use serde_json::Value;

use super::record::Socket;
use super::status::SocketStatus;
use crate::error::SocketError;

/// Re-read the socket from disk.
pub fn socket_refresh(socket: Option<&mut Socket>) -> Result<(), SocketError> {
    if let Some(socket) = socket {
        socket.refresh()?;
    }
    Ok(())
}

/// Set and save the status.
pub fn socket_status(socket: Option<&mut Socket>, status: SocketStatus) -> Result<(), SocketError> {
    if let Some(socket) = socket {
        socket.set_status(status, true)?;
    }
    Ok(())
}

/// `false` when there is no socket.
pub fn socket_is_inactive(socket: Option<&Socket>) -> bool {
    socket.is_some_and(Socket::is_inactive)
}

/// `false` when there is no socket.
pub fn socket_is_active(socket: Option<&Socket>) -> bool {
    socket.is_some_and(Socket::is_active)
}

/// Start with an optional title and message, saved.
pub fn socket_start(
    socket: Option<&mut Socket>,
    title: Option<&str>,
    message: Option<&str>,
) -> Result<(), SocketError> {
    if let Some(socket) = socket {
        socket.start(title, message, true)?;
    }
    Ok(())
}

/// Returns whether the transition happened.
pub fn socket_successful(
    socket: Option<&mut Socket>,
    message: Option<&str>,
    data: Option<Value>,
    files: Option<Vec<String>>,
) -> Result<bool, SocketError> {
    match socket {
        Some(socket) => socket.successful(message, data, files),
        None => Ok(false),
    }
}

pub fn socket_is_successful(socket: Option<&Socket>) -> bool {
    socket.is_some_and(Socket::is_successful)
}

/// Returns whether the transition happened.
pub fn socket_error(
    socket: Option<&mut Socket>,
    message: &str,
    data: Option<Value>,
) -> Result<bool, SocketError> {
    match socket {
        Some(socket) => socket.error(Some(message), data),
        None => Ok(false),
    }
}

pub fn socket_has_error(socket: Option<&Socket>) -> bool {
    socket.is_some_and(Socket::has_error)
}

/// Returns whether the transition happened.
pub fn socket_cancel(
    socket: Option<&mut Socket>,
    message: Option<&str>,
    data: Option<Value>,
) -> Result<bool, SocketError> {
    match socket {
        Some(socket) => socket.cancel(message, data),
        None => Ok(false),
    }
}

pub fn socket_is_canceled(socket: Option<&Socket>) -> bool {
    socket.is_some_and(Socket::is_canceled)
}

/// Returns whether the transition happened.
pub fn socket_delete(
    socket: Option<&mut Socket>,
    message: Option<&str>,
    data: Option<Value>,
) -> Result<bool, SocketError> {
    match socket {
        Some(socket) => socket.delete(message, data),
        None => Ok(false),
    }
}

pub fn socket_is_deleted(socket: Option<&Socket>) -> bool {
    socket.is_some_and(Socket::is_deleted)
}

/// Ask for confirmation and move to waiting, saved.
pub fn socket_confirmation(socket: Option<&mut Socket>, message: &str) -> Result<(), SocketError> {
    if let Some(socket) = socket {
        socket.confirmation(message)?;
    }
    Ok(())
}

pub fn socket_title(socket: Option<&mut Socket>, title: &str) -> Result<(), SocketError> {
    if let Some(socket) = socket {
        socket.set("title", title, true)?;
    }
    Ok(())
}

pub fn socket_message(socket: Option<&mut Socket>, message: &str) -> Result<(), SocketError> {
    if let Some(socket) = socket {
        socket.set("message", message, true)?;
    }
    Ok(())
}

/// Configure the progress bar, saved. Callers without a known maximum pass
/// `-1`; a fresh bar starts at `0`.
pub fn socket_progress(
    socket: Option<&mut Socket>,
    enabled: bool,
    maximum: i64,
    position: i64,
) -> Result<(), SocketError> {
    if let Some(socket) = socket {
        socket.progress(enabled, maximum, position)?;
    }
    Ok(())
}

pub fn socket_progress_increase(socket: Option<&mut Socket>, step: i64) -> Result<(), SocketError> {
    if let Some(socket) = socket {
        socket.progress_increase(step)?;
    }
    Ok(())
}

pub fn socket_progress_position(
    socket: Option<&mut Socket>,
    position: i64,
) -> Result<(), SocketError> {
    if let Some(socket) = socket {
        socket.progress_position(position)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SocketConfig;
    use crate::socket::SocketStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store() -> (SocketStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SocketStore::new(SocketConfig::with_data_root(dir.path()));
        (store, dir)
    }

    #[test]
    fn absent_socket_is_a_noop() {
        assert!(socket_refresh(None).is_ok());
        assert!(socket_status(None, SocketStatus::New).is_ok());
        assert!(socket_start(None, Some("t"), Some("m")).is_ok());
        assert!(!socket_successful(None, None, None, None).unwrap());
        assert!(!socket_error(None, "boom", None).unwrap());
        assert!(!socket_cancel(None, None, None).unwrap());
        assert!(!socket_delete(None, None, None).unwrap());
        assert!(socket_confirmation(None, "sure?").is_ok());
        assert!(socket_title(None, "t").is_ok());
        assert!(socket_message(None, "m").is_ok());
        assert!(socket_progress(None, true, 10, 0).is_ok());
        assert!(socket_progress_increase(None, 1).is_ok());
        assert!(socket_progress_position(None, 5).is_ok());
    }

    #[test]
    fn absent_socket_predicates_are_false() {
        assert!(!socket_is_active(None));
        assert!(!socket_is_inactive(None));
        assert!(!socket_is_successful(None));
        assert!(!socket_has_error(None));
        assert!(!socket_is_canceled(None));
        assert!(!socket_is_deleted(None));
    }

    #[test]
    fn present_socket_mutations_persist() {
        let (store, _dir) = test_store();
        let mut socket = Some(store.create(None, Some("safe")));

        socket_status(socket.as_mut(), SocketStatus::New).unwrap();
        assert_eq!(store.load_content("safe").unwrap().unwrap()["status"], json!("new"));

        socket_start(socket.as_mut(), Some("new title"), Some("new message")).unwrap();
        let persisted = store.load_content("safe").unwrap().unwrap();
        assert_eq!(persisted["title"], json!("new title"));
        assert_eq!(persisted["message"], json!("new message"));
        assert!(!persisted["started"].is_null());

        socket_title(socket.as_mut(), "renamed").unwrap();
        socket_message(socket.as_mut(), "halfway").unwrap();
        socket_progress(socket.as_mut(), true, 10, 0).unwrap();
        socket_progress_increase(socket.as_mut(), 4).unwrap();
        let persisted = store.load_content("safe").unwrap().unwrap();
        assert_eq!(persisted["title"], json!("renamed"));
        assert_eq!(persisted["message"], json!("halfway"));
        assert_eq!(persisted["progress"]["position"], json!(4));

        socket_progress_position(socket.as_mut(), 8).unwrap();
        socket_confirmation(socket.as_mut(), "Continue?").unwrap();
        let persisted = store.load_content("safe").unwrap().unwrap();
        assert_eq!(persisted["progress"]["position"], json!(8));
        assert_eq!(persisted["status"], json!("waiting"));

        assert!(socket_is_active(socket.as_ref()));
        assert!(socket_error(socket.as_mut(), "boom", Some(json!({"line": 3}))).unwrap());
        assert!(socket_has_error(socket.as_ref()));
        assert!(socket_is_inactive(socket.as_ref()));
        assert!(!socket_cancel(socket.as_mut(), None, None).unwrap());
        assert!(!socket_is_canceled(socket.as_ref()));

        assert!(socket_delete(socket.as_mut(), None, None).unwrap());
        assert!(socket_is_deleted(socket.as_ref()));
        assert!(!socket_has_error(socket.as_ref()));
    }

    #[test]
    fn refresh_through_safe_wrapper() {
        let (store, _dir) = test_store();
        let mut writer = store.make(&serde_json::json!({"id": "polled"})).unwrap();
        let mut reader = store.create_from_id("polled").ok().flatten();

        socket_successful(Some(&mut writer), Some("done"), None, None).unwrap();
        assert!(socket_is_successful(reader.as_ref()));
        socket_refresh(reader.as_mut()).unwrap();
        assert_eq!(
            reader.unwrap().data().result.message.as_deref(),
            Some("done")
        );
    }
}
