//! Socket status values.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a socket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketStatus {
    /// Freshly constructed, nothing reported yet.
    #[default]
    Undefined,
    New,
    Queued,
    /// Blocked on a confirmation answer.
    Waiting,
    Running,
    Error,
    Canceled,
    Deleted,
    Successful,
}

impl SocketStatus {
    /// Statuses that leave a marker file next to the document.
    pub const TERMINAL: [SocketStatus; 4] = [
        SocketStatus::Deleted,
        SocketStatus::Error,
        SocketStatus::Canceled,
        SocketStatus::Successful,
    ];

    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Error | Self::Canceled | Self::Deleted | Self::Successful
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::New => "new",
            Self::Queued => "queued",
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Error => "error",
            Self::Canceled => "canceled",
            Self::Deleted => "deleted",
            Self::Successful => "successful",
        }
    }
}

impl std::fmt::Display for SocketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "undefined" => Self::Undefined,
            "new" => Self::New,
            "queued" => Self::Queued,
            "waiting" => Self::Waiting,
            "running" => Self::Running,
            "error" => Self::Error,
            "canceled" => Self::Canceled,
            "deleted" => Self::Deleted,
            "successful" => Self::Successful,
            other => return Err(format!("unknown socket status {other:?}")),
        })
    }
}
