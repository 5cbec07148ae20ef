//! Job Socket: file-backed status records for long-running jobs.

pub mod config;
pub mod error;
pub mod http;
pub mod i18n;
pub mod socket;
