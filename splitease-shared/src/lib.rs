//! # SplitEase Shared Library
//!
//! Types, data access and domain helpers shared by the SplitEase API server
//! and its integration tests.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and migrations
//! - `models`: Database models (users, groups, participants, notifications, expenses)
//! - `auth`: Password hashing, JWT, request identity and group authorization
//! - `notify`: Notification templates, de-duplication and fan-out
//! - `stream`: Per-connection delivery tracking for the notification stream

pub mod auth;
pub mod db;
pub mod models;
pub mod notify;
pub mod stream;

/// Current version of the SplitEase shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
