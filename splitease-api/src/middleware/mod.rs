/// Middleware modules for the API server
///
/// Authentication lives in `app.rs` next to the router because it needs the
/// application state.

pub mod security;
