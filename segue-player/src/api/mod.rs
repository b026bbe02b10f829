//! HTTP control surface
//!
//! REST endpoints for transport and queue control plus an SSE stream of
//! player events.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{build_router, run, AppContext};
