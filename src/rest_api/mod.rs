//! REST API module
//!
//! Thin HTTP front door over the orchestrator: the forecast endpoint, a grid
//! status probe, health and metrics.

mod dto;
mod handlers;
mod server;

pub use server::{router, run_server};
