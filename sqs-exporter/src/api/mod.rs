//! HTTP API module.
//!
//! Serves the Prometheus scrape endpoint and the health endpoint.

pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
