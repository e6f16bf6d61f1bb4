//! igsave - local API server and CLI around the `igcore` extraction pipeline
//!
//! # Module Structure
//!
//! - `cli`: Command-line arguments
//! - `server`: axum router consumed by the browser extension
//! - `state`: The extension's "current download" state

pub mod cli;
pub mod server;
pub mod state;

pub use server::{build_router, start_server, AppState};
pub use state::{DownloadState, StateStore};
