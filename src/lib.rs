//! Backend for the CCNA study tracker and its video tutorial pages.
//!
//! Videos, comments and the tracker board live in flat JSON files under a
//! data directory; [`server::build_router`] exposes them over a small REST
//! API next to the static front-end.

pub mod board;
pub mod cli;
pub mod commands;
pub mod error;
pub mod metadata;
pub mod routes;
pub mod runtime;
pub mod server;
pub mod storage;
pub mod types;

pub use routes::{AppState, SharedState};
pub use server::{build_router, serve};
pub use storage::Store;
