//! File Upload Server Library
//!
//! Receives whole-file uploads over HTTP PUT and persists them under a
//! storage root with a stage-then-rename protocol, so a reader never sees a
//! partially written file. The server binary is in main.rs.
//!
//! # Modules
//!
//! - `upload`: Staging, publishing, and the per-request upload coordinator
//! - `routes`: HTTP boundary mapping requests and outcomes
//! - `config`: Environment configuration

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod upload;
