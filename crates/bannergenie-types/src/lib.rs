//! Shared domain types for BannerGenie.
//!
//! Templates and their layers, per-layer modifications, render jobs, the
//! error taxonomy and the configuration file shape. No I/O lives here --
//! only serde, uuid, chrono and thiserror.

pub mod config;
pub mod error;
pub mod llm;
pub mod modification;
pub mod render;
pub mod template;
