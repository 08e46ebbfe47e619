//! Bannerbear render API client.
//!
//! Implements `RenderClient` from `bannergenie-core` over the v2 REST API.

pub mod client;
pub mod types;

pub use client::BannerbearClient;
