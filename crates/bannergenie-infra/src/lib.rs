//! Infrastructure layer for BannerGenie.
//!
//! Implements the ports defined in `bannergenie-core` against real services:
//! the Bannerbear render API, the freeimage.host upload API and
//! OpenAI-compatible chat completion endpoints. Also loads configuration
//! and credentials.

pub mod bannerbear;
pub mod config;
pub mod credentials;
pub mod filesystem;
pub mod freeimage;
pub mod llm;
