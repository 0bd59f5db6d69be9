//! normo-api: Client for the normo chat gateway
//!
//! This crate provides the wire types and an HTTP client for the legal-assistant
//! gateway: chat completions, conversation CRUD, health checks and cited documents.

pub mod citation;
pub mod client;
pub mod error;
pub mod types;

pub use citation::document_title;
pub use client::{ChatGateway, DEFAULT_BASE_URL, GatewayConfig, HttpGateway};
pub use error::{Error, Result};
pub use types::*;
