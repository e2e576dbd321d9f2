//! Businessmap (Kanbanize) API client for businessmap-mcp.
//!
//! [`BusinessmapClient`] implements the [`businessmap_core::Gateway`] trait
//! over the Businessmap REST API v2.

mod client;
mod text;
mod types;

pub use client::BusinessmapClient;
pub use text::clean_text;
pub use types::*;

/// Path prefix of the Businessmap REST API.
pub const API_PREFIX: &str = "/api/v2";
