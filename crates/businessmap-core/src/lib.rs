//! Core types, gateway trait, and error handling for businessmap-mcp.
//!
//! This crate provides the domain model shared by the Businessmap API client,
//! the tool server, and the command-line entry point.

pub mod config;
pub mod error;
pub mod gateway;
pub mod types;

pub use config::{BusinessmapConfig, Config, ServerConfig, Transport};
pub use error::{Error, Result};
pub use gateway::Gateway;
pub use types::{Board, Card, Comment, CreateCardInput, SearchQuery, UpdateCardInput};
