//! JSON-RPC tool server for Businessmap.
//!
//! This crate exposes Businessmap card operations as named tools behind the
//! `mcp.list_tools` / `mcp.invoke_tool` methods, served over stdio or SSE.

pub mod dispatcher;
pub mod guard;
pub mod protocol;
pub mod registry;
pub mod sse;
pub mod tools;
pub mod transport;

#[cfg(test)]
mod testing;

pub use dispatcher::Dispatcher;
pub use guard::ReadOnlyGateway;
pub use registry::{ToolDescriptor, ToolRegistry};
pub use sse::ClientRegistry;
pub use tools::build_registry;
pub use transport::StdioTransport;
