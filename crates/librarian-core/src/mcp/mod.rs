//! Model Context Protocol server implementation
//!
//! JSON-RPC 2.0 over stdio, targeting MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
