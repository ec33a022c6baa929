//! Tool surface of the Librarian server
//!
//! Every protocol operation is one registered tool with a JSON-schema-typed
//! input. The registry compiles each tool's schema at registration time and
//! validates call payloads before dispatch, so tools themselves only see
//! well-shaped input. Failures are returned to the caller as readable text
//! with an error flag, never as a transport fault.

use crate::errors::LibrarianError;
use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub mod documents;
pub mod structuring;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;
    async fn execute(&self, arguments: Value) -> Result<String, LibrarianError>;
}

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    schema: JSONSchema,
}

/// Registry of callable tools, preserving registration order for listings.
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) -> Result<(), LibrarianError> {
        let metadata = tool.metadata();
        let schema = JSONSchema::compile(&metadata.input_schema).map_err(|e| {
            LibrarianError::ConfigError(format!(
                "Invalid input schema for tool '{}': {}",
                metadata.name, e
            ))
        })?;

        if !self.tools.contains_key(&metadata.name) {
            self.order.push(metadata.name.clone());
        }
        self.tools
            .insert(metadata.name.clone(), RegisteredTool { tool, schema });
        Ok(())
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| entry.tool.clone())
    }

    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|entry| entry.tool.metadata())
            .collect()
    }

    /// Validate a call payload against the tool's compiled input schema.
    pub fn validate_input(&self, name: &str, arguments: &Value) -> Result<(), LibrarianError> {
        let Some(entry) = self.tools.get(name) else {
            return Err(LibrarianError::ToolError {
                tool_name: name.to_string(),
                message: "Unknown tool".to_string(),
            });
        };

        if let Err(errors) = entry.schema.validate(arguments) {
            let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(LibrarianError::ToolError {
                tool_name: name.to_string(),
                message: format!("Input validation failed: {}", messages.join("; ")),
            });
        }
        Ok(())
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull a required string argument out of a tool payload.
pub(crate) fn required_str<'a>(
    arguments: &'a Value,
    tool_name: &str,
    key: &str,
) -> Result<&'a str, LibrarianError> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| LibrarianError::ToolError {
            tool_name: tool_name.to_string(),
            message: format!("Missing or invalid '{}' parameter", key),
        })
}

/// Optional string-array argument, defaulting to empty.
pub(crate) fn string_array(arguments: &Value, key: &str) -> Vec<String> {
    arguments
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
