//! MCP server and tools

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod server;
pub mod tools;

pub use server::PantryMcpServer;
pub use tools::ShoppingTools;

/// MCP transport type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpTransport {
    Stdio,
    Http,
}

impl fmt::Display for McpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            McpTransport::Stdio => write!(f, "stdio"),
            McpTransport::Http => write!(f, "http"),
        }
    }
}

impl FromStr for McpTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdio" => Ok(McpTransport::Stdio),
            "http" => Ok(McpTransport::Http),
            _ => Err(format!("Unknown MCP transport: {}", s)),
        }
    }
}

fn default_quantity() -> f64 {
    1.0
}

// Tool request types

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct AddItemRequest {
    /// Name of the item to add
    pub name: String,
    /// Quantity of the item (default: 1.0)
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    /// Unit of measurement, e.g. 'kg', 'liters', 'pieces'
    #[serde(default)]
    pub unit: String,
    /// Category of the item, e.g. 'dairy', 'produce', 'meat'
    #[serde(default)]
    pub category: String,
    /// Additional notes about the item
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct RemoveItemRequest {
    /// Name of the item to remove (case-insensitive)
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct UpdateItemRequest {
    /// Name of the item to update (case-insensitive)
    pub name: String,
    /// New quantity (optional)
    pub quantity: Option<f64>,
    /// New unit (optional)
    pub unit: Option<String>,
    /// New category (optional)
    pub category: Option<String>,
    /// New notes (optional)
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct CheckItemRequest {
    /// Name of the item to mark as purchased (case-insensitive)
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct UncheckItemRequest {
    /// Name of the item to mark as not purchased (case-insensitive)
    pub name: String,
}

/// Request type for tools that take no parameters
#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct EmptyRequest {}
