pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod mcp;
pub mod models;
pub mod service;

// Re-export commonly used types
pub use config::Config;
pub use db::Store;
pub use error::{PantryError, Result};
pub use identity::{IdentityChain, RequestIdentity};
pub use models::{ShoppingItem, ShoppingList, User};
pub use service::{ItemPatch, ShoppingListService, UserService};
