use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// Main error type for Pantry operations
#[derive(Error, Debug, Diagnostic)]
pub enum PantryError {
    #[error("Database error")]
    #[diagnostic(help("Check store connection and endpoint configuration"))]
    Database(#[from] DatabaseError),

    #[error("Configuration error")]
    #[diagnostic(help("Check your configuration file and environment variables"))]
    Config(#[from] ConfigError),

    #[error("Validation error")]
    #[diagnostic(help("Check input format and constraints"))]
    Validation(#[from] ValidationError),

    #[error("User not found: {external_id}")]
    #[diagnostic(code(pantry::user_not_found))]
    UserNotFound { external_id: String },

    #[error("No shopping list found for owner {owner_id}")]
    #[diagnostic(code(pantry::list_not_found))]
    ListNotFound { owner_id: String },

    #[error("Item '{name}' not found in shopping list")]
    #[diagnostic(code(pantry::item_not_found))]
    ItemNotFound { name: String },
}

/// Store-specific errors
#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("Failed to connect to store at {endpoint}")]
    #[diagnostic(
        code(pantry::db::connection_failed),
        help("Ensure the store endpoint is reachable and the scheme is supported")
    )]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: surrealdb::Error,
    },

    #[error("Timed out after {timeout_ms}ms connecting to store at {endpoint}")]
    #[diagnostic(
        code(pantry::db::connect_timeout),
        help("Raise CONNECT_TIMEOUT_MS or check the endpoint")
    )]
    ConnectTimeout { endpoint: String, timeout_ms: u64 },

    #[error("Store did not become ready within {timeout_ms}ms")]
    #[diagnostic(
        code(pantry::db::not_ready),
        help("The server accepted the connection but failed its health probe")
    )]
    NotReady { timeout_ms: u64 },

    #[error("Query failed: {context}")]
    #[diagnostic(code(pantry::db::query_failed))]
    QueryFailed {
        context: String,
        #[source]
        source: surrealdb::Error,
    },

    #[error("Record '{key}' already exists in table '{table}'")]
    #[diagnostic(code(pantry::db::already_exists))]
    AlreadyExists { table: String, key: String },

    #[error("Store error: {0}")]
    #[diagnostic()]
    Other(String),
}

impl DatabaseError {
    /// Wrap a driver error, picking out the duplicate-record case so callers
    /// can react to store-level uniqueness violations.
    pub fn from_query(context: impl Into<String>, source: surrealdb::Error) -> Self {
        if let surrealdb::Error::Db(surrealdb::error::Db::RecordExists { thing }) = &source {
            let thing = thing.to_string();
            let (table, key) = thing
                .split_once(':')
                .map(|(t, k)| (t.to_string(), k.to_string()))
                .unwrap_or_else(|| (String::new(), thing.clone()));
            return DatabaseError::AlreadyExists { table, key };
        }
        DatabaseError::QueryFailed {
            context: context.into(),
            source,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Required configuration value '{field}' is not set")]
    #[diagnostic(
        code(pantry::config::missing),
        help("Set it in the config file or via the environment")
    )]
    MissingRequired { field: String },

    #[error("Invalid configuration: {field}: {reason}")]
    #[diagnostic(
        code(pantry::config::invalid),
        help("Check configuration format and required fields")
    )]
    Invalid { field: String, reason: String },

    #[error("Configuration file not found at {path}")]
    #[diagnostic(
        code(pantry::config::not_found),
        help("Create a config file or use environment variables")
    )]
    NotFound { path: String },

    #[error("Failed to parse configuration")]
    #[diagnostic(
        code(pantry::config::parse_failed),
        help("Check TOML syntax and field types")
    )]
    ParseFailed {
        #[source]
        source: toml::de::Error,
    },
}

/// A single violated field constraint.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintViolation {
    #[error("item name cannot be empty")]
    NameEmpty,

    #[error("item name is too long ({len} characters, max {max})")]
    NameTooLong { len: usize, max: usize },

    #[error("quantity cannot be negative (got {value})")]
    QuantityNegative { value: f64 },

    #[error("notes are too long ({len} characters, max {max})")]
    NotesTooLong { len: usize, max: usize },

    #[error("list name cannot be empty")]
    ListNameEmpty,

    #[error("list name is too long ({len} characters, max {max})")]
    ListNameTooLong { len: usize, max: usize },

    #[error("owner id cannot be empty")]
    OwnerIdEmpty,

    #[error("user id cannot be empty")]
    ExternalIdEmpty,

    #[error("email address '{value}' is not well-formed")]
    EmailMalformed { value: String },
}

impl ConstraintViolation {
    /// The field the constraint applies to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NameEmpty | Self::NameTooLong { .. } => "name",
            Self::QuantityNegative { .. } => "quantity",
            Self::NotesTooLong { .. } => "notes",
            Self::ListNameEmpty | Self::ListNameTooLong { .. } => "list_name",
            Self::OwnerIdEmpty => "owner_id",
            Self::ExternalIdEmpty => "external_id",
            Self::EmailMalformed { .. } => "email",
        }
    }
}

/// Validation failure carrying every violated constraint, not just the first.
#[derive(Debug, Diagnostic, Clone, PartialEq)]
#[diagnostic(code(pantry::validation), help("Fix the listed fields and retry"))]
pub struct ValidationError {
    pub violations: Vec<ConstraintViolation>,
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(violations: Vec<ConstraintViolation>) -> Self {
        Self { violations }
    }

    /// Ok when no constraints were violated, otherwise the full list.
    pub fn check(violations: Vec<ConstraintViolation>) -> std::result::Result<(), ValidationError> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Self::new(violations))
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}", joined)
    }
}

/// Type alias for Results in Pantry
pub type Result<T> = std::result::Result<T, PantryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn validation_error_lists_every_violation() {
        let err = ValidationError::new(vec![
            ConstraintViolation::NameEmpty,
            ConstraintViolation::QuantityNegative { value: -2.0 },
        ]);
        let text = err.to_string();
        assert!(text.contains("name cannot be empty"));
        assert!(text.contains("quantity cannot be negative"));
        assert_eq!(err.violations.len(), 2);
    }

    #[test]
    fn check_passes_empty() {
        assert!(ValidationError::check(vec![]).is_ok());
    }

    #[test]
    fn violation_fields() {
        assert_eq!(ConstraintViolation::NameEmpty.field(), "name");
        assert_eq!(
            ConstraintViolation::EmailMalformed {
                value: "x".to_string()
            }
            .field(),
            "email"
        );
    }
}
