//! Domain model: items, lists, users. Validation and in-list mutation rules
//! live here, independent of how documents are stored.

use crate::error::{ConstraintViolation, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_ITEM_NAME_LEN: usize = 200;
pub const MAX_NOTES_LEN: usize = 500;
pub const MAX_LIST_NAME_LEN: usize = 100;
pub const DEFAULT_LIST_NAME: &str = "My Shopping List";

/// A single entry on a shopping list.
///
/// `unit`, `category` and `notes` are free-form; empty means unset. Name
/// comparisons are case-insensitive but the stored casing is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    /// Opaque identifier, generated at creation
    pub id: Uuid,
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub checked: bool,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub checked_at: Option<DateTime<Utc>>,
}

impl ShoppingItem {
    /// Build and validate a new unchecked item. Inputs are trimmed before
    /// validation, matching what callers type into a chat box.
    pub fn new(
        name: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
        category: impl Into<String>,
        notes: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let item = Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            quantity,
            unit: unit.into().trim().to_string(),
            category: category.into().trim().to_string(),
            notes: notes.into().trim().to_string(),
            checked: false,
            added_at: Utc::now(),
            checked_at: None,
        };
        item.validate()?;
        Ok(item)
    }

    /// Check every field constraint, reporting all violations at once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        if self.name.trim().is_empty() {
            violations.push(ConstraintViolation::NameEmpty);
        } else if self.name.chars().count() > MAX_ITEM_NAME_LEN {
            violations.push(ConstraintViolation::NameTooLong {
                len: self.name.chars().count(),
                max: MAX_ITEM_NAME_LEN,
            });
        }

        if self.quantity < 0.0 {
            violations.push(ConstraintViolation::QuantityNegative {
                value: self.quantity,
            });
        }

        if self.notes.chars().count() > MAX_NOTES_LEN {
            violations.push(ConstraintViolation::NotesTooLong {
                len: self.notes.chars().count(),
                max: MAX_NOTES_LEN,
            });
        }

        ValidationError::check(violations)
    }

    /// Mark as purchased. Idempotent: re-checking refreshes `checked_at`.
    pub fn mark_checked(&mut self) {
        self.checked = true;
        self.checked_at = Some(Utc::now());
    }

    /// Mark as not purchased, clearing the purchase timestamp.
    pub fn mark_unchecked(&mut self) {
        self.checked = false;
        self.checked_at = None;
    }

    fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// A user's shopping list. One list per owner; items keep insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<ShoppingItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShoppingList {
    /// A fresh, empty list with the default display name.
    pub fn new(owner_id: impl Into<String>) -> Result<Self, ValidationError> {
        let now = Utc::now();
        let list = Self {
            owner_id: owner_id.into(),
            name: DEFAULT_LIST_NAME.to_string(),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        list.validate()?;
        Ok(list)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        if self.owner_id.trim().is_empty() {
            violations.push(ConstraintViolation::OwnerIdEmpty);
        }

        if self.name.trim().is_empty() {
            violations.push(ConstraintViolation::ListNameEmpty);
        } else if self.name.chars().count() > MAX_LIST_NAME_LEN {
            violations.push(ConstraintViolation::ListNameTooLong {
                len: self.name.chars().count(),
                max: MAX_LIST_NAME_LEN,
            });
        }

        ValidationError::check(violations)
    }

    /// Validate and append. Duplicate names are allowed; name-based lookups
    /// only ever see the first match.
    pub fn add_item(&mut self, item: ShoppingItem) -> Result<(), ValidationError> {
        item.validate()?;
        self.items.push(item);
        self.touch();
        Ok(())
    }

    /// Remove the first item whose name matches case-insensitively.
    /// Returns the removed item, or `None` as the not-found signal.
    pub fn remove_item(&mut self, name: &str) -> Option<ShoppingItem> {
        let idx = self.items.iter().position(|i| i.name_matches(name))?;
        let removed = self.items.remove(idx);
        self.touch();
        Some(removed)
    }

    /// First case-insensitive match, if any.
    pub fn find_item(&self, name: &str) -> Option<&ShoppingItem> {
        self.items.iter().find(|i| i.name_matches(name))
    }

    pub fn find_item_mut(&mut self, name: &str) -> Option<&mut ShoppingItem> {
        self.items.iter_mut().find(|i| i.name_matches(name))
    }

    /// Order-preserving snapshot of the items still to buy.
    pub fn unchecked_items(&self) -> Vec<ShoppingItem> {
        self.items.iter().filter(|i| !i.checked).cloned().collect()
    }

    /// Order-preserving snapshot of the purchased items.
    pub fn checked_items(&self) -> Vec<ShoppingItem> {
        self.items.iter().filter(|i| i.checked).cloned().collect()
    }

    /// Drop every checked item, returning how many were removed.
    pub fn clear_checked_items(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|i| !i.checked);
        let removed = before - self.items.len();
        if removed > 0 {
            self.touch();
        }
        removed
    }

    /// Empty the list unconditionally, returning how many items it held.
    pub fn clear_all_items(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        if removed > 0 {
            self.touch();
        }
        removed
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// User record keyed by the caller identity the assistant host supplies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub external_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New user with a display name derived from the caller id.
    pub fn new(external_id: impl Into<String>) -> Result<Self, ValidationError> {
        let external_id = external_id.into();
        let short: String = external_id.chars().take(8).collect();
        let now = Utc::now();
        let user = Self {
            external_id,
            display_name: format!("User-{short}"),
            email: None,
            created_at: now,
            updated_at: now,
        };
        user.validate()?;
        Ok(user)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        if self.external_id.trim().is_empty() {
            violations.push(ConstraintViolation::ExternalIdEmpty);
        }

        if let Some(email) = &self.email {
            if !is_well_formed_email(email) {
                violations.push(ConstraintViolation::EmailMalformed {
                    value: email.clone(),
                });
            }
        }

        ValidationError::check(violations)
    }
}

/// Syntactic well-formedness only: one `@`, non-empty local part, a domain
/// with a dot in it, no whitespace. Deliverability is not our problem.
fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.split_once('.') {
        Some((host, rest)) => !host.is_empty() && !rest.is_empty(),
        None => false,
    }
}
