//! Tool implementations. This is the error boundary: every typed error is
//! converted to a user-safe text reply here, and the underlying detail goes
//! to the logs, never back to the caller.

use crate::{
    db::Store,
    error::PantryError,
    identity::IdentityChain,
    service::{ItemPatch, ShoppingListService, UserService},
};
use rmcp::model::{CallToolResult, Content};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{
    AddItemRequest, CheckItemRequest, RemoveItemRequest, UncheckItemRequest, UpdateItemRequest,
};

/// Shopping-list tools handler
#[derive(Clone)]
pub struct ShoppingTools {
    pub users: UserService,
    pub lists: ShoppingListService,
    pub identity: Arc<IdentityChain>,
    store: Arc<Store>,
}

impl ShoppingTools {
    pub fn new(store: Arc<Store>, identity: IdentityChain) -> Self {
        Self {
            users: UserService::new(Arc::clone(&store)),
            lists: ShoppingListService::new(Arc::clone(&store)),
            identity: Arc::new(identity),
            store,
        }
    }

    pub async fn add_item(&self, owner_id: &str, params: AddItemRequest) -> CallToolResult {
        info!(owner_id, item = %params.name, "add_item called");

        if let Err(e) = self.users.get_or_create_user(owner_id).await {
            error!(owner_id, error = ?e, "add_item: user lookup failed");
            return reply(error_reply("add item", None, &e));
        }

        match self
            .lists
            .add_item(
                owner_id,
                &params.name,
                params.quantity,
                &params.unit,
                &params.category,
                &params.notes,
            )
            .await
        {
            Ok((_, item)) => {
                let qty = format!("{} {}", item.quantity, item.unit);
                reply(format!(
                    "Added '{}' ({}) to your shopping list.",
                    item.name,
                    qty.trim()
                ))
            }
            Err(e) => {
                error!(owner_id, error = ?e, "add_item failed");
                reply(error_reply("add item", Some(&params.name), &e))
            }
        }
    }

    pub async fn remove_item(&self, owner_id: &str, params: RemoveItemRequest) -> CallToolResult {
        info!(owner_id, item = %params.name, "remove_item called");

        match self.lists.remove_item(owner_id, &params.name).await {
            Ok((_, removed)) => reply(format!(
                "Removed '{}' from your shopping list.",
                removed.name
            )),
            Err(e) => {
                warn_or_error(owner_id, "remove_item", &e);
                reply(error_reply("remove item", Some(&params.name), &e))
            }
        }
    }

    pub async fn update_item(&self, owner_id: &str, params: UpdateItemRequest) -> CallToolResult {
        info!(owner_id, item = %params.name, "update_item called");

        let patch = ItemPatch {
            quantity: params.quantity,
            unit: params.unit,
            category: params.category,
            notes: params.notes,
        };
        match self.lists.update_item(owner_id, &params.name, patch).await {
            Ok((_, updated)) => reply(format!(
                "Updated '{}' in your shopping list.",
                updated.name
            )),
            Err(e) => {
                warn_or_error(owner_id, "update_item", &e);
                reply(error_reply("update item", Some(&params.name), &e))
            }
        }
    }

    pub async fn check_item(&self, owner_id: &str, params: CheckItemRequest) -> CallToolResult {
        info!(owner_id, item = %params.name, "check_item called");

        match self.lists.check_item(owner_id, &params.name).await {
            Ok((_, item)) => reply(format!("Marked '{}' as purchased.", item.name)),
            Err(e) => {
                warn_or_error(owner_id, "check_item", &e);
                reply(error_reply("check item", Some(&params.name), &e))
            }
        }
    }

    pub async fn uncheck_item(&self, owner_id: &str, params: UncheckItemRequest) -> CallToolResult {
        info!(owner_id, item = %params.name, "uncheck_item called");

        match self.lists.uncheck_item(owner_id, &params.name).await {
            Ok((_, item)) => reply(format!("Unmarked '{}'.", item.name)),
            Err(e) => {
                warn_or_error(owner_id, "uncheck_item", &e);
                reply(error_reply("uncheck item", Some(&params.name), &e))
            }
        }
    }

    pub async fn get_shopping_list(&self, owner_id: &str) -> CallToolResult {
        info!(owner_id, "get_shopping_list called");

        if let Err(e) = self.users.get_or_create_user(owner_id).await {
            error!(owner_id, error = ?e, "get_shopping_list: user lookup failed");
            return reply(error_reply("retrieve shopping list", None, &e));
        }

        match self.lists.get_shopping_list(owner_id).await {
            Ok(list) => reply(ShoppingListService::format_shopping_list(&list)),
            Err(e) => {
                error!(owner_id, error = ?e, "get_shopping_list failed");
                reply(error_reply("retrieve shopping list", None, &e))
            }
        }
    }

    pub async fn clear_checked_items(&self, owner_id: &str) -> CallToolResult {
        info!(owner_id, "clear_checked_items called");

        match self.lists.clear_checked_items(owner_id).await {
            Ok((_, count)) => reply(format!(
                "Removed {} purchased item(s) from your shopping list.",
                count
            )),
            Err(e) => {
                error!(owner_id, error = ?e, "clear_checked_items failed");
                reply(error_reply("clear items", None, &e))
            }
        }
    }

    pub async fn clear_all_items(&self, owner_id: &str) -> CallToolResult {
        info!(owner_id, "clear_all_items called");

        match self.lists.clear_all_items(owner_id).await {
            Ok(_) => reply("Cleared all items from your shopping list.".to_string()),
            Err(e) => {
                error!(owner_id, error = ?e, "clear_all_items failed");
                reply(error_reply("clear items", None, &e))
            }
        }
    }

    pub async fn get_my_profile(&self, owner_id: &str) -> CallToolResult {
        info!(owner_id, "get_my_profile called");

        let user = match self.users.get_or_create_user(owner_id).await {
            Ok(user) => user,
            Err(e) => {
                error!(owner_id, error = ?e, "get_my_profile failed");
                return reply(error_reply("retrieve profile", None, &e));
            }
        };

        let store_status = if self.store.is_live().await {
            "Connected ✓"
        } else {
            "Unavailable"
        };

        let mut out = "**Your Shopping List Profile:**\n\n".to_string();
        out.push_str(&format!("• Profile Name: `{}`\n", user.display_name));
        out.push_str(&format!("• Caller Id: `{}`\n", user.external_id));
        out.push_str(&format!(
            "• Email: {}\n",
            user.email.as_deref().unwrap_or("not set")
        ));
        out.push_str(&format!(
            "• Member Since: {}\n",
            user.created_at.format("%Y-%m-%d")
        ));
        out.push_str(&format!("• Store: {}\n\n", store_status));
        out.push_str("This shopping list is unique to your profile.");

        reply(out)
    }
}

fn reply(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

/// Not-found is the caller's mistake; everything else is ours.
fn warn_or_error(owner_id: &str, tool: &str, err: &PantryError) {
    match err {
        PantryError::ItemNotFound { .. }
        | PantryError::ListNotFound { .. }
        | PantryError::Validation(_) => {
            warn!(owner_id, tool, error = %err, "tool rejected request");
        }
        _ => error!(owner_id, tool, error = ?err, "tool failed"),
    }
}

/// Convert a typed error into the text a caller is allowed to see. Store
/// and configuration details stay in the logs.
fn error_reply(action: &str, item_name: Option<&str>, err: &PantryError) -> String {
    match err {
        PantryError::Validation(violations) => format!("Error: {}", violations),
        PantryError::ItemNotFound { name } => {
            format!("Could not find '{}' in your shopping list.", name)
        }
        PantryError::ListNotFound { .. } => match item_name {
            Some(name) => format!("Could not find '{}' in your shopping list.", name),
            None => "No shopping list found.".to_string(),
        },
        PantryError::Database(_) => {
            format!("Database error: Unable to {}. Please try again.", action)
        }
        _ => format!("Error: Unable to {}. Please try again.", action),
    }
}
