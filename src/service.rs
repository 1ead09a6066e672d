//! Service layer: the single orchestration point between the tool surface,
//! the domain model, and the store. Every mutating method follows the same
//! shape: load (or create) the owner's list, mutate it in memory, write the
//! whole document back.

use crate::{
    db::Store,
    error::{PantryError, Result},
    models::{ShoppingItem, ShoppingList, User},
};
use std::sync::Arc;
use tracing::info;

/// User operations. Get-or-create is the only one there is.
#[derive(Clone)]
pub struct UserService {
    store: Arc<Store>,
}

impl UserService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn get_or_create_user(&self, external_id: &str) -> Result<User> {
        let user = self.store.get_or_create_user(external_id).await?;
        info!(external_id, "Retrieved or created user");
        Ok(user)
    }
}

/// Fields of an item a caller may change. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
}

/// Shopping list operations.
#[derive(Clone)]
pub struct ShoppingListService {
    store: Arc<Store>,
}

impl ShoppingListService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Validate, append, persist. Duplicate names are fine.
    pub async fn add_item(
        &self,
        owner_id: &str,
        name: &str,
        quantity: f64,
        unit: &str,
        category: &str,
        notes: &str,
    ) -> Result<(ShoppingList, ShoppingItem)> {
        let item = ShoppingItem::new(name, quantity, unit, category, notes)?;
        let mut list = self.store.get_or_create_shopping_list(owner_id).await?;
        list.add_item(item.clone())?;
        let list = self.store.update_shopping_list(&list).await?;

        info!(owner_id, item = %item.name, "Added item to shopping list");
        Ok((list, item))
    }

    /// Remove the first case-insensitive match for `name`.
    pub async fn remove_item(
        &self,
        owner_id: &str,
        name: &str,
    ) -> Result<(ShoppingList, ShoppingItem)> {
        let mut list = self.require_list(owner_id).await?;
        let removed =
            list.remove_item(name.trim())
                .ok_or_else(|| PantryError::ItemNotFound {
                    name: name.to_string(),
                })?;
        let list = self.store.update_shopping_list(&list).await?;

        info!(owner_id, item = %removed.name, "Removed item from shopping list");
        Ok((list, removed))
    }

    /// Apply only the supplied fields, then re-validate. The staging clone
    /// means a failed validation leaves the stored item exactly as it was.
    pub async fn update_item(
        &self,
        owner_id: &str,
        name: &str,
        patch: ItemPatch,
    ) -> Result<(ShoppingList, ShoppingItem)> {
        let mut list = self.require_list(owner_id).await?;
        let slot = list
            .find_item_mut(name.trim())
            .ok_or_else(|| PantryError::ItemNotFound {
                name: name.to_string(),
            })?;

        let mut staged = slot.clone();
        if let Some(quantity) = patch.quantity {
            staged.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            staged.unit = unit.trim().to_string();
        }
        if let Some(category) = patch.category {
            staged.category = category.trim().to_string();
        }
        if let Some(notes) = patch.notes {
            staged.notes = notes.trim().to_string();
        }
        staged.validate()?;

        *slot = staged.clone();
        list.touch();
        let list = self.store.update_shopping_list(&list).await?;

        info!(owner_id, item = %staged.name, "Updated item in shopping list");
        Ok((list, staged))
    }

    /// Mark an item purchased. Idempotent.
    pub async fn check_item(
        &self,
        owner_id: &str,
        name: &str,
    ) -> Result<(ShoppingList, ShoppingItem)> {
        let mut list = self.require_list(owner_id).await?;
        let item = list
            .find_item_mut(name.trim())
            .ok_or_else(|| PantryError::ItemNotFound {
                name: name.to_string(),
            })?;
        item.mark_checked();
        let item = item.clone();
        list.touch();
        let list = self.store.update_shopping_list(&list).await?;

        info!(owner_id, item = %item.name, "Checked item");
        Ok((list, item))
    }

    /// Mark an item not purchased, clearing its purchase timestamp.
    pub async fn uncheck_item(
        &self,
        owner_id: &str,
        name: &str,
    ) -> Result<(ShoppingList, ShoppingItem)> {
        let mut list = self.require_list(owner_id).await?;
        let item = list
            .find_item_mut(name.trim())
            .ok_or_else(|| PantryError::ItemNotFound {
                name: name.to_string(),
            })?;
        item.mark_unchecked();
        let item = item.clone();
        list.touch();
        let list = self.store.update_shopping_list(&list).await?;

        info!(owner_id, item = %item.name, "Unchecked item");
        Ok((list, item))
    }

    /// The owner's list, created empty on first sight.
    pub async fn get_shopping_list(&self, owner_id: &str) -> Result<ShoppingList> {
        let list = self.store.get_or_create_shopping_list(owner_id).await?;
        info!(owner_id, items = list.items.len(), "Retrieved shopping list");
        Ok(list)
    }

    /// Drop every purchased item, returning how many went.
    pub async fn clear_checked_items(&self, owner_id: &str) -> Result<(ShoppingList, usize)> {
        let mut list = self.store.get_or_create_shopping_list(owner_id).await?;
        let count = list.clear_checked_items();
        let list = self.store.update_shopping_list(&list).await?;

        info!(owner_id, count, "Cleared checked items");
        Ok((list, count))
    }

    /// Empty the list unconditionally; the list record itself stays.
    pub async fn clear_all_items(&self, owner_id: &str) -> Result<(ShoppingList, usize)> {
        let mut list = self.store.get_or_create_shopping_list(owner_id).await?;
        let count = list.clear_all_items();
        let list = self.store.update_shopping_list(&list).await?;

        info!(owner_id, count, "Cleared all items");
        Ok((list, count))
    }

    /// Render a list for display: unchecked first in insertion order, then
    /// purchased, then a totals line.
    pub fn format_shopping_list(list: &ShoppingList) -> String {
        if list.items.is_empty() {
            return "Your shopping list is empty.".to_string();
        }

        let unchecked = list.unchecked_items();
        let checked = list.checked_items();

        let mut out = format!("**{}**\n\n", list.name);

        if !unchecked.is_empty() {
            out.push_str("**Items to Buy:**\n");
            for item in &unchecked {
                let qty_unit = format!("{} {}", item.quantity, item.unit);
                let category = if item.category.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", item.category)
                };
                let notes = if item.notes.is_empty() {
                    String::new()
                } else {
                    format!(" - {}", item.notes)
                };
                out.push_str(&format!(
                    "• {} ({}){}{}\n",
                    item.name,
                    qty_unit.trim(),
                    category,
                    notes
                ));
            }
        }

        if !checked.is_empty() {
            out.push_str("\n**Purchased:**\n");
            for item in &checked {
                let qty_unit = format!("{} {}", item.quantity, item.unit);
                out.push_str(&format!("✓ {} ({})\n", item.name, qty_unit.trim()));
            }
        }

        out.push_str(&format!(
            "\n**Total items:** {} to buy, {} purchased",
            unchecked.len(),
            checked.len()
        ));

        out
    }

    async fn require_list(&self, owner_id: &str) -> Result<ShoppingList> {
        self.store
            .get_shopping_list(owner_id)
            .await?
            .ok_or_else(|| PantryError::ListNotFound {
                owner_id: owner_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use pretty_assertions::assert_eq;

    const OWNER: &str = "owner-1";

    async fn services() -> (ShoppingListService, UserService) {
        let config = StoreConfig {
            endpoint: "memory".to_string(),
            ..StoreConfig::default()
        };
        let store = Arc::new(Store::new(config));
        store.connect().await.unwrap();
        (
            ShoppingListService::new(Arc::clone(&store)),
            UserService::new(store),
        )
    }

    #[tokio::test]
    async fn added_item_shows_up_unchecked_with_fields() {
        let (lists, _) = services().await;
        lists
            .add_item(OWNER, "Milk", 2.0, "liters", "dairy", "semi-skimmed")
            .await
            .unwrap();

        let list = lists.get_shopping_list(OWNER).await.unwrap();
        assert_eq!(list.items.len(), 1);
        let item = &list.items[0];
        assert_eq!(item.name, "Milk");
        assert_eq!(item.quantity, 2.0);
        assert_eq!(item.unit, "liters");
        assert_eq!(item.category, "dairy");
        assert_eq!(item.notes, "semi-skimmed");
        assert!(!item.checked);
    }

    #[tokio::test]
    async fn invalid_item_is_rejected_and_nothing_is_persisted() {
        let (lists, _) = services().await;
        let err = lists
            .add_item(OWNER, "Milk", -1.0, "", "", "")
            .await
            .unwrap_err();
        assert!(matches!(err, PantryError::Validation(_)));

        let list = lists.get_shopping_list(OWNER).await.unwrap();
        assert!(list.items.is_empty());
    }

    #[tokio::test]
    async fn remove_is_case_insensitive() {
        let (lists, _) = services().await;
        lists.add_item(OWNER, "Milk", 1.0, "", "", "").await.unwrap();

        let (list, removed) = lists.remove_item(OWNER, "milk").await.unwrap();
        assert_eq!(removed.name, "Milk");
        assert!(list.items.is_empty());
    }

    #[tokio::test]
    async fn remove_unknown_item_is_a_typed_not_found() {
        let (lists, _) = services().await;
        lists.add_item(OWNER, "Milk", 1.0, "", "", "").await.unwrap();

        let err = lists.remove_item(OWNER, "bread").await.unwrap_err();
        assert!(matches!(err, PantryError::ItemNotFound { .. }));
    }

    #[tokio::test]
    async fn remove_without_a_list_is_list_not_found() {
        let (lists, _) = services().await;
        let err = lists.remove_item(OWNER, "milk").await.unwrap_err();
        assert!(matches!(err, PantryError::ListNotFound { .. }));
    }

    #[tokio::test]
    async fn update_applies_only_supplied_fields() {
        let (lists, _) = services().await;
        lists
            .add_item(OWNER, "Milk", 1.0, "liters", "dairy", "semi")
            .await
            .unwrap();

        let (_, updated) = lists
            .update_item(
                OWNER,
                "milk",
                ItemPatch {
                    quantity: Some(3.0),
                    ..ItemPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.quantity, 3.0);
        assert_eq!(updated.unit, "liters");
        assert_eq!(updated.category, "dairy");
        assert_eq!(updated.notes, "semi");
    }

    #[tokio::test]
    async fn failed_update_leaves_the_item_untouched() {
        let (lists, _) = services().await;
        lists
            .add_item(OWNER, "Milk", 1.0, "liters", "", "")
            .await
            .unwrap();

        let err = lists
            .update_item(
                OWNER,
                "milk",
                ItemPatch {
                    quantity: Some(-5.0),
                    unit: Some("crates".to_string()),
                    ..ItemPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PantryError::Validation(_)));

        let list = lists.get_shopping_list(OWNER).await.unwrap();
        let item = list.find_item("milk").unwrap();
        assert_eq!(item.quantity, 1.0);
        assert_eq!(item.unit, "liters");
    }

    #[tokio::test]
    async fn check_is_idempotent_and_uncheck_clears_timestamp() {
        let (lists, _) = services().await;
        lists.add_item(OWNER, "Milk", 1.0, "", "", "").await.unwrap();

        let (_, first) = lists.check_item(OWNER, "milk").await.unwrap();
        assert!(first.checked);
        let first_at = first.checked_at.unwrap();

        let (_, second) = lists.check_item(OWNER, "milk").await.unwrap();
        assert!(second.checked);
        assert!(second.checked_at.unwrap() >= first_at);

        let (_, unchecked) = lists.uncheck_item(OWNER, "MILK").await.unwrap();
        assert!(!unchecked.checked);
        assert!(unchecked.checked_at.is_none());
    }

    #[tokio::test]
    async fn clear_checked_counts_and_spares_unchecked() {
        let (lists, _) = services().await;
        for name in ["a", "b", "c"] {
            lists.add_item(OWNER, name, 1.0, "", "", "").await.unwrap();
        }
        lists.check_item(OWNER, "a").await.unwrap();
        lists.check_item(OWNER, "c").await.unwrap();

        let (list, count) = lists.clear_checked_items(OWNER).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].name, "b");
    }

    #[tokio::test]
    async fn clear_operations_work_without_an_existing_list() {
        let (lists, _) = services().await;
        let (_, checked) = lists.clear_checked_items(OWNER).await.unwrap();
        assert_eq!(checked, 0);
        let (_, all) = lists.clear_all_items(OWNER).await.unwrap();
        assert_eq!(all, 0);
    }

    #[tokio::test]
    async fn clear_all_empties_but_keeps_the_list_record() {
        let (lists, _) = services().await;
        lists.add_item(OWNER, "Milk", 1.0, "", "", "").await.unwrap();
        lists.add_item(OWNER, "Eggs", 12.0, "", "", "").await.unwrap();

        let (list, count) = lists.clear_all_items(OWNER).await.unwrap();
        assert_eq!(count, 2);
        assert!(list.items.is_empty());

        // the record survives as an empty list
        let list = lists.get_shopping_list(OWNER).await.unwrap();
        assert!(list.items.is_empty());
    }

    #[tokio::test]
    async fn full_buy_cycle_example() {
        let (lists, _) = services().await;
        lists
            .add_item(OWNER, "Milk", 2.0, "liters", "dairy", "")
            .await
            .unwrap();

        let list = lists.get_shopping_list(OWNER).await.unwrap();
        let rendered = ShoppingListService::format_shopping_list(&list);
        assert!(rendered.contains("• Milk (2 liters) [dairy]"));
        assert!(rendered.contains("1 to buy, 0 purchased"));

        lists.check_item(OWNER, "milk").await.unwrap();
        let list = lists.get_shopping_list(OWNER).await.unwrap();
        let rendered = ShoppingListService::format_shopping_list(&list);
        assert!(rendered.contains("✓ Milk (2 liters)"));
        assert!(rendered.contains("0 to buy, 1 purchased"));

        let (_, count) = lists.clear_checked_items(OWNER).await.unwrap();
        assert_eq!(count, 1);
        let list = lists.get_shopping_list(OWNER).await.unwrap();
        assert_eq!(
            ShoppingListService::format_shopping_list(&list),
            "Your shopping list is empty."
        );
    }

    #[test]
    fn format_groups_unchecked_before_checked_in_insertion_order() {
        let mut list = ShoppingList::new(OWNER).unwrap();
        for name in ["Apples", "Bread", "Coffee"] {
            list.add_item(ShoppingItem::new(name, 1.0, "", "", "").unwrap())
                .unwrap();
        }
        list.find_item_mut("bread").unwrap().mark_checked();

        let rendered = ShoppingListService::format_shopping_list(&list);
        let buy_section = rendered.find("Items to Buy").unwrap();
        let purchased_section = rendered.find("Purchased").unwrap();
        assert!(buy_section < purchased_section);
        assert!(rendered.find("Apples").unwrap() < rendered.find("Coffee").unwrap());
        assert!(rendered.contains("**Total items:** 2 to buy, 1 purchased"));
    }

    #[test]
    fn format_includes_notes_when_present() {
        let mut list = ShoppingList::new(OWNER).unwrap();
        list.add_item(ShoppingItem::new("Bread", 1.0, "", "", "sourdough if possible").unwrap())
            .unwrap();
        let rendered = ShoppingListService::format_shopping_list(&list);
        assert!(rendered.contains("• Bread (1) - sourdough if possible"));
    }

    #[tokio::test]
    async fn get_or_create_user_twice_returns_same_record() {
        let (_, users) = services().await;
        let first = users.get_or_create_user(OWNER).await.unwrap();
        let second = users.get_or_create_user(OWNER).await.unwrap();
        assert_eq!(first, second);
    }
}
