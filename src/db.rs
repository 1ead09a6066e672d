//! Document-store adapter. Users and lists are whole documents keyed by the
//! caller identity; every mutation rewrites the owning document.

use crate::{
    config::StoreConfig,
    error::{DatabaseError, PantryError, Result},
    models::{ShoppingList, User},
};
use surrealdb::{Surreal, engine::any::Any};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const USER_TABLE: &str = "user";
pub const LIST_TABLE: &str = "shopping_list";

/// Store connection and operations manager.
///
/// The handle is created unconnected; every operation runs
/// [`ensure_connected`](Store::ensure_connected) first, so the first caller
/// pays for the dial and everyone after rides the same session.
pub struct Store {
    db: Surreal<Any>,
    config: StoreConfig,
    connected: Mutex<bool>,
}

impl Store {
    /// Create an unconnected store handle from validated configuration.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            db: Surreal::init(),
            config,
            connected: Mutex::new(false),
        }
    }

    /// Establish the connection now instead of on first use. `main` calls
    /// this so a bad endpoint fails at startup, not on the first tool call.
    pub async fn connect(&self) -> Result<()> {
        self.ensure_connected().await
    }

    /// Connect if we have not already, holding the lock so concurrent first
    /// calls dial once.
    async fn ensure_connected(&self) -> Result<()> {
        let mut connected = self.connected.lock().await;
        if *connected {
            return Ok(());
        }
        self.establish().await?;
        *connected = true;
        Ok(())
    }

    async fn establish(&self) -> Result<()> {
        let endpoint = self.config.endpoint.clone();
        info!(
            endpoint = %endpoint,
            max_connections = self.config.max_connections,
            min_connections = self.config.min_connections,
            "Connecting to store"
        );

        let dial = tokio::time::timeout(
            self.config.connect_timeout(),
            self.db.connect(endpoint.as_str()),
        );
        match dial.await {
            Err(_elapsed) => {
                return Err(DatabaseError::ConnectTimeout {
                    endpoint,
                    timeout_ms: self.config.connect_timeout_ms,
                }
                .into());
            }
            Ok(Err(surrealdb::Error::Api(surrealdb::error::Api::AlreadyConnected))) => {
                // reconnect path: the engine keeps the transport; we only
                // refresh the session below
                debug!("Store already connected; refreshing session");
            }
            Ok(Err(e)) => {
                return Err(DatabaseError::ConnectionFailed {
                    endpoint,
                    source: e,
                }
                .into());
            }
            Ok(Ok(())) => {}
        }

        self.db
            .use_ns(&self.config.namespace)
            .use_db(&self.config.database)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        // Independent readiness budget: accepting the dial is not the same
        // as being able to answer queries.
        let probe = tokio::time::timeout(self.config.ready_timeout(), self.db.health());
        match probe.await {
            Err(_elapsed) => {
                return Err(DatabaseError::NotReady {
                    timeout_ms: self.config.ready_timeout_ms,
                }
                .into());
            }
            Ok(Err(e)) => {
                return Err(DatabaseError::ConnectionFailed { endpoint, source: e }.into());
            }
            Ok(Ok(())) => {}
        }

        info!("Store connection established");
        Ok(())
    }

    /// Liveness probe: connected and answering health checks.
    pub async fn is_live(&self) -> bool {
        if !*self.connected.lock().await {
            return false;
        }
        self.db.health().await.is_ok()
    }

    /// Drop the session marker and run the connect sequence again.
    pub async fn reconnect(&self) -> Result<()> {
        {
            let mut connected = self.connected.lock().await;
            *connected = false;
        }
        self.ensure_connected().await
    }

    /// Mark the session closed. Engine connections close when the handle
    /// drops; this keeps shutdown visible in the logs.
    pub async fn shutdown(&self) {
        let mut connected = self.connected.lock().await;
        if *connected {
            info!("Disconnecting from store");
            *connected = false;
        }
    }

    // ===== User operations =====

    /// Fetch a user by caller identity. Absence is a normal outcome.
    pub async fn get_user(&self, external_id: &str) -> Result<Option<User>> {
        self.ensure_connected().await?;
        let user: Option<User> = self
            .db
            .select((USER_TABLE, external_id.to_string()))
            .await
            .map_err(|e| DatabaseError::from_query("fetch user", e))?;
        Ok(user)
    }

    /// Persist a new user document. Fails if the identity is already taken.
    pub async fn create_user(&self, user: &User) -> Result<User> {
        self.ensure_connected().await?;
        let created: Option<User> = self
            .db
            .create((USER_TABLE, user.external_id.clone()))
            .content(user.clone())
            .await
            .map_err(|e| DatabaseError::from_query("create user", e))?;

        info!(external_id = %user.external_id, "Created user");
        created
            .ok_or_else(|| DatabaseError::Other("store returned no user document".into()).into())
    }

    /// Get existing user or create a default one. Best-effort idempotent: a
    /// lost create race falls back to reading the row that won.
    pub async fn get_or_create_user(&self, external_id: &str) -> Result<User> {
        if let Some(user) = self.get_user(external_id).await? {
            return Ok(user);
        }

        let user = User::new(external_id)?;
        match self.create_user(&user).await {
            Ok(created) => Ok(created),
            Err(PantryError::Database(DatabaseError::AlreadyExists { .. })) => {
                debug!(external_id, "Lost user create race; reading existing row");
                self.get_user(external_id).await?.ok_or_else(|| {
                    PantryError::UserNotFound {
                        external_id: external_id.to_string(),
                    }
                })
            }
            Err(e) => Err(e),
        }
    }

    // ===== Shopping list operations =====

    /// Fetch the owner's list. Absence is a normal outcome.
    pub async fn get_shopping_list(&self, owner_id: &str) -> Result<Option<ShoppingList>> {
        self.ensure_connected().await?;
        let list: Option<ShoppingList> = self
            .db
            .select((LIST_TABLE, owner_id.to_string()))
            .await
            .map_err(|e| DatabaseError::from_query("fetch shopping list", e))?;
        Ok(list)
    }

    /// Persist a new list document.
    pub async fn create_shopping_list(&self, list: &ShoppingList) -> Result<ShoppingList> {
        self.ensure_connected().await?;
        let created: Option<ShoppingList> = self
            .db
            .create((LIST_TABLE, list.owner_id.clone()))
            .content(list.clone())
            .await
            .map_err(|e| DatabaseError::from_query("create shopping list", e))?;

        info!(owner_id = %list.owner_id, "Created shopping list");
        created
            .ok_or_else(|| DatabaseError::Other("store returned no list document".into()).into())
    }

    /// Replace the persisted document wholesale, refreshing `updated_at`
    /// just before the write. This is the only write path for mutations.
    pub async fn update_shopping_list(&self, list: &ShoppingList) -> Result<ShoppingList> {
        self.ensure_connected().await?;
        let mut doc = list.clone();
        doc.touch();

        let owner_id = doc.owner_id.clone();
        let stored: Option<ShoppingList> = self
            .db
            .upsert((LIST_TABLE, owner_id.clone()))
            .content(doc)
            .await
            .map_err(|e| DatabaseError::from_query("update shopping list", e))?;

        debug!(owner_id = %owner_id, "Updated shopping list");
        stored
            .ok_or_else(|| DatabaseError::Other("store returned no list document".into()).into())
    }

    /// Get existing list or create an empty default one.
    pub async fn get_or_create_shopping_list(&self, owner_id: &str) -> Result<ShoppingList> {
        if let Some(list) = self.get_shopping_list(owner_id).await? {
            return Ok(list);
        }

        let list = ShoppingList::new(owner_id)?;
        match self.create_shopping_list(&list).await {
            Ok(created) => Ok(created),
            Err(PantryError::Database(DatabaseError::AlreadyExists { .. })) => {
                debug!(owner_id, "Lost list create race; reading existing row");
                self.get_shopping_list(owner_id)
                    .await?
                    .ok_or_else(|| PantryError::ListNotFound {
                        owner_id: owner_id.to_string(),
                    })
            }
            Err(e) => Err(e),
        }
    }

    /// Remove the owner's list document. Absence is a no-op, not an error.
    pub async fn delete_shopping_list(&self, owner_id: &str) -> Result<bool> {
        self.ensure_connected().await?;
        let deleted: Option<ShoppingList> = self
            .db
            .delete((LIST_TABLE, owner_id.to_string()))
            .await
            .map_err(|e| DatabaseError::from_query("delete shopping list", e))?;

        if deleted.is_some() {
            info!(owner_id, "Deleted shopping list");
        }
        Ok(deleted.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShoppingItem;
    use pretty_assertions::assert_eq;

    async fn test_store() -> Store {
        let config = StoreConfig {
            endpoint: "memory".to_string(),
            ..StoreConfig::default()
        };
        let store = Store::new(config);
        store.connect().await.unwrap();
        store
    }

    #[tokio::test]
    async fn absent_user_is_none_not_an_error() {
        let store = test_store().await;
        assert_eq!(store.get_user("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_or_create_user_is_idempotent() {
        let store = test_store().await;
        let first = store.get_or_create_user("owner-1").await.unwrap();
        let second = store.get_or_create_user("owner-1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.display_name, "User-owner-1");
    }

    #[tokio::test]
    async fn create_user_twice_reports_duplicate() {
        let store = test_store().await;
        let user = User::new("owner-1").unwrap();
        store.create_user(&user).await.unwrap();

        let err = store.create_user(&user).await.unwrap_err();
        assert!(matches!(
            err,
            PantryError::Database(DatabaseError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn list_round_trips_field_for_field() {
        let store = test_store().await;
        let mut list = ShoppingList::new("owner-1").unwrap();
        list.add_item(ShoppingItem::new("Milk", 2.0, "liters", "dairy", "").unwrap())
            .unwrap();
        list.add_item(ShoppingItem::new("Bread", 1.0, "", "bakery", "rye").unwrap())
            .unwrap();
        list.find_item_mut("bread").unwrap().mark_checked();

        store.create_shopping_list(&list).await.unwrap();
        let fetched = store.get_shopping_list("owner-1").await.unwrap().unwrap();
        assert_eq!(fetched, list);
        let names: Vec<_> = fetched.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Milk", "Bread"]);
    }

    #[tokio::test]
    async fn update_replaces_wholesale_and_bumps_updated_at() {
        let store = test_store().await;
        let list = store.get_or_create_shopping_list("owner-1").await.unwrap();

        let mut changed = list.clone();
        changed
            .add_item(ShoppingItem::new("Eggs", 12.0, "", "", "").unwrap())
            .unwrap();
        let stored = store.update_shopping_list(&changed).await.unwrap();
        assert!(stored.updated_at > list.updated_at);

        let fetched = store.get_shopping_list("owner-1").await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.items.len(), 1);
    }

    #[tokio::test]
    async fn get_or_create_list_returns_same_identity() {
        let store = test_store().await;
        let first = store.get_or_create_shopping_list("owner-1").await.unwrap();
        let second = store.get_or_create_shopping_list("owner-1").await.unwrap();
        assert_eq!(first, second);
        assert!(first.items.is_empty());
    }

    #[tokio::test]
    async fn delete_is_a_no_op_when_absent() {
        let store = test_store().await;
        assert!(!store.delete_shopping_list("owner-1").await.unwrap());

        store.get_or_create_shopping_list("owner-1").await.unwrap();
        assert!(store.delete_shopping_list("owner-1").await.unwrap());
        assert_eq!(store.get_shopping_list("owner-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn liveness_tracks_connection_state() {
        let config = StoreConfig {
            endpoint: "memory".to_string(),
            ..StoreConfig::default()
        };
        let store = Store::new(config);
        assert!(!store.is_live().await);

        store.connect().await.unwrap();
        assert!(store.is_live().await);

        store.shutdown().await;
        assert!(!store.is_live().await);

        store.reconnect().await.unwrap();
        assert!(store.is_live().await);
    }
}
