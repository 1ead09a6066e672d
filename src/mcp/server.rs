//! MCP server wiring: tool registration, identity resolution from the peer
//! session, and the stdio / streamable-HTTP transports.

use crate::identity::RequestIdentity;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo},
    service::{RequestContext, RoleServer},
    tool, tool_handler, tool_router,
};
use tracing::{debug, error, info};

use super::{
    AddItemRequest, CheckItemRequest, EmptyRequest, RemoveItemRequest, ShoppingTools,
    UncheckItemRequest, UpdateItemRequest,
};

/// MCP server implementation for Pantry
#[derive(Clone)]
pub struct PantryMcpServer {
    tools: ShoppingTools,
    tool_router: ToolRouter<Self>,
}

impl PantryMcpServer {
    pub fn new(tools: ShoppingTools) -> Self {
        let tool_router = Self::tool_router();
        info!(
            "Tool router initialized with {} tools",
            tool_router.list_all().len()
        );

        Self { tools, tool_router }
    }

    /// Resolve the caller identity for this request: the peer's declared
    /// client name is the session hint, the rest of the chain is static.
    fn owner_id(&self, context: &RequestContext<RoleServer>) -> String {
        let hint = context
            .peer
            .peer_info()
            .map(|info| info.client_info.name.clone());
        self.tools
            .identity
            .resolve(&RequestIdentity::with_session_hint(hint))
    }

    /// Run the MCP server on stdio transport
    pub async fn run_stdio(self) -> miette::Result<()> {
        info!("Starting MCP server on stdio transport");

        use rmcp::transport::stdio;

        let server = rmcp::ServiceExt::serve(self, stdio())
            .await
            .map_err(|e| miette::miette!("Failed to start server: {}", e))?;

        let quit_reason = server
            .waiting()
            .await
            .map_err(|e| miette::miette!("Server error: {}", e))?;

        info!("Server stopped: {:?}", quit_reason);
        Ok(())
    }

    /// Run the MCP server on HTTP transport (streamable)
    pub async fn run_http(self, port: u16) -> miette::Result<()> {
        use hyper_util::{
            rt::{TokioExecutor, TokioIo},
            server::conn::auto::Builder,
            service::TowerToHyperService,
        };
        use rmcp::transport::streamable_http_server::{
            StreamableHttpService, session::local::LocalSessionManager,
        };
        use tokio::net::TcpListener;

        let addr = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| miette::miette!("Failed to bind to {}: {}", addr, e))?;

        info!("MCP HTTP server listening on http://{}", addr);

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    debug!("Accepted new MCP connection from {}", peer_addr);
                    let io = TokioIo::new(stream);

                    let server = self.clone();
                    let service = TowerToHyperService::new(StreamableHttpService::new(
                        move || Ok(server.clone()),
                        LocalSessionManager::default().into(),
                        Default::default(),
                    ));

                    tokio::spawn(async move {
                        let builder = Builder::new(TokioExecutor::new());
                        let conn = builder.serve_connection(io, service);

                        if let Err(e) = conn.await {
                            error!("Error serving MCP connection: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept MCP connection: {}", e);
                }
            }
        }
    }
}

// Tool implementations for shopping list operations
#[tool_router]
impl PantryMcpServer {
    #[tool(description = "Add an item to your shopping list")]
    async fn add_item(
        &self,
        params: Parameters<AddItemRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let owner_id = self.owner_id(&context);
        Ok(self.tools.add_item(&owner_id, params.0).await)
    }

    #[tool(description = "Remove an item from your shopping list by name")]
    async fn remove_item(
        &self,
        params: Parameters<RemoveItemRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let owner_id = self.owner_id(&context);
        Ok(self.tools.remove_item(&owner_id, params.0).await)
    }

    #[tool(description = "Update details of an item in your shopping list")]
    async fn update_item(
        &self,
        params: Parameters<UpdateItemRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let owner_id = self.owner_id(&context);
        Ok(self.tools.update_item(&owner_id, params.0).await)
    }

    #[tool(description = "Mark an item as checked/purchased")]
    async fn check_item(
        &self,
        params: Parameters<CheckItemRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let owner_id = self.owner_id(&context);
        Ok(self.tools.check_item(&owner_id, params.0).await)
    }

    #[tool(description = "Unmark an item (mark as not purchased)")]
    async fn uncheck_item(
        &self,
        params: Parameters<UncheckItemRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let owner_id = self.owner_id(&context);
        Ok(self.tools.uncheck_item(&owner_id, params.0).await)
    }

    #[tool(description = "Get your complete shopping list")]
    async fn get_shopping_list(
        &self,
        _params: Parameters<EmptyRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let owner_id = self.owner_id(&context);
        Ok(self.tools.get_shopping_list(&owner_id).await)
    }

    #[tool(description = "Remove all checked/purchased items from your shopping list")]
    async fn clear_checked_items(
        &self,
        _params: Parameters<EmptyRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let owner_id = self.owner_id(&context);
        Ok(self.tools.clear_checked_items(&owner_id).await)
    }

    #[tool(description = "Clear all items from your shopping list")]
    async fn clear_all_items(
        &self,
        _params: Parameters<EmptyRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let owner_id = self.owner_id(&context);
        Ok(self.tools.clear_all_items(&owner_id).await)
    }

    #[tool(description = "Show which profile this shopping list belongs to")]
    async fn get_my_profile(
        &self,
        _params: Parameters<EmptyRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let owner_id = self.owner_id(&context);
        Ok(self.tools.get_my_profile(&owner_id).await)
    }
}

#[tool_handler]
impl ServerHandler for PantryMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "pantry".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Per-user shopping list manager. Items are kept per caller profile; \
                 add, check off and clear items as you shop."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{IdentityConfig, StoreConfig},
        db::Store,
        identity::IdentityChain,
    };
    use std::sync::Arc;

    async fn server() -> PantryMcpServer {
        let config = StoreConfig {
            endpoint: "memory".to_string(),
            ..StoreConfig::default()
        };
        let store = Arc::new(Store::new(config));
        store.connect().await.unwrap();
        PantryMcpServer::new(ShoppingTools::new(
            store,
            IdentityChain::from_config(&IdentityConfig::default()),
        ))
    }

    #[tokio::test]
    async fn every_tool_is_registered() {
        let server = server().await;
        let mut names: Vec<_> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "add_item",
                "check_item",
                "clear_all_items",
                "clear_checked_items",
                "get_my_profile",
                "get_shopping_list",
                "remove_item",
                "uncheck_item",
                "update_item",
            ]
        );
    }

    #[tokio::test]
    async fn server_info_advertises_tools() {
        let server = server().await;
        let info = server.get_info();
        assert_eq!(info.server_info.name, "pantry");
        assert!(info.capabilities.tools.is_some());
    }
}
