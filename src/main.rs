use miette::Result;
use pantry::{
    config::{self, Config},
    db::Store,
    identity::IdentityChain,
    mcp::{McpTransport, PantryMcpServer, ShoppingTools},
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting Pantry - shopping list MCP server");

    config::load_dotenv();
    let config = Config::load()?;
    config.validate()?;
    info!("Configuration loaded");

    let store = Arc::new(Store::new(config.store.clone()));
    // Fail fast: a bad endpoint stops the process before any tool is served
    store.connect().await?;

    let identity = IdentityChain::from_config(&config.identity);
    let server = PantryMcpServer::new(ShoppingTools::new(Arc::clone(&store), identity));

    let result = match config.mcp.transport {
        McpTransport::Stdio => server.run_stdio().await,
        McpTransport::Http => {
            let port = config.mcp.port.unwrap_or(config::DEFAULT_MCP_PORT);
            server.run_http(port).await
        }
    };

    store.shutdown().await;
    result
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // Create logs directory if it doesn't exist
    std::fs::create_dir_all("logs").ok();

    // Create file appender
    let file_appender = tracing_appender::rolling::daily("logs", "pantry.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to keep it alive for the entire program
    Box::leak(Box::new(_guard));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pantry=info,surrealdb=warn".into()),
        )
        .with(
            // stdout carries the MCP stdio transport; console logs go to stderr
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .with(
            // File output
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_ansi(false),
        )
        .init();
}
