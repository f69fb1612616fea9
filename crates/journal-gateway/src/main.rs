use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use journal_gateway::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "journal_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("JOURNAL_CONFIG").ok();
    let config = journal_core::JournalConfig::load(config_path.as_deref())?;

    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = rusqlite::Connection::open(&config.database.path)?;
    let store = journal_store::Store::new(conn)?;

    let llm = journal_agent::AnthropicClient::new(
        config.llm.api_key.clone(),
        config.llm.model.clone(),
        Some(config.llm.base_url.clone()),
        config.llm.request_timeout_secs,
    );
    let agent = journal_agent::AgentRuntime::new(Box::new(llm));

    let bind = config.server.bind.clone();
    let port = config.server.port;
    let state = Arc::new(app::AppState::new(store, config, agent));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("journal gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
