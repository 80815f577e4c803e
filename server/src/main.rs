mod routes;
mod state;

use std::sync::Arc;

use chat::llm::{LlmChat, LlmClient};

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    // Initialize LLM client (non-fatal: chat requests answer 500 if config missing).
    let llm: Option<Arc<dyn LlmChat>> = match LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured; chat requests will fail");
            None
        }
    };

    let system_prompt = std::env::var("CHAT_SYSTEM_PROMPT")
        .ok()
        .filter(|prompt| !prompt.trim().is_empty());
    if system_prompt.is_some() {
        tracing::info!("default system prompt configured");
    }

    let state = state::AppState::new(llm, system_prompt);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "chat server listening");
    axum::serve(listener, app).await.expect("server failed");
}
