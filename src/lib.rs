pub mod agent;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;

use std::sync::Arc;

use log::info;

use agent::ChatAgent;
use cli::Args;
use error::AgentError;
use server::Server;

pub async fn run(args: Args) -> Result<(), AgentError> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("History Store Type: {}", args.history_type);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Embedding LLM Type: {}", args.embedding_llm_type);
    info!("Default Conversation: {}", args.default_conversation);
    info!("-------------------------");

    let agent = Arc::new(ChatAgent::new(&args).await?);
    let server = Server::new(args.server_addr.clone(), agent, args.default_conversation.clone());
    server.run().await?;

    Ok(())
}
