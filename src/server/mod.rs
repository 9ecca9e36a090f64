pub mod api;

use std::sync::Arc;

use log::info;

use crate::agent::ChatAgent;
use crate::error::ConfigError;

pub struct Server {
    addr: String,
    agent: Arc<ChatAgent>,
    default_conversation: String,
}

impl Server {
    pub fn new(addr: String, agent: Arc<ChatAgent>, default_conversation: String) -> Self {
        Self {
            addr,
            agent,
            default_conversation,
        }
    }

    pub async fn run(&self) -> Result<(), ConfigError> {
        let app = api::router(self.agent.clone(), self.default_conversation.clone());

        let listener = tokio::net::TcpListener
            ::bind(&self.addr).await
            .map_err(|e| ConfigError::Invalid(format!("failed to bind {}: {}", self.addr, e)))?;
        info!("Listening on: http://{}", self.addr);

        axum::serve(listener, app).await.map_err(ConfigError::Io)?;

        Ok(())
    }
}
