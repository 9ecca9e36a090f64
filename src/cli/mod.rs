use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- History Store Args ---
    /// History store backend (memory, sqlite, qdrant)
    #[arg(long, env = "HISTORY_TYPE", default_value = "sqlite")]
    pub history_type: String,

    /// Path of the SQLite history database file
    #[arg(long, env = "HISTORY_PATH", default_value = "./history.db")]
    pub history_path: String,

    /// Endpoint of the Qdrant history index (e.g., http://localhost:6334)
    #[arg(long, env = "HISTORY_URL", default_value = "http://localhost:6334")]
    pub history_url: String,

    /// API credential for the remote history index. Required when
    /// history_type is qdrant.
    #[arg(long, env = "HISTORY_API_KEY", default_value = "")]
    pub history_api_key: String,

    /// Collection name in the remote history index. Required when
    /// history_type is qdrant.
    #[arg(long, env = "HISTORY_COLLECTION", default_value = "")]
    pub collection: String,

    /// Vector dimension of the history index
    #[arg(long, env = "VECTOR_DIMENSION", default_value = "768")]
    pub dimension: usize,

    /// Distance metric for the history index (cosine, euclid, dot)
    #[arg(long, env = "VECTOR_METRIC", default_value = "cosine")]
    pub metric: String,

    /// Result bound for similarity retrieval from the vector backend
    #[arg(long, env = "HISTORY_TOP_K", default_value = "20")]
    pub top_k: usize,

    // --- Chat LLM Provider Args ---
    /// LLM provider for chat completion (ollama, openai)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "ollama")]
    pub chat_llm_type: String,

    /// Base URL for the chat provider API (e.g., http://localhost:11434)
    #[arg(long, env = "CHAT_BASE_URL")]
    pub chat_base_url: Option<String>,

    /// API key for the chat provider
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., llama3.2:1b, gpt-4o-mini)
    #[arg(long, env = "CHAT_MODEL")]
    pub chat_model: Option<String>,

    /// Timeout in seconds for any single provider call
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value = "60")]
    pub llm_timeout_secs: u64,

    // --- Embedding LLM Provider Args ---
    /// LLM provider for text embedding (ollama, openai)
    #[arg(long, env = "EMBEDDING_LLM_TYPE", default_value = "ollama")]
    pub embedding_llm_type: String,

    /// Base URL for the embedding provider API
    #[arg(long, env = "EMBEDDING_BASE_URL")]
    pub embedding_base_url: Option<String>,

    /// API key for the embedding provider
    #[arg(long, env = "EMBEDDING_API_KEY", default_value = "")]
    pub embedding_api_key: String,

    /// Model name for text embedding (e.g., nomic-embed-text)
    #[arg(long, env = "EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    // --- General App Args ---
    /// Path to a JSON file overriding the system prompt preamble
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Language the assistant is asked to respond in
    #[arg(long, env = "RESPONSE_LANGUAGE")]
    pub language: Option<String>,

    /// Conversation id used when a chat request names none
    #[arg(long, env = "DEFAULT_CONVERSATION", default_value = "financial_assistant")]
    pub default_conversation: String,

    /// Host address and port for the server to listen on
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,
}
