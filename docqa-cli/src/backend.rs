//! Model backend selection.

use std::sync::Arc;

use clap::Args;
use docqa_rag::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
use docqa_rag::{EmbeddingProvider, GenerationModel, HashingEmbeddingProvider};
use tracing::info;

/// Connection to an OpenAI-compatible server (OpenAI, Ollama, vLLM).
#[derive(Args, Debug)]
pub struct BackendArgs {
    /// Base URL of the OpenAI-compatible API
    #[arg(long, global = true, env = "DOCQA_BASE_URL", default_value = "http://localhost:11434/v1")]
    base_url: String,

    /// API key, if the server requires one
    #[arg(long, global = true, env = "DOCQA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat model used to generate answers
    #[arg(long, global = true, env = "DOCQA_CHAT_MODEL", default_value = "llama3.2")]
    chat_model: String,

    /// Embedding model; the built-in hashing embedder is used when unset
    #[arg(long, global = true, env = "DOCQA_EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    /// Dimensionality produced by the embedding model
    #[arg(long, global = true, env = "DOCQA_EMBEDDING_DIMENSIONS", default_value_t = 384)]
    embedding_dimensions: usize,
}

impl BackendArgs {
    pub fn embedding_provider(&self) -> Arc<dyn EmbeddingProvider> {
        match &self.embedding_model {
            Some(model) => {
                info!(model, base_url = %self.base_url, "using remote embeddings");
                let provider = OpenAIEmbeddingProvider::new(&self.base_url, self.api_key.clone())
                    .with_model(model, self.embedding_dimensions);
                Arc::new(provider)
            }
            None => {
                info!("using hashing embeddings");
                Arc::new(HashingEmbeddingProvider::default())
            }
        }
    }

    pub fn generation_model(&self) -> Arc<dyn GenerationModel> {
        Arc::new(OpenAIChatModel::new(&self.base_url, self.api_key.clone(), &self.chat_model))
    }
}
