pub mod client;
pub mod error;
pub mod lines;
pub mod openai;
pub mod retriever;

pub use client::{CompletionClient, LineStream};
pub use error::{LLMError, Result};
pub use openai::OpenAIClient;
pub use retriever::HttpRetriever;
