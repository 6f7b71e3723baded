pub mod chat;
pub mod operations;
pub mod retrieval;

pub use chat::{
    ChatCompletionRequest, ChatCompletionResponse, Choice, ContentPart, FunctionCall,
    FunctionSchema, Message, MessageContent, Role, ToolCall, ToolSchema, Usage,
};
pub use operations::{GnosisMetadata, OperationKind, OperationOutcome, OperationRecord};
pub use retrieval::{RetrievalError, RetrievedChunk, Retriever};
