//! Context retrieval gate.
//!
//! Only the first turn of a conversation triggers retrieval. Later turns
//! already carry whatever context the first one was given.

use std::time::Instant;

use gnosis_core::{Message, OperationKind, OperationRecord, RetrievedChunk, Retriever, Role};

/// Operation name used for retrieval records.
pub const RETRIEVAL_OPERATION: &str = "knowledge_base";

/// A first turn holds exactly one user message and no assistant or tool
/// message. Every other history is a continuation.
pub fn is_continuation(messages: &[Message]) -> bool {
    let mut user_messages = 0usize;
    for message in messages {
        match message.role {
            Role::Assistant | Role::Tool => return true,
            Role::User => user_messages += 1,
            Role::System => {}
        }
    }
    user_messages != 1
}

/// Text of the last user message, if it has any.
pub fn extract_user_query(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|message| message.role == Role::User)
        .and_then(Message::text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn render_chunk(chunk: &RetrievedChunk) -> Message {
    if chunk.filename.is_empty() {
        Message::system(format!("Relevant documentation:\n{}", chunk.text))
    } else {
        Message::system(format!(
            "Relevant documentation (source: {}):\n{}",
            chunk.filename, chunk.text
        ))
    }
}

/// Splice one system message per chunk right after the last user message,
/// best score first. Messages after the insertion point keep their order.
pub fn inject_context(messages: &[Message], mut chunks: Vec<RetrievedChunk>) -> Vec<Message> {
    let Some(last_user) = messages.iter().rposition(|m| m.role == Role::User) else {
        return messages.to_vec();
    };

    chunks.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut out = Vec::with_capacity(messages.len() + chunks.len());
    out.extend_from_slice(&messages[..=last_user]);
    out.extend(chunks.iter().map(render_chunk));
    out.extend_from_slice(&messages[last_user + 1..]);
    out
}

pub struct RetrievalGate<'a> {
    retriever: &'a dyn Retriever,
    limit: usize,
    score_threshold: f64,
}

impl<'a> RetrievalGate<'a> {
    pub fn new(retriever: &'a dyn Retriever, limit: usize, score_threshold: f64) -> Self {
        Self {
            retriever,
            limit,
            score_threshold,
        }
    }

    /// Messages to send upstream plus the record of the attempt, if one was
    /// made. Failures leave the messages untouched.
    pub async fn apply(
        &self,
        messages: &[Message],
        request_id: &str,
    ) -> (Vec<Message>, Option<OperationRecord>) {
        if is_continuation(messages) {
            return (messages.to_vec(), None);
        }
        let Some(query) = extract_user_query(messages) else {
            return (messages.to_vec(), None);
        };

        let started = Instant::now();
        match self
            .retriever
            .search(&query, self.limit, self.score_threshold)
            .await
        {
            Ok(chunks) => {
                let count = chunks.len();
                let record =
                    OperationRecord::success(OperationKind::Retrieval, RETRIEVAL_OPERATION, started.elapsed())
                        .with_detail(format!("{} results", count));
                (inject_context(messages, chunks), Some(record))
            }
            Err(e) => {
                log::warn!(
                    "[{}] Retrieval failed, continuing without context: {}",
                    request_id,
                    e
                );
                let record = OperationRecord::failure(
                    OperationKind::Retrieval,
                    RETRIEVAL_OPERATION,
                    started.elapsed(),
                    e.to_string(),
                );
                (messages.to_vec(), Some(record))
            }
        }
    }
}
