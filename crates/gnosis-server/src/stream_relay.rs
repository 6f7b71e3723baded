//! Verbatim relay of a streamed upstream completion.
//!
//! Lines pass through untouched and no `gnosis_metadata` is added: the
//! augmentation records of a streamed request are never reported.

use actix_web::web::Bytes;
use futures::{Stream, StreamExt};
use gnosis_llm::LineStream;
use serde_json::json;

/// Each upstream line plus `\n`. An upstream failure ends the relay with one
/// `data: {"error": ...}` chunk.
pub fn relay_lines(
    mut lines: LineStream,
    request_id: String,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    async_stream::stream! {
        let mut forwarded = 0usize;
        while let Some(line) = lines.next().await {
            match line {
                Ok(line) => {
                    forwarded += 1;
                    let mut chunk = line.into_bytes();
                    chunk.push(b'\n');
                    yield Ok::<Bytes, std::io::Error>(Bytes::from(chunk));
                }
                Err(e) => {
                    log::error!("[{}] Upstream stream failed after {} line(s): {}", request_id, forwarded, e);
                    yield Ok(error_chunk(&e.to_string()));
                    break;
                }
            }
        }
        log::info!("[{}] Stream relay finished, {} line(s) forwarded", request_id, forwarded);
    }
}

pub fn error_chunk(message: &str) -> Bytes {
    let payload = json!({
        "error": {
            "message": message,
            "type": "upstream_error",
        }
    });
    Bytes::from(format!("data: {}\n\n", payload))
}
