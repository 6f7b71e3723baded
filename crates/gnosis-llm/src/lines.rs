//! Body → line stream adapter for streamed upstream responses.

use futures_util::{StreamExt, TryStreamExt};
use reqwest::Response;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

use crate::client::LineStream;
use crate::error::LLMError;

/// Split a streamed HTTP body into lines. A trailing `\r` is dropped, lines
/// are otherwise untouched, blank lines included.
pub fn lines_from_response(response: Response) -> LineStream {
    let body = response
        .bytes_stream()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));

    let lines = FramedRead::new(StreamReader::new(body), LinesCodec::new())
        .map(|line| line.map_err(|e| LLMError::Stream(e.to_string())));

    Box::pin(lines)
}
