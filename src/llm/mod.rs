//! LLM backend access.
//!
//! Generation is exposed as a stream of text fragments; the response is the
//! fold of that stream into a single string.

pub mod ollama;

use anyhow::Result;
use futures::{Stream, TryStreamExt};
use tracing::debug;

pub use ollama::OllamaClient;

/// Concatenate streamed fragments in arrival order.
///
/// The first error aborts the fold and any text gathered so far is dropped.
pub async fn collect_response<S>(fragments: S) -> Result<String>
where
    S: Stream<Item = Result<String>>,
{
    let (response, count) = fragments
        .try_fold((String::new(), 0usize), |(mut acc, count), fragment| async move {
            acc.push_str(&fragment);
            Ok::<_, anyhow::Error>((acc, count + 1))
        })
        .await?;
    debug!("Received {} fragments ({} bytes)", count, response.len());
    Ok(response)
}
