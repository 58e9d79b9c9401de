use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;
use tutor_search::PromptMessages;
use tutor_vector_store::{Embedder, EmbeddingVector, VectorStoreError};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_CHAT_MODEL: &str = "llama3";

const CHAT_TEMPERATURE: f32 = 0.1;

/// Client for a local Ollama server: embeddings and streamed chat
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    embed_model: String,
    chat_model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

/// One NDJSON line of a streamed chat response
#[derive(Debug, Default, Deserialize, PartialEq)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        embed_model: impl Into<String>,
        chat_model: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build Ollama HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            embed_model: embed_model.into(),
            chat_model: chat_model.into(),
        })
    }

    #[must_use]
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    async fn request_embeddings(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        let url = format!("{}/api/embed", self.base_url);
        let request = EmbedRequest {
            model: &self.embed_model,
            input: texts,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("failed to reach Ollama at {url}"))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Ollama returned {status}: {body}");
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .context("failed to parse Ollama embed response")?;
        if parsed.embeddings.len() != texts.len() {
            bail!(
                "Ollama returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            );
        }
        Ok(parsed.embeddings)
    }

    /// Ask the chat model and forward the answer to `out` as it streams in.
    /// Returns the full answer.
    pub async fn chat_stream<W: Write>(
        &self,
        prompt: &PromptMessages,
        out: &mut W,
    ) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.chat_model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            stream: true,
            options: ChatOptions {
                temperature: CHAT_TEMPERATURE,
            },
        };

        let mut response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("failed to reach Ollama at {url}"))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Ollama returned {status}: {body}");
        }

        let mut answer = String::new();
        let mut pending: Vec<u8> = Vec::new();
        while let Some(bytes) = response
            .chunk()
            .await
            .context("failed to read Ollama chat stream")?
        {
            pending.extend_from_slice(&bytes);
            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                if forward_line(&line, &mut answer, out)? {
                    return Ok(answer);
                }
            }
        }
        forward_line(&pending, &mut answer, out)?;
        Ok(answer)
    }
}

/// Decode one NDJSON line, append its content to `answer` and `out`.
/// Returns `true` once the stream reports completion.
fn forward_line<W: Write>(line: &[u8], answer: &mut String, out: &mut W) -> Result<bool> {
    let Some(chunk) = parse_chat_line(line)? else {
        return Ok(false);
    };
    if let Some(error) = chunk.error {
        bail!("Ollama chat failed: {error}");
    }
    if let Some(message) = chunk.message {
        out.write_all(message.content.as_bytes())?;
        out.flush()?;
        answer.push_str(&message.content);
    }
    Ok(chunk.done)
}

fn parse_chat_line(line: &[u8]) -> Result<Option<ChatChunk>> {
    let line = std::str::from_utf8(line).context("chat stream is not UTF-8")?.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let chunk = serde_json::from_str(line)
        .with_context(|| format!("malformed chat stream line: {line}"))?;
    Ok(Some(chunk))
}

#[async_trait]
impl Embedder for OllamaClient {
    fn model_id(&self) -> &str {
        &self.embed_model
    }

    async fn embed(&self, text: &str) -> tutor_vector_store::Result<EmbeddingVector> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("empty embedding batch".into()))
    }

    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> tutor_vector_store::Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request_embeddings(texts)
            .await
            .map_err(|err| VectorStoreError::EmbeddingError(format!("{err:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn forwards_streamed_content_until_done() {
        let mut answer = String::new();
        let mut out = Vec::new();

        let lines: [&[u8]; 3] = [
            br#"{"model":"llama3","message":{"role":"assistant","content":"Use "},"done":false}"#,
            b"\n",
            br#"{"message":{"role":"assistant","content":"fill()."},"done":true}"#,
        ];
        assert!(!forward_line(lines[0], &mut answer, &mut out).unwrap());
        assert!(!forward_line(lines[1], &mut answer, &mut out).unwrap());
        assert!(forward_line(lines[2], &mut answer, &mut out).unwrap());

        assert_eq!(answer, "Use fill().");
        assert_eq!(String::from_utf8(out).unwrap(), "Use fill().");
    }

    #[test]
    fn final_line_without_message_is_accepted() {
        let chunk = parse_chat_line(br#"{"done":true,"total_duration":12}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            chunk,
            ChatChunk {
                message: None,
                done: true,
                error: None
            }
        );
    }

    #[test]
    fn server_errors_surface() {
        let mut answer = String::new();
        let mut out = Vec::<u8>::new();
        let err = forward_line(br#"{"error":"model not found"}"#, &mut answer, &mut out).unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert!(parse_chat_line(b"not json").is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client =
            OllamaClient::new("http://localhost:11434/", "nomic-embed-text", "llama3").unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model_id(), "nomic-embed-text");
        assert_eq!(client.chat_model(), "llama3");
    }
}
