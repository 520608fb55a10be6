//! C1 — splits raw text into size-bounded, overlap-aware fragments
//! (spec §4.1), grounded on `original_source/src/chunking/semantic_chunker.py`.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: 128,
            max_chunk_size: 512,
            overlap: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextChunk {
    pub text: String,
    pub source: Option<String>,
    pub chunk_index: usize,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChunkerError {
    #[error("cannot chunk empty input")]
    EmptyInput,
}

/// Counts tokens the way the original does: whitespace-delimited words.
/// A real tokenizer is not required by the contract; only the size bound
/// needs to hold, and the contract's boundary test cares about word counts.
fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Strips a `---\n<key: value lines>\n---` frontmatter block from the top of
/// `text`, if present, returning the remaining body and the parsed keys.
/// Never panics on malformed frontmatter — falls back to no metadata.
fn strip_frontmatter(text: &str) -> (&str, HashMap<String, String>) {
    let mut metadata = HashMap::new();
    let Some(rest) = text.strip_prefix("---\n") else {
        return (text, metadata);
    };
    let Some(end) = rest.find("\n---") else {
        return (text, metadata);
    };
    let block = &rest[..end];
    for line in block.lines() {
        if let Some((key, value)) = line.split_once(':') {
            metadata.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    let body_start = end + "\n---".len();
    let body = rest[body_start..].trim_start_matches('\n');
    (body, metadata)
}

/// Default paragraph-greedy packer: split on blank lines, greedily append
/// while under `max_chunk_size` tokens, emit when full.
fn greedy_pack(body: &str, config: &ChunkerConfig) -> Vec<String> {
    let paragraphs: Vec<&str> = body
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0usize;

    for para in paragraphs {
        let para_tokens = token_count(para);
        if current_tokens + para_tokens > config.max_chunk_size && !current.is_empty() {
            chunks.push(current.join("\n\n"));
            let overlap_text = overlap_tail(&current, config.overlap);
            current = Vec::new();
            current_tokens = 0;
            if !overlap_text.is_empty() {
                current_tokens = token_count(&overlap_text);
                current.push(overlap_text);
            }
        }
        current.push(para.to_string());
        current_tokens += para_tokens;
    }

    if !current.is_empty() {
        chunks.push(current.join("\n\n"));
    }

    chunks
}

/// Returns up to `overlap` trailing tokens of the already-accumulated
/// paragraphs, to seed the next chunk for overlap-aware continuity.
fn overlap_tail(current: &[String], overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let joined = current.join(" ");
    let words: Vec<&str> = joined.split_whitespace().collect();
    if words.len() <= overlap {
        return String::new();
    }
    words[words.len() - overlap..].join(" ")
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Splits `text` into ordered fragments. Rejects empty input with a
    /// precondition error; never panics on malformed frontmatter.
    pub fn chunk(
        &self,
        text: &str,
        source: Option<String>,
    ) -> Result<Vec<TextChunk>, ChunkerError> {
        if text.trim().is_empty() {
            return Err(ChunkerError::EmptyInput);
        }

        let (body, frontmatter) = strip_frontmatter(text);
        let raw_chunks = greedy_pack(body, &self.config);

        Ok(raw_chunks
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| TextChunk {
                text,
                source: source.clone(),
                chunk_index,
                metadata: frontmatter.clone(),
            })
            .collect())
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}
