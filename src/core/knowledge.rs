//! Local reference material injected into prompts as career context.
//!
//! Text, markdown and PDF files from the knowledge directory are split into
//! overlapping chunks and ranked against each question by term overlap.

use std::collections::HashSet;
use std::error::Error;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const CHUNK_SIZE: usize = 1000;
const CHUNK_OVERLAP: usize = 100;
const BUILTIN_SOURCE: &str = "Internal";

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "your", "with", "what", "which", "who",
    "how", "can", "should", "would", "could", "about", "into", "from", "that", "this", "have",
    "has", "was", "were", "will", "does", "did", "its", "our", "they", "them", "there", "some",
    "any", "all", "more", "most", "like", "get", "good",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeSnippet {
    pub source: String,
    pub text: String,
}

impl KnowledgeSnippet {
    fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    /// First `max_chars` characters, for the sources list under a reply.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.text.chars().take(max_chars).collect();
        if self.text.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

struct Chunk {
    snippet: KnowledgeSnippet,
    terms: HashSet<String>,
}

pub struct KnowledgeBase {
    chunks: Vec<Chunk>,
}

impl KnowledgeBase {
    /// Load every `.txt`, `.md` and `.pdf` file in `dir`. Falls back to the
    /// built-in notes when the directory is missing or holds nothing usable.
    pub fn load(dir: &Path) -> Self {
        let mut snippets = Vec::new();

        match fs::read_dir(dir) {
            Ok(entries) => {
                let mut paths: Vec<_> = entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.path())
                    .filter(|path| {
                        matches!(
                            path.extension().and_then(|ext| ext.to_str()),
                            Some("txt") | Some("md") | Some("pdf")
                        )
                    })
                    .collect();
                paths.sort();

                for path in paths {
                    let source = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    match read_document(&path) {
                        Ok(text) => snippets.extend(
                            split_chunks(&text)
                                .into_iter()
                                .map(|chunk| KnowledgeSnippet::new(source.clone(), chunk)),
                        ),
                        Err(err) => {
                            warn!(path = %path.display(), error = %err, "skipping knowledge file")
                        }
                    }
                }
            }
            Err(err) => debug!(dir = %dir.display(), error = %err, "no knowledge directory"),
        }

        if snippets.is_empty() {
            return Self::builtin();
        }
        debug!(chunks = snippets.len(), "knowledge base loaded");
        Self::from_snippets(snippets)
    }

    pub fn builtin() -> Self {
        Self::from_snippets(vec![
            KnowledgeSnippet::new(
                BUILTIN_SOURCE,
                "Data Science includes roles like Data Analyst, ML Engineer, and Research Scientist.",
            ),
            KnowledgeSnippet::new(
                BUILTIN_SOURCE,
                "Software Engineering requires mastery of algorithms, systems design, and version control.",
            ),
        ])
    }

    pub fn from_snippets(snippets: Vec<KnowledgeSnippet>) -> Self {
        let chunks = snippets
            .into_iter()
            .map(|snippet| Chunk {
                terms: terms(&snippet.text).collect(),
                snippet,
            })
            .collect();
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The `limit` chunks sharing the most distinct terms with `query`.
    /// Chunks with no overlap are never returned.
    pub fn search(&self, query: &str, limit: usize) -> Vec<KnowledgeSnippet> {
        let query_terms: HashSet<String> = terms(query).collect();
        if query_terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, usize)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| (index, chunk.terms.intersection(&query_terms).count()))
            .filter(|(_, score)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        scored
            .into_iter()
            .take(limit)
            .map(|(index, _)| self.chunks[index].snippet.clone())
            .collect()
    }
}

fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 2)
        .map(|word| word.to_lowercase())
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
}

/// Split on whitespace into chunks of at most [`CHUNK_SIZE`] characters where
/// consecutive chunks share roughly [`CHUNK_OVERLAP`] trailing characters.
fn split_chunks(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let mut end = start;
        let mut length = 0;
        while end < words.len() {
            let added = words[end].chars().count() + usize::from(end > start);
            if length + added > CHUNK_SIZE && end > start {
                break;
            }
            length += added;
            end += 1;
        }
        chunks.push(words[start..end].join(" "));

        if end >= words.len() {
            break;
        }

        let mut overlap = 0;
        let mut next = end;
        while next > start + 1 && overlap < CHUNK_OVERLAP {
            next -= 1;
            overlap += words[next].chars().count() + 1;
        }
        start = next.max(start + 1);
    }

    chunks
}

fn read_document(path: &Path) -> Result<String, Box<dyn Error>> {
    if path.extension().and_then(|ext| ext.to_str()) == Some("pdf") {
        return read_pdf(path);
    }
    Ok(fs::read_to_string(path)?)
}

/// Text of every page, in page order.
fn read_pdf(path: &Path) -> Result<String, Box<dyn Error>> {
    let document = lopdf::Document::load(path)?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    Ok(document.extract_text(&pages)?)
}
