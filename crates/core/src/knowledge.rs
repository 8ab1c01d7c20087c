//! Knowledge articles and the chunks sent to the AI backend as call context
//!
//! Articles are split on paragraph boundaries (blank lines). Paragraphs are
//! packed into chunks up to a character limit; a paragraph that alone exceeds
//! the limit is broken on word boundaries, and a single word longer than the
//! limit is cut by character count.

use serde::{Deserialize, Serialize};

/// A knowledge-base article as stored for a company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeArticle {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
}

/// Bounded fragment of an article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeChunk {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
    /// 1-based position within the source article
    pub chunk_index: usize,
}

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Split one article into chunks of at most `max_chars` characters
pub fn chunk_article(article: &KnowledgeArticle, max_chars: usize) -> Vec<KnowledgeChunk> {
    let max_chars = max_chars.max(1);
    let normalized = article.content.replace("\r\n", "\n");
    let paragraphs = normalized
        .split(PARAGRAPH_SEPARATOR)
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for paragraph in paragraphs {
        let para_len = paragraph.chars().count();

        if para_len > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            pieces.extend(split_oversized(paragraph, max_chars));
            continue;
        }

        let joined_len = if current.is_empty() {
            para_len
        } else {
            current_len + PARAGRAPH_SEPARATOR.len() + para_len
        };

        if joined_len > max_chars {
            pieces.push(std::mem::replace(&mut current, paragraph.to_string()));
            current_len = para_len;
        } else {
            if !current.is_empty() {
                current.push_str(PARAGRAPH_SEPARATOR);
            }
            current.push_str(paragraph);
            current_len = joined_len;
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(i, content)| KnowledgeChunk {
            title: article.title.clone(),
            content,
            category: article.category.clone(),
            chunk_index: i + 1,
        })
        .collect()
}

/// Chunk every article, preserving article order
pub fn chunk_articles(articles: &[KnowledgeArticle], max_chars: usize) -> Vec<KnowledgeChunk> {
    articles
        .iter()
        .flat_map(|article| chunk_article(article, max_chars))
        .collect()
}

fn split_oversized(paragraph: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in paragraph.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            pieces.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
            continue;
        }

        let joined_len = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };

        if joined_len > max_chars {
            pieces.push(std::mem::replace(&mut current, word.to_string()));
            current_len = word_len;
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_len = joined_len;
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
