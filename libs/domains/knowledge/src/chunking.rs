use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::TextKnowledge;

/// Metadata key under which a chunk's category is saved.
pub const CATEGORY_KEY: &str = "category";

static SECTION_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"§\s*\d+[a-z]*").unwrap());

/// Split text at every `§ <n>` heading.
///
/// Each chunk starts with its heading and runs up to the next one. Text
/// before the first heading is dropped, as are chunks that are empty after
/// trimming.
pub fn chunk_by_section(text: &str) -> Vec<String> {
    let starts: Vec<usize> = SECTION_HEADING.find_iter(text).map(|m| m.start()).collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            text[start..end].trim()
        })
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}

/// A chunk ready for embedding, with a sequential id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextChunk {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl TextChunk {
    /// Number chunks `rec1`, `rec2`, ... in order.
    pub fn records<I, S>(chunks: I, category: Option<&str>) -> Vec<TextChunk>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, text)| TextChunk {
                id: format!("rec{}", i + 1),
                text: text.into(),
                category: category.map(str::to_string),
            })
            .collect()
    }

    /// Attach an embedding produced elsewhere.
    pub fn into_knowledge(self, embedding: Vec<f32>) -> TextKnowledge {
        let item = TextKnowledge::new(self.id, embedding, self.text);
        match self.category {
            Some(category) => item.with_metadata(CATEGORY_KEY, category),
            None => item,
        }
    }
}
