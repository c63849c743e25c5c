//! Template field completion
//!
//! Suggests YAML field names of scan templates from a key to description
//! mapping, for editors that offer autocompletion while typing.

use crate::error::Result;
use std::collections::BTreeMap;

/// Individual completion item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    /// The completion text
    pub text: String,
    /// What the field means
    pub description: String,
}

/// Completion result containing suggestions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionResult {
    /// List of completion suggestions
    pub suggestions: Vec<CompletionItem>,
    /// The prefix that was matched
    pub prefix: String,
    /// Byte offset in the text where the prefix starts
    pub replace_from: usize,
}

/// Completion provider for template field names
#[derive(Debug, Clone, Default)]
pub struct CompletionProvider {
    /// Lowercased key to (key, description)
    fields: BTreeMap<String, (String, String)>,
}

impl CompletionProvider {
    /// Create a provider from a key to description map
    pub fn from_map<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(key, description)| {
                let key = key.into();
                (key.to_lowercase(), (key, description.into()))
            })
            .collect();
        Self { fields }
    }

    /// Create a provider from a JSON object of `"key": "description"`
    pub fn from_json(json: &str) -> Result<Self> {
        let map: BTreeMap<String, String> = serde_json::from_str(json)?;
        Ok(Self::from_map(map))
    }

    /// Number of known fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields starting with `prefix`, case-insensitively, sorted by key
    pub fn suggest(&self, prefix: &str) -> Vec<CompletionItem> {
        if prefix.is_empty() {
            return Vec::new();
        }

        let needle = prefix.to_lowercase();
        self.fields
            .range(needle.clone()..)
            .take_while(|(lower, _)| lower.starts_with(&needle))
            .map(|(_, (key, description))| CompletionItem {
                text: key.clone(),
                description: description.clone(),
            })
            .collect()
    }

    /// Suggestions for the field name being typed at `cursor` in `text`
    pub fn suggest_at(&self, text: &str, cursor: usize) -> CompletionResult {
        let cursor = floor_char_boundary(text, cursor.min(text.len()));
        let line_start = text[..cursor].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line = &text[line_start..cursor];

        let body = line.trim_start();
        let body = body.strip_prefix("- ").unwrap_or(body);
        let fragment_start = cursor - body.len();

        // Only a bare key is completable, not a value after the colon
        let is_key = body
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !is_key {
            return CompletionResult {
                replace_from: cursor,
                ..CompletionResult::default()
            };
        }

        CompletionResult {
            suggestions: self.suggest(body),
            prefix: body.to_string(),
            replace_from: fragment_start,
        }
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
