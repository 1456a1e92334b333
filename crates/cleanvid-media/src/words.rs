//! Word list loading and matching.

use std::collections::HashMap;
use std::path::Path;

use regex::{Captures, Regex};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Words to mute, with optional subtitle replacements.
///
/// One entry per line: `word` or `word|replacement`. Blank lines and lines
/// starting with `#` are ignored. Matching is case-insensitive and on whole
/// words; entries may contain spaces.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    replacements: HashMap<String, Option<String>>,
    pattern: Option<Regex>,
}

impl WordList {
    /// Load a word list file.
    pub async fn load(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MediaError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let list = Self::parse(&contents)?;
        debug!("Loaded {} words from {}", list.len(), path.display());
        Ok(list)
    }

    /// Parse word list text.
    pub fn parse(contents: &str) -> MediaResult<Self> {
        let mut replacements = HashMap::new();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (word, replacement) = match line.split_once('|') {
                Some((word, replacement)) => (word.trim(), Some(replacement.trim().to_string())),
                None => (line, None),
            };
            if word.is_empty() {
                continue;
            }
            replacements.insert(word.to_lowercase(), replacement);
        }

        let pattern = if replacements.is_empty() {
            None
        } else {
            let mut words: Vec<&String> = replacements.keys().collect();
            // Longest first so phrases win over the words inside them.
            words.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
            let alternation = words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))?)
        };

        Ok(Self {
            replacements,
            pattern,
        })
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Replace listed words in `text`.
    ///
    /// Returns the cleaned text and whether anything was replaced.
    pub fn clean_text(&self, text: &str) -> (String, bool) {
        let Some(pattern) = &self.pattern else {
            return (text.to_string(), false);
        };
        if !pattern.is_match(text) {
            return (text.to_string(), false);
        }

        let cleaned = pattern.replace_all(text, |caps: &Captures| {
            let matched = &caps[0];
            match self.replacements.get(&matched.to_lowercase()) {
                Some(Some(replacement)) => replacement.clone(),
                _ => "*".repeat(matched.chars().count()),
            }
        });
        (cleaned.into_owned(), true)
    }
}
