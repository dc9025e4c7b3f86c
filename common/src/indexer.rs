use std::collections::BTreeSet;
use std::path::Path;

use crate::app::Application;
use crate::kv::KeyValue;
use crate::wordcount::tokenize;

/// Inverted index: for every word, the documents it appears in.
///
/// Output value is `"<n> <doc1>,<doc2>,..."` with documents sorted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Indexer;

impl Application for Indexer {
    fn name(&self) -> &'static str {
        "indexer"
    }

    fn map(&self, source: &str, contents: &str) -> Vec<KeyValue> {
        let doc = Path::new(source)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source.to_string());

        let words: BTreeSet<String> = tokenize(contents).collect();
        words
            .into_iter()
            .map(|w| KeyValue::new(w, doc.clone()))
            .collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        let docs: BTreeSet<&str> = values.iter().map(String::as_str).collect();
        let joined: Vec<&str> = docs.into_iter().collect();
        format!("{} {}", joined.len(), joined.join(","))
    }
}
