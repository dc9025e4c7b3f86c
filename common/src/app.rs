use std::sync::Arc;

use anyhow::{bail, Result};

use crate::indexer::Indexer;
use crate::kv::KeyValue;
use crate::wordcount::WordCount;

/// User-supplied map/reduce logic. Both functions are expected to be pure:
/// a task may run more than once, and every run must emit the same records.
pub trait Application: Send + Sync {
    fn name(&self) -> &'static str;

    /// `source` is the input file's path, `contents` its whole text.
    fn map(&self, source: &str, contents: &str) -> Vec<KeyValue>;

    /// Folds every value emitted for `key` into a single output value.
    fn reduce(&self, key: &str, values: &[String]) -> String;
}

/// Looks an application up by the name used on the command line.
pub fn by_name(name: &str) -> Result<Arc<dyn Application>> {
    match name {
        "wc" | "wordcount" => Ok(Arc::new(WordCount)),
        "indexer" => Ok(Arc::new(Indexer)),
        other => bail!("unknown application {other:?} (expected wc or indexer)"),
    }
}
