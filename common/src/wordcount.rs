use crate::app::Application;
use crate::kv::KeyValue;

/// Classic word count: emits `(word, "1")` per token and sums the ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCount;

/// Splits text into lowercase tokens made of alphanumerics and '_'.
pub fn tokenize(contents: &str) -> impl Iterator<Item = String> + '_ {
    contents.split_whitespace().filter_map(|raw| {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect::<String>()
            .to_lowercase();

        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    })
}

impl Application for WordCount {
    fn name(&self) -> &'static str {
        "wc"
    }

    fn map(&self, _source: &str, contents: &str) -> Vec<KeyValue> {
        tokenize(contents).map(|word| KeyValue::new(word, "1")).collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        let total: u64 = values
            .iter()
            .map(|v| v.trim().parse::<u64>().unwrap_or(0))
            .sum();
        total.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_normalizes_tokens() {
        let kvs = WordCount.map("in.txt", "Hola hola, mundo!!\nmundo   mundo_prueba");
        let keys: Vec<&str> = kvs.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, vec!["hola", "hola", "mundo", "mundo", "mundo_prueba"]);
        assert!(kvs.iter().all(|kv| kv.value == "1"));
    }

    #[test]
    fn map_on_empty_input_emits_nothing() {
        assert!(WordCount.map("empty.txt", "").is_empty());
        assert!(WordCount.map("punct.txt", "!! ,, ..").is_empty());
    }

    #[test]
    fn reduce_sums_counts() {
        let values = vec!["1".to_string(), "1".to_string(), "3".to_string()];
        assert_eq!(WordCount.reduce("fox", &values), "5");
    }
}
