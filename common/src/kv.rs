use serde::{Deserialize, Serialize};

/// One intermediate record emitted by a map function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Groups a key-sorted slice into runs of equal keys.
///
/// The input must already be sorted by key; values inside a group keep the
/// order they had in the slice.
pub fn group_sorted(sorted: &[KeyValue]) -> Vec<(&str, Vec<String>)> {
    sorted
        .chunk_by(|a, b| a.key == b.key)
        .map(|run| {
            let values = run.iter().map(|kv| kv.value.clone()).collect();
            (run[0].key.as_str(), values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_sorted_collects_runs() {
        let mut kvs = vec![
            KeyValue::new("b", "1"),
            KeyValue::new("a", "x"),
            KeyValue::new("b", "2"),
            KeyValue::new("a", "y"),
            KeyValue::new("c", "z"),
        ];
        kvs.sort_by(|l, r| l.key.cmp(&r.key));

        let groups = group_sorted(&kvs);
        assert_eq!(
            groups,
            vec![
                ("a", vec!["x".to_string(), "y".to_string()]),
                ("b", vec!["1".to_string(), "2".to_string()]),
                ("c", vec!["z".to_string()]),
            ]
        );
    }

    #[test]
    fn group_sorted_keeps_single_and_trailing_runs() {
        let kvs = vec![
            KeyValue::new("a", "1"),
            KeyValue::new("b", "2"),
            KeyValue::new("b", "3"),
        ];
        let groups = group_sorted(&kvs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], ("a", vec!["1".to_string()]));
        assert_eq!(groups[1], ("b", vec!["2".to_string(), "3".to_string()]));
    }

    #[test]
    fn group_sorted_on_empty_input() {
        assert!(group_sorted(&[]).is_empty());
    }
}
