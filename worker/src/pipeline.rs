use std::{
    fs, io,
    path::PathBuf,
};

use mr_common::{
    kv::group_sorted, partition::partition, Application, IntermediateStore, KeyValue, Task,
};

/// Map step: read the whole input, run the user map, and append each
/// non-empty bucket to `mr-<worker>-<bucket>`.
///
/// Files are appended in place; nothing is renamed. Returns the files written.
pub fn run_map(
    app: &dyn Application,
    store: &IntermediateStore,
    worker_id: &str,
    task: &Task,
) -> io::Result<Vec<PathBuf>> {
    let contents = fs::read_to_string(&task.input).map_err(|e| {
        io::Error::new(e.kind(), format!("cannot read input {}: {e}", task.input))
    })?;

    let pairs = app.map(&task.input, &contents);
    let buckets = partition(pairs, task.n_reduce);

    let mut files = Vec::new();
    for (bucket, records) in buckets.iter().enumerate() {
        if records.is_empty() {
            continue;
        }
        files.push(store.append(worker_id, bucket as u32, records)?);
    }

    Ok(files)
}

/// Reduce step: gather the bucket from every map worker, sort, group, reduce
/// and commit `mr-out-<bucket>` atomically.
pub fn run_reduce(
    app: &dyn Application,
    store: &IntermediateStore,
    task: &Task,
) -> io::Result<PathBuf> {
    let mut records = store.read_selector(&task.input)?;

    // stable: values of one key keep file order
    records.sort_by(|a, b| a.key.cmp(&b.key));

    let output: Vec<KeyValue> = group_sorted(&records)
        .into_iter()
        .map(|(key, values)| KeyValue::new(key, app.reduce(key, &values)))
        .collect();

    store.commit_output(task.id, &output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mr_common::{store::intermediate_name, wordcount::WordCount, Application};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn write_input(dir: &TempDir, name: &str, text: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path.to_string_lossy().to_string()
    }

    fn output_lines(store: &IntermediateStore, n_reduce: u32) -> Vec<Vec<String>> {
        (0..n_reduce)
            .map(|b| {
                fs::read_to_string(store.output_path(b))
                    .unwrap()
                    .lines()
                    .map(str::to_string)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn word_count_over_two_files_and_two_buckets() {
        let input_dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = IntermediateStore::new(work.path());
        let app = WordCount;

        let a = write_input(&input_dir, "a.txt", "the quick fox");
        let b = write_input(&input_dir, "b.txt", "the lazy fox");

        run_map(&app, &store, "w1", &Task::map(0, a, 2)).unwrap();
        run_map(&app, &store, "w2", &Task::map(1, b, 2)).unwrap();
        for bucket in 0..2 {
            run_reduce(&app, &store, &Task::reduce(bucket, 2)).unwrap();
        }

        let per_file = output_lines(&store, 2);
        for lines in &per_file {
            let mut sorted = lines.clone();
            sorted.sort();
            assert_eq!(lines, &sorted, "each output file is sorted by key");
        }

        let union: BTreeSet<String> = per_file.into_iter().flatten().collect();
        let expected: BTreeSet<String> = ["the 2", "fox 2", "quick 1", "lazy 1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(union, expected);
    }

    #[test]
    fn map_skips_empty_buckets() {
        let input_dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = IntermediateStore::new(work.path());

        let a = write_input(&input_dir, "a.txt", "lazy");
        let files = run_map(&WordCount, &store, "w1", &Task::map(0, a, 2)).unwrap();

        // "lazy" hashes to bucket 1
        assert_eq!(files, vec![work.path().join(intermediate_name("w1", 1))]);
        assert!(!store.intermediate_path("w1", 0).exists());
    }

    #[test]
    fn map_reexecution_duplicates_records() {
        let input_dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = IntermediateStore::new(work.path());
        let a = write_input(&input_dir, "a.txt", "the quick fox");
        let task = Task::map(0, a, 1);

        // the same logical task ran on a presumed-dead worker and on its replacement
        run_map(&WordCount, &store, "slow", &task).unwrap();
        run_map(&WordCount, &store, "fast", &task).unwrap();
        run_reduce(&WordCount, &store, &Task::reduce(0, 1)).unwrap();

        let lines = &output_lines(&store, 1)[0];
        assert_eq!(lines, &vec!["fox 2", "quick 2", "the 2"]);
    }

    #[test]
    fn reduce_rerun_overwrites_output() {
        let input_dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = IntermediateStore::new(work.path());
        let a = write_input(&input_dir, "a.txt", "fox fox");

        run_map(&WordCount, &store, "w1", &Task::map(0, a, 1)).unwrap();
        let first = run_reduce(&WordCount, &store, &Task::reduce(0, 1)).unwrap();
        let before = fs::read_to_string(&first).unwrap();
        let second = run_reduce(&WordCount, &store, &Task::reduce(0, 1)).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(&second).unwrap(), before);
        assert_eq!(before, "fox 2\n");
    }

    #[test]
    fn reduce_of_empty_bucket_commits_empty_file() {
        let work = TempDir::new().unwrap();
        let store = IntermediateStore::new(work.path());

        let path = run_reduce(&WordCount, &store, &Task::reduce(3, 4)).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "");
    }

    #[test]
    fn missing_input_is_an_error() {
        let work = TempDir::new().unwrap();
        let store = IntermediateStore::new(work.path());
        let task = Task::map(0, work.path().join("nope.txt").to_string_lossy(), 1);

        let err = run_map(&WordCount, &store, "w1", &task).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(store.resolve("mr-*-0").unwrap().is_empty());
    }

    struct Concat;

    impl Application for Concat {
        fn name(&self) -> &'static str {
            "concat"
        }

        fn map(&self, _source: &str, contents: &str) -> Vec<KeyValue> {
            contents
                .split_whitespace()
                .enumerate()
                .map(|(i, w)| KeyValue::new("k", format!("{i}{w}")))
                .collect()
        }

        fn reduce(&self, _key: &str, values: &[String]) -> String {
            values.join("|")
        }
    }

    #[test]
    fn reduce_sees_values_in_file_order() {
        let input_dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = IntermediateStore::new(work.path());
        let a = write_input(&input_dir, "a.txt", "x y z");

        run_map(&Concat, &store, "w1", &Task::map(0, a, 1)).unwrap();
        run_reduce(&Concat, &store, &Task::reduce(0, 1)).unwrap();

        assert_eq!(output_lines(&store, 1)[0], vec!["k 0x|1y|2z"]);
    }
}
