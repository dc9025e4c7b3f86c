use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use glob::{glob, Pattern};
use tracing::warn;

use crate::kv::KeyValue;

pub const OUTPUT_PREFIX: &str = "mr-out-";
const TEMP_PREFIX: &str = "mr-tmp-";

/// `mr-<worker>-<bucket>`: records a map worker produced for one bucket.
pub fn intermediate_name(worker_id: &str, bucket: u32) -> String {
    format!("mr-{}-{}", worker_id, bucket)
}

/// `mr-out-<bucket>`: committed reduce output.
pub fn output_name(bucket: u32) -> String {
    format!("{}{}", OUTPUT_PREFIX, bucket)
}

/// Glob matching every map worker's file for `bucket`.
pub fn bucket_selector(bucket: u32) -> String {
    format!("mr-*-{}", bucket)
}

/// On-disk shuffle area shared by map and reduce workers.
///
/// There is no locking: the naming convention is the only coordination.
/// Map output is appended in place, so a reader may see a partially written
/// file; final reduce output goes through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct IntermediateStore {
    dir: PathBuf,
}

impl IntermediateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Like `new`, but creates the directory if it is missing.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let store = Self::new(dir);
        if !store.dir.as_os_str().is_empty() {
            fs::create_dir_all(&store.dir)?;
        }
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn intermediate_path(&self, worker_id: &str, bucket: u32) -> PathBuf {
        self.dir.join(intermediate_name(worker_id, bucket))
    }

    pub fn output_path(&self, bucket: u32) -> PathBuf {
        self.dir.join(output_name(bucket))
    }

    /// Appends `records` as JSON lines to the worker's file for `bucket`,
    /// creating it if needed.
    pub fn append(&self, worker_id: &str, bucket: u32, records: &[KeyValue]) -> io::Result<PathBuf> {
        let path = self.intermediate_path(worker_id, bucket);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);

        for kv in records {
            serde_json::to_writer(&mut writer, kv)?;
            writer.write_all(b"\n")?;
        }

        writer.flush()?;
        Ok(path)
    }

    /// Intermediate files in this store matching `selector` (e.g. `mr-*-3`).
    /// Committed outputs and in-flight temp files are never returned.
    pub fn resolve(&self, selector: &str) -> io::Result<Vec<PathBuf>> {
        let base = Pattern::escape(&self.dir.to_string_lossy());
        let pattern = if base.is_empty() {
            selector.to_string()
        } else {
            format!("{}/{}", base.trim_end_matches('/'), selector)
        };

        let entries = glob(&pattern).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid selector {pattern}: {e}"),
            )
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(io::Error::from)?;
            let is_intermediate = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| !n.starts_with(OUTPUT_PREFIX) && !n.starts_with(TEMP_PREFIX))
                .unwrap_or(false);

            if is_intermediate && path.is_file() {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    /// Decodes every record of every file matched by `selector`.
    pub fn read_selector(&self, selector: &str) -> io::Result<Vec<KeyValue>> {
        let mut out = Vec::new();
        for path in self.resolve(selector)? {
            out.extend(read_records(&path)?);
        }
        Ok(out)
    }

    /// Writes `"<key> <value>"` lines to a temp file next to the final output
    /// and renames it over `mr-out-<bucket>`.
    pub fn commit_output(&self, bucket: u32, records: &[KeyValue]) -> io::Result<PathBuf> {
        let final_path = self.output_path(bucket);
        let dir = if self.dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.dir.as_path()
        };

        let tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(dir)?;

        {
            let mut writer = BufWriter::new(tmp.as_file());
            for kv in records {
                writeln!(writer, "{} {}", kv.key, kv.value)?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&final_path)?;

        Ok(final_path)
    }
}

/// Reads one intermediate file.
///
/// A line that does not decode is skipped with a warning: a map worker may
/// still be appending to the file while we read it.
pub fn read_records(path: &Path) -> io::Result<Vec<KeyValue>> {
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<KeyValue>(&line) {
            Ok(kv) => out.push(kv),
            Err(e) => warn!("skipping undecodable record in {}: {}", path.display(), e),
        }
    }

    Ok(out)
}
