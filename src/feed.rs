use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::parser::extract::Brand;

const FEED_PREFIX: &str = "subzero_wolf";

/// One flat output row: a page's metadata plus one document category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub model: String,
    pub brand: Brand,
    pub product: String,
    pub product_lang: String,
    pub file_urls: Vec<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub url: String,
    pub thumb: String,
    pub source: String,
    pub domain: String,
}

/// `subzero_wolf_2024-05-01T12-30-45.json`
pub fn feed_file_name(started: DateTime<Utc>) -> String {
    format!("{}_{}.json", FEED_PREFIX, started.format("%Y-%m-%dT%H-%M-%S"))
}

/// Streams records into a JSON array file that never replaces an existing one.
///
/// The finished file is byte-identical to `serde_json::to_string_pretty` of
/// all records followed by a newline.
pub struct FeedWriter {
    path: PathBuf,
    out: BufWriter<File>,
    count: usize,
}

impl FeedWriter {
    pub fn create(dir: &Path, started: DateTime<Utc>) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output dir {}", dir.display()))?;
        let path = dir.join(feed_file_name(started));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("Refusing to write feed {}", path.display()))?;

        let mut out = BufWriter::new(file);
        out.write_all(b"[")?;
        Ok(Self { path, out, count: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&mut self, record: &OutputRecord) -> Result<()> {
        let body = serde_json::to_string_pretty(record)?;
        let sep: &[u8] = if self.count == 0 { b"\n" } else { b",\n" };
        self.out.write_all(sep)?;
        for (i, line) in body.lines().enumerate() {
            if i > 0 {
                self.out.write_all(b"\n")?;
            }
            self.out.write_all(b"  ")?;
            self.out.write_all(line.as_bytes())?;
        }
        self.count += 1;
        Ok(())
    }

    pub fn write_all(&mut self, records: &[OutputRecord]) -> Result<()> {
        records.iter().try_for_each(|r| self.write(r))
    }

    /// Close the array and flush. Returns the number of records written.
    pub fn finish(mut self) -> Result<usize> {
        if self.count > 0 {
            self.out.write_all(b"\n")?;
        }
        self.out.write_all(b"]\n")?;
        self.out
            .flush()
            .with_context(|| format!("Failed to flush feed {}", self.path.display()))?;
        Ok(self.count)
    }

    /// Close the array whatever `result` is, then hand `result` back.
    ///
    /// A failed run still leaves a loadable feed holding everything written so far.
    pub fn close_with<T>(self, result: Result<T>) -> Result<T> {
        let path = self.path.clone();
        let closed = self.finish();
        match result {
            Ok(value) => closed.map(|_| value),
            Err(e) => {
                if let Err(close_err) = closed {
                    warn!(path = %path.display(), "Failed to close feed: {:#}", close_err);
                }
                Err(e)
            }
        }
    }
}

pub fn load_feed(path: &Path) -> Result<Vec<OutputRecord>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to parse feed {}", path.display()))
}
