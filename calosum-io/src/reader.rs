//! JSON-lines event readers.
//!
//! One event per line, as written by the hit-recording stage:
//!
//! ```text
//! {"event_id":0,"steps":[0.12,0.5],"interaction_layer":3,"hits":{"CEEHitsCollection":[[0.0,0.1],[0.2,0.0]]}}
//! ```
//!
//! Blank lines are ignored.

use crate::{Error, Result};
use calosum_pipeline::EventInput;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// Reader for a JSON-lines events file.
pub struct EventFileReader {
    path: PathBuf,
    file_size: u64,
}

impl EventFileReader {
    /// Opens an events file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let metadata = File::open(&path)?.metadata()?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            file_size: metadata.len(),
        })
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Streams events one line at a time.
    ///
    /// # Errors
    /// Returns an error if the file cannot be reopened.
    pub fn events(&self) -> Result<EventStream<BufReader<File>>> {
        let file = File::open(&self.path)?;
        Ok(EventStream::new(BufReader::new(file)))
    }

    /// Reads every event into memory.
    ///
    /// # Errors
    /// Returns the first I/O or parse error.
    pub fn read_all(&self) -> Result<Vec<EventInput>> {
        self.events()?.collect()
    }
}

/// Iterator over the events of a JSON-lines source.
pub struct EventStream<R> {
    lines: Lines<R>,
    line: usize,
}

impl<R: BufRead> EventStream<R> {
    /// Wraps any buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for EventStream<R> {
    type Item = Result<EventInput>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(err) => return Some(Err(err.into())),
            };
            self.line += 1;
            if text.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&text).map_err(|source| Error::Parse {
                    line: self.line,
                    source,
                }),
            );
        }
    }
}
