//! Event record writers.

use crate::Result;
use calosum_core::{EventRecord, EventSink, RECORD_COLUMNS};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes one CSV row per event, ntuple style.
///
/// Columns: `edep,cee_total,che_total,ahcal_total,hgcal_total,interaction_layer`.
pub struct CsvEventWriter<W: Write = BufWriter<File>> {
    writer: W,
    wrote_header: bool,
}

impl CsvEventWriter {
    /// Creates a new CSV file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> CsvEventWriter<W> {
    /// Wraps any writer. The header is written with the first record.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            wrote_header: false,
        }
    }

    /// Writes one record.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_record(&mut self, record: &EventRecord) -> Result<()> {
        if !self.wrote_header {
            writeln!(self.writer, "{}", RECORD_COLUMNS.join(","))?;
            self.wrote_header = true;
        }
        writeln!(
            self.writer,
            "{},{},{},{},{},{}",
            record.edep,
            record.cee_total,
            record.che_total,
            record.ahcal_total,
            record.hgcal_total,
            record.interaction_layer
        )?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and returns the inner writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> EventSink for CsvEventWriter<W> {
    fn record(&mut self, record: &EventRecord) -> calosum_core::Result<()> {
        Ok(self.write_record(record)?)
    }

    fn flush(&mut self) -> calosum_core::Result<()> {
        Ok(CsvEventWriter::flush(self)?)
    }
}

/// Writes one JSON object per line per event.
pub struct JsonLinesEventWriter<W: Write = BufWriter<File>> {
    writer: W,
}

impl JsonLinesEventWriter {
    /// Creates a new JSON-lines file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesEventWriter<W> {
    /// Wraps any writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one record.
    ///
    /// # Errors
    /// Returns an error if serialisation or writing fails.
    pub fn write_record(&mut self, record: &EventRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and returns the inner writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> EventSink for JsonLinesEventWriter<W> {
    fn record(&mut self, record: &EventRecord) -> calosum_core::Result<()> {
        Ok(self.write_record(record)?)
    }

    fn flush(&mut self) -> calosum_core::Result<()> {
        Ok(JsonLinesEventWriter::flush(self)?)
    }
}
