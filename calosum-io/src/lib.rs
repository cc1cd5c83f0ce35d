//! calosum-io: File I/O for calosum.
//!
//! This crate reads simulated events from JSON-lines files, writes event
//! records as CSV or JSON lines, and loads and saves detector configurations.
//!

mod batch;
pub mod config;
mod error;
mod reader;
mod summary;
mod writer;

pub use batch::process_files;
pub use config::{load_config, save_config};
pub use error::{Error, Result};
pub use reader::{EventFileReader, EventStream};
pub use summary::{summarize_events, CollectionSummary, EventFileSummary};
pub use writer::{CsvEventWriter, JsonLinesEventWriter};
