//! Multi-file processing.

use crate::reader::EventFileReader;
use crate::Result;
use calosum_core::{DetectorConfig, EventSink};
use calosum_pipeline::{process_events, process_events_parallel, ProcessingSummary, RunConfig};
use log::info;
use std::path::Path;

/// Processes several events files into one sink.
///
/// File `i` runs on noise stream `run.stream + i`: event ids restart in
/// every simulation run, and the same id in two files must not replay the
/// same noise.
///
/// # Errors
/// Read and parse errors, sink errors, and per-event errors under
/// [`FailurePolicy::Abort`](calosum_pipeline::FailurePolicy::Abort).
pub fn process_files<P, K>(
    config: &DetectorConfig,
    paths: &[P],
    run: &RunConfig,
    parallel: bool,
    sink: &mut K,
) -> Result<ProcessingSummary>
where
    P: AsRef<Path>,
    K: EventSink + ?Sized,
{
    let mut total = ProcessingSummary::default();
    for (index, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        let file_run = run.with_stream(run.stream.wrapping_add(index as u64));
        info!("reading {} (stream {})", path.display(), file_run.stream);

        let events = EventFileReader::open(path)?.read_all()?;
        let summary = if parallel {
            process_events_parallel(config, &events, &file_run, &mut *sink)?
        } else {
            process_events(config, events, &file_run, &mut *sink)?
        };
        total.processed += summary.processed;
        total.skipped += summary.skipped;
    }
    Ok(total)
}
