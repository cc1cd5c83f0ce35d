//! Detector configuration files (JSON).

use crate::Result;
use calosum_core::DetectorConfig;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Loads and validates a detector configuration.
///
/// # Errors
/// Returns an error if the file cannot be read, is not a valid
/// configuration, or fails [`DetectorConfig::validate`].
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DetectorConfig> {
    let file = File::open(path.as_ref())?;
    let config: DetectorConfig = serde_json::from_reader(BufReader::new(file))?;
    config.validate()?;
    log::debug!("loaded detector configuration from {}", path.as_ref().display());
    Ok(config)
}

/// Writes a detector configuration as pretty-printed JSON.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn save_config<P: AsRef<Path>>(path: P, config: &DetectorConfig) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, config)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use calosum_core::{CellSelection, Subdetector};
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let mut config = DetectorConfig::default();
        config.subdetector_mut(Subdetector::Che).selection = CellSelection::SingleWafer {
            from_layer: 10,
            cells_per_wafer: 133,
        };
        save_config(file.path(), &config).unwrap();
        assert_eq!(load_config(file.path()).unwrap(), config);
    }

    #[test]
    fn test_invalid_config_rejected_on_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = DetectorConfig::default();
        config.cee.policy.divisor = 0.0;
        save_config(file.path(), &config).unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(
            err,
            Error::CoreError(calosum_core::Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_selection_json_shape() {
        let json = serde_json::to_value(DetectorConfig::default()).unwrap();
        assert_eq!(json["che"]["selection"]["rule"], "single_wafer");
        assert_eq!(json["che"]["selection"]["from_layer"], 9);
        assert_eq!(json["cee"]["selection"]["rule"], "all");
        assert_eq!(json["ahcal"]["collection"], "AHCALHitsCollection");
    }
}
