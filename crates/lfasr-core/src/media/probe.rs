//! Optional format hints sent with `prepare`.

use std::path::Path;

use tracing::debug;

/// Sample rate and channel count, when they can be read from the file header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioHints {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// Read hints from a WAV header. Other formats yield empty hints.
pub fn probe_hints(path: &Path) -> AudioHints {
    if super::extension_of(path) != "wav" {
        return AudioHints::default();
    }

    match hound::WavReader::open(path) {
        Ok(reader) => {
            let spec = reader.spec();
            AudioHints {
                sample_rate: Some(spec.sample_rate),
                channels: Some(spec.channels),
            }
        }
        Err(e) => {
            debug!("Could not read WAV header of {}: {e}", path.display());
            AudioHints::default()
        }
    }
}
