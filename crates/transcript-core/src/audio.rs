//! The audio prepare contract the import pipeline consumes from an
//! external collaborator: resolve candidate paths, inspect the WAV header,
//! and re-encode to the canonical format when necessary.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Canonical audio facts the core needs to populate `project.audio` and to
/// feed the import pipeline's `ImportAudioMetadata`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPrepared {
    pub original_path: PathBuf,
    pub resolved_path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub duration_sec: f64,
    pub was_converted: bool,
}

/// Collaborator boundary for audio preparation. `transcript-core` depends
/// only on this trait, never on `audio-wav`'s internals, mirroring how the
/// store depends on a media backend trait rather than an ffmpeg crate
/// directly.
pub trait AudioPreparer {
    fn prepare(&self, candidates: &[PathBuf], work_path: &Path) -> Result<AudioPrepared>;
}

/// Default `AudioPreparer` backed by the `audio-wav` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavAudioPreparer;

impl AudioPreparer for WavAudioPreparer {
    fn prepare(&self, candidates: &[PathBuf], work_path: &Path) -> Result<AudioPrepared> {
        let prepared = audio_wav::prepare_audio(candidates, work_path)?;
        Ok(AudioPrepared {
            original_path: prepared.source_path,
            resolved_path: prepared.path,
            sample_rate: prepared.header.sample_rate,
            channels: prepared.header.channels,
            bit_depth: prepared.header.bits_per_sample,
            duration_sec: prepared.header.duration_seconds,
            was_converted: prepared.was_converted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_audio_preparer_surfaces_no_source_audio_found() {
        let preparer = WavAudioPreparer;
        let dir = tempfile::tempdir().expect("tempdir");
        let candidates = vec![dir.path().join("missing.wav")];
        let work_path = dir.path().join("work.wav");

        let result = preparer.prepare(&candidates, &work_path);
        assert!(result.is_err());
    }
}
