use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{AudioWavError, Result};
use crate::wav::{self, CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE, WavHeader};

/// Outcome of preparing a source file for playback-ready use by the project
/// store: a canonical-format WAV path plus the header facts it now has.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedAudio {
    pub path: PathBuf,
    /// The candidate that `prepare_audio` actually resolved, before any
    /// re-encoding. Equal to `path` when `was_converted` is `false`.
    pub source_path: PathBuf,
    pub header: WavHeader,
    pub was_converted: bool,
}

/// Resolves, inspects, and if necessary re-encodes a source audio file into
/// the canonical format (48kHz, stereo, integer PCM).
///
/// `candidates` is tried in order; the first path that exists is used. This
/// mirrors how an import step is handed an embedded path, an original
/// recording path, and a `file:` URL, none of which is guaranteed to resolve
/// on its own.
///
/// # Example
/// ```no_run
/// use audio_wav::prepare_audio;
///
/// let prepared = prepare_audio(
///     &["missing.wav", "fallback.wav"],
///     std::env::temp_dir().join("prepared.wav"),
/// )
/// .expect("one candidate should resolve");
/// assert!(prepared.header.is_canonical());
/// ```
pub fn prepare_audio(candidates: &[impl AsRef<Path>], work_path: impl AsRef<Path>) -> Result<PreparedAudio> {
    let source = resolve_source(candidates)?;
    let header = wav::inspect(&source)?;

    if header.is_canonical() {
        tracing::info!(path = %source.display(), "source audio already canonical, no conversion needed");
        return Ok(PreparedAudio {
            path: source.clone(),
            source_path: source,
            header,
            was_converted: false,
        });
    }

    let work_path = work_path.as_ref();
    tracing::info!(
        path = %source.display(),
        sample_rate = header.sample_rate,
        channels = header.channels,
        "re-encoding source audio to canonical format",
    );
    reencode_to_canonical(&source, work_path)?;

    let converted_header = wav::inspect(work_path)?;
    if !converted_header.is_canonical() {
        return Err(AudioWavError::AudioValidationFailed {
            path: work_path.to_path_buf(),
            reason: "re-encoded file still does not match the canonical format".to_string(),
        });
    }

    Ok(PreparedAudio {
        path: work_path.to_path_buf(),
        source_path: source,
        header: converted_header,
        was_converted: true,
    })
}

fn resolve_source(candidates: &[impl AsRef<Path>]) -> Result<PathBuf> {
    let mut searched = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let candidate = candidate.as_ref();
        searched.push(candidate.to_path_buf());
        if candidate.is_file() {
            return Ok(candidate.to_path_buf());
        }
    }
    Err(AudioWavError::NoSourceAudioFound { searched })
}

fn reencode_to_canonical(source: &Path, destination: &Path) -> Result<()> {
    const CONVERTER: &str = "ffmpeg";

    let output = Command::new(CONVERTER)
        .args(["-hide_banner", "-v", "error", "-y"])
        .arg("-i")
        .arg(source)
        .args(["-ar", &CANONICAL_SAMPLE_RATE.to_string()])
        .args(["-ac", &CANONICAL_CHANNELS.to_string()])
        .args(["-c:a", "pcm_s16le"])
        .arg(destination)
        .output()
        .map_err(|source| AudioWavError::ConverterUnavailable {
            command: CONVERTER,
            source,
        })?;

    if !output.status.success() {
        return Err(AudioWavError::ConverterFailed {
            command: format!("{CONVERTER} -i {}", source.display()),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_searched_path_when_nothing_resolves() {
        let candidates = ["missing_one.wav", "missing_two.wav"];
        let err = resolve_source(&candidates).expect_err("no candidate exists");
        match err {
            AudioWavError::NoSourceAudioFound { searched } => assert_eq!(searched.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn resolves_the_first_existing_candidate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let existing = dir.path().join("present.wav");
        std::fs::write(&existing, b"not a real wav, just needs to exist").expect("write file");

        let candidates = [dir.path().join("missing.wav"), existing.clone()];
        let resolved = resolve_source(&candidates).expect("should resolve second candidate");
        assert_eq!(resolved, existing);
    }

    #[test]
    fn prepare_audio_skips_conversion_when_already_canonical() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("already_canonical.wav");
        let spec = hound::WavSpec {
            channels: CANONICAL_CHANNELS,
            sample_rate: CANONICAL_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&source, spec).expect("create wav");
        writer.write_sample(0i16).expect("write sample");
        writer.write_sample(0i16).expect("write sample");
        writer.finalize().expect("finalize wav");

        let work_path = dir.path().join("work.wav");
        let prepared = prepare_audio(&[&source], &work_path).expect("prepare should succeed");
        assert!(!prepared.was_converted);
        assert_eq!(prepared.path, source);
        assert_eq!(prepared.source_path, source);
    }
}
