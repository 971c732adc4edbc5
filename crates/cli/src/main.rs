//! Demonstration binary: wires `audio-wav` and `transcript-core` together
//! end to end. Generates a synthetic WAV, imports a fixture ASR result,
//! applies a couple of edits through `ProjectStore`, projects an EDL, then
//! saves and reloads a package to prove the round trip.

use std::collections::HashMap;
use std::path::PathBuf;

use transcript_core::edl::project_edl;
use transcript_core::import::{ImportAudioMetadata, ImportOptions, RawSegment, RawWord, TranscriptionResult, import_transcription};
use transcript_core::persistence::{load_package, save_package};
use transcript_core::store::OperationPayload;
use transcript_core::ProjectStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let workdir = tempfile::tempdir()?;
    let audio_path = workdir.path().join("source.wav");
    write_demo_wav(&audio_path)?;

    let transcription = fixture_transcription();
    let header = audio_wav::inspect(&audio_path)?;
    let audio = ImportAudioMetadata {
        original_name: "source.wav".to_string(),
        resolved_path: audio_path.to_string_lossy().into_owned(),
        embedded_path: None,
        sample_rate: header.sample_rate,
        channels: header.channels,
        bit_depth: header.bits_per_sample,
        duration_sec: header.duration_seconds,
        was_converted: false,
        asr_provider: Some("demo-asr".to_string()),
    };

    let project = import_transcription(transcription, audio, ImportOptions::default())?;
    tracing::info!(clip_count = project.clips.clips.len(), "imported project");

    let mut store = ProjectStore::new();
    for event in store.load(project)? {
        tracing::info!(?event, "store event");
    }

    let clip_id = store
        .snapshot()
        .expect("project just loaded")
        .clips
        .clips
        .first()
        .expect("fixture always yields at least one clip")
        .id;

    let events = store.apply(OperationPayload::ChangeSpeaker {
        clip_id,
        new_speaker: "narrator".to_string(),
    })?;
    for event in events {
        tracing::info!(?event, "store event");
    }

    let events = store.apply(OperationPayload::RenameSpeaker {
        old_name: "narrator".to_string(),
        new_name: "Narrator".to_string(),
    })?;
    for event in events {
        tracing::info!(?event, "store event");
    }

    let project = store.snapshot().expect("project still loaded");
    let edl = project_edl(&project, 1);
    tracing::info!(entries = edl.entries.len(), revision = edl.revision, "projected edl");

    let package_path = workdir.path().join("demo.tproj");
    save_package(&project, &package_path, &audio_path)?;

    let extract_dir = workdir.path().join("extracted");
    let loaded = load_package(&package_path, &extract_dir)?;
    tracing::info!(
        path = %loaded.extracted_audio_path.display(),
        clip_count = loaded.data.clips.clips.len(),
        "reloaded package",
    );

    println!("imported {} clip(s), projected {} edl entr(y/ies), round-tripped through {}",
        loaded.data.clips.clips.len(),
        edl.entries.len(),
        package_path.display());

    Ok(())
}

fn write_demo_wav(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let spec = hound::WavSpec {
        channels: audio_wav::CANONICAL_CHANNELS,
        sample_rate: audio_wav::CANONICAL_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_samples = audio_wav::CANONICAL_SAMPLE_RATE as usize * audio_wav::CANONICAL_CHANNELS as usize * 2;
    for _ in 0..total_samples {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    Ok(())
}

fn fixture_transcription() -> TranscriptionResult {
    let mut speakers = HashMap::new();
    speakers.insert("speaker-1".to_string(), "Speaker One".to_string());

    TranscriptionResult {
        segments: vec![RawSegment {
            start: 0.0,
            end: 2.0,
            text: "hello there".to_string(),
            speaker: Some("speaker-1".to_string()),
            words: vec![
                RawWord {
                    start: 0.0,
                    end: 0.9,
                    text: "hello".to_string(),
                    confidence: Some(0.95),
                    speaker: None,
                },
                RawWord {
                    start: 1.0,
                    end: 2.0,
                    text: "there".to_string(),
                    confidence: Some(0.9),
                    speaker: None,
                },
            ],
        }],
        language: Some("en".to_string()),
        speakers,
    }
}
