//! Persistence: reads and writes a self-contained project package bundling
//! `project.json`, `transcription.json`, `speakers.json`, `clips.json`, and
//! the canonical embedded WAV, all addressed by relative path inside one
//! zip file.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;

use crate::error::{CoreError, Result};
use crate::project::{
    AudioInfo, ClipsData, ProjectData, ProjectInfo, Speakers, Transcription, PROJECT_DATA_VERSION,
};

const PROJECT_JSON: &str = "project.json";
const TRANSCRIPTION_JSON: &str = "transcription.json";
const SPEAKERS_JSON: &str = "speakers.json";
const CLIPS_JSON: &str = "clips.json";
const DEFAULT_EMBEDDED_AUDIO_PATH: &str = "audio/original.wav";

#[derive(Debug, Serialize, Deserialize)]
struct ProjectDocument {
    version: String,
    project: ProjectInfo,
}

#[derive(Debug, Serialize, Deserialize)]
struct SpeakersDocument {
    speakers: Speakers,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClipsDocument {
    clips: ClipsData,
}

/// Outcome of loading a package: the project data plus the path the
/// embedded audio was extracted to (already substituted into
/// `project.audio.path`).
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedProject {
    pub data: ProjectData,
    pub extracted_audio_path: PathBuf,
}

/// Writes `project` as a self-contained package at `path`. `audio_source`
/// is the current canonical WAV the transport is playing, so the saved
/// package matches what the EDL references.
///
/// # Example
/// ```no_run
/// use transcript_core::persistence::save_package;
/// use transcript_core::project::fixtures::sample_project;
///
/// let project = sample_project();
/// save_package(&project, "project.tproj", "source.wav").expect("save should succeed");
/// ```
pub fn save_package(project: &ProjectData, path: impl AsRef<Path>, audio_source: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| CoreError::PersistenceIo {
        context: "create project package",
        path: path.to_path_buf(),
        source,
    })?;

    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    write_json_entry(
        &mut writer,
        options,
        PROJECT_JSON,
        &ProjectDocument {
            version: project.version.clone(),
            project: project.project.clone(),
        },
    )?;
    write_json_entry(
        &mut writer,
        options,
        TRANSCRIPTION_JSON,
        &project.transcription,
    )?;
    write_json_entry(
        &mut writer,
        options,
        SPEAKERS_JSON,
        &SpeakersDocument {
            speakers: project.speakers.clone(),
        },
    )?;
    write_json_entry(
        &mut writer,
        options,
        CLIPS_JSON,
        &ClipsDocument {
            clips: project.clips.clone(),
        },
    )?;

    let embedded_path = project
        .project
        .audio
        .embedded_path
        .clone()
        .unwrap_or_else(|| DEFAULT_EMBEDDED_AUDIO_PATH.to_string());
    write_audio_entry(&mut writer, options, &embedded_path, audio_source.as_ref())?;

    writer.finish().map_err(|source| CoreError::Persistence {
        path: Some(path.to_path_buf()),
        detail: source.to_string(),
    })?;
    Ok(())
}

/// Reads a package, extracting the embedded audio into `extract_dir` and
/// substituting the extracted path into `project.audio.path` before the
/// store ever sees the data.
///
/// # Example
/// ```no_run
/// use transcript_core::persistence::load_package;
///
/// let loaded = load_package("project.tproj", std::env::temp_dir()).expect("load should succeed");
/// assert_eq!(loaded.data.version, "2.0");
/// ```
pub fn load_package(path: impl AsRef<Path>, extract_dir: impl AsRef<Path>) -> Result<LoadedProject> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| CoreError::PersistenceIo {
        context: "open project package",
        path: path.to_path_buf(),
        source,
    })?;

    let mut archive = zip::ZipArchive::new(file).map_err(|source| CoreError::Persistence {
        path: Some(path.to_path_buf()),
        detail: source.to_string(),
    })?;

    let project_doc: ProjectDocument = read_json_entry(&mut archive, path, PROJECT_JSON)?;
    if project_doc.version != PROJECT_DATA_VERSION {
        return Err(CoreError::Persistence {
            path: Some(path.to_path_buf()),
            detail: format!(
                "unsupported package version {}, expected {PROJECT_DATA_VERSION}",
                project_doc.version
            ),
        });
    }
    let transcription: Transcription = read_json_entry(&mut archive, path, TRANSCRIPTION_JSON)?;
    let speakers_doc: SpeakersDocument = read_json_entry(&mut archive, path, SPEAKERS_JSON)?;
    let clips_doc: ClipsDocument = read_json_entry(&mut archive, path, CLIPS_JSON)?;

    let embedded_path = project_doc
        .project
        .audio
        .embedded_path
        .clone()
        .unwrap_or_else(|| DEFAULT_EMBEDDED_AUDIO_PATH.to_string());
    let extract_dir = extract_dir.as_ref();
    std::fs::create_dir_all(extract_dir).map_err(|source| CoreError::PersistenceIo {
        context: "create audio extraction directory",
        path: extract_dir.to_path_buf(),
        source,
    })?;
    let extracted_audio_path = extract_audio_entry(&mut archive, path, &embedded_path, extract_dir)?;

    let mut project_info = project_doc.project;
    project_info.audio.path = extracted_audio_path.to_string_lossy().into_owned();

    let data = ProjectData {
        version: project_doc.version,
        project: project_info,
        transcription,
        speakers: speakers_doc.speakers,
        clips: clips_doc.clips,
    };

    Ok(LoadedProject {
        data,
        extracted_audio_path,
    })
}

fn write_json_entry<W: Write + std::io::Seek, T: Serialize>(
    writer: &mut zip::ZipWriter<W>,
    options: SimpleFileOptions,
    name: &str,
    value: &T,
) -> Result<()> {
    writer.start_file(name, options).map_err(|source| CoreError::Persistence {
        path: None,
        detail: format!("failed to start package entry {name}: {source}"),
    })?;
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| CoreError::PersistenceSerialization {
        path: PathBuf::from(name),
        source,
    })?;
    writer.write_all(&bytes).map_err(|source| CoreError::PersistenceIo {
        context: "write package entry",
        path: PathBuf::from(name),
        source,
    })?;
    Ok(())
}

fn write_audio_entry<W: Write + std::io::Seek>(
    writer: &mut zip::ZipWriter<W>,
    options: SimpleFileOptions,
    embedded_path: &str,
    audio_source: &Path,
) -> Result<()> {
    writer
        .start_file(embedded_path, options)
        .map_err(|source| CoreError::Persistence {
            path: None,
            detail: format!("failed to start package entry {embedded_path}: {source}"),
        })?;
    let mut source_file = File::open(audio_source).map_err(|source| CoreError::PersistenceIo {
        context: "open canonical audio for embedding",
        path: audio_source.to_path_buf(),
        source,
    })?;
    std::io::copy(&mut source_file, writer).map_err(|source| CoreError::PersistenceIo {
        context: "embed canonical audio",
        path: audio_source.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn read_json_entry<R: Read + std::io::Seek, T: for<'de> Deserialize<'de>>(
    archive: &mut zip::ZipArchive<R>,
    package_path: &Path,
    name: &str,
) -> Result<T> {
    let mut entry = archive.by_name(name).map_err(|source| CoreError::Persistence {
        path: Some(package_path.to_path_buf()),
        detail: format!("package is missing {name}: {source}"),
    })?;
    let mut contents = String::new();
    entry
        .read_to_string(&mut contents)
        .map_err(|source| CoreError::PersistenceIo {
            context: "read package entry",
            path: PathBuf::from(name),
            source,
        })?;
    serde_json::from_str(&contents).map_err(|source| CoreError::PersistenceSerialization {
        path: PathBuf::from(name),
        source,
    })
}

fn extract_audio_entry<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    package_path: &Path,
    embedded_path: &str,
    extract_dir: &Path,
) -> Result<PathBuf> {
    let mut entry = archive
        .by_name(embedded_path)
        .map_err(|source| CoreError::Persistence {
            path: Some(package_path.to_path_buf()),
            detail: format!("package is missing embedded audio {embedded_path}: {source}"),
        })?;

    let file_name = Path::new(embedded_path)
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "original.wav".into());
    let destination = extract_dir.join(file_name);

    let mut out = File::create(&destination).map_err(|source| CoreError::PersistenceIo {
        context: "create extracted audio file",
        path: destination.clone(),
        source,
    })?;
    std::io::copy(&mut entry, &mut out).map_err(|source| CoreError::PersistenceIo {
        context: "extract embedded audio",
        path: destination.clone(),
        source,
    })?;
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::fixtures::sample_project;

    fn write_sample_wav(path: &Path) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
        writer.write_sample(0i16).expect("write sample");
        writer.write_sample(0i16).expect("write sample");
        writer.finalize().expect("finalize wav");
    }

    #[test]
    fn round_trips_project_semantic_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let audio_path = dir.path().join("source.wav");
        write_sample_wav(&audio_path);

        let project = sample_project();
        let package_path = dir.path().join("project.tproj");
        save_package(&project, &package_path, &audio_path).expect("save should succeed");

        let extract_dir = dir.path().join("extracted");
        let loaded = load_package(&package_path, &extract_dir).expect("load should succeed");

        assert_eq!(loaded.data.version, project.version);
        assert_eq!(loaded.data.transcription, project.transcription);
        assert_eq!(loaded.data.speakers, project.speakers);
        assert_eq!(loaded.data.clips, project.clips);
        assert!(loaded.extracted_audio_path.is_file());
    }

    #[test]
    fn rejects_package_with_wrong_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let audio_path = dir.path().join("source.wav");
        write_sample_wav(&audio_path);

        let mut project = sample_project();
        project.version = "1.0".to_string();
        let package_path = dir.path().join("project.tproj");
        save_package(&project, &package_path, &audio_path).expect("save should succeed");

        let extract_dir = dir.path().join("extracted");
        let result = load_package(&package_path, &extract_dir);
        assert!(result.is_err());
    }
}
