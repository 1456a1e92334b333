//! FFprobe stream inspection.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use crate::command::{check_ffprobe, media_command};
use crate::error::{MediaError, MediaResult};

/// Subtitle codecs FFmpeg can convert to SRT.
const TEXT_SUBTITLE_CODECS: &[&str] = &["subrip", "srt", "ass", "ssa", "mov_text", "webvtt", "text"];

/// What the cleaner needs to know about a media file.
#[derive(Debug, Clone, Default)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    pub has_video: bool,
    pub has_audio: bool,
    /// Subtitle streams in file order
    pub subtitles: Vec<SubtitleStream>,
}

/// An embedded subtitle stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleStream {
    /// Position among subtitle streams, for `-map 0:s:N`
    pub index: usize,
    pub codec: String,
    /// `language` tag, if present
    pub language: Option<String>,
}

impl SubtitleStream {
    /// Whether the stream is text and can be converted to SRT.
    pub fn is_text(&self) -> bool {
        TEXT_SUBTITLE_CODECS.contains(&self.codec.as_str())
    }
}

impl MediaInfo {
    /// Duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.duration * 1000.0).round() as i64
    }

    /// Pick the embedded text subtitle to extract for `language`.
    ///
    /// Prefers a stream tagged with the language (three- or two-letter code).
    /// Falls back to the first text stream only when no text stream carries a
    /// language tag at all.
    pub fn subtitle_for(&self, language: &str) -> Option<&SubtitleStream> {
        let text: Vec<&SubtitleStream> = self.subtitles.iter().filter(|s| s.is_text()).collect();

        let tagged = text.iter().copied().find(|s| {
            s.language
                .as_deref()
                .is_some_and(|tag| language_matches(tag, language))
        });
        if tagged.is_some() {
            return tagged;
        }

        if text.iter().all(|s| s.language.is_none()) {
            return text.first().copied();
        }

        None
    }
}

/// Two-letter ISO 639-1 code for a three-letter ISO 639-2 code.
pub fn iso639_1(code: &str) -> Option<&'static str> {
    let two = match code.to_lowercase().as_str() {
        "eng" | "en" => "en",
        "spa" | "es" => "es",
        "fre" | "fra" | "fr" => "fr",
        "ger" | "deu" | "de" => "de",
        "ita" | "it" => "it",
        "por" | "pt" => "pt",
        "dut" | "nld" | "nl" => "nl",
        "rus" | "ru" => "ru",
        "jpn" | "ja" => "ja",
        "kor" | "ko" => "ko",
        "chi" | "zho" | "zh" => "zh",
        _ => return None,
    };
    Some(two)
}

fn language_matches(tag: &str, language: &str) -> bool {
    if tag.eq_ignore_ascii_case(language) {
        return true;
    }
    matches!((iso639_1(tag), iso639_1(language)), (Some(a), Some(b)) if a == b)
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Probe a media file for its streams.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = media_command("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe could not read {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(json: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let mut info = MediaInfo {
        duration,
        ..Default::default()
    };

    for stream in probe.streams {
        match stream.codec_type.as_deref() {
            Some("video") => info.has_video = true,
            Some("audio") => info.has_audio = true,
            Some("subtitle") => {
                let language = stream
                    .tags
                    .get("language")
                    .filter(|l| !l.is_empty() && l.as_str() != "und")
                    .cloned();
                info.subtitles.push(SubtitleStream {
                    index: info.subtitles.len(),
                    codec: stream.codec_name.unwrap_or_default(),
                    language,
                });
            }
            _ => {}
        }
    }

    Ok(info)
}
