//! Subtitle discovery and SRT parsing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::{iso639_1, MediaInfo};

/// One subtitle cue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start: Duration,
    pub end: Duration,
    /// Cue text, lines joined with `\n`
    pub text: String,
}

/// Find or produce an SRT subtitle for `video` in `language`.
///
/// Sidecar files win: `<stem>.<lang>.srt`, `<stem>.<iso639-1>.srt`, then
/// `<stem>.srt`. Otherwise the matching embedded text track is extracted to
/// `<stem>.<lang>.srt` next to the video.
pub async fn locate_subtitle(
    video: &Path,
    language: &str,
    info: &MediaInfo,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    for candidate in sidecar_candidates(video, language) {
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            debug!("Using sidecar subtitle {}", candidate.display());
            return Ok(candidate);
        }
    }

    let stream = info
        .subtitle_for(language)
        .ok_or_else(|| MediaError::subtitle_not_found(video, language))?;

    let target = sidecar_path(video, Some(language));
    info!(
        "Extracting embedded subtitle stream {} ({}) to {}",
        stream.index,
        stream.codec,
        target.display()
    );

    let cmd = FfmpegCommand::new(video, &target)
        .map(format!("0:s:{}", stream.index))
        .subtitle_codec("srt");

    if let Err(e) = runner.run(&cmd).await {
        let _ = tokio::fs::remove_file(&target).await;
        return Err(e);
    }

    Ok(target)
}

fn sidecar_path(video: &Path, language: Option<&str>) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match language {
        Some(lang) => format!("{}.{}.srt", stem, lang),
        None => format!("{}.srt", stem),
    };
    video.with_file_name(name)
}

fn sidecar_candidates(video: &Path, language: &str) -> Vec<PathBuf> {
    let mut candidates = vec![sidecar_path(video, Some(language))];
    if let Some(short) = iso639_1(language).filter(|s| *s != language) {
        candidates.push(sidecar_path(video, Some(short)));
    }
    candidates.push(sidecar_path(video, None));
    candidates
}

/// Parse SRT text.
///
/// Tolerates a byte-order mark, CRLF line endings, missing cue numbers and
/// coordinates after the end timestamp. Blocks without a timing line are
/// skipped.
pub fn parse_srt(input: &str) -> Vec<Cue> {
    let normalized = input.trim_start_matches('\u{feff}').replace("\r\n", "\n").replace('\r', "\n");

    let mut cues = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in normalized.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if let Some(cue) = parse_block(&block) {
                cues.push(cue);
            }
            block.clear();
        } else {
            block.push(line);
        }
    }

    cues
}

fn parse_block(lines: &[&str]) -> Option<Cue> {
    let timing_idx = lines.iter().position(|l| l.contains("-->"))?;
    let (start, end) = lines[timing_idx].split_once("-->")?;

    let start = parse_timestamp(start.trim())?;
    let end = parse_timestamp(end.split_whitespace().next()?)?;

    Some(Cue {
        start,
        end: end.max(start),
        text: lines[timing_idx + 1..].join("\n"),
    })
}

/// Parse `HH:MM:SS,mmm` (a `.` separator is accepted too).
fn parse_timestamp(s: &str) -> Option<Duration> {
    let (hms, millis) = s.split_once([',', '.']).unwrap_or((s, "0"));
    let mut parts = hms.split(':');
    let hours: u64 = parts.next()?.trim().parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }

    let digits: String = millis.chars().take(3).collect();
    let mut millis: u64 = digits.parse().ok()?;
    for _ in digits.len()..3 {
        millis *= 10;
    }

    Some(Duration::from_millis(
        ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis,
    ))
}

fn format_timestamp(d: Duration) -> String {
    let total = d.as_millis();
    let millis = total % 1000;
    let seconds = (total / 1000) % 60;
    let minutes = (total / 60_000) % 60;
    let hours = total / 3_600_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Render cues as SRT, renumbered from 1.
pub fn render_srt(cues: &[Cue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(cue.start),
            format_timestamp(cue.end),
            cue.text
        ));
    }
    out
}
