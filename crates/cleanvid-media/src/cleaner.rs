//! Producing a cleaned copy of a video.
//!
//! A clean runs in three steps:
//! 1. locate an SRT subtitle (sidecar or extracted from the container)
//! 2. plan: replace listed words in the cues and collect the intervals to mute
//! 3. multiplex: copy video, mute audio over the planned intervals and attach
//!    the cleaned subtitle

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::plan::{build_plan, CleanPlan};
use crate::probe::probe_media;
use crate::subtitle::{locate_subtitle, parse_srt, render_srt};
use crate::words::WordList;

/// Output containers that need `mov_text` subtitles.
const MOV_TEXT_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov"];

/// Input to a clean.
#[derive(Debug, Clone)]
pub struct CleanRequest {
    pub video: PathBuf,
    /// Subtitle language code, e.g. `eng`
    pub language: String,
    pub output: PathBuf,
    /// Path to the word list file
    pub word_list: PathBuf,
}

/// Result of a successful clean.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub output: PathBuf,
    /// Subtitle the plan was built from
    pub subtitle: PathBuf,
    /// Number of merged mute intervals applied
    pub muted_spans: usize,
}

/// Something that can produce a cleaned copy of a video.
#[async_trait]
pub trait Cleaner: Send + Sync {
    /// Write a cleaned copy of `request.video` to `request.output`.
    ///
    /// On error no output file is left behind.
    async fn clean(&self, request: &CleanRequest) -> MediaResult<CleanOutcome>;
}

/// [`Cleaner`] backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegCleaner {
    runner: FfmpegRunner,
}

impl FfmpegCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill FFmpeg runs that take longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }

    async fn plan(&self, subtitle: &Path, word_list: &Path) -> MediaResult<CleanPlan> {
        let bytes = tokio::fs::read(subtitle).await?;
        let cues = parse_srt(&String::from_utf8_lossy(&bytes));
        if cues.is_empty() {
            return Err(MediaError::invalid_subtitle(subtitle, "no cues"));
        }

        let words = WordList::load(word_list).await?;
        Ok(build_plan(&cues, &words))
    }

    async fn multiplex(
        &self,
        request: &CleanRequest,
        plan: &CleanPlan,
        duration_ms: i64,
    ) -> MediaResult<()> {
        let output_dir = request
            .output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let cleaned_srt = tempfile::Builder::new()
            .prefix(".cleanvid-")
            .suffix(".srt")
            .tempfile_in(output_dir)?;
        tokio::fs::write(cleaned_srt.path(), render_srt(&plan.cues)).await?;

        let mut cmd = FfmpegCommand::new(&request.video, &request.output)
            .add_input(cleaned_srt.path())
            .map("0:v:0")
            .map("0:a:0")
            .map("1:0")
            .video_codec("copy");

        cmd = match plan.volume_filter() {
            Some(filter) => cmd.audio_filter(filter).audio_codec("aac"),
            None => cmd.audio_codec("copy"),
        };

        cmd = cmd
            .subtitle_codec(subtitle_codec_for(&request.output))
            .stream_metadata("s:s:0", "language", &request.language);

        let name = request
            .video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.runner
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    "Cleaning {}: {:.1}% ({:.2}x)",
                    name,
                    progress.percentage(duration_ms),
                    progress.speed
                );
            })
            .await
    }
}

#[async_trait]
impl Cleaner for FfmpegCleaner {
    async fn clean(&self, request: &CleanRequest) -> MediaResult<CleanOutcome> {
        info!(
            "Cleaning {} -> {}",
            request.video.display(),
            request.output.display()
        );

        let info = probe_media(&request.video).await?;
        if !info.has_video || !info.has_audio {
            return Err(MediaError::invalid_media(format!(
                "{} needs both a video and an audio stream",
                request.video.display()
            )));
        }

        let subtitle = locate_subtitle(&request.video, &request.language, &info, &self.runner).await?;
        let plan = self.plan(&subtitle, &request.word_list).await?;
        debug!(
            "Planned {} mute intervals over {} cues",
            plan.mutes.len(),
            plan.cues.len()
        );

        if let Err(e) = self.multiplex(request, &plan, info.duration_ms()).await {
            let _ = tokio::fs::remove_file(&request.output).await;
            return Err(e);
        }

        info!(
            "Cleaned {} ({} muted intervals)",
            request.output.display(),
            plan.mutes.len()
        );

        Ok(CleanOutcome {
            output: request.output.clone(),
            subtitle,
            muted_spans: plan.mutes.len(),
        })
    }
}

fn subtitle_codec_for(output: &Path) -> &'static str {
    let is_mov = output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MOV_TEXT_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(e)));
    if is_mov {
        "mov_text"
    } else {
        "srt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_subtitle_codec_for() {
        assert_eq!(subtitle_codec_for(Path::new("a_clean.mp4")), "mov_text");
        assert_eq!(subtitle_codec_for(Path::new("a_clean.MOV")), "mov_text");
        assert_eq!(subtitle_codec_for(Path::new("a_clean.mkv")), "srt");
        assert_eq!(subtitle_codec_for(Path::new("a_clean")), "srt");
    }

    #[tokio::test]
    async fn test_plan_from_files() {
        let dir = TempDir::new().unwrap();
        let srt = dir.path().join("movie.srt");
        let words = dir.path().join("swears.txt");
        std::fs::write(
            &srt,
            "1\n00:00:01,000 --> 00:00:02,000\nwhat the hell\n\n2\n00:00:05,000 --> 00:00:06,000\nfine\n",
        )
        .unwrap();
        std::fs::write(&words, "hell\n").unwrap();

        let plan = FfmpegCleaner::new().plan(&srt, &words).await.unwrap();

        assert_eq!(plan.cues.len(), 2);
        assert_eq!(plan.cues[0].text, "what the ****");
        assert_eq!(plan.mutes.len(), 1);
    }

    #[tokio::test]
    async fn test_plan_rejects_empty_subtitle() {
        let dir = TempDir::new().unwrap();
        let srt = dir.path().join("movie.srt");
        let words = dir.path().join("swears.txt");
        std::fs::write(&srt, "\n\n").unwrap();
        std::fs::write(&words, "hell\n").unwrap();

        let err = FfmpegCleaner::new().plan(&srt, &words).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidSubtitle { .. }));
    }

    #[tokio::test]
    async fn test_clean_missing_video() {
        let dir = TempDir::new().unwrap();
        let request = CleanRequest {
            video: dir.path().join("missing.mkv"),
            language: "eng".to_string(),
            output: dir.path().join("missing_clean.mkv"),
            word_list: dir.path().join("swears.txt"),
        };

        let err = FfmpegCleaner::new().clean(&request).await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
        assert!(!request.output.exists());
    }
}
