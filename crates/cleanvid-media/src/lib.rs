#![deny(unreachable_patterns)]
//! Subtitle-driven profanity muting via the FFmpeg CLI.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - FFprobe stream inspection
//! - Subtitle discovery (sidecar files or embedded text tracks)
//! - SRT parsing and word-list matching into a mute plan
//! - The `Cleaner` trait and its FFmpeg implementation

pub mod cleaner;
pub mod command;
pub mod error;
pub mod plan;
pub mod probe;
pub mod progress;
pub mod subtitle;
pub mod words;

pub use cleaner::{CleanOutcome, CleanRequest, Cleaner, FfmpegCleaner};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{FailureKind, MediaError, MediaResult};
pub use plan::{build_plan, CleanPlan, MuteSpan};
pub use probe::{probe_media, MediaInfo, SubtitleStream};
pub use progress::FfmpegProgress;
pub use subtitle::{locate_subtitle, parse_srt, render_srt, Cue};
pub use words::WordList;
