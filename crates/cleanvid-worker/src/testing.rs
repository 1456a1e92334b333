//! Test doubles shared by the runner and monitor tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cleanvid_media::{CleanOutcome, CleanRequest, Cleaner, MediaError, MediaResult};

type Hook = Arc<dyn Fn() + Send + Sync>;

/// Cleaner that writes a placeholder output instead of running FFmpeg.
///
/// Files named in `failing` fail with `SubtitleNotFound`. The subtitle it
/// reports is the `<stem>.srt` sidecar, whether or not it exists.
#[derive(Clone, Default)]
pub struct ScriptedCleaner {
    failing: HashSet<String>,
    calls: Arc<Mutex<Vec<String>>>,
    on_clean: Option<Hook>,
}

impl ScriptedCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Run `hook` after every clean attempt.
    pub fn on_clean(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_clean = Some(Arc::new(hook));
        self
    }

    /// File names passed to `clean`, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Cleaner for ScriptedCleaner {
    async fn clean(&self, request: &CleanRequest) -> MediaResult<CleanOutcome> {
        let name = request
            .video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(name.clone());

        let result = if self.failing.contains(&name) {
            Err(MediaError::subtitle_not_found(&request.video, &request.language))
        } else {
            std::fs::write(&request.output, b"cleaned")?;
            Ok(CleanOutcome {
                output: request.output.clone(),
                subtitle: request.video.with_extension("srt"),
                muted_spans: 1,
            })
        };

        if let Some(hook) = &self.on_clean {
            hook();
        }
        result
    }
}
