//! Mute planning from subtitle cues.

use std::time::Duration;

use crate::subtitle::Cue;
use crate::words::WordList;

/// An interval of audio to silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuteSpan {
    pub start: Duration,
    pub end: Duration,
}

/// Cleaned subtitle cues and the audio intervals to mute.
#[derive(Debug, Clone, Default)]
pub struct CleanPlan {
    /// Every input cue, with listed words replaced
    pub cues: Vec<Cue>,
    /// Sorted, non-overlapping mute intervals
    pub mutes: Vec<MuteSpan>,
}

impl CleanPlan {
    /// FFmpeg audio filter muting every planned span, if any.
    pub fn volume_filter(&self) -> Option<String> {
        if self.mutes.is_empty() {
            return None;
        }

        let windows = self
            .mutes
            .iter()
            .map(|m| {
                format!(
                    "between(t,{:.3},{:.3})",
                    m.start.as_secs_f64(),
                    m.end.as_secs_f64()
                )
            })
            .collect::<Vec<_>>()
            .join("+");

        Some(format!("volume=enable='{}':volume=0", windows))
    }
}

/// Clean cue text and collect the intervals of cues that matched.
pub fn build_plan(cues: &[Cue], words: &WordList) -> CleanPlan {
    let mut spans = Vec::new();
    let cleaned = cues
        .iter()
        .map(|cue| {
            let (text, matched) = words.clean_text(&cue.text);
            if matched {
                spans.push(MuteSpan {
                    start: cue.start,
                    end: cue.end,
                });
            }
            Cue { text, ..cue.clone() }
        })
        .collect();

    CleanPlan {
        cues: cleaned,
        mutes: merge_spans(spans),
    }
}

/// Merge overlapping or touching spans.
fn merge_spans(mut spans: Vec<MuteSpan>) -> Vec<MuteSpan> {
    spans.sort_by_key(|s| (s.start, s.end));

    let mut merged: Vec<MuteSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(start_ms: u64, end_ms: u64, text: &str) -> Cue {
        Cue {
            start: Duration::from_millis(start_ms),
            end: Duration::from_millis(end_ms),
            text: text.to_string(),
        }
    }

    fn span(start_ms: u64, end_ms: u64) -> MuteSpan {
        MuteSpan {
            start: Duration::from_millis(start_ms),
            end: Duration::from_millis(end_ms),
        }
    }

    #[test]
    fn test_build_plan_keeps_all_cues() {
        let words = WordList::parse("hell\n").unwrap();
        let cues = vec![
            cue(1000, 2000, "Hello"),
            cue(3000, 4000, "What the hell"),
            cue(3500, 4500, "hell no"),
            cue(9000, 9500, "Bye"),
        ];

        let plan = build_plan(&cues, &words);

        assert_eq!(plan.cues.len(), 4);
        assert_eq!(plan.cues[0].text, "Hello");
        assert_eq!(plan.cues[1].text, "What the ****");
        assert_eq!(plan.mutes, vec![span(3000, 4500)]);
    }

    #[test]
    fn test_merge_spans() {
        let merged = merge_spans(vec![span(5000, 6000), span(1000, 2000), span(2000, 2500), span(1500, 1800)]);
        assert_eq!(merged, vec![span(1000, 2500), span(5000, 6000)]);
    }

    #[test]
    fn test_volume_filter() {
        let plan = CleanPlan {
            cues: Vec::new(),
            mutes: vec![span(1000, 2500), span(61_000, 62_125)],
        };

        assert_eq!(
            plan.volume_filter().unwrap(),
            "volume=enable='between(t,1.000,2.500)+between(t,61.000,62.125)':volume=0"
        );
        assert!(CleanPlan::default().volume_filter().is_none());
    }
}
