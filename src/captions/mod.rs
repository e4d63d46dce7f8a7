//! Caption tracks: one cue list per language, loaded independently.

mod vtt;

pub use vtt::{ParsedCaptions, parse_vtt, strip_voice_tags};

use std::cmp::Ordering;

use futures_util::future::join_all;
use serde::Serialize;

use crate::error::{CueError, FetchError};
use crate::fetch::Fetcher;
use crate::model::CaptionSources;

/// A timed caption. `start` and `end` are seconds; the window is inclusive
/// at both ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    #[serde(rename = "startTime")]
    pub start: f64,
    #[serde(rename = "endTime")]
    pub end: f64,
    pub text: String,
}

impl Cue {
    pub fn new(start: f64, end: f64, text: &str) -> Self {
        Self {
            start,
            end,
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionTrack {
    pub language: String,
    pub cues: Vec<Cue>,
    pub errors: Vec<CueError>,
}

impl CaptionTrack {
    pub fn from_vtt(language: &str, content: &str) -> Self {
        let ParsedCaptions { cues, errors } = parse_vtt(content);
        Self {
            language: language.to_string(),
            cues,
            errors,
        }
    }
}

/// Index of the cue whose window contains `seconds`. Cues must be sorted by
/// start time and must not overlap.
pub fn cue_at(cues: &[Cue], seconds: f64) -> Option<usize> {
    cues.binary_search_by(|cue| {
        if cue.end < seconds {
            Ordering::Less
        } else if cue.start > seconds {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
    .ok()
}

/// Fetches and parses one language. Malformed cues end up in
/// `CaptionTrack::errors`; only an unreachable source is an error.
pub async fn load_track(fetcher: &Fetcher, language: &str, source: &str) -> Result<CaptionTrack, FetchError> {
    let content = fetcher.fetch_text(source).await?;
    let track = CaptionTrack::from_vtt(language, &content);
    for e in &track.errors {
        tracing::warn!(language = %language, source = %source, line = e.line, "malformed cue: {}", e.message);
    }
    Ok(track)
}

/// Loads every language concurrently. Languages whose source cannot be
/// fetched are left out; the others are unaffected.
pub async fn load_captions(fetcher: &Fetcher, sources: &CaptionSources) -> Vec<CaptionTrack> {
    let loads = sources.iter().map(|(language, source)| async move {
        match load_track(fetcher, language, source).await {
            Ok(track) => Some(track),
            Err(e) => {
                tracing::warn!(language = %language, error = %e, "captions unavailable");
                None
            }
        }
    });

    join_all(loads).await.into_iter().flatten().collect()
}
