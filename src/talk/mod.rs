mod handler;
pub mod page;
mod routes;

pub use page::{Preferences, render};
pub use routes::routes;

use crate::catalog::CatalogEntry;
use crate::config::App;
use crate::engine::SyncEngine;
use crate::error::SyncError;
use crate::fetch::Fetcher;
use crate::merge::{EMPTY_TRANSCRIPT, MergedDocument, PLACEHOLDER_SLIDES, SlideDeck, Transcript, merge};
use crate::model::{Playback, TalkRecord};
use crate::timecodes::Timecodes;

/// A talk's merged document and the timecode table that drives it.
#[derive(Debug, Clone)]
pub struct AssembledTalk {
    pub document: MergedDocument,
    pub timecodes: Timecodes,
}

impl AssembledTalk {
    pub fn engine(&self) -> Result<SyncEngine, SyncError> {
        SyncEngine::new(
            self.document.sync_elements.iter().map(|e| e.kind),
            self.timecodes.clone(),
        )
    }

    /// The engine for a looked-up talk. Audio talks offer the following talk
    /// when playback ends; embedded players do not report the end.
    pub fn engine_for(&self, entry: &CatalogEntry<'_>) -> Result<SyncEngine, SyncError> {
        let next = match entry.talk.playback() {
            Some(Playback::Audio(_)) => entry.next.map(|t| t.key.clone()),
            _ => None,
        };
        Ok(self.engine()?.with_next_talk(next))
    }
}

/// Fetches the timecode table. A missing, unreachable or malformed table
/// becomes `[0.0]`. Video talks get the table adjusted for the embedded
/// player.
pub async fn load_timecodes(fetcher: &Fetcher, talk: &TalkRecord) -> Timecodes {
    let timecodes = match &talk.timecodes {
        None => Timecodes::default(),
        Some(source) => match fetcher.fetch_text(source).await {
            Ok(json) => Timecodes::parse_or_default(Some(&json), source),
            Err(e) => {
                tracing::warn!(talk = %talk.key, error = %e, "timecodes unavailable");
                Timecodes::default()
            }
        },
    };

    match talk.playback() {
        Some(Playback::Video(_)) => timecodes.for_embedded_player(),
        _ => timecodes,
    }
}

/// Fetches the slides, transcript and timecodes of a talk concurrently and
/// merges them. Unreachable sources fall back to placeholder content.
pub async fn assemble(fetcher: &Fetcher, app: &App, talk: &TalkRecord) -> AssembledTalk {
    let (slides, transcript, timecodes) = tokio::join!(
        fetcher.fetch_text(&talk.slides),
        fetcher.fetch_text(&talk.transcript),
        load_timecodes(fetcher, talk),
    );

    let slides = slides.unwrap_or_else(|e| {
        tracing::warn!(talk = %talk.key, error = %e, "slides unavailable, using placeholder");
        PLACEHOLDER_SLIDES.to_string()
    });
    let transcript = transcript.unwrap_or_else(|e| {
        tracing::warn!(talk = %talk.key, error = %e, "transcript unavailable");
        EMPTY_TRANSCRIPT.to_string()
    });

    let deck = SlideDeck::parse(&slides, &talk.slides, &app.asset_base);
    let transcript = Transcript::parse(&transcript, &talk.transcript, &app.asset_base);
    let document = merge(&deck, &transcript);
    tracing::debug!(
        talk = %talk.key,
        slides = document.slides.len(),
        sync_elements = document.sync_elements.len(),
        "talk assembled"
    );

    AssembledTalk { document, timecodes }
}
