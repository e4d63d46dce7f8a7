use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Navigation, PlayerMessage, SyncEffect, SyncEngine};
use crate::captions::{CaptionTrack, load_track};
use crate::fetch::Fetcher;
use crate::model::CaptionSources;

#[derive(Debug, Clone)]
pub enum SyncEvent {
    Player(PlayerMessage),
    Navigate(Navigation),
    /// A language tag, or `x-none` for no captions.
    SelectLanguage(String),
    CaptionsLoaded(CaptionTrack),
    /// The audio element reached the end of the recording.
    Ended,
}

/// Drives a [`SyncEngine`] from a single event queue. Events are handled one
/// at a time in arrival order, so position reports, navigation and caption
/// loads never interleave.
pub struct SyncSession {
    engine: SyncEngine,
    events: mpsc::Receiver<SyncEvent>,
    effects: mpsc::Sender<SyncEffect>,
}

impl SyncSession {
    /// Returns the session with the sender for its events and the receiver
    /// for the effects it produces.
    pub fn new(engine: SyncEngine, capacity: usize) -> (Self, mpsc::Sender<SyncEvent>, mpsc::Receiver<SyncEffect>) {
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (effect_tx, effect_rx) = mpsc::channel(capacity);
        let session = Self {
            engine,
            events: event_rx,
            effects: effect_tx,
        };
        (session, event_tx, effect_rx)
    }

    /// Runs until every event sender is gone, then hands the engine back.
    pub async fn run(mut self) -> SyncEngine {
        while let Some(event) = self.events.recv().await {
            for effect in handle(&mut self.engine, event) {
                if self.effects.send(effect).await.is_err() {
                    tracing::debug!("effect receiver dropped, stopping sync session");
                    return self.engine;
                }
            }
        }
        self.engine
    }
}

/// Applies one event to the engine.
pub fn handle(engine: &mut SyncEngine, event: SyncEvent) -> Vec<SyncEffect> {
    match event {
        SyncEvent::Player(PlayerMessage::Position(seconds)) => engine.report_position(seconds),
        SyncEvent::Player(PlayerMessage::Seek(seconds)) => {
            tracing::debug!(seconds, "ignoring seek message sent to the host");
            Vec::new()
        }
        SyncEvent::Navigate(navigation) => engine.navigate(navigation),
        SyncEvent::SelectLanguage(language) => engine.set_language(Some(&language)),
        SyncEvent::CaptionsLoaded(track) => {
            // Only the first problem is shown to the viewer.
            let error = track.errors.first().map(|e| SyncEffect::CaptionError {
                language: track.language.clone(),
                line: e.line,
                message: e.message.clone(),
            });
            let mut effects = engine.captions_loaded(&track.language, track.cues);
            effects.extend(error);
            effects
        }
        SyncEvent::Ended => engine.playback_ended(),
    }
}

/// Starts one load per caption language. Each finished load is posted as a
/// [`SyncEvent::CaptionsLoaded`]; a language that cannot be fetched posts
/// nothing.
pub fn spawn_caption_loads(
    fetcher: &Fetcher,
    sources: &CaptionSources,
    events: &mpsc::Sender<SyncEvent>,
) -> Vec<JoinHandle<()>> {
    sources
        .iter()
        .map(|(language, source)| {
            let fetcher = fetcher.clone();
            let events = events.clone();
            let language = language.to_string();
            let source = source.to_string();
            tokio::spawn(async move {
                match load_track(&fetcher, &language, &source).await {
                    Ok(track) => {
                        if events.send(SyncEvent::CaptionsLoaded(track)).await.is_err() {
                            tracing::debug!(language = %language, "session closed before captions arrived");
                        }
                    }
                    Err(e) => tracing::warn!(language = %language, error = %e, "captions unavailable"),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::SyncKind;
    use crate::timecodes::Timecodes;

    fn engine() -> SyncEngine {
        let kinds = [SyncKind::Slide(0), SyncKind::Slide(1)];
        SyncEngine::new(kinds, Timecodes::new(vec![0.0, 10.0]).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_session_processes_events_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("en.vtt"),
            "WEBVTT\n\n00:00.000 --> 00:09.000\nhi\n\n00:10.000 --> 00:24.000\nbye\n\nnope\n",
        )
        .unwrap();
        let sources = CaptionSources::new(vec![
            ("en".to_string(), "en.vtt".to_string()),
            ("fr".to_string(), "missing.vtt".to_string()),
        ]);

        let (session, events, mut effects) = SyncSession::new(engine(), 16);
        let running = tokio::spawn(session.run());

        events.send(SyncEvent::SelectLanguage("en".to_string())).await.unwrap();
        for load in spawn_caption_loads(&Fetcher::local(dir.path()), &sources, &events) {
            load.await.unwrap();
        }
        events.send(SyncEvent::Player(PlayerMessage::Position(15.0))).await.unwrap();
        drop(events);

        let engine = running.await.unwrap();
        let mut seen = Vec::new();
        while let Some(effect) = effects.recv().await {
            seen.push(effect);
        }

        assert_eq!(
            seen,
            vec![
                SyncEffect::ClearCue,
                SyncEffect::ShowCue {
                    language: "en".to_string(),
                    index: 0,
                    text: "hi".to_string()
                },
                SyncEffect::CaptionError {
                    language: "en".to_string(),
                    line: 9,
                    message: "expected a cue timing line".to_string()
                },
                SyncEffect::ShowCue {
                    language: "en".to_string(),
                    index: 1,
                    text: "bye".to_string()
                },
                SyncEffect::Announce { slide: 1 },
            ]
        );
        assert_eq!(engine.current(), 1);
        assert!(!engine.has_captions("fr"));
    }

    #[test]
    fn test_navigation_event_emits_seek() {
        let mut engine = engine();
        let effects = handle(&mut engine, SyncEvent::Navigate(Navigation::Next));
        assert_eq!(effects[1].player_message(), Some(PlayerMessage::Seek(10.0)));
    }

    #[test]
    fn test_ended_event_offers_next_talk() {
        let mut engine = engine().with_next_talk(Some("next-one".to_string()));
        handle(&mut engine, SyncEvent::Player(PlayerMessage::Position(12.0)));
        assert_eq!(
            handle(&mut engine, SyncEvent::Ended),
            vec![SyncEffect::ShowNextTalk {
                key: "next-one".to_string()
            }]
        );
        assert_eq!(engine.current(), 1);
    }
}
