//! The state machine that keeps the visible slide and caption in step with
//! the recording.
//!
//! The engine owns indices and presentation flags only. It never touches the
//! rendered document; every change the host has to make is returned as a
//! [`SyncEffect`]. All state is private: the operations below are the only
//! way to change it.

mod protocol;
mod session;

pub use protocol::PlayerMessage;
pub use session::{SyncEvent, SyncSession, spawn_caption_loads};

use std::collections::HashMap;

use serde::Serialize;

use crate::captions::{Cue, cue_at};
use crate::error::SyncError;
use crate::merge::SyncKind;
use crate::timecodes::Timecodes;

/// Language value that turns captions off.
pub const CAPTIONS_OFF: &str = "x-none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presentation {
    Unvisited,
    /// Left behind by moving forward. Hosts use this to suppress the
    /// entrance animation when the slide is shown again.
    Visited,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    First,
    Previous,
    Next,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SyncEffect {
    /// A different slide is now showing; `slide` is its sync element index.
    Announce { slide: usize },
    /// Move playback to this time.
    Seek { seconds: f64 },
    ShowCue {
        language: String,
        index: usize,
        text: String,
    },
    ClearCue,
    CaptionError {
        language: String,
        line: usize,
        message: String,
    },
    /// Playback ended; offer the talk with this catalog key in the cue area.
    ShowNextTalk { key: String },
}

impl SyncEffect {
    /// The message to send to the playback surface, if this effect needs one.
    pub fn player_message(&self) -> Option<PlayerMessage> {
        match self {
            SyncEffect::Seek { seconds } => Some(PlayerMessage::Seek(*seconds)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncEngine {
    is_slide: Vec<bool>,
    active: Vec<bool>,
    visited: Vec<bool>,
    timecodes: Timecodes,
    captions: HashMap<String, Vec<Cue>>,
    current: usize,
    current_slide: usize,
    current_cue: Option<usize>,
    selected_language: Option<String>,
    position: f64,
    next_talk: Option<String>,
}

impl SyncEngine {
    /// Starts on the first element with captions off.
    pub fn new<I>(kinds: I, timecodes: Timecodes) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = SyncKind>,
    {
        let is_slide: Vec<bool> = kinds.into_iter().map(|k| matches!(k, SyncKind::Slide(_))).collect();
        if is_slide.is_empty() {
            return Err(SyncError::Empty);
        }

        let len = is_slide.len();
        let mut active = vec![false; len];
        active[0] = true;

        Ok(Self {
            is_slide,
            active,
            visited: vec![false; len],
            timecodes,
            captions: HashMap::new(),
            current: 0,
            current_slide: 0,
            current_cue: None,
            selected_language: None,
            position: 0.0,
            next_talk: None,
        })
    }

    /// The talk to offer once playback ends.
    pub fn with_next_talk(mut self, key: Option<String>) -> Self {
        self.next_talk = key;
        self
    }

    pub fn len(&self) -> usize {
        self.is_slide.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_slide.is_empty()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_slide(&self) -> usize {
        self.current_slide
    }

    pub fn current_cue(&self) -> Option<usize> {
        self.current_cue
    }

    pub fn selected_language(&self) -> Option<&str> {
        self.selected_language.as_deref()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn next_talk(&self) -> Option<&str> {
        self.next_talk.as_deref()
    }

    pub fn presentation(&self, index: usize) -> Option<Presentation> {
        let active = *self.active.get(index)?;
        Some(if active {
            Presentation::Active
        } else if self.visited[index] {
            Presentation::Visited
        } else {
            Presentation::Unvisited
        })
    }

    pub fn has_captions(&self, language: &str) -> bool {
        self.captions.contains_key(language)
    }

    /// Makes `target` the current element, walking the elements in between.
    pub fn seek_to_index(&mut self, target: usize) -> Result<Vec<SyncEffect>, SyncError> {
        let len = self.len();
        if target >= len {
            return Err(SyncError::IndexOutOfRange { index: target, len });
        }
        if target == self.current {
            return Ok(Vec::new());
        }

        let previous_slide = self.current_slide;
        if target < self.current {
            for i in (target + 1..=self.current).rev() {
                self.active[i] = false;
            }
            let slide = self.slide_at_or_before(target);
            if slide != previous_slide {
                self.deactivate_slide(previous_slide);
                self.current_slide = slide;
            }
        } else {
            for i in self.current + 1..=target {
                if self.is_slide[i] {
                    self.deactivate_slide(self.current_slide);
                    self.visited[self.current_slide] = true;
                    self.current_slide = i;
                }
            }
        }

        // The slide and its reveal steps up to the target are showing.
        for i in self.current_slide..=target {
            self.active[i] = true;
        }
        self.current = target;

        let mut effects = Vec::new();
        if self.current_slide != previous_slide {
            effects.push(SyncEffect::Announce {
                slide: self.current_slide,
            });
        }
        Ok(effects)
    }

    /// Handles a playback position report: selects the caption and the
    /// element for `seconds`.
    pub fn report_position(&mut self, seconds: f64) -> Vec<SyncEffect> {
        if !seconds.is_finite() {
            tracing::debug!(seconds, "ignoring non-finite position");
            return Vec::new();
        }
        self.position = seconds;
        let mut effects = self.refresh_cue(false);

        let target = self.index_for_time(seconds);
        match self.seek_to_index(target) {
            Ok(more) => effects.extend(more),
            Err(e) => tracing::error!(error = %e, "position lookup produced an invalid index"),
        }
        effects
    }

    /// Switches the caption language (`None` or [`CAPTIONS_OFF`] for no
    /// captions) and shows the cue for the current time, if any.
    pub fn set_language(&mut self, language: Option<&str>) -> Vec<SyncEffect> {
        self.selected_language = language.filter(|l| *l != CAPTIONS_OFF).map(str::to_string);
        self.refresh_cue(true)
    }

    /// Stores the cues of one language.
    pub fn captions_loaded(&mut self, language: &str, mut cues: Vec<Cue>) -> Vec<SyncEffect> {
        if !cues.is_sorted_by(|a, b| a.start <= b.start) {
            tracing::warn!(language = %language, "cues out of order, sorting");
            cues.sort_by(|a, b| a.start.total_cmp(&b.start));
        }
        self.captions.insert(language.to_string(), cues);

        if self.selected_language.as_deref() == Some(language) {
            self.refresh_cue(true)
        } else {
            Vec::new()
        }
    }

    /// Replaces the cue with the next talk, if there is one. The slide
    /// state is left as it is.
    pub fn playback_ended(&mut self) -> Vec<SyncEffect> {
        match &self.next_talk {
            Some(key) => {
                self.current_cue = None;
                vec![SyncEffect::ShowNextTalk { key: key.clone() }]
            }
            None => Vec::new(),
        }
    }

    pub fn navigate(&mut self, navigation: Navigation) -> Vec<SyncEffect> {
        let target = match navigation {
            Navigation::First => 0,
            Navigation::Previous => match self.current.checked_sub(1) {
                Some(target) => target,
                None => return Vec::new(),
            },
            Navigation::Next => {
                if self.current + 1 >= self.len() {
                    return Vec::new();
                }
                self.current + 1
            }
        };

        let mut effects = match self.seek_to_index(target) {
            Ok(effects) => effects,
            Err(e) => {
                tracing::error!(error = %e, "navigation target out of range");
                return Vec::new();
            }
        };
        if let Some(seconds) = self.timecodes.get(self.current) {
            effects.push(SyncEffect::Seek { seconds });
        }
        effects
    }

    pub fn navigate_first(&mut self) -> Vec<SyncEffect> {
        self.navigate(Navigation::First)
    }

    pub fn navigate_prev(&mut self) -> Vec<SyncEffect> {
        self.navigate(Navigation::Previous)
    }

    pub fn navigate_next(&mut self) -> Vec<SyncEffect> {
        self.navigate(Navigation::Next)
    }

    /// Local search from the current element: forward while the next
    /// timecode has been reached, then back while this one has not.
    fn index_for_time(&self, seconds: f64) -> usize {
        let usable = self.timecodes.len().min(self.len());
        if usable == 0 {
            return self.current;
        }
        let table = &self.timecodes.as_slice()[..usable];
        let last = usable - 1;

        let mut i = self.current.min(last);
        while i < last && table[i + 1] <= seconds {
            i += 1;
        }
        while i > 0 && table[i] > seconds {
            i -= 1;
        }
        i
    }

    fn slide_at_or_before(&self, index: usize) -> usize {
        (0..=index).rev().find(|&i| self.is_slide[i]).unwrap_or(0)
    }

    /// Clears the active flag of a slide and of every reveal step in it.
    fn deactivate_slide(&mut self, slide: usize) {
        let end = (slide + 1..self.len()).find(|&i| self.is_slide[i]).unwrap_or(self.len());
        for i in slide..end {
            self.active[i] = false;
        }
    }

    /// Recomputes the cue for the last reported position. Without `force`,
    /// nothing is emitted when the cue index did not change.
    fn refresh_cue(&mut self, force: bool) -> Vec<SyncEffect> {
        let found = self.selected_language.as_ref().and_then(|language| {
            let cues = self.captions.get(language)?;
            let index = cue_at(cues, self.position)?;
            Some((language.clone(), index, cues[index].text.clone()))
        });

        let index = found.as_ref().map(|(_, i, _)| *i);
        if !force && index == self.current_cue {
            return Vec::new();
        }
        self.current_cue = index;

        match found {
            Some((language, index, text)) => vec![SyncEffect::ShowCue { language, index, text }],
            None => vec![SyncEffect::ClearCue],
        }
    }
}

/// Index of the last timecode not after `seconds` (0 if there is none).
/// Gives the same answer as the engine's local search on a non-decreasing
/// table.
pub fn locate(timecodes: &[f64], seconds: f64) -> usize {
    timecodes.partition_point(|&t| t <= seconds).saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(kinds: &[SyncKind], timecodes: &[f64]) -> SyncEngine {
        SyncEngine::new(kinds.iter().copied(), Timecodes::new(timecodes.to_vec()).unwrap()).unwrap()
    }

    fn slides(n: usize) -> Vec<SyncKind> {
        (0..n).map(SyncKind::Slide).collect()
    }

    fn active_slides(e: &SyncEngine) -> usize {
        (0..e.len())
            .filter(|&i| e.is_slide[i] && e.presentation(i) == Some(Presentation::Active))
            .count()
    }

    #[test]
    fn test_position_resolves_to_last_reached_timecode() {
        let mut e = engine(&slides(5), &[0.0, 5.0, 12.0, 12.0, 20.0]);
        let effects = e.report_position(13.0);
        assert_eq!(e.current(), 3);
        assert_eq!(effects, vec![SyncEffect::Announce { slide: 3 }]);
        assert_eq!(locate(&[0.0, 5.0, 12.0, 12.0, 20.0], 13.0), 3);
    }

    #[test]
    fn test_local_search_matches_binary_search() {
        let table = [0.0, 2.0, 2.0, 7.5, 9.0, 9.0, 9.0, 30.0];
        for start in 0..table.len() {
            for step in 0..70 {
                let t = step as f64 * 0.5 - 1.0;
                let mut e = engine(&slides(table.len()), &table);
                e.seek_to_index(start).unwrap();
                e.report_position(t);
                assert_eq!(e.current(), locate(&table, t), "start {} t {}", start, t);
            }
        }
    }

    #[test]
    fn test_navigation_bounds_are_no_ops() {
        let mut e = engine(&slides(3), &[0.0, 10.0, 20.0]);
        assert!(e.navigate_prev().is_empty());
        assert_eq!(e.current(), 0);

        e.seek_to_index(2).unwrap();
        assert!(e.navigate_next().is_empty());
        assert_eq!(e.current(), 2);
    }

    #[test]
    fn test_navigation_seeks_playback() {
        let mut e = engine(&slides(3), &[0.0, 10.0]);
        assert_eq!(
            e.navigate_next(),
            vec![SyncEffect::Announce { slide: 1 }, SyncEffect::Seek { seconds: 10.0 }]
        );
        // No timecode for element 2: no seek.
        assert_eq!(e.navigate_next(), vec![SyncEffect::Announce { slide: 2 }]);
        assert_eq!(
            e.navigate_first(),
            vec![SyncEffect::Announce { slide: 0 }, SyncEffect::Seek { seconds: 0.0 }]
        );
    }

    #[test]
    fn test_reveal_steps_within_a_slide() {
        use SyncKind::*;
        let mut e = engine(&[Slide(0), Reveal, Reveal, Slide(1), Reveal], &[0.0, 1.0, 2.0, 3.0, 4.0]);

        assert!(e.navigate_next().iter().all(|f| matches!(f, SyncEffect::Seek { .. })));
        assert_eq!(e.current_slide(), 0);
        assert_eq!(e.presentation(1), Some(Presentation::Active));
        assert_eq!(e.presentation(2), Some(Presentation::Unvisited));

        // Jump into the middle of the next slide.
        e.seek_to_index(4).unwrap();
        assert_eq!(e.current_slide(), 3);
        assert_eq!(e.presentation(0), Some(Presentation::Visited));
        assert_eq!(e.presentation(1), Some(Presentation::Unvisited));
        assert_eq!(e.presentation(3), Some(Presentation::Active));
        assert_eq!(e.presentation(4), Some(Presentation::Active));

        // Back to the second reveal of the first slide.
        let effects = e.seek_to_index(2).unwrap();
        assert_eq!(effects, vec![SyncEffect::Announce { slide: 0 }]);
        assert_eq!(e.presentation(0), Some(Presentation::Active));
        assert_eq!(e.presentation(1), Some(Presentation::Active));
        assert_eq!(e.presentation(2), Some(Presentation::Active));
        assert_eq!(e.presentation(3), Some(Presentation::Unvisited));
        assert_eq!(e.presentation(4), Some(Presentation::Unvisited));
    }

    #[test]
    fn test_exactly_one_active_slide_after_any_sequence() {
        use SyncKind::*;
        let kinds = [Slide(0), Reveal, Slide(1), Slide(2), Reveal, Reveal, Slide(3)];
        let mut e = engine(&kinds, &[0.0, 3.0, 6.0, 9.0, 12.0, 15.0, 18.0]);
        enum Step {
            Position(f64),
            Nav(Navigation),
            Index(usize),
        }
        let script = [
            Step::Position(13.0),
            Step::Nav(Navigation::Previous),
            Step::Position(1.0),
            Step::Nav(Navigation::Next),
            Step::Index(6),
            Step::Position(7.0),
            Step::Nav(Navigation::First),
            Step::Position(100.0),
            Step::Index(1),
        ];
        for step in script {
            match step {
                Step::Position(t) => {
                    e.report_position(t);
                }
                Step::Nav(n) => {
                    e.navigate(n);
                }
                Step::Index(i) => {
                    e.seek_to_index(i).unwrap();
                }
            }
            assert_eq!(active_slides(&e), 1);
            assert_eq!(e.presentation(e.current()), Some(Presentation::Active));
            for i in e.current() + 1..e.len() {
                assert_ne!(e.presentation(i), Some(Presentation::Active));
            }
        }
    }

    #[test]
    fn test_seek_out_of_range_is_an_error() {
        let mut e = engine(&slides(2), &[0.0]);
        assert_eq!(e.seek_to_index(2), Err(SyncError::IndexOutOfRange { index: 2, len: 2 }));
        assert_eq!(
            SyncEngine::new(Vec::new(), Timecodes::default()).unwrap_err(),
            SyncError::Empty
        );
    }

    #[test]
    fn test_cues_follow_position_and_language() {
        let mut e = engine(&slides(2), &[0.0, 10.0]);
        e.captions_loaded("en", vec![Cue::new(0.0, 9.0, "hi"), Cue::new(10.0, 24.0, "bye")]);
        assert_eq!(
            e.set_language(Some("en")),
            vec![SyncEffect::ShowCue {
                language: "en".to_string(),
                index: 0,
                text: "hi".to_string()
            }]
        );

        // Same cue again: nothing to do.
        assert!(e.report_position(3.0).is_empty());
        // Between cues, before the next timecode.
        assert_eq!(e.report_position(9.5), vec![SyncEffect::ClearCue]);
        assert_eq!(e.current(), 0);
        assert_eq!(e.current_cue(), None);

        assert_eq!(
            e.report_position(15.0),
            vec![
                SyncEffect::ShowCue {
                    language: "en".to_string(),
                    index: 1,
                    text: "bye".to_string()
                },
                SyncEffect::Announce { slide: 1 },
            ]
        );
    }

    #[test]
    fn test_language_without_captions_clears_cue() {
        let mut e = engine(&slides(1), &[0.0]);
        e.captions_loaded("en", vec![Cue::new(0.0, 5.0, "hi")]);
        e.set_language(Some("en"));
        assert_eq!(e.current_cue(), Some(0));

        assert_eq!(e.set_language(Some("ko")), vec![SyncEffect::ClearCue]);
        assert_eq!(e.current_cue(), None);
        assert_eq!(e.current(), 0);

        // Captions arriving later for the selected language show up at once.
        assert_eq!(
            e.captions_loaded("ko", vec![Cue::new(0.0, 5.0, "annyeong")]),
            vec![SyncEffect::ShowCue {
                language: "ko".to_string(),
                index: 0,
                text: "annyeong".to_string()
            }]
        );
        assert_eq!(e.set_language(Some(CAPTIONS_OFF)), vec![SyncEffect::ClearCue]);
        assert_eq!(e.selected_language(), None);
    }

    #[test]
    fn test_non_finite_position_is_ignored() {
        let mut e = engine(&slides(3), &[0.0, 4.0, 8.0]);
        e.captions_loaded(
            "en",
            vec![Cue::new(0.0, 1.0, "a"), Cue::new(5.0, 6.0, "b"), Cue::new(9.0, 10.0, "c")],
        );
        e.set_language(Some("en"));
        e.report_position(5.5);
        assert_eq!(e.current_cue(), Some(1));

        assert!(e.report_position(f64::NAN).is_empty());
        assert!(e.report_position(f64::INFINITY).is_empty());
        assert_eq!(e.current_cue(), Some(1));
        assert_eq!(e.current(), 1);
        assert_eq!(e.position(), 5.5);
    }

    #[test]
    fn test_playback_ended_offers_next_talk() {
        let mut e = engine(&slides(2), &[0.0, 10.0]).with_next_talk(Some("b".to_string()));
        e.captions_loaded("en", vec![Cue::new(0.0, 30.0, "last words")]);
        e.set_language(Some("en"));
        e.report_position(20.0);

        assert_eq!(e.playback_ended(), vec![SyncEffect::ShowNextTalk { key: "b".to_string() }]);
        assert_eq!(e.current_cue(), None);
        assert_eq!(e.current(), 1);

        let mut last = engine(&slides(1), &[0.0]);
        assert!(last.playback_ended().is_empty());
    }

    #[test]
    fn test_short_timecode_table() {
        let mut e = engine(&slides(4), &[0.0, 10.0]);
        e.report_position(50.0);
        assert_eq!(e.current(), 1);
    }
}
