//! The talk catalog: an immutable table loaded once, looked up by key.

use std::collections::HashSet;

use crate::error::{CatalogError, LookupError};
use crate::model::{TalkRecord, TalkSummary};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    talks: Vec<TalkRecord>,
}

/// A looked-up talk together with its neighbours in catalog order.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry<'a> {
    pub talk: &'a TalkRecord,
    pub previous: Option<&'a TalkRecord>,
    pub next: Option<&'a TalkRecord>,
}

impl Catalog {
    pub fn new(talks: Vec<TalkRecord>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for talk in &talks {
            if talk.key.is_empty() {
                return Err(CatalogError::EmptyKey);
            }
            if !seen.insert(talk.key.as_str()) {
                return Err(CatalogError::DuplicateKey(talk.key.clone()));
            }
            if talk.video.is_some() && talk.audio.is_some() {
                return Err(CatalogError::ConflictingPlayback(talk.key.clone()));
            }
        }
        Ok(Self { talks })
    }

    pub fn lookup(&self, key: &str) -> Result<CatalogEntry<'_>, LookupError> {
        let index = self
            .talks
            .iter()
            .position(|t| t.key == key)
            .ok_or_else(|| LookupError(key.to_string()))?;

        Ok(CatalogEntry {
            talk: &self.talks[index],
            previous: index.checked_sub(1).map(|i| &self.talks[i]),
            next: self.talks.get(index + 1),
        })
    }

    pub fn summaries(&self) -> Vec<TalkSummary> {
        self.talks.iter().map(TalkRecord::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.talks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.talks.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::CaptionSources;

    pub(crate) fn record(key: &str) -> TalkRecord {
        TalkRecord {
            key: key.to_string(),
            title: format!("Talk {}", key),
            presenter: "Presenter".to_string(),
            slides: format!("{}/slides.html", key),
            transcript: format!("{}/transcript.html", key),
            captions: CaptionSources::new(vec![("en".to_string(), format!("{}/en.vtt", key))]),
            video: Some(format!("https://player.example/{}", key)),
            audio: None,
            poster: None,
            timecodes: Some(format!("{}/times.json", key)),
            duration: "4 min".to_string(),
            published: None,
        }
    }

    #[test]
    fn test_lookup_with_neighbours() {
        let catalog = Catalog::new(vec![record("a"), record("b"), record("c")]).unwrap();

        let first = catalog.lookup("a").unwrap();
        assert!(first.previous.is_none());
        assert_eq!(first.next.map(|t| t.key.as_str()), Some("b"));

        let middle = catalog.lookup("b").unwrap();
        assert_eq!(middle.previous.map(|t| t.key.as_str()), Some("a"));
        assert_eq!(middle.next.map(|t| t.key.as_str()), Some("c"));

        assert!(catalog.lookup("c").unwrap().next.is_none());
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let catalog = Catalog::new(vec![record("a")]).unwrap();
        let err = catalog.lookup("zzz").unwrap_err();
        assert_eq!(err.to_string(), "Not found: zzz");
    }

    #[test]
    fn test_invalid_catalogs_are_rejected() {
        assert_eq!(
            Catalog::new(vec![record("a"), record("a")]).unwrap_err(),
            CatalogError::DuplicateKey("a".to_string())
        );

        let mut both = record("x");
        both.audio = Some("x.mp3".to_string());
        assert_eq!(
            Catalog::new(vec![both]).unwrap_err(),
            CatalogError::ConflictingPlayback("x".to_string())
        );

        assert_eq!(Catalog::new(vec![record("")]).unwrap_err(), CatalogError::EmptyKey);
    }
}
