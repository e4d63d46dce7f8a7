use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// One talk as described in the catalog. Read-only once loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct TalkRecord {
    pub key: String,
    pub title: String,
    pub presenter: String,
    pub slides: String,
    pub transcript: String,
    #[serde(default)]
    pub captions: CaptionSources,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub timecodes: Option<String>,
    pub duration: String,
    #[serde(default)]
    pub published: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback<'a> {
    /// An embedded player page, shown in an iframe and driven by messages.
    Video(&'a str),
    /// A sound file played by an audio element.
    Audio(&'a str),
}

impl<'a> Playback<'a> {
    pub fn url(&self) -> &'a str {
        match self {
            Playback::Video(url) | Playback::Audio(url) => url,
        }
    }

    pub fn noun(&self) -> &'static str {
        match self {
            Playback::Video(_) => "video",
            Playback::Audio(_) => "sound player",
        }
    }
}

impl TalkRecord {
    /// Audio wins if a record (wrongly) names both; the catalog rejects such
    /// records at load time.
    pub fn playback(&self) -> Option<Playback<'_>> {
        match (&self.audio, &self.video) {
            (Some(audio), _) => Some(Playback::Audio(audio)),
            (None, Some(video)) => Some(Playback::Video(video)),
            (None, None) => None,
        }
    }

    pub fn summary(&self) -> TalkSummary {
        TalkSummary {
            key: self.key.clone(),
            title: self.title.clone(),
            presenter: self.presenter.clone(),
            duration: self.duration.clone(),
            languages: self.captions.languages().map(str::to_string).collect(),
        }
    }
}

/// Caption file per language, in the order the catalog lists them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionSources(Vec<(String, String)>);

impl CaptionSources {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(lang, url)| (lang.as_str(), url.as_str()))
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(lang, _)| lang.as_str())
    }

    pub fn get(&self, language: &str) -> Option<&str> {
        self.iter().find(|(lang, _)| *lang == language).map(|(_, url)| url)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for CaptionSources {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMap;

        impl<'de> Visitor<'de> for OrderedMap {
            type Value = CaptionSources;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from language tag to caption URL")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((lang, url)) = map.next_entry::<String, String>()? {
                    entries.push((lang, url));
                }
                Ok(CaptionSources(entries))
            }
        }

        deserializer.deserialize_map(OrderedMap)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TalkSummary {
    pub key: String,
    pub title: String,
    pub presenter: String,
    pub duration: String,
    pub languages: Vec<String>,
}
