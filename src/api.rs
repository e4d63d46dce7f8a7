use serde::{Deserialize, Serialize};

use crate::model::TalkSummary;
use crate::talk::Preferences;
use crate::timecodes::Timecodes;

#[derive(Debug, Deserialize, Default)]
pub struct QueryParams {
    pub cuelang: Option<String>,
    /// Present (with any value, including none) to start in sync mode.
    pub sync: Option<String>,
}

impl QueryParams {
    pub fn into_preferences(self) -> Preferences {
        Preferences {
            language: self.cuelang.filter(|l| !l.is_empty()),
            sync: self.sync.is_some(),
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub struct APIResponse {
    pub status: String,
    pub talks: Vec<TalkSummary>,
}

impl APIResponse {
    pub fn new(msg: Option<&str>, talks: Option<Vec<TalkSummary>>) -> Self {
        APIResponse {
            status: msg.unwrap_or("").to_owned(),
            talks: talks.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimecodesResponse<'a> {
    pub key: &'a str,
    pub timecodes: &'a Timecodes,
}
