//! Timecode tables: playback second at which each sync element starts.

use serde::Serialize;

use crate::error::TimecodeError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Timecodes(Vec<f64>);

impl Default for Timecodes {
    /// What a talk without a usable table gets: everything starts at zero.
    fn default() -> Self {
        Timecodes(vec![0.0])
    }
}

impl Timecodes {
    /// Accepts a non-decreasing sequence of finite, non-negative seconds.
    pub fn new(values: Vec<f64>) -> Result<Self, TimecodeError> {
        let mut previous: Option<f64> = None;
        for (index, &value) in values.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(TimecodeError::InvalidValue { index, value });
            }
            if let Some(previous) = previous {
                if value < previous {
                    return Err(TimecodeError::NonMonotonic {
                        index,
                        value,
                        previous,
                    });
                }
            }
            previous = Some(value);
        }
        Ok(Timecodes(values))
    }

    pub fn parse(json: &str) -> Result<Self, TimecodeError> {
        let values: Vec<f64> = serde_json::from_str(json)?;
        Self::new(values)
    }

    /// Like [`Timecodes::parse`], but a missing or bad table becomes the
    /// default `[0.0]`.
    pub fn parse_or_default(json: Option<&str>, source: &str) -> Self {
        let Some(json) = json else {
            return Self::default();
        };
        Self::parse(json).unwrap_or_else(|e| {
            tracing::warn!(source = %source, error = %e, "ignoring timecode table");
            Self::default()
        })
    }

    /// Embedded players can only seek to whole seconds, and seeking to 0
    /// is ignored by them while 0.01 works.
    pub fn for_embedded_player(&self) -> Self {
        // Zeros can only lead a non-decreasing table; replacing all of them
        // keeps it ordered.
        let values = self
            .0
            .iter()
            .map(|t| t.round())
            .map(|t| if t == 0.0 { 0.01 } else { t })
            .collect();
        Timecodes(values)
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}
