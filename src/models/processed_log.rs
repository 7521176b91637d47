use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal sentiment encoding: 0 = not flagged, 1 = flagged as a problem.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(into = "u8", try_from = "u8")]
pub enum Sentiment {
    #[default]
    NotFlagged,
    Flagged,
}

impl Sentiment {
    /// Maps a classifier score onto the internal encoding. Only an exact
    /// `-1` is flagged; anything else, including a missing score, is not.
    pub fn from_classifier_score(score: Option<f64>) -> Self {
        match score {
            Some(s) if s == -1.0 => Sentiment::Flagged,
            _ => Sentiment::NotFlagged,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Sentiment::NotFlagged => 0,
            Sentiment::Flagged => 1,
        }
    }
}

impl From<Sentiment> for u8 {
    fn from(s: Sentiment) -> u8 {
        s.as_u8()
    }
}

impl TryFrom<u8> for Sentiment {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Sentiment::NotFlagged),
            1 => Ok(Sentiment::Flagged),
            other => Err(format!("sentiment must be 0 or 1, got {}", other)),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessedLog {
    pub process_id: u64,
    pub log_id: u64,
    pub sentiment: Sentiment,
    pub resolved: bool,
}

/// A processed log joined with its source log and machine name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorRecord {
    pub process_id: u64,
    pub log_id: u64,
    pub sentiment: Sentiment,
    pub resolved: bool,
    pub date_created: DateTime<Utc>,
    pub log_content: String,
    pub machine_name: String,
}

/// Optional filters for error listings. Every set field must match.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ErrorFilter {
    pub machine_name: Option<String>,
    pub machine_id: Option<u64>,
    pub resolved: Option<bool>,
    pub sentiment: Option<u8>,
}

impl ErrorFilter {
    pub fn matches(&self, record: &ErrorRecord, machine_id: u64) -> bool {
        self.machine_name
            .as_ref()
            .map_or(true, |name| *name == record.machine_name)
            && self.machine_id.map_or(true, |id| id == machine_id)
            && self.resolved.map_or(true, |r| r == record.resolved)
            && self
                .sentiment
                .map_or(true, |s| s == record.sentiment.as_u8())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResolvedUpdate {
    pub resolved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_negative_one_is_flagged() {
        assert_eq!(Sentiment::from_classifier_score(Some(-1.0)), Sentiment::Flagged);
        assert_eq!(Sentiment::from_classifier_score(Some(0.0)), Sentiment::NotFlagged);
        assert_eq!(Sentiment::from_classifier_score(Some(1.0)), Sentiment::NotFlagged);
        assert_eq!(Sentiment::from_classifier_score(None), Sentiment::NotFlagged);
        assert_eq!(Sentiment::from_classifier_score(Some(-2.0)), Sentiment::NotFlagged);
    }

    #[test]
    fn sentiment_is_a_bare_integer_on_the_wire() {
        assert_eq!(serde_json::to_string(&Sentiment::Flagged).unwrap(), "1");
        let parsed: Sentiment = serde_json::from_str("0").unwrap();
        assert_eq!(parsed, Sentiment::NotFlagged);
        assert!(serde_json::from_str::<Sentiment>("2").is_err());
    }
}
