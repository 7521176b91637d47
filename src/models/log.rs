use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A raw machine-emitted log line. Immutable once stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Log {
    pub log_id: u64,
    pub machine_id: u64,
    pub date_created: DateTime<Utc>,
    pub log_content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Machine {
    pub machine_id: u64,
    pub machine_name: String,
}

/// Fields supplied when a log is recorded; the store assigns the id.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct NewLog {
    pub machine_id: u64,
    pub date_created: DateTime<Utc>,
    pub log_content: String,
}

impl Log {
    /// The pair handed to the sentiment classifier.
    pub fn as_item(&self) -> (u64, String) {
        (self.log_id, self.log_content.clone())
    }
}

pub fn to_millis(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_original_field_names() {
        let log = Log {
            log_id: 7,
            machine_id: 2,
            date_created: from_millis(0),
            log_content: "PROBE CARD FAIL".into(),
        };
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["LogId"], 7);
        assert_eq!(json["MachineId"], 2);
        assert_eq!(json["LogContent"], "PROBE CARD FAIL");
        assert!(json["DateCreated"].as_str().unwrap().starts_with("1970-01-01T00:00:00"));
    }

    #[test]
    fn millis_round_trip_keeps_precision() {
        let ts = from_millis(1_700_000_123_456);
        assert_eq!(to_millis(&ts), 1_700_000_123_456);
    }
}
